//! Resolves a local stage folder name to a catalog [`StageRecord`].
//!
//! Resolution order, first success wins:
//! 1. exact match of normalized names
//! 2. the normalized catalog name starts with the normalized folder name
//! 3. Levenshtein distance, accepted only when the best candidate is within
//!    [`FUZZY_MAX_DISTANCE`] and the runner-up is more than
//!    [`AMBIGUITY_GAP`] further away
mod normalize;
pub use normalize::*;


use std::collections::HashMap;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::constants::AMBIGUITY_GAP;
use crate::constants::FUZZY_MAX_DISTANCE;
use crate::metrics::STAGE_MATCH_METRIC;
use crate::StageRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Exact(StageRecord),
    Prefix(StageRecord),
    Fuzzy { record: StageRecord, distance: usize },
    /// Best fuzzy candidates (name, distance), closest first, at most three
    Ambiguous(Vec<(String, usize)>),
    NoMatch,
}

impl MatchOutcome {
    pub fn record(&self) -> Option<&StageRecord> {
        match self {
            MatchOutcome::Exact(r) | MatchOutcome::Prefix(r) => Some(r),
            MatchOutcome::Fuzzy { record, .. } => Some(record),
            MatchOutcome::Ambiguous(_) | MatchOutcome::NoMatch => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MatchOutcome::Exact(_) => "exact",
            MatchOutcome::Prefix(_) => "prefix",
            MatchOutcome::Fuzzy { .. } => "fuzzy",
            MatchOutcome::Ambiguous(_) => "ambiguous",
            MatchOutcome::NoMatch => "none",
        }
    }
}

#[derive(Debug, Default)]
pub struct NameMatcher {
    /// (normalized name, record) in catalog order
    entries: Vec<(String, StageRecord)>,
    exact: HashMap<String, usize>,
    /// Resolution per folder name, valid for the current catalog only
    cache: HashMap<String, Option<StageRecord>>,
}

impl NameMatcher {
    pub fn new(records: Vec<StageRecord>) -> Self {
        let mut matcher = Self::default();
        matcher.install(records);
        matcher
    }

    /// Replaces the catalog and forgets every cached resolution.
    pub fn install(
        &mut self,
        records: Vec<StageRecord>,
    ) {
        self.entries = records
            .into_iter()
            .filter_map(|r| {
                let key = normalize(&r.name);
                if key.is_empty() {
                    debug!("stage {} ({:?}) has no matchable characters, skipped", r.stage_id, r.name);
                    return None;
                }
                Some((key, r))
            })
            .collect();
        self.exact.clear();
        for (index, (key, _)) in self.entries.iter().enumerate() {
            self.exact.entry(key.clone()).or_insert(index);
        }
        self.cache.clear();
        debug!("name matcher installed {} stage records", self.entries.len());
    }

    pub fn is_loaded(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Cached resolution of `folder`; logs ambiguous matches.
    pub fn resolve(
        &mut self,
        folder: &str,
    ) -> Option<StageRecord> {
        if let Some(hit) = self.cache.get(folder) {
            trace!("stage match cache hit for {:?}", folder);
            return hit.clone();
        }

        let outcome = self.match_name(folder);
        STAGE_MATCH_METRIC.with_label_values(&[outcome.label()]).inc();
        match &outcome {
            MatchOutcome::Ambiguous(top) => {
                warn!("ambiguous stage match for folder {:?}, closest candidates: {:?}", folder, top);
            }
            MatchOutcome::NoMatch if self.is_loaded() => {
                debug!("no stage matches folder {:?}", folder);
            }
            MatchOutcome::Fuzzy { record, distance } => {
                debug!(
                    "folder {:?} fuzzily matched stage {} ({}) at distance {}",
                    folder, record.stage_id, record.name, distance
                );
            }
            _ => {}
        }

        let resolved = outcome.record().cloned();
        self.cache.insert(folder.to_string(), resolved.clone());
        resolved
    }

    /// Uncached resolution of `folder` against the installed catalog.
    pub fn match_name(
        &self,
        folder: &str,
    ) -> MatchOutcome {
        let needle = normalize(folder);
        if needle.is_empty() || self.entries.is_empty() {
            return MatchOutcome::NoMatch;
        }

        if let Some(&index) = self.exact.get(&needle) {
            return MatchOutcome::Exact(self.entries[index].1.clone());
        }

        if let Some(record) = self.unique_prefix_match(&needle) {
            return MatchOutcome::Prefix(record.clone());
        }

        self.fuzzy_match(&needle)
    }

    /// Shortest catalog name extending `needle`, if that shortest one is unique.
    fn unique_prefix_match(
        &self,
        needle: &str,
    ) -> Option<&StageRecord> {
        let mut best: Option<(usize, &StageRecord)> = None;
        let mut tied = false;
        for (key, record) in self.entries.iter().filter(|(key, _)| key.starts_with(needle)) {
            match best {
                Some((len, _)) if key.len() > len => {}
                Some((len, _)) if key.len() == len => tied = true,
                _ => {
                    best = Some((key.len(), record));
                    tied = false;
                }
            }
        }
        match best {
            Some((_, record)) if !tied => Some(record),
            _ => None,
        }
    }

    fn fuzzy_match(
        &self,
        needle: &str,
    ) -> MatchOutcome {
        let mut ranked: Vec<(usize, usize)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, (key, _))| (levenshtein(needle, key), index))
            .collect();
        ranked.sort_by_key(|&(distance, index)| (distance, index));

        let (best_distance, best_index) = ranked[0];
        if best_distance > FUZZY_MAX_DISTANCE {
            return MatchOutcome::NoMatch;
        }

        let confident = match ranked.get(1) {
            None => true,
            Some(&(runner_up, _)) => runner_up > best_distance + AMBIGUITY_GAP,
        };
        if confident {
            return MatchOutcome::Fuzzy {
                record: self.entries[best_index].1.clone(),
                distance: best_distance,
            };
        }

        MatchOutcome::Ambiguous(
            ranked
                .iter()
                .take(3)
                .map(|&(distance, index)| (self.entries[index].1.name.clone(), distance))
                .collect(),
        )
    }
}
