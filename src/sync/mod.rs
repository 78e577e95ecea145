//! File-system change detection to per-device delivery.
mod annotation;
mod delivery_tracker;
mod sync_engine;

pub use annotation::*;
pub use delivery_tracker::*;
pub use sync_engine::*;

#[cfg(test)]
mod delivery_tracker_test;
