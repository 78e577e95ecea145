use std::path::Path;
use std::path::PathBuf;

use tracing::info;

use crate::constants::PACENOTES_COUNT_KEY;
use crate::constants::PACENOTES_SECTION;
use crate::utils::file_io::overwrite_file;
use crate::utils::file_io::sanitize_component;
use crate::IniDocument;
use crate::IniScalar;
use crate::IniSection;
use crate::PacenoteEntry;
use crate::Result;
use crate::SaveRequest;
use crate::StructuredTextCodec;

/// `[PACENOTES] count=N` followed by `[P0]..[P{N-1}]`, in list order.
pub fn build_annotation(pacenotes: &[PacenoteEntry]) -> IniDocument {
    let mut document = IniDocument::new();
    document.push_section(
        IniSection::new(PACENOTES_SECTION).with(PACENOTES_COUNT_KEY, pacenotes.len().to_string()),
    );

    for (index, note) in pacenotes.iter().enumerate() {
        let mut section = IniSection::new(format!("P{}", index))
            .with("type", note.kind.to_ini_value())
            .with("distance", note.distance.to_ini_value())
            .with("flag", note.flag.to_ini_value());
        for (key, value) in &note.extra {
            if let Some(scalar) = IniScalar::from_json(value) {
                section.set(key.as_str(), scalar.to_ini_value());
            }
        }
        document.push_section(section);
    }
    document
}

/// `<root>/<folder>/<name>.<suffix>`; the folder defaults to the name.
pub fn annotation_target(
    root: &Path,
    request: &SaveRequest,
    suffix: &str,
) -> Result<PathBuf> {
    let name = sanitize_component(&request.stage_info.name)?;
    let folder = match request.stage_info.folder.as_deref().filter(|f| !f.trim().is_empty()) {
        Some(folder) => sanitize_component(folder)?,
        None => name.clone(),
    };
    Ok(root.join(folder).join(format!("{}.{}", name, suffix)))
}

/// Serializes the request and overwrites its target. Returns the path written.
pub async fn write_annotation(
    root: &Path,
    request: &SaveRequest,
    suffix: &str,
    codec: &dyn StructuredTextCodec,
) -> Result<PathBuf> {
    let target = annotation_target(root, request, suffix)?;
    let text = codec.serialize(&build_annotation(&request.pacenotes));
    overwrite_file(&target, text.as_bytes()).await?;
    info!(
        "annotation {:?} written with {} calls (author: {})",
        target,
        request.pacenotes.len(),
        request.stage_info.author.as_deref().unwrap_or("unknown")
    );
    Ok(target)
}

/// Persists the label override block verbatim.
pub async fn write_label_overrides(
    path: &Path,
    text: &str,
) -> Result<()> {
    overwrite_file(path, text.as_bytes()).await?;
    info!("pacenote labels saved to {:?}", path);
    Ok(())
}
