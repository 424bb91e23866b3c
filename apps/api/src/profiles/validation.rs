use std::collections::HashSet;
use std::path::Path;

use crate::extraction::text::{TextExtractorRegistry, DOCX_CONTENT_TYPE, PDF_CONTENT_TYPE};

/// File extension for each content type an upload may arrive as.
const UPLOAD_EXTENSIONS: &[(&str, &str)] = &[(PDF_CONTENT_TYPE, "pdf"), (DOCX_CONTENT_TYPE, "docx")];

/// Rejects an empty list or any blank entry.
pub fn validate_skills(skills: &[String]) -> Result<(), String> {
    if skills.is_empty() {
        return Err("At least one skill is required.".to_string());
    }
    if skills.iter().any(|s| s.trim().is_empty()) {
        return Err("Skills cannot be blank.".to_string());
    }
    Ok(())
}

/// Trims every entry and drops case-insensitive repeats, keeping the first
/// spelling and the caller's order.
pub fn normalize_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}

/// Checks an uploaded file against the size limit and the formats the
/// registry can extract. Returns the content type the extractor should be
/// invoked with.
pub fn validate_upload(
    file_name: &str,
    declared_content_type: &str,
    len: usize,
    max_bytes: usize,
    registry: &TextExtractorRegistry,
) -> Result<&'static str, String> {
    if len == 0 {
        return Err("A CV file is required.".to_string());
    }
    if len > max_bytes {
        let max_mb = max_bytes as f64 / 1024.0 / 1024.0;
        return Err(format!(
            "File size exceeds the maximum allowed size of {max_mb:.1} MB."
        ));
    }

    resolve_content_type(file_name, declared_content_type, registry).ok_or_else(|| {
        let formats: Vec<String> = registry
            .supported_types()
            .into_iter()
            .filter_map(extension_for)
            .map(|ext| format!(".{}", ext.to_uppercase()))
            .collect();
        format!(
            "Unsupported file format. Supported formats: {}.",
            formats.join(", ")
        )
    })
}

/// Declared type wins when the registry handles it; otherwise the file
/// extension decides, again only for registered types.
fn resolve_content_type(
    file_name: &str,
    declared: &str,
    registry: &TextExtractorRegistry,
) -> Option<&'static str> {
    let declared = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    if let Some(content_type) = registry
        .supported_types()
        .into_iter()
        .find(|ct| ct.eq_ignore_ascii_case(declared))
    {
        return Some(content_type);
    }

    let extension = Path::new(file_name).extension()?.to_str()?;
    UPLOAD_EXTENSIONS
        .iter()
        .find(|(_, ext)| ext.eq_ignore_ascii_case(extension))
        .map(|(ct, _)| *ct)
        .filter(|ct| registry.supports(ct))
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    UPLOAD_EXTENSIONS
        .iter()
        .find(|(ct, _)| *ct == content_type)
        .map(|(_, ext)| *ext)
}
