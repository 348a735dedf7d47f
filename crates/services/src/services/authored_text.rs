//! Normalisation shared by every service that stores an authored text.

/// Trimmed title, or `None` when nothing but whitespace is left
pub fn clean_title(title: &str) -> Option<String> {
    let trimmed = title.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Trimmed body; blank bodies are stored as NULL
pub fn clean_body(body: Option<&str>) -> Option<String> {
    body.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
