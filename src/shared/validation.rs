use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for extensions that may be carried over onto a storage key
    /// - Valid: "pdf", "png", "tar", "log1"
    /// - Invalid: "", "p df", "../x", "verylongextension"
    pub static ref EXTENSION_REGEX: Regex = Regex::new(r"^[a-z0-9]{1,10}$").unwrap();
}

/// Strip any directory components a client put into an uploaded file name.
///
/// Both `/` and `\` are treated as separators. The result is trimmed and may
/// be empty, which callers reject.
pub fn display_file_name(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Extension safe to append to a generated storage key, lowercased
pub fn storage_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let ext = ext.to_ascii_lowercase();
    EXTENSION_REGEX.is_match(&ext).then_some(ext)
}
