use std::path::{Path, PathBuf};

/// Trim whitespace + strip one pair of outer quotes (single or double) if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    let quoted = trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')));
    if quoted {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<dir>/<input stem>_dlog.csv`, or next to the input when `dir` is `None`.
pub fn default_output_path(input: &Path, dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = format!("{}_dlog.csv", stem);
    match dir {
        Some(d) => d.join(file_name),
        None => input.with_file_name(file_name),
    }
}
