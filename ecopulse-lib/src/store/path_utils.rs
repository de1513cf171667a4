//! Mapping of collection and document names onto file names.

/// Turn a collection or document name into a single safe path component.
///
/// `..` becomes `__` and separators or reserved characters become `_`, so a name can never
/// escape its collection directory. Trailing dots and spaces are dropped since some
/// filesystems silently strip them. The `#` in repository keys is kept, which leaves
/// `acme#widget` readable on disk.
#[must_use]
pub fn sanitize_path_component(name: &str) -> String {
    let cleaned = name
        .replace("..", "__")
        .replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'], "_");

    let trimmed = cleaned.trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}
