//! Path filters used when ingesting a directory tree.

use std::path::Path;

/// Default directory and file names skipped during directory ingestion.
pub fn default_exclude_patterns() -> Vec<String> {
    vec![
        // Version control
        ".git".to_string(),
        ".svn".to_string(),
        ".hg".to_string(),

        // Build outputs
        "target".to_string(),
        "dist".to_string(),
        "build".to_string(),

        // Package managers
        "node_modules".to_string(),
        "vendor".to_string(),

        // Python
        "__pycache__".to_string(),
        ".venv".to_string(),

        // IDEs
        ".vscode".to_string(),
        ".idea".to_string(),

        // OS
        ".DS_Store".to_string(),
        "Thumbs.db".to_string(),
    ]
}

/// File extensions that never hold extractable text.
pub fn binary_extensions() -> &'static [&'static str] {
    &[
        // Images
        "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp",
        // Office documents
        "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
        // Archives
        "zip", "tar", "gz", "bz2", "7z", "rar",
        // Executables/Libraries
        "exe", "dll", "so", "dylib", "a", "lib",
        // Media
        "mp3", "mp4", "avi", "mov", "mkv", "wav", "flac",
        // Binary data
        "wasm", "bin", "dat", "db", "sqlite", "sqlite3",
    ]
}

/// Returns true if any component of `relative` equals an exclude pattern,
/// or the file has a known binary extension.
///
/// `relative` is the path below the ingestion root, so the location of the
/// root itself never causes an exclusion.
pub fn should_exclude(relative: &Path, exclude_patterns: &[String]) -> bool {
    let excluded_component = relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| exclude_patterns.iter().any(|p| p == name))
    });
    if excluded_component {
        return true;
    }

    relative
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| binary_extensions().contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_should_exclude_git() {
        let path = PathBuf::from("project/.git/config");
        assert!(should_exclude(&path, &default_exclude_patterns()));
    }

    #[test]
    fn test_should_exclude_node_modules() {
        let path = PathBuf::from("web/node_modules/package/readme.md");
        assert!(should_exclude(&path, &default_exclude_patterns()));
    }

    #[test]
    fn test_should_not_exclude_docs() {
        let path = PathBuf::from("docs/guide.md");
        assert!(!should_exclude(&path, &default_exclude_patterns()));
    }

    #[test]
    fn test_partial_name_is_not_a_match() {
        let path = PathBuf::from("targeting/notes.txt");
        assert!(!should_exclude(&path, &default_exclude_patterns()));
    }

    #[test]
    fn test_should_exclude_binary() {
        let path = PathBuf::from("assets/diagram.PNG");
        assert!(should_exclude(&path, &default_exclude_patterns()));
    }
}
