//! Candidate file enumeration.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::DocexError;
use crate::models::document::{is_hidden, Document};

/// List supported, non-hidden files in `input_dir`, sorted by path.
///
/// Hidden directories are not descended into when `recursive` is set.
/// Files with unsupported extensions are left out; they are neither
/// candidates nor failures.
pub fn discover(input_dir: &Path, recursive: bool) -> Result<Vec<Document>, DocexError> {
    if !input_dir.is_dir() {
        return Err(DocexError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input directory not found: {}", input_dir.display()),
        )));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut documents = Vec::new();

    for entry in WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot read directory entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        match Document::from_path(entry.path()) {
            Some(doc) => documents.push(doc),
            None => debug!("Skipping unsupported file {}", entry.path().display()),
        }
    }

    documents.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn names(docs: &[Document]) -> Vec<String> {
        docs.iter().map(|d| d.file_name()).collect()
    }

    #[test]
    fn test_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PNG", "c.jpeg", "notes.txt", ".hidden.png", "d.tiff"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let docs = discover(dir.path(), false).unwrap();
        assert_eq!(names(&docs), vec!["a.PNG", "b.pdf", "c.jpeg", "d.tiff"]);
    }

    #[test]
    fn test_recursion_is_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::create_dir_all(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join("top.png"), b"x").unwrap();
        fs::write(dir.path().join("sub/inner.pdf"), b"x").unwrap();
        fs::write(dir.path().join(".cache/skip.pdf"), b"x").unwrap();

        assert_eq!(names(&discover(dir.path(), false).unwrap()), vec!["top.png"]);
        assert_eq!(
            names(&discover(dir.path(), true).unwrap()),
            vec!["inner.pdf", "top.png"]
        );
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover(&dir.path().join("nope"), false),
            Err(DocexError::Io(_))
        ));
    }
}
