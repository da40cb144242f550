//! Filesystem walker feeding `index_file`, gitignore-aware. One tree per
//! root, named by the root path.

use ignore::WalkBuilder;
use std::path::Path;
use tracing::warn;

use super::{CodeIndex, IndexError, MAX_FILE_SIZE};

pub fn index_filesystem(idx: &mut CodeIndex, root: &Path) -> Result<(), IndexError> {
    let tree = idx.open_tree(&root.display().to_string(), None, "")?;
    for result in WalkBuilder::new(root).build() {
        let entry = match result {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        match entry.metadata() {
            Ok(m) if m.len() > MAX_FILE_SIZE => {
                warn!(path = %path.display(), size = m.len(), "skipping oversized file");
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unstattable file");
                continue;
            }
        }
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        if memchr::memchr(0, &bytes).is_some() {
            continue; // binary
        }
        let rel = path.strip_prefix(root).unwrap_or(path).display().to_string();
        idx.index_file(tree, rel, &bytes)?;
    }
    Ok(())
}
