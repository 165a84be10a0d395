//! Source collection and line-window chunking.

use std::path::Path;

use crate::domain::SourceChunk;
use crate::error::Result;
use crate::fs::{FileSystem, slash_path};

/// Collect every matching source file below `root` as fixed-size line windows.
///
/// A file matches when its name ends with one of `extensions`. Files under
/// hidden directories are never visited. Unreadable files are skipped with a
/// warning, and files that are blank after trimming produce no chunks.
pub fn collect<F: FileSystem + ?Sized>(
    fs: &F,
    root: &Path,
    extensions: &[String],
    chunk_lines: usize,
) -> Result<Vec<SourceChunk>> {
    let mut chunks = Vec::new();

    for entry in fs.walk(root)? {
        if !entry.is_file() || !matches_extension(&entry.relative, extensions) {
            continue;
        }
        let contents = match fs.read_lossy(&root.join(&entry.relative)) {
            Ok(contents) => contents,
            Err(err) => {
                log::warn!("skipping unreadable file {}: {err}", entry.relative.display());
                continue;
            }
        };
        if contents.trim().is_empty() {
            continue;
        }
        chunks.extend(chunk_file(&slash_path(&entry.relative), &contents, chunk_lines));
    }

    Ok(chunks)
}

/// Split one file's contents into consecutive windows of at most `chunk_lines` lines.
pub fn chunk_file(origin_file: &str, contents: &str, chunk_lines: usize) -> Vec<SourceChunk> {
    let lines: Vec<&str> = contents.lines().collect();
    lines
        .chunks(chunk_lines.max(1))
        .enumerate()
        .map(|(index, window)| {
            let start = index * chunk_lines.max(1) + 1;
            SourceChunk {
                origin_file: origin_file.to_string(),
                line_range: (start, start + window.len() - 1),
                text: window.join("\n"),
            }
        })
        .collect()
}

fn matches_extension(relative: &Path, extensions: &[String]) -> bool {
    let Some(name) = relative.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    extensions.iter().any(|ext| name.ends_with(ext.as_str()))
}
