//! Repository structure heuristics.

use std::path::Path;

use crate::domain::StructureReport;
use crate::error::Result;
use crate::fs::{FileSystem, TreeEntry};

const README_NAMES: &[&str] = &["readme.md", "readme.txt", "readme"];
const MANIFEST_NAMES: &[&str] = &["requirements.txt", "pyproject.toml", "setup.py"];
const CONTAINER_NAME: &str = "dockerfile";
const WORKFLOWS_DIR: &str = ".github/workflows";

/// Inspect the tree below `root` for hygiene markers and size counters.
///
/// Hidden directories are pruned from the walk, so nothing below them is
/// counted or flagged; hidden files are still counted. Each file contributes
/// to at most one flag, checked in README, manifest, container, CI, tests
/// order.
pub fn analyze_structure<F: FileSystem + ?Sized>(fs: &F, root: &Path) -> Result<StructureReport> {
    let mut report = StructureReport::default();

    for entry in fs.walk(root)? {
        if !entry.is_file() {
            report.dir_count += 1;
            continue;
        }
        report.file_count += 1;
        classify(&entry, &mut report);
    }

    Ok(report)
}

fn classify(entry: &TreeEntry, report: &mut StructureReport) {
    let name = entry.file_name_lower();
    let parent = entry.parent_display().to_lowercase();

    if README_NAMES.contains(&name.as_str()) {
        report.has_readme = true;
    } else if MANIFEST_NAMES.contains(&name.as_str()) {
        report.has_requirements = true;
    } else if name == CONTAINER_NAME {
        report.has_dockerfile = true;
    } else if parent.contains(WORKFLOWS_DIR) {
        report.has_ci = true;
    } else if parent.contains("test") {
        report.has_tests = true;
    }
}
