use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::load_pdf::Document;

/// Collects every `.pdf` under `source_dir` (or the configured source
/// directory), sorted by path so repeated scans feed the pipeline in the
/// same order.
pub fn scan_files(cfg: &Config, source_dir: Option<&str>) -> Vec<Document> {
    let base = source_dir.unwrap_or(&cfg.source_dir);
    let mut results = Vec::new();

    let walker = WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !cfg.exclude_dirs.iter().any(|d| d == &name)
        });

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !is_pdf(path) {
            continue;
        }
        if let Ok(meta) = fs::metadata(path) {
            if meta.len() > cfg.max_file_bytes {
                debug!(path = %path.display(), size = meta.len(), "skipping oversized file");
                continue;
            }
        }
        match Document::from_path(path) {
            Ok(doc) => results.push(doc),
            Err(err) => warn!(error = %err, "skipping unreadable file"),
        }
    }

    results
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
