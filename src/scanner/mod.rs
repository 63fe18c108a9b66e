//! Input discovery.
//!
//! Expands the paths given on the command line into the list of COCO
//! JSON files to process. Files are taken as given; directories are
//! walked for `*.json` files.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// A COCO file to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Path on disk.
    pub path: PathBuf,
    /// Name shown in reports.
    pub name: String,
}

impl InputFile {
    fn new(path: PathBuf) -> Self {
        let name = path.display().to_string();
        Self { path, name }
    }

    /// Read the whole file as UTF-8 text.
    pub fn read(&self) -> std::io::Result<String> {
        std::fs::read_to_string(&self.path)
    }
}

/// Expand input paths into files.
///
/// Directory contents are sorted by path. Hidden entries inside a
/// directory are skipped. Only the top level of a directory is searched
/// unless `recursive` is set.
pub fn collect_inputs(paths: &[PathBuf], recursive: bool) -> Result<Vec<InputFile>> {
    let mut inputs = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found = scan_directory(path, recursive)?;
            debug!("Found {} JSON files in {}", found.len(), path.display());
            inputs.append(&mut found);
        } else if path.is_file() {
            inputs.push(InputFile::new(path.clone()));
        } else {
            return Err(anyhow!("Input not found: {}", path.display()));
        }
    }

    Ok(inputs)
}

fn scan_directory(dir: &Path, recursive: bool) -> Result<Vec<InputFile>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));

    for entry in walker {
        let entry =
            entry.with_context(|| format!("Failed to read directory: {}", dir.display()))?;

        if entry.file_type().is_file() && is_json(entry.path()) {
            files.push(InputFile::new(entry.into_path()));
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        fs::write(root.join("b.json"), "{}").unwrap();
        fs::write(root.join("a.JSON"), "{}").unwrap();
        fs::write(root.join("notes.txt"), "not coco").unwrap();
        fs::write(root.join(".hidden.json"), "{}").unwrap();

        fs::create_dir(root.join("nested")).unwrap();
        fs::write(root.join("nested").join("c.json"), "{}").unwrap();

        dir
    }

    fn names(inputs: &[InputFile]) -> Vec<String> {
        inputs
            .iter()
            .map(|input| {
                input
                    .path
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_directory_top_level_only() {
        let dir = setup();
        let inputs = collect_inputs(&[dir.path().to_path_buf()], false).unwrap();
        assert_eq!(names(&inputs), vec!["a.JSON", "b.json"]);
    }

    #[test]
    fn test_directory_recursive() {
        let dir = setup();
        let inputs = collect_inputs(&[dir.path().to_path_buf()], true).unwrap();
        assert_eq!(names(&inputs), vec!["a.JSON", "b.json", "c.json"]);
    }

    #[test]
    fn test_explicit_file_kept_regardless_of_extension() {
        let dir = setup();
        let path = dir.path().join("notes.txt");
        let inputs = collect_inputs(&[path.clone()], false).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].path, path);
        assert_eq!(inputs[0].read().unwrap(), "not coco");
    }

    #[test]
    fn test_missing_path_is_error() {
        let dir = setup();
        let missing = dir.path().join("missing.json");
        assert!(collect_inputs(&[missing], false).is_err());
    }
}
