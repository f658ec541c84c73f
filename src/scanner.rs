use crate::error::{Error, Result};
use log::{debug, warn};
use std::path::PathBuf;
use walkdir::WalkDir;

/// Finds the Rust sources that model definitions are read from.
///
/// Walks a source root recursively, skipping `target` and hidden directories. Files are
/// returned sorted so that two scans of the same tree register models in the same order.
///
/// # Example
///
/// ```no_run
/// use openapi_from_routes::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let result = FileScanner::new(PathBuf::from("./src")).scan().unwrap();
/// println!("Found {} model sources", result.rust_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Files found by a scan, plus the entries that could not be read
pub struct ScanResult {
    pub rust_files: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Collects every `.rs` file under the root.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` when the root does not exist. Unreadable entries below
    /// the root only produce warnings.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.exists() {
            return Err(Error::InvalidArgument(format!(
                "Source path does not exist: {}",
                self.root_path.display()
            )));
        }

        let mut rust_files = Vec::new();
        let mut warnings = Vec::new();

        let walker = WalkDir::new(&self.root_path).into_iter().filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            let file_name = e.file_name().to_string_lossy();
            !file_name.starts_with('.') && file_name != "target"
        });

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file()
                        && path.extension().and_then(|s| s.to_str()) == Some("rs")
                    {
                        rust_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        rust_files.sort();
        debug!(
            "Scanned {}: {} Rust files",
            self.root_path.display(),
            rust_files.len()
        );

        Ok(ScanResult {
            rust_files,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_finds_nested_sources_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("models/billing")).unwrap();
        fs::write(root.join("models/user.rs"), "pub struct User {}").unwrap();
        fs::write(root.join("models/billing/invoice.rs"), "pub struct Invoice {}").unwrap();
        fs::write(root.join("README.md"), "# models").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        let names: Vec<String> = result
            .rust_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["invoice.rs".to_string(), "user.rs".to_string()]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_skips_target_and_hidden_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("target/debug")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("target/debug/build.rs"), "fn main() {}").unwrap();
        fs::write(root.join(".cache/stale.rs"), "struct Stale;").unwrap();
        fs::write(root.join("lib.rs"), "pub struct Kept;").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(result.rust_files.len(), 1);
        assert!(result.rust_files[0].ends_with("lib.rs"));
    }

    #[test]
    fn test_scan_missing_root_is_invalid_argument() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        let result = FileScanner::new(missing).scan();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
