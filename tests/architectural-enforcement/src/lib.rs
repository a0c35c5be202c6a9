//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! on the production sources of the workspace:
//! - No blocking I/O inside async code
//! - No sleep() calls
//! - No unwrap()/expect() panics
//!
//! The helpers here walk the production source trees and classify each line
//! as production or test code. Classification is line-based and heuristic,
//! which is adequate for code formatted with rustfmt.

use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["streamswap/core/src", "streamswap/cli/src"];

/// Workspace root, two levels above this package
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// A Rust source file loaded for scanning
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// File lines
    pub lines: Vec<String>,
    test_module_start: Option<usize>,
}

impl SourceFile {
    /// Load a file; `None` if it cannot be read
    #[must_use]
    pub fn load(root: &Path, path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        let test_module_start = lines
            .iter()
            .position(|line| line.trim_start() == "#[cfg(test)]" && !line.starts_with(' '));

        Some(Self {
            path: path.strip_prefix(root).unwrap_or(path).to_path_buf(),
            lines,
            test_module_start,
        })
    }

    /// Lines as string slices, for the scanning helpers
    #[must_use]
    pub fn line_refs(&self) -> Vec<&str> {
        self.lines.iter().map(String::as_str).collect()
    }

    /// Whether the line at `idx` is test code
    ///
    /// True past a top-level `#[cfg(test)]` or inside a `#[test]` /
    /// `#[tokio::test]` function.
    #[must_use]
    pub fn is_test_code(&self, idx: usize) -> bool {
        if self.test_module_start.is_some_and(|start| idx >= start) {
            return true;
        }
        is_in_test_function(&self.line_refs(), idx)
    }

    /// Format a violation for this file
    #[must_use]
    pub fn violation(&self, idx: usize, kind: &str) -> String {
        format!(
            "{}:{} - {}: {}",
            self.path.display(),
            idx + 1,
            kind,
            self.lines[idx].trim()
        )
    }
}

/// Load every `.rs` file under the production directories
#[must_use]
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut sources = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        if !path.exists() {
            continue;
        }

        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
                if let Some(source) = SourceFile::load(&root, entry.path()) {
                    sources.push(source);
                }
            }
        }
    }

    sources
}

/// Code portion of a line, with any trailing `//` comment removed
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

fn is_fn_line(line: &str) -> bool {
    line.starts_with("fn ")
        || line.starts_with("async fn ")
        || line.starts_with("pub fn ")
        || line.starts_with("pub async fn ")
        || line.starts_with("pub(crate) fn ")
        || line.starts_with("pub(crate) async fn ")
}

fn is_boundary(line: &str) -> bool {
    line.starts_with("mod ") || (line.starts_with("impl") && line.contains('{'))
}

/// Check if line is inside a test function
#[must_use]
pub fn is_in_test_function(lines: &[&str], current_idx: usize) -> bool {
    let mut found_fn_idx = None;
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if is_fn_line(line) {
            found_fn_idx = Some(i);
            break;
        }

        if is_boundary(line) {
            return false;
        }
    }

    if let Some(fn_idx) = found_fn_idx {
        for i in (0..fn_idx).rev() {
            let line = lines[i].trim();

            if line.starts_with("#[test]")
                || line.starts_with("#[tokio::test")
                || line.starts_with("#[cfg(test)]")
            {
                return true;
            }

            // Only attributes and docs may sit between a marker and its fn
            if !line.starts_with("#[") && !line.starts_with("///") {
                break;
            }
        }
    }

    false
}

/// Check if line is inside an async function
#[must_use]
pub fn is_in_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if is_fn_line(line) {
            return line.contains("async fn ");
        }

        if is_boundary(line) {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_function_detection() {
        let code = [
            "pub async fn run(self) -> Outcome {",
            "    let text = std::fs::read_to_string(\"file.txt\");",
            "}",
        ];
        assert!(is_in_async_function(&code, 1));

        let code = [
            "fn load() {",
            "    let text = std::fs::read_to_string(\"config.toml\");",
            "}",
        ];
        assert!(!is_in_async_function(&code, 1));
    }

    #[test]
    fn test_test_function_detection() {
        let code = [
            "#[tokio::test]",
            "async fn test_something() {",
            "    value.unwrap();",
            "}",
        ];
        assert!(is_in_test_function(&code, 2));

        let code = ["/// Docs", "pub fn production() {", "    value.unwrap();", "}"];
        assert!(!is_in_test_function(&code, 2));
    }

    #[test]
    fn test_code_part_strips_comments() {
        assert_eq!(code_part("let x = y; // .unwrap()"), "let x = y; ");
        assert_eq!(code_part("plain"), "plain");
    }

    #[test]
    fn test_workspace_root_holds_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }
}
