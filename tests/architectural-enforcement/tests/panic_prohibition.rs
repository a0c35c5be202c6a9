//! Integration Test: Panic Prohibition
//!
//! Failures propagate as `Result` values: `StreamError` and friends in the
//! library, `anyhow::Error` at the binary boundary.
//!
//! **Policy**: Production code MUST NOT call `unwrap()`, `expect()` or
//! `panic!()`.
//! **Exceptions**: test code

use architectural_enforcement::{code_part, production_sources, SourceFile};

const PANIC_PATTERNS: &[&str] = &[".unwrap()", ".expect(", "panic!(", "unreachable!("];

#[test]
fn test_no_panics_in_production_code() {
    let violations: Vec<String> = production_sources()
        .iter()
        .flat_map(find_panic_violations)
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Panicking calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n✅ Use `?`, `ok_or`, `unwrap_or_else` or a logged fallback instead.");

        panic!(
            "\nFound {} panic violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

fn find_panic_violations(source: &SourceFile) -> Vec<String> {
    source
        .lines
        .iter()
        .enumerate()
        .filter(|(idx, line)| !source.is_test_code(*idx) && is_panicking_call(line))
        .map(|(idx, _)| source.violation(idx, "panicking call"))
        .collect()
}

fn is_panicking_call(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with("//") {
        return false;
    }
    let code = code_part(line);
    PANIC_PATTERNS.iter().any(|pattern| code.contains(pattern))
}

#[test]
fn test_panic_detection() {
    assert!(is_panicking_call("    let value = result.unwrap();"));
    assert!(is_panicking_call("    let value = result.expect(\"present\");"));
    assert!(!is_panicking_call("    let value = result.unwrap_or_default();"));
    assert!(!is_panicking_call("    let value = result.unwrap_or_else(|_| fallback);"));
    assert!(!is_panicking_call("    /// Never calls .unwrap() on the stream"));
}
