//! Integration Test: Blocking I/O Prohibition
//!
//! Async code runs on the tokio runtime and must never block a worker thread.
//!
//! **Policy**: Production async functions MUST NOT call blocking std I/O.
//! **Exceptions**: non-async functions (configuration loading, terminal
//! construction), test code

use architectural_enforcement::{code_part, is_in_async_function, production_sources};

/// Blocking calls forbidden inside async functions
const BLOCKING_PATTERNS: &[(&str, &str)] = &[
    ("std::fs::", "blocking filesystem I/O (use tokio::fs)"),
    ("std::net::", "blocking network I/O (use tokio::net)"),
    ("std::process::Command", "blocking process spawn (use tokio::process)"),
    ("reqwest::blocking", "blocking HTTP client"),
    ("std::io::stdin()", "blocking stdin read"),
    ("std::io::stdout()", "stdout handle acquired in async code"),
    ("std::io::stderr()", "stderr handle acquired in async code"),
    (".read_line(", "blocking line read"),
];

/// Test that async production code does not perform blocking I/O
#[test]
fn test_no_blocking_io_in_async_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O found in async production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n✅ ACCEPTABLE:");
        eprintln!("  - Blocking calls in non-async helpers run before the runtime work starts");
        eprintln!("  - Test code (#[test] or #[tokio::test] functions)");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - std::fs / std::net inside async fn");
        eprintln!("  - reqwest::blocking anywhere in async code");

        panic!(
            "\nFound {} blocking I/O violation(s) in async code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all blocking I/O calls inside async production functions
fn find_blocking_io_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for source in production_sources() {
        let lines = source.line_refs();

        for (idx, line) in lines.iter().enumerate() {
            if source.is_test_code(idx) {
                continue;
            }

            let code = code_part(line);
            for (pattern, reason) in BLOCKING_PATTERNS {
                if code.contains(pattern) && is_in_async_function(&lines, idx) {
                    violations.push(source.violation(idx, reason));
                }
            }
        }
    }

    violations
}

#[test]
fn test_production_sources_are_found() {
    let sources = production_sources();

    assert!(
        sources
            .iter()
            .any(|s| s.path.ends_with("streamswap/core/src/session.rs")),
        "session.rs should be scanned"
    );
    assert!(
        sources
            .iter()
            .any(|s| s.path.ends_with("streamswap/cli/src/main.rs")),
        "main.rs should be scanned"
    );
}

#[test]
fn test_detector_flags_blocking_call_in_async_fn() {
    let code = [
        "pub async fn load() {",
        "    let text = std::fs::read_to_string(\"config.toml\");",
        "}",
    ];
    let code_line = code_part(code[1]);

    assert!(code_line.contains("std::fs::"));
    assert!(is_in_async_function(&code, 1));
}

#[test]
fn test_detector_ignores_commented_call() {
    let line = "    let x = 1; // std::fs::read is not used here";
    assert!(!code_part(line).contains("std::fs::"));
}
