//! Integration Test: Sleep Prohibition
//!
//! Streaming is driven entirely by I/O readiness: chunks render when bytes
//! arrive and cancellation is observed through tokens.
//!
//! **Policy**: Production code MUST NOT call sleep methods.
//! **Exceptions**: test code

use architectural_enforcement::{code_part, production_sources};

const SLEEP_PATTERNS: &[&str] = &[
    "thread::sleep(",
    "time::sleep(",
    "sleep_until(",
    "tokio::time::sleep",
];

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - Sleep in polling loops");
        eprintln!("  - Sleep as poor man's synchronization");
        eprintln!("  - Sleep to 'wait' for a stream or a cancellation (await it instead)");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all sleep() calls in production code
fn find_sleep_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for source in production_sources() {
        for (idx, line) in source.lines.iter().enumerate() {
            if source.is_test_code(idx) {
                continue;
            }

            if is_sleep_call(line) {
                violations.push(source.violation(idx, "sleep call"));
            }
        }
    }

    violations
}

fn is_sleep_call(line: &str) -> bool {
    let code = code_part(line);
    SLEEP_PATTERNS.iter().any(|pattern| code.contains(pattern))
}

#[test]
fn test_sleep_detection() {
    assert!(is_sleep_call("    tokio::time::sleep(Duration::from_millis(10)).await;"));
    assert!(is_sleep_call("    std::thread::sleep(delay);"));
    assert!(is_sleep_call("    time::sleep_until(deadline).await;"));
    assert!(!is_sleep_call("    // never tokio::time::sleep here"));
    assert!(!is_sleep_call("    tokio::time::timeout(limit, rx.recv()).await"));
}
