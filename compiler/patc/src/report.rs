//! Textual rendering of check reports.
//!
//! This is the sole formatting boundary of the pipeline. The success format
//! keeps stable, greppable markers relied on by embedding services:
//! `=== Resolved Program: ===`, `interface <Name> { ... }`,
//! `guard <name>: <pattern>`, and a final `Type: <type>` line. Failure lines
//! carry the category and a 1-based `line N` reference.

use crate::CheckReport;
use std::fmt::Write as _;

/// Render the success output. The resolved-program dump is verbose-only;
/// the `Type:` line is always present.
pub fn render_success(report: &CheckReport, verbose: bool) -> String {
    let mut out = String::new();

    if verbose {
        out.push_str("=== Resolved Program: ===\n");
        for interface in &report.interfaces {
            out.push_str(interface);
            out.push('\n');
        }
        for guard in &report.guards {
            out.push_str(guard);
            out.push('\n');
        }
    }

    let ty = report.program_type.as_deref().unwrap_or("Unit");
    let _ = writeln!(out, "Type: {ty}");
    out
}

/// Render the failure output, one line per diagnostic.
pub fn render_failure(report: &CheckReport) -> String {
    let mut out = String::new();
    for diagnostic in &report.diagnostics {
        let _ = writeln!(
            out,
            "[{}] line {}: {}",
            diagnostic.kind, diagnostic.line, diagnostic.message
        );
    }
    out
}
