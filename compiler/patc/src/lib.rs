//! Driver for the Pat mailbox type checker.
//!
//! [`check`] is a pure function from source text to a structured
//! [`CheckReport`]; it performs no I/O, so embedding services can call it
//! without staging temp files. The thin CLI in `main.rs` is a collaborator
//! of this library, not part of it.

pub mod report;

use pat_diagnostic::{Diagnostic, LineIndex, Severity};
use pat_ir::StringInterner;
use pat_types::InterfaceRegistry;
use serde::Serialize;

/// Exit code for a program that failed type checking.
pub const EXIT_TYPE_ERROR: i32 = 123;
/// Exit code for an invalid invocation or a parse failure.
pub const EXIT_USAGE: i32 = 124;

/// Options for a check run.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Include the resolved-program dump in textual output.
    pub verbose: bool,
}

/// A diagnostic in the external shape: category, message, 1-based line.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReportedDiagnostic {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub line: u32,
    pub severity: String,
}

/// Structured result of checking one source text.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub success: bool,
    /// Resolved whole-program type; present on success.
    pub program_type: Option<String>,
    /// Rendered interface summaries, in declaration order.
    pub interfaces: Vec<String>,
    /// `guard <name>: <pattern>` summaries from verified definitions.
    pub guards: Vec<String>,
    pub diagnostics: Vec<ReportedDiagnostic>,
}

impl CheckReport {
    /// Whether the failure was a lexical/grammatical one (exit-code class).
    pub fn is_parse_failure(&self) -> bool {
        self.diagnostics
            .first()
            .is_some_and(|d| d.kind == "Parse Error")
    }
}

/// Check Pat source text: lex, parse, build the interface registry, type
/// check, solve constraints. Deterministic: the same input yields the same
/// report.
pub fn check(source: &str, _options: &CheckOptions) -> CheckReport {
    let interner = StringInterner::new();
    let line_index = LineIndex::new(source);
    tracing::debug!(bytes = source.len(), "checking source");

    // Parse errors are unrecoverable for the file: no partial AST is checked.
    let program = match pat_parse::parse_source(source, &interner) {
        Ok(program) => program,
        Err(diag) => {
            return failure(vec![diag], &line_index);
        }
    };

    // Protocols must be well-formed before any definition is checked.
    let (registry, registry_diags) = InterfaceRegistry::build(&program.interfaces, &interner);
    if registry_diags.iter().any(Diagnostic::is_error) {
        return failure(registry_diags, &line_index);
    }

    let outcome = pat_typeck::check_program(&program, &registry, &interner);
    if outcome.diagnostics.has_errors() {
        return failure(outcome.diagnostics.into_vec(), &line_index);
    }

    // Resolved program type: `main`'s declared return type when present.
    let main_name = interner.intern("main");
    let program_type = program
        .defs
        .iter()
        .find(|def| def.name == main_name)
        .map_or_else(|| "Unit".to_string(), |def| def.return_type.kind.render(&interner));

    let interfaces = registry.iter().map(|info| info.render(&interner)).collect();

    CheckReport {
        success: true,
        program_type: Some(program_type),
        interfaces,
        guards: outcome.guards,
        diagnostics: outcome
            .diagnostics
            .into_vec()
            .into_iter()
            .map(|d| reported(&d, &line_index))
            .collect(),
    }
}

fn failure(diagnostics: Vec<Diagnostic>, line_index: &LineIndex) -> CheckReport {
    CheckReport {
        success: false,
        program_type: None,
        interfaces: Vec::new(),
        guards: Vec::new(),
        diagnostics: diagnostics.iter().map(|d| reported(d, line_index)).collect(),
    }
}

fn reported(diagnostic: &Diagnostic, line_index: &LineIndex) -> ReportedDiagnostic {
    ReportedDiagnostic {
        kind: diagnostic.kind.category().to_string(),
        message: diagnostic.message.clone(),
        line: line_index.line_of_span(diagnostic.span),
        severity: match diagnostic.severity {
            Severity::Error => "error".to_string(),
            Severity::Warning => "warning".to_string(),
        },
    }
}

/// Driver-boundary failures (host-level, not part of the pure checker).
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("cannot read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read and check a file; the only filesystem touchpoint.
pub fn check_file(path: &str, options: &CheckOptions) -> Result<CheckReport, DriverError> {
    let source = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.to_string(),
        source,
    })?;
    Ok(check(&source, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_failure_is_flagged() {
        let report = check("def @", &CheckOptions::default());
        assert!(!report.success);
        assert!(report.is_parse_failure());
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].line, 1);
    }

    #[test]
    fn registry_failure_is_not_parse_failure() {
        let report = check(
            "interface A { M() }\ninterface A { M() }",
            &CheckOptions::default(),
        );
        assert!(!report.success);
        assert!(!report.is_parse_failure());
        assert_eq!(report.diagnostics[0].kind, "Interface Error");
        assert_eq!(report.diagnostics[0].line, 2);
    }

    #[test]
    fn empty_program_type_defaults_to_unit() {
        let report = check("interface A { M() }", &CheckOptions::default());
        assert!(report.success);
        assert_eq!(report.program_type.as_deref(), Some("Unit"));
    }

    #[test]
    fn report_serializes_with_external_field_names() {
        let report = check("def @", &CheckOptions::default());
        let json = match serde_json::to_value(&report) {
            Ok(json) => json,
            Err(err) => panic!("serialization failed: {err}"),
        };
        assert_eq!(json["success"], false);
        assert_eq!(json["diagnostics"][0]["type"], "Parse Error");
        assert_eq!(json["diagnostics"][0]["severity"], "error");
    }
}
