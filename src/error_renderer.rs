//! Error rendering using ariadne
//!
//! Compilation errors are shown against the tree dump they came from, with
//! the offending node underlined and help texts as notes.

use crate::{Diagnostic, Error, Severity};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

const SOURCE_ID: &str = "<input>";

/// Render an error with formatting to stderr
///
/// # Example
/// ```no_run
/// use mjc::{TargetConfig, compile, render_error};
///
/// if let Err(e) = compile("program main { x#1.$print(): void; }", &TargetConfig::default()) {
///     render_error(&e);
/// }
/// ```
pub fn render_error(error: &Error) {
    render_error_to_writer(error, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
pub fn render_error_to(error: &Error, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, writer, true)
}

/// Render an error to a String
pub fn render_error_to_string(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render an error to a String without color codes (useful for tests)
pub fn render_error_to_string_no_color(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Compilation {
            diagnostics,
            source,
        } => render_diagnostics(source, diagnostics, writer, use_color),
        Error::Config(err) => {
            writeln!(writer, "{}", err.to_diagnostic())
        }
        Error::Io(err) => {
            writeln!(writer, "I/O error: {}", err)
        }
    }
}

fn render_diagnostics(
    source: &str,
    diagnostics: &[Diagnostic],
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    for diag in diagnostics {
        let mut colors = ColorGenerator::new();
        colors.next(); // Skip the first color.

        let kind = match diag.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
            Severity::Info => ReportKind::Advice,
        };

        let mut report = Report::build(kind, (SOURCE_ID, diag.span.0.clone()))
            .with_message(&diag.message)
            .with_config(ariadne::Config::default().with_color(use_color));

        if let Some(code) = &diag.code {
            report = report.with_code(code);
        }

        let color = colors.next();
        report = report.with_label(
            Label::new((SOURCE_ID, diag.span.0.clone()))
                .with_message(&diag.message)
                .with_color(color),
        );

        for help_msg in &diag.help {
            report = report.with_help(help_msg);
        }

        report
            .finish()
            .write((SOURCE_ID, Source::from(source)), &mut *writer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigError, Register, TargetConfig, compile};

    #[test]
    fn test_render_syntax_error() {
        let source = "program main { var x#1: int = ; }";
        let err = compile(source, &TargetConfig::default()).unwrap_err();
        let output = render_error_to_string_no_color(&err);

        assert!(output.contains("Error"), "output: {}", output);
        assert!(output.contains("R001"), "output: {}", output);
        assert!(output.contains(source), "output: {}", output);
    }

    #[test]
    fn test_render_generation_error_with_help() {
        let source = "program main { var a#1: int = b#2; var b#2: int = 1; }";
        let err = compile(source, &TargetConfig::default()).unwrap_err();
        let output = render_error_to_string_no_color(&err);

        assert!(output.contains("G001"), "output: {}", output);
        assert!(output.contains("used before its frame offset is known"));
        assert!(output.contains("locals must be declared before they are referenced"));
    }

    #[test]
    fn test_render_config_error_without_source() {
        let config = TargetConfig {
            int_tag: Register::S2,
            ..TargetConfig::default()
        };
        let err = compile("program main { }", &config).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::RegisterConflict { .. })
        ));

        let output = render_error_to_string_no_color(&err);
        assert!(output.starts_with("error: "), "output: {}", output);
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_render_to_string_is_multiline() {
        let err = compile("program main { this.$print(): void; }", &TargetConfig::default())
            .unwrap_err();
        let output = render_error_to_string_no_color(&err);
        assert!(output.lines().count() > 1);
    }
}
