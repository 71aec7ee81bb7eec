use std::io::Write;

use hotspot_protocol::{Diagnostic, Severity};
use serde::Serialize;

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Information => "info",
        Severity::Hint => "hint",
    }
}

/// `file:line: severity: message`, one related location per indented line.
/// Lines are printed 1-based.
pub fn write_text(out: &mut dyn Write, file: &str, diagnostics: &[Diagnostic]) -> std::io::Result<()> {
    if diagnostics.is_empty() {
        writeln!(out, "{file}: no hot spots")?;
        return Ok(());
    }
    for d in diagnostics {
        writeln!(
            out,
            "{file}:{}: {}: {}",
            d.range.start.line + 1,
            severity_label(d.severity),
            d.message
        )?;
        for r in d.related_information.iter().flatten() {
            writeln!(
                out,
                "    {}:{}: {}",
                r.location.uri,
                r.location.range.start.line + 1,
                r.message
            )?;
        }
    }
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
