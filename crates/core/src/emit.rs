use hotspot_protocol::{Diagnostic, Location, Range, RelatedInformation, Severity, SharedStr};

use crate::report::{CallerShare, Hotspot};

pub const DEFAULT_SOURCE: &str = "Codewind Language Server";

/// Maps a file path as the profiled application saw it to the path the
/// diagnostic consumer can open.
pub trait PathRewrite {
    fn rewrite(&self, app_path: &str) -> SharedStr;
}

impl<F> PathRewrite for F
where
    F: Fn(&str) -> SharedStr,
{
    fn rewrite(&self, app_path: &str) -> SharedStr {
        self(app_path)
    }
}

/// Leaves paths untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unchanged;

impl PathRewrite for Unchanged {
    fn rewrite(&self, app_path: &str) -> SharedStr {
        app_path.into()
    }
}

/// Replaces a leading directory, e.g. the container's `/app/` with the
/// project checkout on disk. Paths outside `from` are returned as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRewrite {
    pub from: String,
    pub to: String,
}

impl PrefixRewrite {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl PathRewrite for PrefixRewrite {
    fn rewrite(&self, app_path: &str) -> SharedStr {
        match app_path.strip_prefix(self.from.as_str()) {
            Some(rest) => format!("{}{rest}", self.to).into(),
            None => app_path.into(),
        }
    }
}

pub struct EmitOptions<'a> {
    pub source: &'a str,
    /// Attach one related location per caller.
    pub related_information: bool,
    pub rewrite: &'a dyn PathRewrite,
}

impl Default for EmitOptions<'_> {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE,
            related_information: true,
            rewrite: &Unchanged,
        }
    }
}

pub fn hotspot_message(hotspot: &Hotspot) -> String {
    format!(
        "Function {} was the running function in {:.2}% of samples.",
        hotspot.display_name(),
        hotspot.percentage
    )
}

pub fn caller_message(caller: &CallerShare) -> String {
    format!(
        "{} made {:.2}% of sampled calls.",
        caller.display_name(),
        caller.percentage
    )
}

/// Turn a hot-spot report into editor diagnostics, one per function.
pub fn to_diagnostics(hotspots: &[Hotspot], options: &EmitOptions<'_>) -> Vec<Diagnostic> {
    hotspots
        .iter()
        .map(|h| Diagnostic {
            message: hotspot_message(h),
            range: Range::for_source_line(h.line),
            severity: Severity::Warning,
            source: options.source.to_string(),
            related_information: options.related_information.then(|| {
                h.callers
                    .iter()
                    .map(|c| RelatedInformation {
                        location: Location {
                            uri: options.rewrite.rewrite(&c.file),
                            range: Range::for_source_line(c.line),
                        },
                        message: caller_message(c),
                    })
                    .collect()
            }),
        })
        .collect()
}
