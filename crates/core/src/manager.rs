use std::path::Path;
use std::sync::Arc;

use hotspot_protocol::Diagnostic;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::cache::TreeCache;
use crate::emit::{self, DEFAULT_SOURCE, EmitOptions, PathRewrite};
use crate::model::CallTree;
use crate::report::{Hotspot, HotspotReporter, HotspotSort};

/// How reports are built and emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportOptions {
    /// Attribute each function's ticks to its direct callers.
    pub related_information: bool,
    pub sort: HotspotSort,
    /// Label put on every diagnostic.
    pub source: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            related_information: true,
            sort: HotspotSort::default(),
            source: DEFAULT_SOURCE.to_string(),
        }
    }
}

/// Answers hot-spot requests for source files, parsing each results
/// directory once and keeping the tree for later requests.
#[derive(Debug, Default)]
pub struct HotspotManager {
    cache: TreeCache,
    options: ReportOptions,
}

impl HotspotManager {
    pub fn new(options: ReportOptions) -> Self {
        Self {
            cache: TreeCache::new(),
            options,
        }
    }

    /// The call tree for `results_dir`, or `None` (logged) if it cannot be read.
    pub fn tree(&self, results_dir: &Path) -> Option<Arc<CallTree>> {
        match self.cache.get_or_load(results_dir) {
            Ok(tree) => Some(tree),
            Err(e) => {
                error!(source = %results_dir.display(), error = %e, "no profiling data available");
                None
            }
        }
    }

    /// Hot spots in `app_file`, a path as the profiled application saw it.
    /// Unreadable profiling data yields an empty report.
    pub fn report_for_file(&self, results_dir: &Path, app_file: &str) -> Vec<Hotspot> {
        let Some(tree) = self.tree(results_dir) else {
            return Vec::new();
        };
        let mut hotspots = HotspotReporter::new(&tree)
            .with_callers(self.options.related_information)
            .report(app_file);
        self.options.sort.apply(&mut hotspots);
        hotspots
    }

    /// Diagnostics for `app_file`, with caller locations mapped through
    /// `rewrite`.
    pub fn diagnostics_for_file(
        &self,
        results_dir: &Path,
        app_file: &str,
        rewrite: &dyn PathRewrite,
    ) -> Vec<Diagnostic> {
        let hotspots = self.report_for_file(results_dir, app_file);
        emit::to_diagnostics(
            &hotspots,
            &EmitOptions {
                source: &self.options.source,
                related_information: self.options.related_information,
                rewrite,
            },
        )
    }
}
