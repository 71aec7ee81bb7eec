use std::collections::HashMap;

use hotspot_protocol::SharedStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::model::{CallTree, NodeIdentity};

/// Label used for functions without a name.
pub const ANONYMOUS_FUNCTION: &str = "<anonymous function>";

/// Hot-spot entry for one function location in the requested file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// Empty for anonymous functions.
    pub name: SharedStr,
    /// 1-based profiler line.
    pub line: i64,
    /// Self ticks summed over every call path reaching this function.
    pub count: u64,
    /// Share of all recorded ticks, 0–100.
    pub percentage: f64,
    /// Empty unless caller attribution was requested.
    pub callers: Vec<CallerShare>,
}

/// How much of one hot function's own ticks arrived through one direct caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerShare {
    pub file: SharedStr,
    pub name: SharedStr,
    pub line: i64,
    pub count: u64,
    /// Share of the hot function's own count, 0–100.
    pub percentage: f64,
}

impl Hotspot {
    pub fn display_name(&self) -> String {
        display_name(&self.name)
    }
}

impl CallerShare {
    pub fn display_name(&self) -> String {
        display_name(&self.name)
    }
}

fn display_name(name: &str) -> String {
    if name.is_empty() {
        ANONYMOUS_FUNCTION.to_string()
    } else {
        format!("{name}()")
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no ticks recorded in the call tree")]
    NoTicks,
    #[error("{name} at line {line} has no self ticks")]
    EmptyGroup { name: SharedStr, line: i64 },
}

/// Ordering applied to a finished report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HotspotSort {
    /// Order in which the functions were first seen in the tree.
    #[default]
    FirstSeen,
    /// Highest share first.
    Percentage,
    Line,
}

impl HotspotSort {
    /// Reorder hot spots, and each hot spot's callers the same way.
    pub fn apply(self, hotspots: &mut [Hotspot]) {
        match self {
            HotspotSort::FirstSeen => {}
            HotspotSort::Percentage => {
                hotspots.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
                for h in hotspots.iter_mut() {
                    h.callers.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
                }
            }
            HotspotSort::Line => {
                hotspots.sort_by_key(|h| h.line);
                for h in hotspots.iter_mut() {
                    h.callers.sort_by_key(|c| c.line);
                }
            }
        }
    }
}

/// Accumulates one function's ticks before percentages are known.
struct Group {
    name: SharedStr,
    line: i64,
    count: u64,
    callers: Vec<(NodeIdentity, u64)>,
    caller_index: HashMap<NodeIdentity, usize>,
}

/// Builds per-function hot-spot reports from a finished [`CallTree`].
pub struct HotspotReporter<'t> {
    tree: &'t CallTree,
    include_callers: bool,
}

impl<'t> HotspotReporter<'t> {
    pub fn new(tree: &'t CallTree) -> Self {
        Self {
            tree,
            include_callers: true,
        }
    }

    pub fn with_callers(mut self, include_callers: bool) -> Self {
        self.include_callers = include_callers;
        self
    }

    /// Report every function in `file` that was caught running.
    ///
    /// Nodes are grouped by `(name, line)` regardless of the path that
    /// reached them, so one function yields one entry. Entries that cannot
    /// be computed are logged and dropped; the rest are still returned.
    pub fn report(&self, file: &str) -> Vec<Hotspot> {
        let groups = self.group(file);
        let total = self.tree.total_ticks();

        let mut hotspots = Vec::with_capacity(groups.len());
        for group in groups {
            match self.finish(group, total) {
                Ok(h) => hotspots.push(h),
                Err(e) => error!(file, error = %e, "dropping hot spot entry"),
            }
        }
        hotspots
    }

    fn group(&self, file: &str) -> Vec<Group> {
        let mut groups: Vec<Group> = Vec::new();
        let mut by_function: HashMap<(SharedStr, i64), usize> = HashMap::new();

        for node in self.tree.nodes_for_file(file) {
            // Ancestors of running code only show up through their children.
            if node.self_ticks == 0 {
                continue;
            }
            // The root is the whole program, not a function.
            let Some(parent) = self.tree.parent(node.id) else {
                continue;
            };

            let key = (node.identity.name.clone(), node.identity.line);
            let gi = *by_function.entry(key).or_insert_with(|| {
                groups.push(Group {
                    name: node.identity.name.clone(),
                    line: node.identity.line,
                    count: 0,
                    callers: Vec::new(),
                    caller_index: HashMap::new(),
                });
                groups.len() - 1
            });
            let group = &mut groups[gi];
            group.count = group.count.saturating_add(node.self_ticks);

            if self.include_callers {
                // Credit the caller with this function's ticks, not its own.
                let ci = *group
                    .caller_index
                    .entry(parent.identity.clone())
                    .or_insert_with(|| {
                        group.callers.push((parent.identity.clone(), 0));
                        group.callers.len() - 1
                    });
                group.callers[ci].1 = group.callers[ci].1.saturating_add(node.self_ticks);
            }
        }
        groups
    }

    fn finish(&self, group: Group, total: u64) -> Result<Hotspot, ReportError> {
        if total == 0 {
            return Err(ReportError::NoTicks);
        }
        if group.count == 0 {
            return Err(ReportError::EmptyGroup {
                name: group.name,
                line: group.line,
            });
        }

        let callers = group
            .callers
            .into_iter()
            .map(|(caller, count)| CallerShare {
                file: caller.file,
                name: caller.name,
                line: caller.line,
                count,
                percentage: percent(count, group.count),
            })
            .collect();

        Ok(Hotspot {
            name: group.name,
            line: group.line,
            count: group.count,
            percentage: percent(group.count, total),
            callers,
        })
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    part as f64 * 100.0 / whole as f64
}
