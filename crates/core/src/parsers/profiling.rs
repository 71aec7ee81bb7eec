use std::collections::{HashMap, HashSet};

use hotspot_protocol::SharedStr;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{CallTree, NodeIdentity, SampleFrame, SampleRecord};

/// A sample record that cannot be merged. Only that record is dropped.
#[derive(Debug, Error)]
pub enum MalformedSample {
    #[error("invalid record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame id {0} appears more than once")]
    DuplicateFrameId(u64),
    #[error("parent chain of frame {0} loops back on itself")]
    ParentCycle(u64),
}

/// Frame as written by the profiler.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrame {
    #[serde(rename = "self")]
    self_id: u64,
    #[serde(default)]
    name: Option<SharedStr>,
    #[serde(default)]
    file: Option<SharedStr>,
    #[serde(default)]
    line: Option<i64>,
    #[serde(default)]
    parent: Option<u64>,
    #[serde(alias = "count")]
    tick_count: u64,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    functions: Vec<RawFrame>,
}

impl From<RawFrame> for SampleFrame {
    fn from(raw: RawFrame) -> Self {
        SampleFrame {
            self_id: raw.self_id,
            parent: raw.parent,
            identity: NodeIdentity::new(
                raw.file.unwrap_or_default(),
                raw.name.unwrap_or_default(),
                raw.line.unwrap_or(0),
            ),
            tick_count: raw.tick_count,
        }
    }
}

impl SampleRecord {
    /// Validate one record from its JSON form.
    ///
    /// Expects `{"functions": [{"self", "name", "file", "line", "parent",
    /// "tickCount"}, ...]}`. `self` and `tickCount` are required; a missing
    /// name or file reads as empty and a missing line as unknown.
    pub fn from_json(value: serde_json::Value) -> Result<Self, MalformedSample> {
        let raw: RawRecord = serde_json::from_value(value)?;
        let mut seen = HashSet::with_capacity(raw.functions.len());
        for f in &raw.functions {
            if !seen.insert(f.self_id) {
                return Err(MalformedSample::DuplicateFrameId(f.self_id));
            }
        }
        Ok(SampleRecord {
            frames: raw.functions.into_iter().map(SampleFrame::from).collect(),
        })
    }
}

/// Running totals for one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub records: usize,
    pub rejected: usize,
    pub frames_merged: usize,
    pub program_frames: usize,
}

/// Replays sample records into a [`CallTree`].
pub struct SampleIngestor<'t> {
    tree: &'t mut CallTree,
    stats: IngestStats,
}

impl<'t> SampleIngestor<'t> {
    pub fn new(tree: &'t mut CallTree) -> Self {
        Self {
            tree,
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn finish(self) -> IngestStats {
        self.stats
    }

    /// Validate and ingest one JSON record. A malformed record is logged,
    /// counted as rejected, and leaves the tree untouched.
    pub fn ingest_json(&mut self, value: serde_json::Value) {
        let index = self.stats.records;
        match SampleRecord::from_json(value).and_then(|r| self.ingest(&r)) {
            Ok(()) => {}
            Err(e) => {
                self.stats.records += 1;
                self.stats.rejected += 1;
                warn!(record = index, error = %e, "skipping malformed sample record");
            }
        }
    }

    /// Merge every frame of `record` except `(program)`.
    ///
    /// All paths are rebuilt before anything is merged, so a record with a
    /// parent cycle contributes nothing.
    pub fn ingest(&mut self, record: &SampleRecord) -> Result<(), MalformedSample> {
        let by_id: HashMap<u64, &SampleFrame> =
            record.frames.iter().map(|f| (f.self_id, f)).collect();

        let mut paths = Vec::with_capacity(record.frames.len());
        let mut program_frames = 0;
        for frame in &record.frames {
            if frame.identity.is_program() {
                program_frames += 1;
                continue;
            }
            paths.push((frame.tick_count, call_path(frame, &by_id)?));
        }

        for (ticks, path) in &paths {
            self.tree.merge_sample(path, *ticks);
        }

        debug!(frames = paths.len(), program_frames, "merged sample record");
        self.stats.records += 1;
        self.stats.frames_merged += paths.len();
        self.stats.program_frames += program_frames;
        Ok(())
    }
}

/// Walk `parent` links from `frame` to the top and return the path
/// root-first. A parent id missing from the record or a `(program)` parent
/// ends the walk, so the path never contains a `(program)` frame.
fn call_path<'r>(
    frame: &'r SampleFrame,
    by_id: &HashMap<u64, &'r SampleFrame>,
) -> Result<Vec<&'r SampleFrame>, MalformedSample> {
    let mut path = vec![frame];
    let mut next = frame.parent;
    while let Some(pid) = next {
        let Some(&parent) = by_id.get(&pid).filter(|p| !p.identity.is_program()) else {
            break;
        };
        // Without repeats a path can hold every frame of the record once.
        if path.len() >= by_id.len() {
            return Err(MalformedSample::ParentCycle(frame.self_id));
        }
        path.push(parent);
        next = parent.parent;
    }
    path.reverse();
    Ok(path)
}
