use serde::{Deserialize, Serialize};

use super::identity::NodeIdentity;

/// One validated frame of a profiler sample record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFrame {
    /// Record-local id. Only meaningful for resolving `parent` within the
    /// same record.
    pub self_id: u64,
    /// `self_id` of the caller within the same record, `None` at the top.
    pub parent: Option<u64>,
    pub identity: NodeIdentity,
    /// Samples observed with this frame as the running function.
    pub tick_count: u64,
}

/// One profiler record: a flat set of frames linked by parent id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub frames: Vec<SampleFrame>,
}

impl SampleRecord {
    /// Sum of tick counts over every frame, `(program)` included.
    /// Saturates at `u64::MAX`.
    pub fn total_ticks(&self) -> u64 {
        self.frames
            .iter()
            .fold(0u64, |sum, f| sum.saturating_add(f.tick_count))
    }
}
