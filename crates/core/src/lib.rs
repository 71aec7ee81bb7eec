//! Turns sampled CPU profiles into per-function hot-spot reports.
//!
//! ```text
//!   profiling.json ─▶ SampleIngestor ─▶ CallTree ─▶ HotspotReporter ─▶ Diagnostic[]
//!   (sample records)   (path rebuild)    (merged)     (per function)     (emit)
//! ```

pub mod cache;
pub mod emit;
pub mod manager;
pub mod model;
pub mod parsers;
pub mod report;
