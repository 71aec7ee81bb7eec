pub mod profiling;

use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use tracing::info;

use crate::model::CallTree;

pub use profiling::{IngestStats, MalformedSample, SampleIngestor};

/// File holding the sample records inside a results directory.
pub const PROFILING_FILE: &str = "profiling.json";

/// The profiling-data source as a whole could not be read.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("profiling data is not an array of sample records")]
    NotAnArray,
}

/// Build a call tree from the contents of a `profiling.json`.
///
/// The top level must be a JSON array. Each element is validated on its
/// own; malformed records are logged and skipped.
pub fn parse_profiling(data: &[u8]) -> Result<(CallTree, IngestStats), SourceError> {
    let value: serde_json::Value = serde_json::from_slice(data)?;
    let serde_json::Value::Array(records) = value else {
        return Err(SourceError::NotAnArray);
    };

    let mut tree = CallTree::new();
    let mut ingestor = SampleIngestor::new(&mut tree);
    for record in records {
        ingestor.ingest_json(record);
    }
    let stats = ingestor.finish();
    Ok((tree, stats))
}

/// Read and parse `<dir>/profiling.json`.
pub fn load_tree(dir: &Path) -> Result<CallTree, SourceError> {
    let path = dir.join(PROFILING_FILE);
    info!(path = %path.display(), "starting parsing");
    let start = Instant::now();

    let data = std::fs::read(&path).map_err(|source| SourceError::Io {
        path: path.clone(),
        source,
    })?;
    let (tree, stats) = parse_profiling(&data)?;

    info!(
        path = %path.display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        records = stats.records,
        rejected = stats.rejected,
        nodes = tree.len(),
        "done parsing"
    );
    Ok(tree)
}
