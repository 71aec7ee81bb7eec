use hotspot_protocol::SharedStr;
use serde::{Deserialize, Serialize};

/// Name of the synthetic frame standing for the whole program.
pub const ROOT_NAME: &str = "(root)";

/// Name of the frame profilers use for idle and other non-user time.
pub const PROGRAM_NAME: &str = "(program)";

/// The key deciding whether two frames refer to the same function location.
///
/// Record-local frame ids never take part in matching; only this triple
/// survives across records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub file: SharedStr,
    /// Empty for anonymous functions.
    pub name: SharedStr,
    /// 1-based; 0 means unknown.
    pub line: i64,
}

impl NodeIdentity {
    pub fn new(file: impl Into<SharedStr>, name: impl Into<SharedStr>, line: i64) -> Self {
        Self {
            file: file.into(),
            name: name.into(),
            line,
        }
    }

    /// `("", "(root)", 0)`
    pub fn root() -> Self {
        Self::new("", ROOT_NAME, 0)
    }

    pub fn is_root(&self) -> bool {
        self.file.is_empty() && self.name == ROOT_NAME && self.line == 0
    }

    pub fn is_program(&self) -> bool {
        self.name == PROGRAM_NAME
    }
}

impl std::fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = if self.name.is_empty() {
            "<anonymous>"
        } else {
            self.name.as_str()
        };
        write!(f, "{name} ({}:{})", self.file, self.line)
    }
}
