pub mod call_tree;
pub mod identity;
pub mod sample;

pub use call_tree::{CallTree, CallTreeNode, NodeId};
pub use identity::{NodeIdentity, PROGRAM_NAME, ROOT_NAME};
pub use sample::{SampleFrame, SampleRecord};
