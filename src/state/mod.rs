mod session;
mod tree;

pub use session::{ChannelEvent, ChannelId, ChannelUpdate, RunStatus, TrajectorySession};
pub use tree::{build_tree, effective_id, TreeNode};
