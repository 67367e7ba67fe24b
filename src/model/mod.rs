pub mod bucket;
pub mod nodes;

pub use bucket::{OrgBucket, Record};
pub use nodes::NodeRegistry;
