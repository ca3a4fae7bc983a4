//! The dialect-agnostic tag tree: [`TagNode`]/[`TagValue`] plus the
//! incremental [`NodeBuilder`] that grows them from scanner events.

pub mod builder;
pub mod node;

pub use builder::{ClosedTag, NodeBuilder};
pub use node::{TagNode, TagValue};
