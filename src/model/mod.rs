//! # Entity Graph Model
//!
//! Plain DTOs shared by every layer: store ↔ display ↔ render ↔ wire.
//!
//! Design rule: this module is pure data: no I/O, no state, no async.
//! The wire document (`document`) is the only place that knows about the
//! backend's `{ nodes: [{data: ...}], edges: [{data: ...}] }` envelope.

pub mod node;
pub mod edge;
pub mod value;
pub mod attribute_map;
pub mod graph;
pub mod document;

pub use node::{Node, NodeId, UNKNOWN_TYPE};
pub use edge::{Edge, EdgeId};
pub use value::Value;
pub use attribute_map::AttributeMap;
pub use graph::Graph;
pub use document::{EdgeData, Element, GraphDocument, NodeData};
