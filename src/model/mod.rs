//! # Property Graph Model
//!
//! Plain DTOs that define the property graph. These types cross every
//! boundary: storage ↔ transactions ↔ traversal ↔ user.
//!
//! This module is pure data — no I/O, no state, no locking.

pub mod node;
pub mod relationship;
pub mod path;
pub mod value;
pub mod property_map;
pub mod entity;

pub use node::{Node, NodeId};
pub use relationship::{Relationship, RelId, RelType, Direction};
pub use path::Path;
pub use value::Value;
pub use property_map::{PropertyMap, properties};
pub use entity::{EntityId, EntityKind, IndexEntity};
