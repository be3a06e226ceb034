//! Core types for the Troupe simulation engine.
//!
//! This is the leaf crate with zero dependencies. It defines the
//! fundamental vocabulary shared by every other Troupe crate: actor
//! handles, 2D math, actor kinematic state, the closed event set, and
//! structural error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod actor;
pub mod error;
pub mod event;
pub mod id;
pub mod math;

pub use actor::Actor;
pub use error::GraphError;
pub use event::{Event, Topic};
pub use id::ActorId;
pub use math::{Aabb, Vec2, WorldBounds};
