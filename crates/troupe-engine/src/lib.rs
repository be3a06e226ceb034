//! The Troupe engine: frame scheduling, the physics tick, and the
//! application lifecycle.
//!
//! [`Engine`] ties the other Troupe crates together. It owns the
//! message bus, the worker pool, and the [`SimWorld`], and drives them
//! on two cadences: a fast message pump and a capped simulation tick.
//! Applications plug in through the [`Application`] trait and the
//! closed event set.
//!
//! The central concurrency rule is ownership transfer: the world is
//! moved into each tick task and moved back when it completes, so no
//! flag or lock is needed to keep ticks from overlapping.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod scheduler;
pub mod sim;

pub use config::{ConfigError, EngineConfig};
pub use scheduler::{Application, Engine, EngineContext, TickContext, TickListener};
pub use sim::{step, SimWorld};
