//! Structural error types shared across the workspace.

use std::error::Error;
use std::fmt;

use crate::id::ActorId;

/// Errors from actor-graph mutation.
///
/// A cyclic attach is rejected rather than silently ignored: ignoring
/// it would mask a caller bug that would otherwise infinite-loop
/// during delta propagation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// Attaching `child` under `parent` would create a cycle because
    /// `child` is already an ancestor of `parent` (or is `parent`
    /// itself). The graph is left unchanged.
    CyclicAttachment {
        /// The prospective parent.
        parent: ActorId,
        /// The prospective child, found on `parent`'s ancestor path.
        child: ActorId,
    },
    /// The handle does not resolve to a live arena slot.
    StaleHandle(ActorId),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CyclicAttachment { parent, child } => {
                write!(
                    f,
                    "attaching {child} under {parent} would create a cycle"
                )
            }
            Self::StaleHandle(id) => write!(f, "stale actor handle {id}"),
        }
    }
}

impl Error for GraphError {}
