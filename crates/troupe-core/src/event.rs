//! The closed event set carried by the message bus.
//!
//! Topics are a closed enum rather than strings: the compiler checks
//! every publish and subscribe site, and dispatch stays a cheap
//! discriminant match. Applications extend the set through
//! [`Event::App`] with their own code space.

use crate::id::ActorId;
use crate::math::WorldBounds;

/// Named channel on the message bus.
///
/// One topic per [`Event`] variant, plus a per-code channel for
/// application events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// An actor entered the simulated set.
    EntityAdded,
    /// An actor left the simulated set.
    EntityRemoved,
    /// World bounds were reconfigured.
    WorldBoundsChanged,
    /// Movement integration was enabled or disabled.
    MovementEnabledChanged,
    /// Drop every simulated entity and per-tick listener.
    ClearAllEntities,
    /// A soft restart was requested.
    SoftResetRequested,
    /// A full engine shutdown was requested.
    ShutdownRequested,
    /// A simulation tick fired.
    UpdateTick,
    /// A render cycle fired.
    RenderTick,
    /// Application-defined channel, keyed by code.
    App(u32),
}

/// A message on the bus: a topic plus its payload, as one tagged value.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Enroll an already-spawned actor in the simulated set.
    EntityAdded(ActorId),
    /// Remove an actor from the simulated set (the arena slot survives).
    EntityRemoved(ActorId),
    /// Replace the world bounds; takes effect before the next tick.
    WorldBoundsChanged(WorldBounds),
    /// Toggle movement integration for the whole world.
    MovementEnabledChanged(bool),
    /// Clear the simulated set, the arena, and every per-tick listener.
    ClearAllEntities,
    /// Request a soft restart at the end of the current loop iteration.
    SoftResetRequested,
    /// Request a full shutdown.
    ShutdownRequested,
    /// Broadcast once per simulation tick with the measured, scaled dt.
    UpdateTick {
        /// Elapsed seconds since the previous tick, after time scaling.
        dt: f64,
    },
    /// Broadcast once per render cycle.
    RenderTick {
        /// Elapsed seconds since the previous tick, after time scaling.
        dt: f64,
    },
    /// Application-defined event.
    App {
        /// Application channel code.
        code: u32,
        /// Optional subject actor.
        actor: Option<ActorId>,
    },
}

impl Event {
    /// The topic this event is delivered on.
    pub fn topic(&self) -> Topic {
        match self {
            Event::EntityAdded(_) => Topic::EntityAdded,
            Event::EntityRemoved(_) => Topic::EntityRemoved,
            Event::WorldBoundsChanged(_) => Topic::WorldBoundsChanged,
            Event::MovementEnabledChanged(_) => Topic::MovementEnabledChanged,
            Event::ClearAllEntities => Topic::ClearAllEntities,
            Event::SoftResetRequested => Topic::SoftResetRequested,
            Event::ShutdownRequested => Topic::ShutdownRequested,
            Event::UpdateTick { .. } => Topic::UpdateTick,
            Event::RenderTick { .. } => Topic::RenderTick,
            Event::App { code, .. } => Topic::App(*code),
        }
    }
}
