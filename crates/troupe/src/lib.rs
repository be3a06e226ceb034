//! Troupe: a real-time 2D entity simulation core.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Troupe sub-crates. For most users, adding `troupe` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use troupe::prelude::*;
//!
//! let mut config = EngineConfig::default();
//! config.worker_threads = Some(2);
//! let mut engine = Engine::new(config).unwrap();
//!
//! // Spawn an actor and enroll it in the simulated set through the bus.
//! let id = engine.world_mut().unwrap().stage_mut().spawn(
//!     Actor::new(100.0, 100.0, 10.0, 10.0, 0.0).with_velocity(Vec2::new(30.0, 0.0)),
//! );
//! engine.bus().publish(Event::EntityAdded(id));
//! engine.pump();
//!
//! // One simulation tick: the world is moved into a worker task and
//! // recovered, collision listeners included.
//! engine.tick(1.0);
//! engine.finish_tick();
//!
//! let world = engine.world().unwrap();
//! assert_eq!(
//!     world.stage().get(id).unwrap().position(),
//!     Vec2::new(130.0, 100.0)
//! );
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `troupe-core` | Handles, 2D math, actor state, the closed event set |
//! | [`bus`] | `troupe-bus` | Named-topic publish/subscribe bus |
//! | [`tasks`] | `troupe-tasks` | Worker pool, batch counters, completion callbacks |
//! | [`stage`] | `troupe-stage` | Actor arena, ownership graph, collision listeners |
//! | [`space`] | `troupe-space` | Region-splitting spatial index |
//! | [`engine`] | `troupe-engine` | Frame scheduler, physics tick, application lifecycle |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types: handles, 2D math, actor state, events (`troupe-core`).
///
/// The vocabulary shared by every other module: [`types::ActorId`],
/// [`types::Actor`], [`types::Event`], [`types::Topic`], and the math
/// primitives.
pub use troupe_core as types;

/// Named-topic publish/subscribe bus (`troupe-bus`).
///
/// [`bus::MessageBus`] carries the closed event set between engine
/// components and application handlers.
pub use troupe_bus as bus;

/// Worker pool and batch completion tracking (`troupe-tasks`).
///
/// [`tasks::TaskPool`] runs batches, [`tasks::Counter`] tracks their
/// completion, and [`tasks::CallbackQueue`] delivers callbacks on the
/// scheduling thread.
pub use troupe_tasks as tasks;

/// Actor arena and ownership graph (`troupe-stage`).
///
/// [`stage::Stage`] stores actors behind generational handles and keeps
/// the attachment tree acyclic; [`stage::CollisionListener`]s consume
/// per-tick overlap records.
pub use troupe_stage as stage;

/// Region-splitting spatial index (`troupe-space`).
///
/// [`space::SpatialIndex`] is rebuilt from scratch each tick and
/// answers leaf-sharing and rectangle queries.
pub use troupe_space as space;

/// Frame scheduler and application lifecycle (`troupe-engine`).
///
/// [`engine::Engine`] owns the bus, the pool, and the
/// [`engine::SimWorld`], and drives applications through the
/// [`engine::Application`] trait.
pub use troupe_engine as engine;

/// Common imports for typical Troupe usage.
///
/// ```rust
/// use troupe::prelude::*;
/// ```
pub mod prelude {
    // Core vocabulary
    pub use troupe_core::{Aabb, Actor, ActorId, Event, GraphError, Topic, Vec2, WorldBounds};

    // Bus
    pub use troupe_bus::MessageBus;

    // Tasks
    pub use troupe_tasks::{CallbackQueue, Counter, Task, TaskPool};

    // Stage
    pub use troupe_stage::{CollisionListener, CollisionMap, Stage};

    // Space
    pub use troupe_space::{SpatialIndex, SquareRegion};

    // Engine
    pub use troupe_engine::{
        Application, ConfigError, Engine, EngineConfig, EngineContext, SimWorld, TickContext,
    };
}
