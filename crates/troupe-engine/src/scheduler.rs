//! Frame scheduler and application lifecycle.
//!
//! The [`Engine`] owns the message bus, the task pool, and the
//! [`SimWorld`]. Its loop runs two cadences: a fast message pump that
//! drains the bus and polls completion callbacks, and a capped
//! simulation cadence that hands the world to a pool task for one
//! physics tick.
//!
//! At most one tick is ever in flight, enforced by ownership: the
//! world is *moved* into the tick task and sent back over a channel,
//! so while a tick runs the scheduler simply has no world to hand out.
//! Events that would mutate the world during that window are deferred
//! and applied when it returns.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use troupe_bus::MessageBus;
use troupe_core::{Actor, ActorId, Event};
use troupe_tasks::{Callback, CallbackQueue, Counter, Task, TaskPool};

use crate::config::{ConfigError, EngineConfig};
use crate::sim::{self, SimWorld};

/// A per-tick listener, run on the scheduling thread just before the
/// world is handed to the physics task.
pub type TickListener = Box<dyn FnMut(&mut TickContext<'_>) + Send>;

/// What a tick listener sees: the scaled `dt`, the world, and the bus.
pub struct TickContext<'a> {
    /// Elapsed seconds since the previous tick, after time scaling.
    pub dt: f64,
    bus: &'a MessageBus,
    world: &'a mut SimWorld,
}

impl TickContext<'_> {
    /// The message bus, for publishing follow-up events.
    pub fn bus(&self) -> &MessageBus {
        self.bus
    }

    /// The simulation world.
    pub fn world(&mut self) -> &mut SimWorld {
        self.world
    }
}

/// Hooks an application implements to live inside the engine loop.
///
/// `setup` runs before the loop starts and again after every soft
/// restart; `teardown` runs on soft restart and on shutdown.
pub trait Application {
    /// Build the initial scene: spawn actors, subscribe handlers,
    /// register tick listeners.
    fn setup(&mut self, ctx: &mut EngineContext<'_>);

    /// Release application resources. Default is a no-op.
    fn teardown(&mut self) {}
}

/// Setup-time view of the engine handed to [`Application::setup`].
pub struct EngineContext<'a> {
    bus: &'a Arc<MessageBus>,
    world: &'a mut SimWorld,
    tick_listeners: &'a mut Vec<TickListener>,
}

impl EngineContext<'_> {
    /// The message bus.
    pub fn bus(&self) -> &Arc<MessageBus> {
        self.bus
    }

    /// The simulation world.
    pub fn world(&mut self) -> &mut SimWorld {
        self.world
    }

    /// Spawn an actor and enroll it in the simulated set in one step.
    ///
    /// The enrollment goes through the bus as [`Event::EntityAdded`],
    /// so subscribers observe it like any other entity.
    pub fn spawn(&mut self, actor: Actor) -> ActorId {
        let id = self.world.stage_mut().spawn(actor);
        self.bus.publish(Event::EntityAdded(id));
        id
    }

    /// Register a listener invoked once per simulation tick.
    pub fn add_tick_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&mut TickContext<'_>) + Send + 'static,
    {
        self.tick_listeners.push(Box::new(listener));
    }
}

struct InflightTick {
    counter: Counter,
    rx: Receiver<SimWorld>,
}

/// The engine: message bus, task pool, world, and the loop that
/// drives them.
pub struct Engine {
    config: EngineConfig,
    bus: Arc<MessageBus>,
    pool: TaskPool,
    callbacks: CallbackQueue,
    world: Option<SimWorld>,
    inflight: Option<InflightTick>,
    tick_listeners: Vec<TickListener>,
    deferred: Vec<Event>,
    movement_enabled: bool,
    pending_restart: bool,
    pending_shutdown: bool,
}

impl Engine {
    /// Build an engine from a validated configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let world = SimWorld::new(
            config.world_bounds,
            config.index_load_factor,
            config.index_min_split,
        );
        let pool = TaskPool::new(config.effective_workers());
        let movement_enabled = config.movement_enabled;
        Ok(Self {
            config,
            bus: Arc::new(MessageBus::new()),
            pool,
            callbacks: CallbackQueue::new(),
            world: Some(world),
            inflight: None,
            tick_listeners: Vec::new(),
            deferred: Vec::new(),
            movement_enabled,
            pending_restart: false,
            pending_shutdown: false,
        })
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A handle to the message bus, cloneable across threads.
    pub fn bus(&self) -> Arc<MessageBus> {
        Arc::clone(&self.bus)
    }

    /// The world, unless a tick is in flight.
    pub fn world(&self) -> Option<&SimWorld> {
        self.world.as_ref()
    }

    /// The world mutably, unless a tick is in flight.
    pub fn world_mut(&mut self) -> Option<&mut SimWorld> {
        self.world.as_mut()
    }

    /// Whether a physics tick currently owns the world.
    pub fn is_tick_in_flight(&self) -> bool {
        self.inflight.is_some()
    }

    /// Whether movement integration is currently enabled.
    pub fn movement_enabled(&self) -> bool {
        self.movement_enabled
    }

    /// Submit a batch of tasks to the worker pool.
    pub fn submit_batch(&self, tasks: Vec<Task>) -> Counter {
        self.pool.submit(tasks)
    }

    /// Submit a batch whose completion runs `callback` on the
    /// scheduling thread, from a later message pump.
    pub fn submit_batch_with_callback(&mut self, tasks: Vec<Task>, callback: Callback) {
        let counter = self.pool.submit(tasks);
        self.callbacks.push(counter, callback);
    }

    /// Run the engine loop until a shutdown is requested, driving
    /// `app` through its lifecycle.
    pub fn run(&mut self, app: &mut dyn Application) {
        self.pending_shutdown = false;
        self.pending_restart = false;
        // A previous run stopped the pool on shutdown; a dead pool
        // would drop tick tasks (world included) unrun.
        if self.pool.is_stopped() {
            self.pool = TaskPool::new(self.config.effective_workers());
        }
        log::info!(
            "engine loop starting: {} workers, tick cap {} Hz",
            self.pool.worker_count(),
            self.config.max_tick_hz
        );
        self.start(app);

        let sim_period = Duration::from_secs_f64(1.0 / self.config.max_tick_hz);
        let pump_period = Duration::from_secs_f64(1.0 / self.config.message_hz);
        let mut last_sim = Instant::now();
        let mut last_pump = Instant::now();

        while !self.pending_shutdown {
            thread::sleep(Duration::from_millis(1));
            let now = Instant::now();

            if now.duration_since(last_pump) >= pump_period {
                last_pump = now;
                self.pump();
            }
            if now.duration_since(last_sim) >= sim_period {
                let dt = now.duration_since(last_sim).as_secs_f64() * self.config.time_scale;
                last_sim = now;
                self.tick(dt);
            }
            if self.pending_restart && !self.pending_shutdown {
                self.soft_restart(app);
                last_sim = Instant::now();
                last_pump = last_sim;
            }
        }
        self.shutdown(app);
    }

    /// Start one simulation tick, moving the world into a pool task.
    ///
    /// Returns `false` without doing anything if the previous tick has
    /// not been recovered yet; ticks never overlap.
    pub fn tick(&mut self, dt: f64) -> bool {
        let Some(mut world) = self.world.take() else {
            return false;
        };
        if self.movement_enabled {
            self.bus.publish(Event::UpdateTick { dt });
        }
        if !self.config.headless {
            self.bus.publish(Event::RenderTick { dt });
        }

        // Tick listeners run here, on the scheduling thread, while the
        // world is still home.
        let mut listeners = std::mem::take(&mut self.tick_listeners);
        {
            let mut ctx = TickContext {
                dt,
                bus: &self.bus,
                world: &mut world,
            };
            for listener in listeners.iter_mut() {
                listener(&mut ctx);
            }
        }
        self.tick_listeners = listeners;

        let (tx, rx) = crossbeam_channel::bounded(1);
        let integrate = self.movement_enabled;
        let counter = self.pool.submit_one(move || {
            sim::step(&mut world, dt, integrate);
            let _ = tx.send(world);
        });
        self.inflight = Some(InflightTick { counter, rx });
        true
    }

    /// One message pump: recover a finished tick, dispatch the bus,
    /// and poll completion callbacks. Returns the number of events
    /// dispatched.
    pub fn pump(&mut self) -> usize {
        self.poll_tick();
        let events = self.bus.drain();
        let count = events.len();
        for event in &events {
            self.handle_core(event);
            self.bus.deliver(event);
        }
        self.callbacks.poll();
        count
    }

    /// Block until the in-flight tick (if any) completes and its world
    /// is recovered, collision listeners included.
    pub fn finish_tick(&mut self) {
        if let Some(tick) = self.inflight.take() {
            tick.counter.wait();
            self.accept_world(tick);
        }
    }

    fn poll_tick(&mut self) {
        let done = self
            .inflight
            .as_ref()
            .map_or(false, |tick| tick.counter.is_complete());
        if done {
            if let Some(tick) = self.inflight.take() {
                self.accept_world(tick);
            }
        }
    }

    fn accept_world(&mut self, tick: InflightTick) {
        match tick.rx.try_recv() {
            Ok(mut world) => {
                world.consume_collisions();
                for event in std::mem::take(&mut self.deferred) {
                    self.apply_world_event(&event, &mut world);
                }
                self.world = Some(world);
            }
            Err(_) => {
                // The tick task died before sending the world back.
                log::error!("physics tick failed to return the world; resetting state");
                self.deferred.clear();
                self.world = Some(SimWorld::new(
                    self.config.world_bounds,
                    self.config.index_load_factor,
                    self.config.index_min_split,
                ));
            }
        }
    }

    fn handle_core(&mut self, event: &Event) {
        match event {
            Event::MovementEnabledChanged(enabled) => self.movement_enabled = *enabled,
            Event::SoftResetRequested => self.pending_restart = true,
            Event::ShutdownRequested => self.pending_shutdown = true,
            Event::EntityAdded(_)
            | Event::EntityRemoved(_)
            | Event::WorldBoundsChanged(_)
            | Event::ClearAllEntities => {
                if let Some(mut world) = self.world.take() {
                    self.apply_world_event(event, &mut world);
                    self.world = Some(world);
                } else {
                    self.deferred.push(event.clone());
                }
            }
            Event::UpdateTick { .. } | Event::RenderTick { .. } | Event::App { .. } => {}
        }
    }

    fn apply_world_event(&mut self, event: &Event, world: &mut SimWorld) {
        match event {
            Event::EntityAdded(id) => {
                if !world.activate(*id) {
                    log::warn!("ignoring enrollment of stale handle {id}");
                }
            }
            Event::EntityRemoved(id) => {
                world.deactivate(*id);
            }
            Event::WorldBoundsChanged(bounds) => world.set_bounds(*bounds),
            Event::ClearAllEntities => {
                world.clear();
                self.tick_listeners.clear();
            }
            _ => {}
        }
    }

    fn start(&mut self, app: &mut dyn Application) {
        if let Some(world) = self.world.as_mut() {
            let mut ctx = EngineContext {
                bus: &self.bus,
                world,
                tick_listeners: &mut self.tick_listeners,
            };
            app.setup(&mut ctx);
        }
        // Deliver setup-time publishes (enrollments included) before
        // the first tick.
        self.pump();
    }

    fn soft_restart(&mut self, app: &mut dyn Application) {
        self.pending_restart = false;
        log::info!("soft restart: clearing entities and subscriptions");
        self.finish_tick();
        self.bus.publish(Event::ClearAllEntities);
        self.pump();
        self.bus.clear_all_handlers();
        self.callbacks.clear();
        app.teardown();
        self.start(app);
    }

    fn shutdown(&mut self, app: &mut dyn Application) {
        log::info!("engine shutting down");
        self.finish_tick();
        self.pool.stop();
        app.teardown();
    }
}
