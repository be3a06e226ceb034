//! Simulation world state and the physics step.
//!
//! A [`SimWorld`] bundles the actor arena, the set of simulated
//! handles, the world bounds, and the most recent collision record.
//! The scheduler moves the whole world into a pool task for each tick
//! and receives it back over a channel, so exactly one thread ever
//! mutates it.
//!
//! [`step`] is the tick body: integrate root movement, propagate deltas
//! through the ownership graph, wrap positions over the toroidal
//! bounds, then rebuild the spatial index and record same-depth
//! overlaps.

use indexmap::IndexSet;

use troupe_core::{ActorId, Vec2, WorldBounds};
use troupe_space::{SpatialIndex, SquareRegion};
use troupe_stage::{dispatch_collisions, CollisionMap, Stage};

/// Everything a physics tick reads and writes.
pub struct SimWorld {
    stage: Stage,
    active: IndexSet<ActorId>,
    bounds: WorldBounds,
    collisions: CollisionMap,
    load_factor: usize,
    min_split: f64,
}

impl SimWorld {
    /// Create an empty world over `bounds` with the given spatial
    /// index tuning.
    pub fn new(bounds: WorldBounds, load_factor: usize, min_split: f64) -> Self {
        Self {
            stage: Stage::new(),
            active: IndexSet::new(),
            bounds,
            collisions: CollisionMap::new(),
            load_factor,
            min_split,
        }
    }

    /// The actor arena.
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// The actor arena, mutably.
    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    /// Current world bounds.
    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    /// Replace the world bounds. Takes effect from the next step.
    pub fn set_bounds(&mut self, bounds: WorldBounds) {
        self.bounds = bounds;
    }

    /// Enroll a spawned actor in the simulated set. Returns `false`
    /// for a stale handle, leaving the set unchanged.
    pub fn activate(&mut self, id: ActorId) -> bool {
        if !self.stage.contains(id) {
            return false;
        }
        self.active.insert(id);
        true
    }

    /// Remove an actor from the simulated set. The arena slot
    /// survives; the actor just stops being stepped and indexed.
    pub fn deactivate(&mut self, id: ActorId) -> bool {
        self.active.shift_remove(&id)
    }

    /// Whether the actor is currently simulated.
    pub fn is_active(&self, id: ActorId) -> bool {
        self.active.contains(&id)
    }

    /// Number of simulated actors.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// The collision record from the most recent step. Symmetric:
    /// `a ∈ collisions[b]` iff `b ∈ collisions[a]`.
    pub fn collisions(&self) -> &CollisionMap {
        &self.collisions
    }

    /// Invoke collision listeners for the current record.
    ///
    /// Called from the scheduling thread after the world returns from
    /// a tick, never from the tick itself.
    pub fn consume_collisions(&mut self) {
        let record = std::mem::take(&mut self.collisions);
        dispatch_collisions(&mut self.stage, &record);
        self.collisions = record;
    }

    /// Drop every actor, the simulated set, and the collision record.
    pub fn clear(&mut self) {
        self.stage.clear();
        self.active.clear();
        self.collisions.clear();
    }
}

/// Run one physics tick over `world`.
///
/// When `integrate` is false the movement phase is skipped but the
/// spatial index is still rebuilt and collisions still recorded.
pub fn step(world: &mut SimWorld, dt: f64, integrate: bool) {
    if integrate {
        integrate_movement(world, dt);
    }
    rebuild_and_collide(world);
}

fn integrate_movement(world: &mut SimWorld, dt: f64) {
    // Only roots integrate their own kinematics; attached actors
    // inherit their root's delta so groups move rigidly.
    let roots: Vec<ActorId> = world
        .active
        .iter()
        .copied()
        .filter(|&id| world.stage.contains(id) && !world.stage.is_attached(id))
        .collect();

    let mut visited: IndexSet<ActorId> = IndexSet::new();
    for id in roots {
        let delta = {
            let Some(actor) = world.stage.get_mut(id) else {
                continue;
            };
            let velocity = actor.velocity() + actor.acceleration() * dt;
            actor.set_velocity(velocity);
            velocity * dt
        };
        move_group(world, id, delta, &mut visited);
    }
}

/// Apply `delta` to `id` and recursively to its descendants.
///
/// The visited set guards against an actor being reached twice in one
/// tick. Inactive descendants are not moved but are still walked, so
/// their own children (if active) inherit the delta.
fn move_group(world: &mut SimWorld, id: ActorId, delta: Vec2, visited: &mut IndexSet<ActorId>) {
    if !visited.insert(id) {
        return;
    }
    if world.active.contains(&id) {
        apply_delta(world, id, delta);
    }
    let children: Vec<ActorId> = world.stage.children_of(id).collect();
    for child in children {
        move_group(world, child, delta, visited);
    }
}

fn apply_delta(world: &mut SimWorld, id: ActorId, delta: Vec2) {
    let bounds = world.bounds;
    let Some(actor) = world.stage.get_mut(id) else {
        return;
    };
    let mut delta = delta;
    if actor.x_locked() {
        delta.x = 0.0;
    }
    if actor.y_locked() {
        delta.y = 0.0;
    }
    let mut pos = actor.position() + delta;
    let (w, h) = (actor.width(), actor.height());
    // Toroidal wraparound: a box that has fully exited one edge
    // reappears flush with the opposite edge.
    if pos.x + w < bounds.min_x() {
        pos.x = bounds.max_x() - w;
    } else if pos.x > bounds.max_x() {
        pos.x = bounds.min_x();
    }
    if pos.y + h < bounds.min_y() {
        pos.y = bounds.max_y() - h;
    } else if pos.y > bounds.max_y() {
        pos.y = bounds.min_y();
    }
    actor.set_position(pos);
}

fn rebuild_and_collide(world: &mut SimWorld) {
    let region = SquareRegion::new(
        Vec2::new(world.bounds.min_x(), world.bounds.min_y()),
        world.bounds.square_side(),
    );
    let mut index = SpatialIndex::new(region, world.load_factor, world.min_split);

    // Every active actor gets a record entry, overlapping or not.
    let mut record = CollisionMap::new();
    for &id in &world.active {
        if let Some(actor) = world.stage.get(id) {
            index.insert(id, actor.index_box());
            record.entry(id).or_default();
        }
    }

    for members in index.leaves() {
        let ids: Vec<ActorId> = members.keys().copied().collect();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (a, b) = (ids[i], ids[j]);
                let (Some(actor_a), Some(actor_b)) = (world.stage.get(a), world.stage.get(b))
                else {
                    continue;
                };
                // Index boxes are conservative; the true rectangles
                // decide, and only exactly-equal depths are eligible.
                if actor_a.depth() == actor_b.depth()
                    && actor_a.aabb().intersects(&actor_b.aabb())
                {
                    record.entry(a).or_default().insert(b);
                    record.entry(b).or_default().insert(a);
                }
            }
        }
    }
    world.collisions = record;
}

#[cfg(test)]
mod tests {
    use super::*;
    use troupe_core::Actor;

    fn world() -> SimWorld {
        SimWorld::new(WorldBounds::default(), 10, 100.0)
    }

    fn spawn_active(world: &mut SimWorld, actor: Actor) -> ActorId {
        let id = world.stage_mut().spawn(actor);
        assert!(world.activate(id));
        id
    }

    #[test]
    fn velocity_integrates_position() {
        let mut w = world();
        let id = spawn_active(
            &mut w,
            Actor::new(100.0, 100.0, 10.0, 10.0, 0.0).with_velocity(Vec2::new(30.0, -20.0)),
        );
        step(&mut w, 0.5, true);
        assert_eq!(w.stage().get(id).unwrap().position(), Vec2::new(115.0, 90.0));
    }

    #[test]
    fn acceleration_feeds_velocity_before_moving() {
        let mut w = world();
        let id = spawn_active(
            &mut w,
            Actor::new(0.0, 0.0, 1.0, 1.0, 0.0).with_acceleration(Vec2::new(10.0, 0.0)),
        );
        step(&mut w, 1.0, true);
        let actor = w.stage().get(id).unwrap();
        assert_eq!(actor.velocity(), Vec2::new(10.0, 0.0));
        assert_eq!(actor.position().x, 10.0);
    }

    #[test]
    fn exits_left_reappears_at_right_edge() {
        let mut w = world();
        let id = spawn_active(
            &mut w,
            Actor::new(0.0, 500.0, 5.0, 5.0, 0.0).with_velocity(Vec2::new(-50.0, 0.0)),
        );
        step(&mut w, 1.0, true);
        assert_eq!(w.stage().get(id).unwrap().position().x, 995.0);
    }

    #[test]
    fn exits_right_reappears_at_left_edge() {
        let mut w = world();
        let id = spawn_active(
            &mut w,
            Actor::new(990.0, 500.0, 5.0, 5.0, 0.0).with_velocity(Vec2::new(50.0, 0.0)),
        );
        step(&mut w, 1.0, true);
        assert_eq!(w.stage().get(id).unwrap().position().x, 0.0);
    }

    #[test]
    fn partially_outside_does_not_wrap() {
        let mut w = world();
        let id = spawn_active(
            &mut w,
            Actor::new(2.0, 500.0, 5.0, 5.0, 0.0).with_velocity(Vec2::new(-5.0, 0.0)),
        );
        step(&mut w, 1.0, true);
        // Still straddling the edge: x + w = 2 >= min edge.
        assert_eq!(w.stage().get(id).unwrap().position().x, -3.0);
    }

    #[test]
    fn attached_actor_inherits_root_delta() {
        let mut w = world();
        let root = spawn_active(
            &mut w,
            Actor::new(100.0, 100.0, 10.0, 10.0, 0.0).with_velocity(Vec2::new(10.0, 0.0)),
        );
        let child = spawn_active(&mut w, Actor::new(105.0, 105.0, 2.0, 2.0, 0.0));
        w.stage_mut().attach(root, child).unwrap();

        step(&mut w, 1.0, true);
        assert_eq!(w.stage().get(root).unwrap().position().x, 110.0);
        assert_eq!(w.stage().get(child).unwrap().position().x, 115.0);
    }

    #[test]
    fn attached_actor_own_velocity_is_ignored() {
        let mut w = world();
        let root = spawn_active(&mut w, Actor::new(100.0, 100.0, 10.0, 10.0, 0.0));
        let child = spawn_active(
            &mut w,
            Actor::new(105.0, 105.0, 2.0, 2.0, 0.0).with_velocity(Vec2::new(99.0, 99.0)),
        );
        w.stage_mut().attach(root, child).unwrap();

        step(&mut w, 1.0, true);
        // Root is stationary, so the whole group stays put.
        assert_eq!(w.stage().get(child).unwrap().position(), Vec2::new(105.0, 105.0));
    }

    #[test]
    fn inactive_link_still_carries_delta_to_grandchild() {
        let mut w = world();
        let root = spawn_active(
            &mut w,
            Actor::new(100.0, 100.0, 10.0, 10.0, 0.0).with_velocity(Vec2::new(10.0, 0.0)),
        );
        let middle = w.stage_mut().spawn(Actor::new(0.0, 0.0, 1.0, 1.0, 0.0));
        let leaf = spawn_active(&mut w, Actor::new(50.0, 50.0, 1.0, 1.0, 0.0));
        w.stage_mut().attach(root, middle).unwrap();
        w.stage_mut().attach(middle, leaf).unwrap();

        step(&mut w, 1.0, true);
        // The inactive middle does not move but does not break the chain.
        assert_eq!(w.stage().get(middle).unwrap().position(), Vec2::ZERO);
        assert_eq!(w.stage().get(leaf).unwrap().position().x, 60.0);
    }

    #[test]
    fn axis_locks_zero_the_delta_component() {
        let mut w = world();
        let id = spawn_active(
            &mut w,
            Actor::new(100.0, 100.0, 5.0, 5.0, 0.0).with_velocity(Vec2::new(10.0, 10.0)),
        );
        w.stage_mut().get_mut(id).unwrap().set_x_locked(true);

        step(&mut w, 1.0, true);
        let pos = w.stage().get(id).unwrap().position();
        assert_eq!(pos, Vec2::new(100.0, 110.0));
    }

    #[test]
    fn locked_child_resists_inherited_delta() {
        let mut w = world();
        let root = spawn_active(
            &mut w,
            Actor::new(100.0, 100.0, 10.0, 10.0, 0.0).with_velocity(Vec2::new(10.0, 0.0)),
        );
        let child = spawn_active(&mut w, Actor::new(105.0, 105.0, 2.0, 2.0, 0.0));
        w.stage_mut().get_mut(child).unwrap().set_x_locked(true);
        w.stage_mut().attach(root, child).unwrap();

        step(&mut w, 1.0, true);
        assert_eq!(w.stage().get(child).unwrap().position().x, 105.0);
    }

    #[test]
    fn overlapping_same_depth_actors_collide_symmetrically() {
        let mut w = world();
        let a = spawn_active(&mut w, Actor::new(100.0, 100.0, 20.0, 20.0, 1.0));
        let b = spawn_active(&mut w, Actor::new(110.0, 110.0, 20.0, 20.0, 1.0));
        let far = spawn_active(&mut w, Actor::new(800.0, 800.0, 20.0, 20.0, 1.0));

        step(&mut w, 0.0, true);
        let record = w.collisions();
        assert!(record[&a].contains(&b));
        assert!(record[&b].contains(&a));
        assert!(record[&far].is_empty());
    }

    #[test]
    fn different_depths_never_collide() {
        let mut w = world();
        let a = spawn_active(&mut w, Actor::new(100.0, 100.0, 20.0, 20.0, 1.0));
        let b = spawn_active(&mut w, Actor::new(100.0, 100.0, 20.0, 20.0, 1.0 + f64::EPSILON));

        step(&mut w, 0.0, true);
        assert!(w.collisions()[&a].is_empty());
        assert!(w.collisions()[&b].is_empty());
    }

    #[test]
    fn inactive_actors_are_not_indexed() {
        let mut w = world();
        let a = spawn_active(&mut w, Actor::new(100.0, 100.0, 20.0, 20.0, 0.0));
        let ghost = w.stage_mut().spawn(Actor::new(100.0, 100.0, 20.0, 20.0, 0.0));

        step(&mut w, 0.0, true);
        assert!(w.collisions()[&a].is_empty());
        assert!(!w.collisions().contains_key(&ghost));
    }

    #[test]
    fn straddling_pair_recorded_once_per_side() {
        // Two boxes across the root split line end up sharing several
        // leaves; the record still holds one entry per partner.
        let mut w = SimWorld::new(WorldBounds::default(), 2, 10.0);
        let a = spawn_active(&mut w, Actor::new(495.0, 495.0, 10.0, 10.0, 0.0));
        let b = spawn_active(&mut w, Actor::new(498.0, 498.0, 10.0, 10.0, 0.0));
        for i in 0..8 {
            spawn_active(&mut w, Actor::new(i as f64 * 100.0, 50.0, 5.0, 5.0, 9.0));
        }

        step(&mut w, 0.0, true);
        assert_eq!(w.collisions()[&a].len(), 1);
        assert!(w.collisions()[&a].contains(&b));
    }

    #[test]
    fn disabled_integration_still_detects_collisions() {
        let mut w = world();
        let a = spawn_active(
            &mut w,
            Actor::new(100.0, 100.0, 20.0, 20.0, 0.0).with_velocity(Vec2::new(50.0, 0.0)),
        );
        let b = spawn_active(&mut w, Actor::new(110.0, 110.0, 20.0, 20.0, 0.0));

        step(&mut w, 1.0, false);
        assert_eq!(w.stage().get(a).unwrap().position().x, 100.0);
        assert!(w.collisions()[&a].contains(&b));
    }

    #[test]
    fn deactivate_freezes_but_keeps_actor() {
        let mut w = world();
        let id = spawn_active(
            &mut w,
            Actor::new(100.0, 100.0, 5.0, 5.0, 0.0).with_velocity(Vec2::new(10.0, 0.0)),
        );
        assert!(w.deactivate(id));
        step(&mut w, 1.0, true);
        assert_eq!(w.stage().get(id).unwrap().position().x, 100.0);
        assert!(!w.collisions().contains_key(&id));
    }

    #[test]
    fn clear_resets_everything() {
        let mut w = world();
        spawn_active(&mut w, Actor::new(0.0, 0.0, 1.0, 1.0, 0.0));
        step(&mut w, 0.0, true);
        w.clear();
        assert!(w.stage().is_empty());
        assert_eq!(w.active_count(), 0);
        assert!(w.collisions().is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Whatever the layout, the collision record is symmetric
            /// and never pairs actors across depths.
            #[test]
            fn record_is_symmetric_and_depth_pure(
                actors in proptest::collection::vec(
                    (0.0f64..950.0, 0.0f64..950.0, 5.0f64..50.0, 0u8..3),
                    2..40
                )
            ) {
                let mut w = world();
                let ids: Vec<ActorId> = actors
                    .iter()
                    .map(|&(x, y, s, depth)| {
                        spawn_active(&mut w, Actor::new(x, y, s, s, depth as f64))
                    })
                    .collect();

                step(&mut w, 0.0, true);
                let record = w.collisions();
                prop_assert_eq!(record.len(), ids.len());
                for (&id, others) in record {
                    for other in others {
                        prop_assert!(record[other].contains(&id));
                        let d1 = w.stage().get(id).unwrap().depth();
                        let d2 = w.stage().get(*other).unwrap().depth();
                        prop_assert_eq!(d1, d2);
                    }
                }
            }
        }
    }
}
