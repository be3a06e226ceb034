//! Generational actor arena and ownership graph.
//!
//! Actors live in slots indexed by [`ActorId`] handles; parent/child
//! links are expressed as handles rather than references, so the graph
//! carries no lifetimes and staleness is an O(1) generation check.
//!
//! The ownership relation is a strict tree: attaching X under Y is
//! rejected if Y is already a descendant of X. Attached actors move as
//! a rigid group with their root — only roots integrate their own
//! velocity (see the physics engine).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use troupe_core::{Actor, ActorId, GraphError};

/// Per-tick collision record: each actor mapped to the set of actors
/// it currently overlaps, same depth only. Fully replaced every tick.
pub type CollisionMap = IndexMap<ActorId, IndexSet<ActorId>>;

/// Receives overlap notifications during the single-threaded
/// collision-consumption step. Never called from the physics tick.
pub trait CollisionListener: Send {
    /// `actor` (the listener's owner) currently overlaps `other`.
    fn on_overlap(&mut self, actor: ActorId, other: ActorId);
}

impl<F> CollisionListener for F
where
    F: FnMut(ActorId, ActorId) + Send,
{
    fn on_overlap(&mut self, actor: ActorId, other: ActorId) {
        self(actor, other)
    }
}

struct Entry {
    actor: Actor,
    parent: Option<ActorId>,
    children: IndexSet<ActorId>,
    listeners: SmallVec<[Box<dyn CollisionListener>; 2]>,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Arena of actors plus their ownership graph.
///
/// Mutated only from the scheduling thread or the single worker
/// executing the in-flight physics tick, never both at once — the
/// engine enforces this by moving the world into the tick task.
#[derive(Default)]
pub struct Stage {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl Stage {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live actors.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena holds no live actors.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocate a slot for `actor` and mint its handle.
    pub fn spawn(&mut self, actor: Actor) -> ActorId {
        self.len += 1;
        let entry = Entry {
            actor,
            parent: None,
            children: IndexSet::new(),
            listeners: SmallVec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            ActorId::from_parts(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            ActorId::from_parts(index, 0)
        }
    }

    /// Remove an actor, detaching it from its parent and orphaning its
    /// children (they become roots). Returns the actor, or `None` for
    /// a stale handle.
    pub fn despawn(&mut self, id: ActorId) -> Option<Actor> {
        // Unlink before removal so the graph never holds stale edges.
        let entry = self.entry(id)?;
        let parent = entry.parent;
        let children: Vec<ActorId> = entry.children.iter().copied().collect();

        if let Some(parent) = parent {
            if let Some(p) = self.entry_mut(parent) {
                p.children.shift_remove(&id);
            }
        }
        for child in children {
            if let Some(c) = self.entry_mut(child) {
                c.parent = None;
            }
        }

        let slot = &mut self.slots[id.index() as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.len -= 1;
        slot.entry.take().map(|e| e.actor)
    }

    /// Whether the handle resolves to a live actor.
    pub fn contains(&self, id: ActorId) -> bool {
        self.entry(id).is_some()
    }

    /// Resolve a handle.
    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.entry(id).map(|e| &e.actor)
    }

    /// Resolve a handle mutably.
    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.entry_mut(id).map(|e| &mut e.actor)
    }

    /// Iterate over every live `(handle, actor)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (ActorId, &Actor)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.entry
                .as_ref()
                .map(|e| (ActorId::from_parts(i as u32, slot.generation), &e.actor))
        })
    }

    /// Iterate over every live handle.
    pub fn ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    /// Remove every actor and reset the graph. Handles stay stale.
    pub fn clear(&mut self) {
        let ids: Vec<ActorId> = self.ids().collect();
        for id in ids {
            self.despawn(id);
        }
    }

    // ── Ownership graph ──────────────────────────────────────────

    /// Link `child` under `parent`.
    ///
    /// Fails with [`GraphError::CyclicAttachment`] if `child` is an
    /// ancestor of `parent` (or is `parent` itself), leaving the graph
    /// unchanged. If `child` already has a different parent it is
    /// detached from it first.
    pub fn attach(&mut self, parent: ActorId, child: ActorId) -> Result<(), GraphError> {
        if self.entry(parent).is_none() {
            return Err(GraphError::StaleHandle(parent));
        }
        if self.entry(child).is_none() {
            return Err(GraphError::StaleHandle(child));
        }

        // Walk parent's ancestor path; finding `child` there means the
        // new edge would close a cycle.
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(GraphError::CyclicAttachment { parent, child });
            }
            cursor = self.entry(node).and_then(|e| e.parent);
        }

        if let Some(old_parent) = self.entry(child).and_then(|e| e.parent) {
            if old_parent == parent {
                return Ok(());
            }
            if let Some(old) = self.entry_mut(old_parent) {
                old.children.shift_remove(&child);
            }
        }

        if let Some(e) = self.entry_mut(child) {
            e.parent = Some(parent);
        }
        if let Some(e) = self.entry_mut(parent) {
            e.children.insert(child);
        }
        Ok(())
    }

    /// Unlink `child` from its parent, making it a root. A root child
    /// is a no-op.
    pub fn detach(&mut self, child: ActorId) -> Result<(), GraphError> {
        let Some(entry) = self.entry(child) else {
            return Err(GraphError::StaleHandle(child));
        };
        let Some(parent) = entry.parent else {
            return Ok(());
        };
        if let Some(p) = self.entry_mut(parent) {
            p.children.shift_remove(&child);
        }
        if let Some(e) = self.entry_mut(child) {
            e.parent = None;
        }
        Ok(())
    }

    /// Whether the actor has a parent. Stale handles are unattached.
    pub fn is_attached(&self, id: ActorId) -> bool {
        self.entry(id).map_or(false, |e| e.parent.is_some())
    }

    /// The actor's parent, if any.
    pub fn parent_of(&self, id: ActorId) -> Option<ActorId> {
        self.entry(id).and_then(|e| e.parent)
    }

    /// O(1) membership check against `parent`'s child set.
    pub fn contains_child(&self, parent: ActorId, child: ActorId) -> bool {
        self.entry(parent)
            .map_or(false, |e| e.children.contains(&child))
    }

    /// Iterate over the actor's direct children.
    pub fn children_of(&self, id: ActorId) -> impl Iterator<Item = ActorId> + '_ {
        self.entry(id)
            .map(|e| e.children.iter().copied())
            .into_iter()
            .flatten()
    }

    // ── Collision listeners ──────────────────────────────────────

    /// Attach a collision listener to an actor.
    pub fn add_collision_listener(
        &mut self,
        id: ActorId,
        listener: Box<dyn CollisionListener>,
    ) -> Result<(), GraphError> {
        match self.entry_mut(id) {
            Some(e) => {
                e.listeners.push(listener);
                Ok(())
            }
            None => Err(GraphError::StaleHandle(id)),
        }
    }

    /// Number of listeners attached to an actor.
    pub fn collision_listener_count(&self, id: ActorId) -> usize {
        self.entry(id).map_or(0, |e| e.listeners.len())
    }

    fn entry(&self, id: ActorId) -> Option<&Entry> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, id: ActorId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entry.as_mut()
    }
}

/// Consume a collision record: invoke each overlapping actor's
/// listeners, once per overlapping partner.
///
/// Runs on whichever single thread owns the stage between ticks; the
/// physics tick itself never invokes callbacks.
pub fn dispatch_collisions(stage: &mut Stage, collisions: &CollisionMap) {
    for (&id, others) in collisions {
        if others.is_empty() {
            continue;
        }
        let Some(entry) = stage.entry_mut(id) else {
            continue;
        };
        // Listeners are taken out for the duration of the calls so the
        // borrow on the stage entry is released.
        let mut listeners = std::mem::take(&mut entry.listeners);
        for listener in listeners.iter_mut() {
            for &other in others {
                listener.on_overlap(id, other);
            }
        }
        if let Some(entry) = stage.entry_mut(id) {
            entry.listeners = listeners;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn actor() -> Actor {
        Actor::new(0.0, 0.0, 10.0, 10.0, 0.0)
    }

    fn stage_with(n: usize) -> (Stage, Vec<ActorId>) {
        let mut stage = Stage::new();
        let ids = (0..n).map(|_| stage.spawn(actor())).collect();
        (stage, ids)
    }

    #[test]
    fn spawn_get_despawn() {
        let mut stage = Stage::new();
        let id = stage.spawn(actor());
        assert!(stage.contains(id));
        assert_eq!(stage.len(), 1);

        stage.get_mut(id).unwrap().set_depth(3.0);
        assert_eq!(stage.get(id).unwrap().depth(), 3.0);

        let removed = stage.despawn(id).unwrap();
        assert_eq!(removed.depth(), 3.0);
        assert!(!stage.contains(id));
        assert!(stage.is_empty());
    }

    #[test]
    fn reused_slot_invalidates_old_handle() {
        let mut stage = Stage::new();
        let a = stage.spawn(actor());
        stage.despawn(a);
        let b = stage.spawn(actor());
        assert_eq!(a.index(), b.index());
        assert!(!stage.contains(a));
        assert!(stage.contains(b));
        assert!(stage.get(a).is_none());
    }

    #[test]
    fn attach_links_parent_and_child() {
        let (mut stage, ids) = stage_with(2);
        stage.attach(ids[0], ids[1]).unwrap();
        assert!(stage.is_attached(ids[1]));
        assert!(!stage.is_attached(ids[0]));
        assert!(stage.contains_child(ids[0], ids[1]));
        assert_eq!(stage.parent_of(ids[1]), Some(ids[0]));
    }

    #[test]
    fn cycle_rejected_and_graph_unchanged() {
        // C under B under A; attaching A under C must fail.
        let (mut stage, ids) = stage_with(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        stage.attach(a, b).unwrap();
        stage.attach(b, c).unwrap();

        let err = stage.attach(c, a).unwrap_err();
        assert_eq!(
            err,
            GraphError::CyclicAttachment {
                parent: c,
                child: a
            }
        );

        // Graph unchanged: same edges as before the failed attach.
        assert_eq!(stage.parent_of(a), None);
        assert_eq!(stage.parent_of(b), Some(a));
        assert_eq!(stage.parent_of(c), Some(b));
        assert!(!stage.contains_child(c, a));
    }

    #[test]
    fn self_attach_is_cyclic() {
        let (mut stage, ids) = stage_with(1);
        assert!(matches!(
            stage.attach(ids[0], ids[0]),
            Err(GraphError::CyclicAttachment { .. })
        ));
    }

    #[test]
    fn reattach_moves_between_parents() {
        let (mut stage, ids) = stage_with(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        stage.attach(a, c).unwrap();
        stage.attach(b, c).unwrap();

        assert_eq!(stage.parent_of(c), Some(b));
        assert!(!stage.contains_child(a, c));
        assert!(stage.contains_child(b, c));
    }

    #[test]
    fn detach_makes_root() {
        let (mut stage, ids) = stage_with(2);
        stage.attach(ids[0], ids[1]).unwrap();
        stage.detach(ids[1]).unwrap();
        assert!(!stage.is_attached(ids[1]));
        assert!(!stage.contains_child(ids[0], ids[1]));
        // Detaching a root is a no-op, not an error.
        stage.detach(ids[1]).unwrap();
    }

    #[test]
    fn despawn_orphans_children() {
        let (mut stage, ids) = stage_with(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        stage.attach(a, b).unwrap();
        stage.attach(b, c).unwrap();

        stage.despawn(b);
        assert!(!stage.contains_child(a, b));
        assert_eq!(stage.parent_of(c), None);
        assert!(stage.contains(c));
    }

    #[test]
    fn stale_handles_are_rejected() {
        let (mut stage, ids) = stage_with(2);
        let dead = ids[0];
        stage.despawn(dead);
        assert_eq!(
            stage.attach(dead, ids[1]),
            Err(GraphError::StaleHandle(dead))
        );
        assert_eq!(
            stage.attach(ids[1], dead),
            Err(GraphError::StaleHandle(dead))
        );
        assert_eq!(stage.detach(dead), Err(GraphError::StaleHandle(dead)));
        assert!(!stage.is_attached(dead));
    }

    #[test]
    fn collision_listeners_fire_per_partner() {
        let (mut stage, ids) = stage_with(3);
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = Arc::clone(&hits);
        let owner = ids[0];
        stage
            .add_collision_listener(
                owner,
                Box::new(move |me: ActorId, _other: ActorId| {
                    assert_eq!(me, owner);
                    hits2.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        let mut record = CollisionMap::new();
        record.insert(ids[0], IndexSet::from_iter([ids[1], ids[2]]));
        record.insert(ids[1], IndexSet::from_iter([ids[0]]));
        record.insert(ids[2], IndexSet::from_iter([ids[0]]));

        dispatch_collisions(&mut stage, &record);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        // Listener survives dispatch.
        assert_eq!(stage.collision_listener_count(owner), 1);
    }

    #[test]
    fn dispatch_skips_stale_entries() {
        let (mut stage, ids) = stage_with(2);
        let mut record = CollisionMap::new();
        record.insert(ids[0], IndexSet::from_iter([ids[1]]));
        stage.despawn(ids[0]);
        // Must not panic on the stale key.
        dispatch_collisions(&mut stage, &record);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any sequence of attach attempts (failures ignored)
            /// leaves every parent chain finite, i.e. acyclic.
            #[test]
            fn attach_sequences_never_form_cycles(
                edges in proptest::collection::vec((0usize..8, 0usize..8), 0..40)
            ) {
                let (mut stage, ids) = stage_with(8);
                for (p, c) in edges {
                    let _ = stage.attach(ids[p], ids[c]);
                }
                for &id in &ids {
                    let mut cursor = Some(id);
                    let mut steps = 0;
                    while let Some(node) = cursor {
                        cursor = stage.parent_of(node);
                        steps += 1;
                        prop_assert!(steps <= ids.len(), "cycle reached via {}", id);
                    }
                }
            }

            /// A child has exactly one parent: membership in some
            /// child set implies that set's owner is its parent.
            #[test]
            fn single_parent_invariant(
                edges in proptest::collection::vec((0usize..6, 0usize..6), 0..30)
            ) {
                let (mut stage, ids) = stage_with(6);
                for (p, c) in edges {
                    let _ = stage.attach(ids[p], ids[c]);
                }
                for &child in &ids {
                    let owners: Vec<ActorId> = ids
                        .iter()
                        .copied()
                        .filter(|&p| stage.contains_child(p, child))
                        .collect();
                    match stage.parent_of(child) {
                        Some(parent) => prop_assert_eq!(owners, vec![parent]),
                        None => prop_assert!(owners.is_empty()),
                    }
                }
            }
        }
    }
}
