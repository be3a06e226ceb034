//! Region-splitting spatial index (quadtree).
//!
//! The index is rebuilt from scratch every tick — no incremental
//! maintenance — and answers "who shares a leaf with whom" and "what's
//! in this rectangle" in sub-quadratic time.
//!
//! An actor's box is inserted into *every* leaf it intersects: an
//! object straddling a split boundary legitimately lives in more than
//! one leaf, deduplicated by handle within each leaf's membership map.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

use indexmap::{IndexMap, IndexSet};

use troupe_core::{Aabb, ActorId, Vec2};

/// Square region covered by one index node: origin (min corner) plus
/// side length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SquareRegion {
    /// Minimum corner.
    pub origin: Vec2,
    /// Side length.
    pub side: f64,
}

impl SquareRegion {
    /// Create a region from its min corner and side length.
    pub fn new(origin: Vec2, side: f64) -> Self {
        Self { origin, side }
    }

    /// The region as an inclusive-edge box.
    pub fn as_aabb(&self) -> Aabb {
        Aabb::from_origin_size(self.origin, self.side, self.side)
    }

    /// Whether the region and the box overlap (boundary contact counts).
    pub fn intersects(&self, rect: &Aabb) -> bool {
        self.as_aabb().intersects(rect)
    }

    /// The four equal quadrants of this region.
    fn quadrants(&self) -> [SquareRegion; 4] {
        let half = self.side / 2.0;
        let Vec2 { x, y } = self.origin;
        [
            SquareRegion::new(Vec2::new(x, y), half),
            SquareRegion::new(Vec2::new(x + half, y), half),
            SquareRegion::new(Vec2::new(x, y + half), half),
            SquareRegion::new(Vec2::new(x + half, y + half), half),
        ]
    }
}

/// Membership of one leaf: handle to indexed box, deduplicated by handle.
pub type LeafMembers = IndexMap<ActorId, Aabb>;

struct Node {
    region: SquareRegion,
    members: LeafMembers,
    children: Option<Box<[Node; 4]>>,
}

impl Node {
    fn leaf(region: SquareRegion) -> Self {
        Self {
            region,
            members: LeafMembers::new(),
            children: None,
        }
    }

    fn insert(&mut self, id: ActorId, rect: Aabb, load_factor: usize, min_split: f64) {
        if !self.region.intersects(&rect) {
            return;
        }
        if let Some(children) = &mut self.children {
            for child in children.iter_mut() {
                child.insert(id, rect, load_factor, min_split);
            }
            return;
        }
        self.members.insert(id, rect);
        // Split once the leaf is loaded, but only while the child
        // half-size stays above the minimum: below that, a leaf may
        // legitimately exceed the load factor.
        if self.members.len() >= load_factor && self.region.side / 2.0 > min_split {
            self.split(load_factor, min_split);
        }
    }

    fn split(&mut self, load_factor: usize, min_split: f64) {
        let q = self.region.quadrants();
        let mut children = Box::new([
            Node::leaf(q[0]),
            Node::leaf(q[1]),
            Node::leaf(q[2]),
            Node::leaf(q[3]),
        ]);
        // Redistribute existing members into every intersecting child.
        for (id, rect) in self.members.drain(..) {
            for child in children.iter_mut() {
                child.insert(id, rect, load_factor, min_split);
            }
        }
        self.children = Some(children);
    }

    fn query_into(&self, rect: &Aabb, out: &mut IndexSet<ActorId>) {
        if !self.region.intersects(rect) {
            return;
        }
        match &self.children {
            Some(children) => {
                for child in children.iter() {
                    child.query_into(rect, out);
                }
            }
            None => {
                for (&id, member_rect) in &self.members {
                    if member_rect.intersects(rect) {
                        out.insert(id);
                    }
                }
            }
        }
    }
}

/// Spatial index over a square region.
///
/// Built fresh for every tick; never persisted across ticks.
pub struct SpatialIndex {
    root: Node,
    load_factor: usize,
    min_split: f64,
}

impl SpatialIndex {
    /// Create an empty index covering `region`.
    ///
    /// `load_factor` is the member count at which a leaf splits into
    /// four quadrants; `min_split` is the smallest child side length a
    /// split may produce.
    pub fn new(region: SquareRegion, load_factor: usize, min_split: f64) -> Self {
        Self {
            root: Node::leaf(region),
            load_factor: load_factor.max(2),
            min_split,
        }
    }

    /// The region covered by the whole index.
    pub fn region(&self) -> SquareRegion {
        self.root.region
    }

    /// Insert a box into every leaf it intersects. A box outside the
    /// indexed region is dropped silently (wraparound keeps simulated
    /// actors inside the world).
    pub fn insert(&mut self, id: ActorId, rect: Aabb) {
        self.root
            .insert(id, rect, self.load_factor, self.min_split);
    }

    /// Collect the members of every node intersecting `rect`,
    /// deduplicated across leaves.
    pub fn query(&self, rect: &Aabb) -> IndexSet<ActorId> {
        let mut out = IndexSet::new();
        self.root.query_into(rect, &mut out);
        out
    }

    /// Iterate over the membership map of every leaf, for one build.
    ///
    /// The sequence is finite and non-restartable; collision detection
    /// walks it exactly once per tick.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            stack: vec![&self.root],
        }
    }

    /// Number of leaves in the current build.
    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }
}

/// Depth-first iterator over leaf membership maps.
pub struct Leaves<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a LeafMembers;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match &node.children {
                Some(children) => self.stack.extend(children.iter()),
                None => return Some(&node.members),
            }
        }
        None
    }
}
