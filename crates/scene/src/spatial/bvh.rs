use std::ops::Range;

use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use foundation::math::precision::stable_total_cmp_f64;

/// Bounding volume hierarchy over per-paper quad bounds.
///
/// Items live in one flat array reordered during the build; every node owns
/// a contiguous range of it. `query_ray` returns paper indices ascending.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<Node>,
    items: Vec<Item>,
}

#[derive(Debug, Clone)]
struct Node {
    bounds: Aabb3,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Leaf(Range<usize>),
    Branch { left: usize, right: usize },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Item {
    pub paper: usize,
    pub bounds: Aabb3,
}

const LEAF_SIZE: usize = 8;

impl Bvh {
    pub fn build(mut items: Vec<Item>) -> Self {
        let mut nodes = Vec::new();
        if !items.is_empty() {
            let len = items.len();
            split(&mut nodes, &mut items, 0..len);
        }
        Self { nodes, items }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Papers whose bounds intersect the ray segment `[t_min, t_max]`.
    pub fn query_ray(&self, origin: Vec3, dir: Vec3, t_min: f64, t_max: f64) -> Vec<usize> {
        let slab = Slab::new(origin, dir, t_min, t_max);
        let mut hits = Vec::new();
        let mut pending = if self.nodes.is_empty() { vec![] } else { vec![0] };

        while let Some(idx) = pending.pop() {
            let node = &self.nodes[idx];
            if !slab.hits(&node.bounds) {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf(range) => hits.extend(
                    self.items[range.clone()]
                        .iter()
                        .filter(|item| slab.hits(&item.bounds))
                        .map(|item| item.paper),
                ),
                NodeKind::Branch { left, right } => pending.extend([*right, *left]),
            }
        }

        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

/// Builds the node for `items[range]` and returns its index. Children are
/// pushed after their parent, so the root is always node 0.
fn split(nodes: &mut Vec<Node>, items: &mut [Item], range: Range<usize>) -> usize {
    let bounds = items[range.clone()]
        .iter()
        .fold(Aabb3::empty(), |mut acc, item| {
            acc.extend(item.bounds.min);
            acc.extend(item.bounds.max);
            acc
        });
    let idx = nodes.len();

    if range.len() <= LEAF_SIZE {
        nodes.push(Node {
            bounds,
            kind: NodeKind::Leaf(range),
        });
        return idx;
    }

    let axis = longest_axis(bounds.size());
    items[range.clone()].sort_by(|a, b| {
        stable_total_cmp_f64(center_on(a, axis), center_on(b, axis))
            .then_with(|| a.paper.cmp(&b.paper))
    });

    nodes.push(Node {
        bounds,
        kind: NodeKind::Leaf(range.start..range.start),
    });
    let mid = range.start + range.len() / 2;
    let left = split(nodes, items, range.start..mid);
    let right = split(nodes, items, mid..range.end);
    nodes[idx].kind = NodeKind::Branch { left, right };
    idx
}

fn component(v: Vec3, axis: usize) -> f64 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}

fn center_on(item: &Item, axis: usize) -> f64 {
    component(item.bounds.center(), axis)
}

/// Ties prefer x, then y.
fn longest_axis(extent: Vec3) -> usize {
    if extent.x >= extent.y && extent.x >= extent.z {
        0
    } else if extent.y >= extent.z {
        1
    } else {
        2
    }
}

/// Ray segment prepared for repeated slab tests. Boxes may be flat on any
/// axis; quads are.
struct Slab {
    origin: Vec3,
    dir: Vec3,
    t_min: f64,
    t_max: f64,
}

impl Slab {
    fn new(origin: Vec3, dir: Vec3, t_min: f64, t_max: f64) -> Self {
        Self {
            origin,
            dir,
            t_min,
            t_max,
        }
    }

    fn hits(&self, aabb: &Aabb3) -> bool {
        let (mut lo, mut hi) = (self.t_min, self.t_max);
        for axis in 0..3 {
            let o = component(self.origin, axis);
            let d = component(self.dir, axis);
            let min = component(aabb.min, axis);
            let max = component(aabb.max, axis);

            if d.abs() < 1e-12 {
                if o < min || o > max {
                    return false;
                }
                continue;
            }

            let (a, b) = ((min - o) / d, (max - o) / d);
            lo = lo.max(a.min(b));
            hi = hi.min(a.max(b));
            if hi < lo {
                return false;
            }
        }
        true
    }
}
