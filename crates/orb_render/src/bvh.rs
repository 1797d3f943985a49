//! Bounding volume hierarchy over an externally owned primitive table.
//!
//! The tree is an arena of nodes addressed by index; it never owns the
//! primitives, leaves refer to them by position in the slice the tree was
//! built from. Built once at scene-load time and read-only afterwards, so it
//! is safely shared across concurrent traversals.

use crate::{Intersection, LightSample, Primitive};
use orb_math::{Aabb, Ray};
use rand::rngs::StdRng;
use rand::Rng;

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf { primitive: usize },
    Internal { left: usize, right: usize },
}

#[derive(Debug, Clone, Copy)]
struct Node {
    bounds: Aabb,
    /// Total surface area of the subtree, for area-proportional light
    /// sampling.
    area: f32,
    kind: NodeKind,
}

/// Median-split BVH, balanced by primitive count.
pub struct Bvh {
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl Bvh {
    /// Build over a primitive table. An empty table yields an empty tree for
    /// which every query misses.
    pub fn build<P: Primitive>(primitives: &[P]) -> Self {
        let mut bvh = Self {
            nodes: Vec::with_capacity(primitives.len().saturating_mul(2)),
            root: None,
        };
        if primitives.is_empty() {
            return bvh;
        }

        let mut order: Vec<usize> = (0..primitives.len()).collect();
        let root = bvh.build_node(primitives, &mut order);
        bvh.root = Some(root);
        bvh
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total surface area of every primitive in the tree.
    pub fn total_area(&self) -> f32 {
        self.root.map_or(0.0, |root| self.nodes[root].area)
    }

    fn push_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn build_node<P: Primitive>(&mut self, primitives: &[P], order: &mut [usize]) -> usize {
        match order.len() {
            0 => unreachable!("build_node called with no primitives"),
            1 => {
                let primitive = order[0];
                self.push_node(Node {
                    bounds: primitives[primitive].bounding_box(),
                    area: primitives[primitive].area(),
                    kind: NodeKind::Leaf { primitive },
                })
            }
            2 => {
                // Two singleton leaves, no sort needed.
                let (left_half, right_half) = order.split_at_mut(1);
                let left = self.build_node(primitives, left_half);
                let right = self.build_node(primitives, right_half);
                self.join(left, right)
            }
            _ => {
                // Partition by primitive count: sort by centroid along the
                // longest axis of the centroid bounds and split at the
                // median.
                let centroid_bounds = order.iter().fold(Aabb::EMPTY, |acc, &i| {
                    acc.union_point(primitives[i].bounding_box().centroid())
                });
                let axis = centroid_bounds.longest_axis();

                order.sort_by(|&a, &b| {
                    let ca = primitives[a].bounding_box().centroid_on(axis);
                    let cb = primitives[b].bounding_box().centroid_on(axis);
                    ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
                });

                let mid = order.len() / 2;
                let (left_half, right_half) = order.split_at_mut(mid);
                let left = self.build_node(primitives, left_half);
                let right = self.build_node(primitives, right_half);
                self.join(left, right)
            }
        }
    }

    fn join(&mut self, left: usize, right: usize) -> usize {
        let bounds = self.nodes[left].bounds.union(&self.nodes[right].bounds);
        let area = self.nodes[left].area + self.nodes[right].area;
        self.push_node(Node {
            bounds,
            area,
            kind: NodeKind::Internal { left, right },
        })
    }

    /// Nearest intersection along the ray, or the miss record.
    ///
    /// `primitives` must be the same table the tree was built from.
    pub fn traverse<'a, P: Primitive>(
        &self,
        primitives: &'a [P],
        ray: &Ray,
    ) -> Intersection<'a> {
        match self.root {
            None => Intersection::miss(),
            Some(root) => self.traverse_node(root, primitives, ray),
        }
    }

    fn traverse_node<'a, P: Primitive>(
        &self,
        index: usize,
        primitives: &'a [P],
        ray: &Ray,
    ) -> Intersection<'a> {
        let node = &self.nodes[index];
        if !node.bounds.hit(ray) {
            return Intersection::miss();
        }
        match node.kind {
            NodeKind::Leaf { primitive } => primitives[primitive].intersect(ray),
            NodeKind::Internal { left, right } => {
                // Both boxes already passed the slab test, so test both
                // subtrees and keep the nearer record; a miss carries
                // t = +inf and never wins.
                let left_hit = self.traverse_node(left, primitives, ray);
                let right_hit = self.traverse_node(right, primitives, ray);
                if left_hit.t < right_hit.t {
                    left_hit
                } else {
                    right_hit
                }
            }
        }
    }

    /// Uniform-area sample over the primitives in the tree: descend choosing
    /// each child with probability proportional to its subtree area, then
    /// delegate to the leaf primitive. The pdf of the returned sample is the
    /// leaf's own; callers normalize against [`total_area`](Self::total_area).
    pub fn sample<P: Primitive>(&self, primitives: &[P], rng: &mut StdRng) -> LightSample {
        let Some(root) = self.root else {
            return LightSample::default();
        };
        let mut index = root;
        loop {
            match self.nodes[index].kind {
                NodeKind::Leaf { primitive } => return primitives[primitive].sample(rng),
                NodeKind::Internal { left, right } => {
                    let split = rng.gen::<f32>() * self.nodes[index].area;
                    index = if split < self.nodes[left].area {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}
