use std::collections::BinaryHeap;

/// Error types for spatial index construction.
#[derive(Debug, thiserror::Error)]
pub enum KdTreeError {
    /// The index cannot be built over zero points.
    #[error("Cannot build a spatial index over zero points")]
    EmptyPoints,
}

/// A single nearest-neighbor query result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// The matched point.
    pub point: [f64; 3],
    /// Index of the matched point in the buffer the tree was built from.
    pub index: usize,
    /// Squared Euclidean distance between the query and the match.
    pub distance_sq: f64,
}

// Heap entry ordered by (distance, index) so that ties at equal distance
// prefer the lowest index. Inputs are finite, total_cmp keeps the order total.
struct HeapNeighbor(Neighbor);

impl PartialEq for HeapNeighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}
impl Eq for HeapNeighbor {}

impl Ord for HeapNeighbor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .distance_sq
            .total_cmp(&other.0.distance_sq)
            .then(self.0.index.cmp(&other.0.index))
    }
}

impl PartialOrd for HeapNeighbor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

struct Node {
    point: [f64; 3],
    index: usize,
    axis: usize,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn build(mut points: Vec<([f64; 3], usize)>, depth: usize) -> Option<Box<Node>> {
        if points.is_empty() {
            return None;
        }

        // cycle the split axis with depth
        let axis = depth % 3;

        // median split; the index tiebreak keeps construction deterministic
        // for duplicate coordinates
        points.sort_by(|(a, ai), (b, bi)| a[axis].total_cmp(&b[axis]).then(ai.cmp(bi)));
        let median = points.len() / 2;

        let right_points = points.split_off(median + 1);
        let (point, index) = points.pop().unwrap_or_default();

        Some(Box::new(Node {
            point,
            index,
            axis,
            left: Self::build(points, depth + 1),
            right: Self::build(right_points, depth + 1),
        }))
    }

    fn nearest(&self, query: &[f64; 3], best: &mut Neighbor) {
        let distance_sq = squared_distance(&self.point, query);
        if distance_sq < best.distance_sq
            || (distance_sq == best.distance_sq && self.index < best.index)
        {
            *best = Neighbor {
                point: self.point,
                index: self.index,
                distance_sq,
            };
        }

        let split_delta = query[self.axis] - self.point[self.axis];
        let (near, far) = if split_delta < 0.0 {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };

        if let Some(node) = near {
            node.nearest(query, best);
        }
        // the far half-space can still hold a closer point, or an
        // equidistant one with a lower index
        if split_delta * split_delta <= best.distance_sq {
            if let Some(node) = far {
                node.nearest(query, best);
            }
        }
    }

    fn knn(&self, query: &[f64; 3], k: usize, heap: &mut BinaryHeap<HeapNeighbor>) {
        let distance_sq = squared_distance(&self.point, query);
        let candidate = HeapNeighbor(Neighbor {
            point: self.point,
            index: self.index,
            distance_sq,
        });
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(top) = heap.peek() {
            if candidate < *top {
                heap.pop();
                heap.push(candidate);
            }
        }

        let split_delta = query[self.axis] - self.point[self.axis];
        let (near, far) = if split_delta < 0.0 {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };

        if let Some(node) = near {
            node.knn(query, k, heap);
        }

        let worst = heap.peek().map_or(f64::INFINITY, |n| n.0.distance_sq);
        if heap.len() < k || split_delta * split_delta <= worst {
            if let Some(node) = far {
                node.knn(query, k, heap);
            }
        }
    }
}

/// Nearest-neighbor index over a fixed set of 3d points.
///
/// Built once over the reference cloud and read-only afterwards, so a single
/// tree can serve concurrent lookups. Median splits keep the tree balanced;
/// duplicate and degenerate (collinear, coplanar) inputs stay correct, with
/// queries degrading towards a linear scan in the worst case. Ties at equal
/// squared distance resolve to the lowest point index.
pub struct KdTree {
    root: Box<Node>,
    len: usize,
}

impl KdTree {
    /// Build the index over the given points. Fails on an empty slice.
    pub fn build(points: &[[f64; 3]]) -> Result<Self, KdTreeError> {
        let indexed = points
            .iter()
            .copied()
            .zip(0..points.len())
            .collect::<Vec<_>>();
        match Node::build(indexed, 0) {
            Some(root) => Ok(Self {
                root,
                len: points.len(),
            }),
            None => Err(KdTreeError::EmptyPoints),
        }
    }

    /// Number of indexed points.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index is empty. Always false: construction rejects zero points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Find the nearest indexed point to `query`.
    pub fn nearest(&self, query: &[f64; 3]) -> Neighbor {
        let mut best = Neighbor {
            point: self.root.point,
            index: usize::MAX,
            distance_sq: f64::INFINITY,
        };
        self.root.nearest(query, &mut best);
        best
    }

    /// Find the `k` nearest indexed points to `query`, ascending by
    /// `(squared distance, index)`. `k` is capped at the tree size.
    pub fn nearest_n(&self, query: &[f64; 3], k: usize) -> Vec<Neighbor> {
        let k = k.min(self.len);
        if k == 0 {
            return Vec::new();
        }
        let mut heap = BinaryHeap::with_capacity(k);
        self.root.knn(query, k, &mut heap);
        heap.into_sorted_vec().into_iter().map(|n| n.0).collect()
    }
}

#[inline]
fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}
