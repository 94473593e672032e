use log::debug;

use crate::errors::DynamicsError;
use crate::math::SpatialVector;
use crate::shapes::{Bounds, Ray};

#[cfg(test)]
mod tree_tests;

/// Coordinates are pulled this far inside the raw world cell before any
/// point-to-cell mapping, so positions sitting exactly on the world edge
/// never map to an out-of-range cell.
pub const EDGE_TOLERANCE: f64 = 1e-3;

/// Nodes holding this many keys or fewer are never subdivided; queries run
/// the exact pairwise scan on them directly.
const SCAN_THRESHOLD: usize = 2;

/// Hard ceiling on the subdivision depth, independent of the per-dimension
/// limit imposed by the 32-bit spatial hash key.
const MAX_DEPTH: u32 = 10;

/// One cell of the tree: its world-space extents, the shape keys whose
/// bounding volumes overlap it, and the start of its contiguous child block
/// (0 marks a childless node; node 0 is the root and is never a child).
#[derive(Debug)]
struct Node<V: SpatialVector> {
    min: V,
    max: V,
    keys: Vec<u32>,
    first_child: u32,
}

/// A recursive bounding-volume partitioning of a fixed world cell, rebuilt
/// from scratch on every [`insert`](SpatialTree::insert).
///
/// The tree answers three query families over the shapes of the last insert:
/// all intersecting pairs, shapes overlapping a region or containing a point,
/// and shapes pierced by a ray. It only prunes candidates; every reported
/// collision is confirmed with the exact shape-pair test.
///
/// Internal buffers (node arena, pair flags, hit lists) are retained across
/// calls purely to avoid reallocation; they carry no state between queries.
///
/// # Example
/// ```
/// use rs_dynamics::math::{SpatialVector, Vec3};
/// use rs_dynamics::shapes::Bounds;
/// use rs_dynamics::tree::SpatialTree;
///
/// let shapes = vec![
///     Bounds::sphere(Vec3::new(-1.0, 0.0, 0.0), 1.5),
///     Bounds::sphere(Vec3::new(1.0, 0.0, 0.0), 1.5),
///     Bounds::sphere(Vec3::new(30.0, 0.0, 0.0), 1.5),
/// ];
/// let mut tree = SpatialTree::new(Vec3::splat(-50.0), Vec3::splat(50.0));
/// tree.insert_no_sort(&shapes).unwrap();
///
/// // Only the first two spheres touch
/// assert_eq!(tree.collisions(), &[(0, 1)]);
/// ```
pub struct SpatialTree<V: SpatialVector> {
    cell_min: V,
    cell_max: V,
    lower: V,
    upper: V,
    depth: u32,
    depth_override: Option<u32>,
    shapes: Vec<Bounds<V>>,
    index_map: Vec<u32>,
    nodes: Vec<Node<V>>,
    // Scratch buffers reused across queries
    pair_flags: Vec<u64>,
    seen: Vec<u64>,
    hits: Vec<(u32, u32)>,
    shape_hits: Vec<u32>,
    sort_scratch: Vec<(u32, u32)>,
    sort_keys: Vec<(u32, u32)>,
}

impl<V: SpatialVector> SpatialTree<V> {
    /// Creates a tree over the world cell `[cell_min, cell_max]`.
    ///
    /// The usable coordinate range is inset from the raw cell by
    /// [`EDGE_TOLERANCE`]; all query points are clamped into it.
    pub fn new(cell_min: V, cell_max: V) -> Self {
        let lower = cell_min + V::splat(EDGE_TOLERANCE);
        let upper = cell_max - V::splat(EDGE_TOLERANCE);
        Self {
            cell_min,
            cell_max,
            lower,
            upper,
            depth: 1,
            depth_override: None,
            shapes: Vec::new(),
            index_map: Vec::new(),
            nodes: Vec::new(),
            pair_flags: Vec::new(),
            seen: Vec::new(),
            hits: Vec::new(),
            shape_hits: Vec::new(),
            sort_scratch: Vec::new(),
            sort_keys: Vec::new(),
        }
    }

    /// Overrides the automatic depth heuristic. The override is clamped to
    /// the range the spatial hash key can address.
    pub fn set_depth(&mut self, depth: u32) {
        self.depth_override = Some(depth.clamp(1, Self::depth_limit()));
    }

    /// Returns the subdivision depth used by the last build
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Returns the tree-local -> caller index translation of the last insert
    pub fn index_map(&self) -> &[u32] {
        &self.index_map
    }

    /// Returns the tree's reordered copy of the shapes from the last insert
    pub fn shapes(&self) -> &[Bounds<V>] {
        &self.shapes
    }

    /// Rebuilds the tree over `shapes`, sorting its internal copy by spatial
    /// hash key for cache-friendly traversal. [`index_map`](Self::index_map)
    /// records, for every tree-local key, the caller's original index.
    ///
    /// # Errors
    /// Returns `DynamicsError::CapacityExceeded` if `shapes` has more
    /// entries than the `u32` key space can address.
    pub fn insert(&mut self, shapes: &[Bounds<V>]) -> Result<(), DynamicsError> {
        self.check_capacity(shapes)?;
        self.compute_depth(shapes);
        self.sort_shapes(shapes);
        self.build();
        Ok(())
    }

    /// Rebuilds the tree over `shapes` in their given order, skipping the
    /// sort. Tree-local keys equal caller indices (identity index map).
    ///
    /// # Errors
    /// Returns `DynamicsError::CapacityExceeded` if `shapes` has more
    /// entries than the `u32` key space can address.
    pub fn insert_no_sort(&mut self, shapes: &[Bounds<V>]) -> Result<(), DynamicsError> {
        self.check_capacity(shapes)?;
        self.compute_depth(shapes);
        self.shapes.clear();
        self.shapes.extend_from_slice(shapes);
        self.index_map.clear();
        self.index_map.extend(0..shapes.len() as u32);
        self.build();
        Ok(())
    }

    /// Returns every unordered pair `(a, b)`, `a < b`, of tree-local keys
    /// whose shapes geometrically intersect. Each candidate pair is tested
    /// at most once globally even when both shapes co-occur in several
    /// cells; a pair bit-matrix marks pairs already seen.
    pub fn collisions(&mut self) -> &[(u32, u32)] {
        self.reset_pair_flags();
        self.hits.clear();
        if !self.nodes.is_empty() {
            self.collect_collisions(0);
        }
        &self.hits
    }

    /// Runs the pairwise intersection scan restricted to the single leaf
    /// cell containing `point` (clamped into the world bounds).
    pub fn collisions_at_point(&mut self, point: V) -> &[(u32, u32)] {
        self.reset_pair_flags();
        self.hits.clear();
        if !self.nodes.is_empty() {
            let node_index = self.locate(point);
            self.scan_node_pairs(node_index);
        }
        &self.hits
    }

    /// Returns the keys of shapes hit by `ray`, found by marching the leaf
    /// grid cell by cell from the ray's entry into the world.
    ///
    /// Marching stops at the first cell that yields any exact hit: shapes in
    /// cells further along the ray are not reported even if the ray also
    /// pierces them, and the reported hit is not guaranteed to be the
    /// closest. Known limitation, kept for compatibility with the original
    /// traversal contract.
    pub fn collisions_ray(&mut self, ray: &Ray<V>) -> &[u32] {
        self.reset_seen();
        self.shape_hits.clear();
        if self.nodes.is_empty() {
            return &self.shape_hits;
        }

        let entry = match ray.box_entry(self.lower, self.upper) {
            Some(t) => t,
            None => return &self.shape_hits,
        };

        let cells = 1i64 << self.depth;
        let mut sizes = [0.0_f64; 4];
        let mut cell = [0_i64; 4];
        let mut step = [0_i64; 4];
        let mut t_next = [f64::INFINITY; 4];
        let mut t_delta = [f64::INFINITY; 4];

        let start = ray.at(entry + 1e-9).clamp(&self.lower, &self.upper);
        for axis in 0..V::DIM {
            let lo = self.lower.component(axis);
            let size = (self.upper.component(axis) - lo) / cells as f64;
            sizes[axis] = size;
            let c = (((start.component(axis) - lo) / size) as i64).clamp(0, cells - 1);
            cell[axis] = c;

            let d = ray.direction.component(axis);
            if d > 1e-12 {
                step[axis] = 1;
                let boundary = lo + (c + 1) as f64 * size;
                t_next[axis] = entry + (boundary - start.component(axis)) / d;
                t_delta[axis] = size / d;
            } else if d < -1e-12 {
                step[axis] = -1;
                let boundary = lo + c as f64 * size;
                t_next[axis] = entry + (boundary - start.component(axis)) / d;
                t_delta[axis] = size / -d;
            }
        }

        loop {
            // Probe the leaf under the current cell's center and test its keys
            let mut probe = V::zero();
            for axis in 0..V::DIM {
                probe.set_component(
                    axis,
                    self.lower.component(axis) + (cell[axis] as f64 + 0.5) * sizes[axis],
                );
            }
            let node_index = self.locate(probe);
            let count = self.nodes[node_index].keys.len();
            let mut found = false;
            for i in 0..count {
                let key = self.nodes[node_index].keys[i];
                if self.test_and_set_seen(key) {
                    continue;
                }
                if self.shapes[key as usize].intersects_ray(ray) {
                    self.shape_hits.push(key);
                    found = true;
                }
            }
            if found {
                break;
            }

            // March into the next cell pierced by the ray
            let mut axis = 0;
            for a in 1..V::DIM {
                if t_next[a] < t_next[axis] {
                    axis = a;
                }
            }
            if t_next[axis] == f64::INFINITY {
                break;
            }
            cell[axis] += step[axis];
            if cell[axis] < 0 || cell[axis] >= cells {
                break;
            }
            t_next[axis] += t_delta[axis];
        }

        &self.shape_hits
    }

    /// Returns the keys of every childless cell overlapping the query
    /// shape's AABB, deduplicated, without exact pair testing. Callers run
    /// their own exact test on the survivors.
    pub fn overlap(&mut self, shape: &Bounds<V>) -> &[u32] {
        self.reset_seen();
        self.shape_hits.clear();
        if !self.nodes.is_empty() {
            let query_min = shape.min_extent();
            let query_max = shape.max_extent();
            self.collect_overlap(0, &query_min, &query_max);
        }
        &self.shape_hits
    }

    /// Returns the raw key list of the leaf containing `point` (clamped
    /// into the world bounds), with no intersection testing.
    pub fn point_inside(&self, point: V) -> &[u32] {
        if self.nodes.is_empty() {
            return &[];
        }
        let node_index = self.locate(point);
        &self.nodes[node_index].keys
    }

    fn check_capacity(&self, shapes: &[Bounds<V>]) -> Result<(), DynamicsError> {
        if shapes.len() > (u32::MAX - 1) as usize {
            return Err(DynamicsError::CapacityExceeded);
        }
        Ok(())
    }

    fn depth_limit() -> u32 {
        MAX_DEPTH.min(32 / V::DIM as u32)
    }

    /// Sizes the subdivision so the smallest cell is not much larger than
    /// the largest shape: `D = ceil(log2(world_diagonal / max_shape_diagonal))`.
    fn compute_depth(&mut self, shapes: &[Bounds<V>]) {
        if let Some(depth) = self.depth_override {
            self.depth = depth;
            return;
        }

        let world_diagonal = (self.cell_max - self.cell_min).length();
        let max_shape_diagonal = shapes
            .iter()
            .map(|s| s.square_size())
            .fold(0.0_f64, f64::max)
            .sqrt();

        if max_shape_diagonal <= 0.0 || world_diagonal <= max_shape_diagonal {
            self.depth = 1;
            return;
        }

        let depth = (world_diagonal / max_shape_diagonal).log2().ceil() as u32;
        self.depth = depth.clamp(1, Self::depth_limit());
        debug!("spatial tree depth sized to {} (world diagonal {:.3}, largest shape {:.3})",
            self.depth, world_diagonal, max_shape_diagonal);
    }

    /// Sorts a copy of the shapes by spatial hash key (radix sort on the
    /// integer grid key) and records the permutation in `index_map`.
    fn sort_shapes(&mut self, shapes: &[Bounds<V>]) {
        let cells = 1u32 << self.depth;
        self.sort_keys.clear();
        for (i, shape) in shapes.iter().enumerate() {
            let key = self.grid_key(shape.center(), cells);
            self.sort_keys.push((key, i as u32));
        }

        // LSD radix sort, one byte per pass
        self.sort_scratch.clear();
        self.sort_scratch.resize(self.sort_keys.len(), (0, 0));
        for pass in 0..4 {
            let shift = pass * 8;
            let mut counts = [0usize; 256];
            for &(key, _) in &self.sort_keys {
                counts[((key >> shift) & 0xFF) as usize] += 1;
            }
            let mut total = 0;
            for count in counts.iter_mut() {
                let c = *count;
                *count = total;
                total += c;
            }
            for &(key, index) in &self.sort_keys {
                let bucket = ((key >> shift) & 0xFF) as usize;
                self.sort_scratch[counts[bucket]] = (key, index);
                counts[bucket] += 1;
            }
            std::mem::swap(&mut self.sort_keys, &mut self.sort_scratch);
        }

        self.shapes.clear();
        self.index_map.clear();
        for &(_, original) in &self.sort_keys {
            self.shapes.push(shapes[original as usize].clone());
            self.index_map.push(original);
        }
    }

    /// Maps a point onto the uniform `cells^DIM` grid and packs the cell
    /// coordinates into a single integer sort key. This key space is
    /// unrelated to the per-node octant codes used during the build.
    fn grid_key(&self, point: V, cells: u32) -> u32 {
        let clamped = point.clamp(&self.lower, &self.upper);
        let mut key = 0u32;
        for axis in 0..V::DIM {
            let lo = self.lower.component(axis);
            let hi = self.upper.component(axis);
            let t = (clamped.component(axis) - lo) / (hi - lo);
            let cell = ((t * cells as f64) as u32).min(cells - 1);
            key |= cell << (self.depth * axis as u32);
        }
        key
    }

    /// Rebuilds the node arena: the root covers the raw world cell and owns
    /// every key; each level pushes keys into the child octants their AABBs
    /// overlap, stopping at depth 0 or at nodes of `SCAN_THRESHOLD` keys.
    fn build(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node {
            min: self.cell_min,
            max: self.cell_max,
            keys: (0..self.shapes.len() as u32).collect(),
            first_child: 0,
        });
        self.subdivide(0, self.depth);
    }

    fn subdivide(&mut self, node_index: usize, depth: u32) {
        if depth == 0 || self.nodes[node_index].keys.len() <= SCAN_THRESHOLD {
            return;
        }

        let min = self.nodes[node_index].min;
        let max = self.nodes[node_index].max;
        let mid = min.lerp(&max, 0.5);
        let child_count = 1usize << V::DIM;
        let first_child = self.nodes.len() as u32;

        for octant in 0..child_count {
            let mut child_min = min;
            let mut child_max = max;
            for axis in 0..V::DIM {
                if octant & (1 << axis) != 0 {
                    child_min.set_component(axis, mid.component(axis));
                } else {
                    child_max.set_component(axis, mid.component(axis));
                }
            }
            self.nodes.push(Node {
                min: child_min,
                max: child_max,
                keys: Vec::new(),
                first_child: 0,
            });
        }
        self.nodes[node_index].first_child = first_child;

        // A key goes into every child whose cell its AABB overlaps, so a
        // shape straddling the midpoint appears in several children
        let keys = std::mem::take(&mut self.nodes[node_index].keys);
        for &key in &keys {
            let shape_min = self.shapes[key as usize].min_extent();
            let shape_max = self.shapes[key as usize].max_extent();
            for octant in 0..child_count {
                let mut overlaps = true;
                for axis in 0..V::DIM {
                    if octant & (1 << axis) != 0 {
                        if shape_max.component(axis) < mid.component(axis) {
                            overlaps = false;
                            break;
                        }
                    } else if shape_min.component(axis) > mid.component(axis) {
                        overlaps = false;
                        break;
                    }
                }
                if overlaps {
                    self.nodes[first_child as usize + octant].keys.push(key);
                }
            }
        }
        self.nodes[node_index].keys = keys;

        for octant in 0..child_count {
            self.subdivide(first_child as usize + octant, depth - 1);
        }
    }

    /// Walks midpoint octant codes from the root down to the childless node
    /// containing `point`.
    fn locate(&self, point: V) -> usize {
        let point = point.clamp(&self.lower, &self.upper);
        let mut node_index = 0usize;
        loop {
            let node = &self.nodes[node_index];
            if node.first_child == 0 {
                return node_index;
            }
            let mid = node.min.lerp(&node.max, 0.5);
            let mut octant = 0usize;
            for axis in 0..V::DIM {
                if point.component(axis) >= mid.component(axis) {
                    octant |= 1 << axis;
                }
            }
            node_index = node.first_child as usize + octant;
        }
    }

    fn collect_collisions(&mut self, node_index: usize) {
        let first_child = self.nodes[node_index].first_child;
        if first_child == 0 {
            self.scan_node_pairs(node_index);
            return;
        }
        let child_count = 1usize << V::DIM;
        for octant in 0..child_count {
            self.collect_collisions(first_child as usize + octant);
        }
    }

    /// O(k²) exact scan over one node's key list
    fn scan_node_pairs(&mut self, node_index: usize) {
        let count = self.nodes[node_index].keys.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let key_a = self.nodes[node_index].keys[i];
                let key_b = self.nodes[node_index].keys[j];
                let (a, b) = if key_a < key_b { (key_a, key_b) } else { (key_b, key_a) };
                if self.test_and_set_pair(a, b) {
                    continue;
                }
                if self.shapes[a as usize].intersects(&self.shapes[b as usize]) {
                    self.hits.push((a, b));
                }
            }
        }
    }

    fn collect_overlap(&mut self, node_index: usize, query_min: &V, query_max: &V) {
        {
            let node = &self.nodes[node_index];
            for axis in 0..V::DIM {
                if node.min.component(axis) > query_max.component(axis)
                    || query_min.component(axis) > node.max.component(axis)
                {
                    return;
                }
            }
        }

        let first_child = self.nodes[node_index].first_child;
        if first_child == 0 {
            let count = self.nodes[node_index].keys.len();
            for i in 0..count {
                let key = self.nodes[node_index].keys[i];
                if !self.test_and_set_seen(key) {
                    self.shape_hits.push(key);
                }
            }
            return;
        }
        let child_count = 1usize << V::DIM;
        for octant in 0..child_count {
            self.collect_overlap(first_child as usize + octant, query_min, query_max);
        }
    }

    fn reset_pair_flags(&mut self) {
        let n = self.shapes.len();
        let words = (n * n + 63) / 64;
        self.pair_flags.clear();
        self.pair_flags.resize(words, 0);
    }

    /// Marks the pair `(a, b)` as tested; returns whether it already was
    fn test_and_set_pair(&mut self, a: u32, b: u32) -> bool {
        let index = a as usize * self.shapes.len() + b as usize;
        let word = index / 64;
        let mask = 1u64 << (index % 64);
        let already = self.pair_flags[word] & mask != 0;
        self.pair_flags[word] |= mask;
        already
    }

    fn reset_seen(&mut self) {
        let words = (self.shapes.len() + 63) / 64;
        self.seen.clear();
        self.seen.resize(words, 0);
    }

    /// Marks a single key as seen; returns whether it already was
    fn test_and_set_seen(&mut self, key: u32) -> bool {
        let word = key as usize / 64;
        let mask = 1u64 << (key % 64);
        let already = self.seen[word] & mask != 0;
        self.seen[word] |= mask;
        already
    }
}
