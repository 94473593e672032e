// src/world/rigid_world.rs

use log::warn;

use crate::bodies::RigidBody;
use crate::errors::DynamicsError;
use crate::math::{SpatialVector, Vec3};
use crate::shapes::{resolve, Bounds};
use crate::tree::{SpatialTree, EDGE_TOLERANCE};
use crate::world::response::{correction_shares, exchange_impulse, exchange_impulse_static};
use crate::world::rk4;

/// Game-level reaction hook, invoked once per colliding pair per step in
/// each direction before the impulse exchange
pub type CollisionCallback = Box<dyn FnMut(&mut RigidBody, &mut RigidBody)>;

/// Rigid-body simulation over a fixed world cell, with torque.
///
/// Owns parallel `shapes[i]` / `bodies[i]` vectors; index `i` always refers
/// to the same logical object in both. Every [`solve`](Self::solve) rebuilds
/// the broad-phase tree over the shapes, resolves the colliding pairs with
/// impulses and positional correction, integrates every body with RK4, and
/// copies the new positions and rotations back onto the shapes.
///
/// The engine is inherently stateful across frames and single-threaded;
/// callers typically sub-step it several times per rendered frame.
///
/// # Example
/// ```
/// use rs_dynamics::math::{SpatialVector, Vec3};
/// use rs_dynamics::shapes::Bounds;
/// use rs_dynamics::world::PhysicsWorld;
///
/// let mut world = PhysicsWorld::new(
///     Vec3::splat(-100.0),
///     Vec3::splat(100.0),
///     Vec3::new(0.0, -9.81, 0.0),
/// );
/// let ball = world
///     .add_body(Bounds::sphere(Vec3::new(0.0, 20.0, 0.0), 1.0), 1.0, None, None)
///     .unwrap();
/// for _ in 0..30 {
///     world.solve(1.0 / 1800.0, 0.0).unwrap();
/// }
/// assert!(world.get_body(ball).unwrap().velocity.y < 0.0);
/// ```
pub struct PhysicsWorld {
    tree: SpatialTree<Vec3>,
    shapes: Vec<Bounds<Vec3>>,
    bodies: Vec<RigidBody>,
    callbacks: Vec<Option<CollisionCallback>>,
    dead: Vec<usize>,
    gravity: Vec3,
    elasticity: f64,
    contact_tolerance: f64,
    lower: Vec3,
    upper: Vec3,
    pair_buf: Vec<(u32, u32)>,
}

impl PhysicsWorld {
    /// Creates a world over the cell `[cell_min, cell_max]` with the given
    /// gravity. Body positions are clamped into the cell inset by the same
    /// edge tolerance the tree uses.
    pub fn new(cell_min: Vec3, cell_max: Vec3, gravity: Vec3) -> Self {
        Self {
            tree: SpatialTree::new(cell_min, cell_max),
            shapes: Vec::new(),
            bodies: Vec::new(),
            callbacks: Vec::new(),
            dead: Vec::new(),
            gravity,
            elasticity: 0.5,
            contact_tolerance: 1e-6,
            lower: cell_min + Vec3::splat(EDGE_TOLERANCE),
            upper: cell_max - Vec3::splat(EDGE_TOLERANCE),
            pair_buf: Vec::new(),
        }
    }

    /// Sets the coefficient of restitution applied uniformly to all pairs
    pub fn set_elasticity(&mut self, elasticity: f64) {
        self.elasticity = elasticity;
    }

    /// Sets the minimum penetration/approach speed worth resolving
    pub fn set_contact_tolerance(&mut self, tolerance: f64) {
        self.contact_tolerance = tolerance;
    }

    /// Pre-allocates room for `n` bodies
    pub fn reserve(&mut self, n: usize) {
        self.shapes.reserve(n);
        self.bodies.reserve(n);
        self.callbacks.reserve(n);
    }

    /// Adds a body wrapped in `shape`, reusing a dead slot when one exists.
    ///
    /// # Arguments
    /// * `shape` - The bounding volume; its center becomes the body position.
    /// * `mass` - The mass of the body in kilograms.
    /// * `inertia` - Diagonal inertia tensor; derived from the shape if `None`.
    /// * `tag` - Opaque user data stored on the body.
    ///
    /// # Returns
    /// The index of the new body, stable until pruned.
    ///
    /// # Errors
    /// Returns an error if the mass or inertia is not positive.
    pub fn add_body(
        &mut self,
        shape: Bounds<Vec3>,
        mass: f64,
        inertia: Option<Vec3>,
        tag: Option<u64>,
    ) -> Result<usize, DynamicsError> {
        let inertia = inertia.unwrap_or_else(|| shape.moment_of_inertia(mass));
        let mut body = RigidBody::new(shape.center(), mass, inertia)?;
        body.tag = tag.unwrap_or(0);
        body.clear_force(self.gravity);

        if let Some(slot) = self.dead.pop() {
            self.shapes[slot] = shape;
            self.bodies[slot] = body;
            self.callbacks[slot] = None;
            return Ok(slot);
        }
        self.shapes.push(shape);
        self.bodies.push(body);
        self.callbacks.push(None);
        Ok(self.bodies.len() - 1)
    }

    /// Soft-deletes a body: it is marked dead, skipped by every later step,
    /// and its slot queued for reuse. Compaction only happens through
    /// [`prune_after`](Self::prune_after).
    ///
    /// # Errors
    /// Returns an error if `index` does not refer to a live body.
    pub fn clear_body(&mut self, index: usize) -> Result<(), DynamicsError> {
        if index >= self.bodies.len() || self.bodies[index].is_dead() {
            return Err(DynamicsError::BodyNotFound);
        }
        self.bodies[index].kill();
        self.callbacks[index] = None;
        self.dead.push(index);
        Ok(())
    }

    /// Registers a collision callback for the body at `index`
    ///
    /// # Errors
    /// Returns an error if `index` does not refer to a live body.
    pub fn register_callback(
        &mut self,
        index: usize,
        callback: CollisionCallback,
    ) -> Result<(), DynamicsError> {
        if index >= self.bodies.len() || self.bodies[index].is_dead() {
            return Err(DynamicsError::BodyNotFound);
        }
        self.callbacks[index] = Some(callback);
        Ok(())
    }

    /// Compacts the arrays down to `index + 1` entries, but only when every
    /// body past the index is already dead; otherwise the call is refused
    /// with a warning and nothing changes. The dead free list is rebuilt
    /// from the surviving prefix.
    pub fn prune_after(&mut self, index: usize) {
        if self.bodies.iter().skip(index + 1).any(|body| !body.is_dead()) {
            warn!("prune_after({}) refused: live bodies remain past the index", index);
            return;
        }
        self.truncate_to(index + 1);
    }

    /// Compacts the arrays down to `index + 1` entries unconditionally,
    /// discarding any live bodies past the index
    pub fn prune_after_force(&mut self, index: usize) {
        if self.bodies.iter().skip(index + 1).any(|body| !body.is_dead()) {
            warn!("prune_after_force({}) discarding live bodies past the index", index);
        }
        self.truncate_to(index + 1);
    }

    fn truncate_to(&mut self, len: usize) {
        self.shapes.truncate(len);
        self.bodies.truncate(len);
        self.callbacks.truncate(len);
        self.dead.clear();
        for (i, body) in self.bodies.iter().enumerate() {
            if body.is_dead() {
                self.dead.push(i);
            }
        }
    }

    pub fn get_body(&self, index: usize) -> Option<&RigidBody> {
        self.bodies.get(index)
    }

    pub fn get_body_mut(&mut self, index: usize) -> Option<&mut RigidBody> {
        self.bodies.get_mut(index)
    }

    pub fn get_bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    pub fn get_shape(&self, index: usize) -> Option<&Bounds<Vec3>> {
        self.shapes.get(index)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Advances the whole simulation by `dt`: broad phase, narrow phase
    /// with impulse resolution, RK4 integration, and shape re-sync.
    ///
    /// # Arguments
    /// * `dt` - The step duration; callers usually sub-step with small values.
    /// * `damping` - Velocity-proportional damping applied during integration.
    ///
    /// # Errors
    /// Returns an error only if the body count exceeds the tree's key
    /// capacity; every per-step numeric edge case resolves silently.
    pub fn solve(&mut self, dt: f64, damping: f64) -> Result<(), DynamicsError> {
        self.tree.insert(&self.shapes)?;
        self.collect_pairs(true);
        self.resolve_pairs();
        self.integrate(dt, damping);
        Ok(())
    }

    /// Like [`solve`](Self::solve), but skips the tree's sort/permutation
    /// step; pairs arrive in the engine's own index space directly.
    ///
    /// # Errors
    /// Same as [`solve`](Self::solve).
    pub fn solve_no_sort(&mut self, dt: f64, damping: f64) -> Result<(), DynamicsError> {
        self.tree.insert_no_sort(&self.shapes)?;
        self.collect_pairs(false);
        self.resolve_pairs();
        self.integrate(dt, damping);
        Ok(())
    }

    /// Pure integration: no broad phase, no collisions. Used for bodies
    /// that should feel gravity and damping but never collide.
    pub fn solve_no_collide(&mut self, dt: f64, damping: f64) {
        self.integrate(dt, damping);
    }

    /// One-off resolution of a body against an immovable, body-less shape
    /// (e.g. character versus terrain) outside the broad-phase pass. The
    /// body receives the impulse and the full positional correction.
    ///
    /// # Returns
    /// Whether a contact was found and resolved.
    ///
    /// # Errors
    /// Returns an error if `index` does not refer to a live body.
    pub fn collide(
        &mut self,
        index: usize,
        static_shape: &Bounds<Vec3>,
    ) -> Result<bool, DynamicsError> {
        if index >= self.bodies.len() || self.bodies[index].is_dead() {
            return Err(DynamicsError::BodyNotFound);
        }
        let contact = match resolve(&self.shapes[index], static_shape, self.contact_tolerance) {
            Some(contact) => contact,
            None => return Ok(false),
        };
        let body = &mut self.bodies[index];
        exchange_impulse_static(body, &contact, self.elasticity, self.contact_tolerance);
        if body.inv_mass > 0.0 {
            body.position = body.position - contact.offset;
            let position = body.position;
            self.shapes[index].set_position(position);
        }
        Ok(true)
    }

    /// Sums kinetic, potential (referenced to the world floor), and
    /// rotational energy over all live bodies. Diagnostic only.
    pub fn get_total_energy(&self) -> f64 {
        let mut total = 0.0;
        for body in &self.bodies {
            if body.is_dead() {
                continue;
            }
            total += 0.5 * body.mass * body.velocity.length_squared();
            total += body.mass * self.gravity.dot(&(self.lower - body.position));
            let angular_momentum = body.inertia.component_mul(&body.angular_velocity);
            total += angular_momentum.dot(&body.angular_velocity);
        }
        total
    }

    /// Copies the tree's pair list into the engine buffer, translating
    /// tree-local keys back to engine indices when the build was sorted
    fn collect_pairs(&mut self, mapped: bool) {
        self.pair_buf.clear();
        let pairs = self.tree.collisions();
        self.pair_buf.extend_from_slice(pairs);
        if mapped {
            let map = self.tree.index_map();
            for pair in &mut self.pair_buf {
                pair.0 = map[pair.0 as usize];
                pair.1 = map[pair.1 as usize];
            }
        }
    }

    fn resolve_pairs(&mut self) {
        for k in 0..self.pair_buf.len() {
            let (a, b) = self.pair_buf[k];
            let (a, b) = (a as usize, b as usize);
            if self.bodies[a].is_dead() || self.bodies[b].is_dead() {
                continue;
            }
            let contact = match resolve(&self.shapes[a], &self.shapes[b], self.contact_tolerance) {
                Some(contact) => contact,
                None => continue,
            };

            // Both directions get their own callback before energy resolution
            if let Some(callback) = self.callbacks[a].as_mut() {
                let (body_a, body_b) = split_pair(&mut self.bodies, a, b);
                callback(body_a, body_b);
            }
            if let Some(callback) = self.callbacks[b].as_mut() {
                let (body_b, body_a) = split_pair(&mut self.bodies, b, a);
                callback(body_b, body_a);
            }

            let (body_a, body_b) = split_pair(&mut self.bodies, a, b);
            exchange_impulse(body_a, body_b, &contact, self.elasticity, self.contact_tolerance);

            // Positional correction split by inverse-mass share; an
            // immovable body never moves
            if let Some((share_a, share_b)) = correction_shares(body_a.inv_mass, body_b.inv_mass) {
                body_a.position = body_a.position - contact.offset * share_a;
                body_b.position = body_b.position + contact.offset * share_b;
            }
        }
    }

    fn integrate(&mut self, dt: f64, damping: f64) {
        for i in 0..self.bodies.len() {
            if self.bodies[i].is_dead() {
                continue;
            }
            let lower = self.lower;
            let upper = self.upper;
            let gravity = self.gravity;

            let body = &mut self.bodies[i];
            let velocity = rk4(body.velocity, dt, |v| body.linear_acceleration(v, damping));
            let angular = rk4(body.angular_velocity, dt, |w| body.angular_acceleration(w, damping));
            body.update_position(velocity, dt, lower, upper);
            body.update_rotation(angular, dt);
            body.clear_force(gravity);
            body.clear_torque();

            let position = body.position;
            let rotation = body.rotation;
            self.shapes[i].set_position(position);
            self.shapes[i].rotate(&rotation);
        }
    }
}

/// Disjoint mutable borrows of two distinct slots
fn split_pair<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
