// src/world/linear_world.rs

use crate::bodies::LinearBody;
use crate::errors::DynamicsError;
use crate::math::SpatialVector;
use crate::shapes::{resolve, Bounds};
use crate::tree::{SpatialTree, EDGE_TOLERANCE};
use crate::world::response::{
    correction_shares, exchange_linear_impulse, exchange_linear_impulse_static,
};
use crate::world::rk4;

/// Game-level reaction hook for the torque-free engine
pub type LinearCollisionCallback<V> = Box<dyn FnMut(&mut LinearBody<V>, &mut LinearBody<V>)>;

/// Torque-free rigid-body simulation over a fixed world cell.
///
/// The linear-only counterpart of [`PhysicsWorld`](crate::world::PhysicsWorld):
/// the same broad phase, pair resolution, and RK4 integration, but bodies
/// carry no angular state, which makes the engine usable in any dimension
/// the vector layer supports. There is no soft-delete lifecycle here;
/// bodies live as long as the world.
pub struct LinearWorld<V: SpatialVector> {
    tree: SpatialTree<V>,
    shapes: Vec<Bounds<V>>,
    bodies: Vec<LinearBody<V>>,
    callbacks: Vec<Option<LinearCollisionCallback<V>>>,
    gravity: V,
    elasticity: f64,
    contact_tolerance: f64,
    lower: V,
    upper: V,
    pair_buf: Vec<(u32, u32)>,
}

impl<V: SpatialVector> LinearWorld<V> {
    /// Creates a world over the cell `[cell_min, cell_max]` with the given
    /// gravity.
    pub fn new(cell_min: V, cell_max: V, gravity: V) -> Self {
        Self {
            tree: SpatialTree::new(cell_min, cell_max),
            shapes: Vec::new(),
            bodies: Vec::new(),
            callbacks: Vec::new(),
            gravity,
            elasticity: 0.5,
            contact_tolerance: 1e-6,
            lower: cell_min + V::splat(EDGE_TOLERANCE),
            upper: cell_max - V::splat(EDGE_TOLERANCE),
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

    /// Adds a body wrapped in `shape`; its center becomes the body position.
    ///
    /// # Errors
    /// Returns an error if the mass is not positive.
    pub fn add_body(
        &mut self,
        shape: Bounds<V>,
        mass: f64,
        tag: Option<u64>,
    ) -> Result<usize, DynamicsError> {
        let mut body = LinearBody::new(shape.center(), mass)?;
        body.tag = tag.unwrap_or(0);
        body.clear_force(self.gravity);
        self.shapes.push(shape);
        self.bodies.push(body);
        self.callbacks.push(None);
        Ok(self.bodies.len() - 1)
    }

    /// Registers a collision callback for the body at `index`
    ///
    /// # Errors
    /// Returns an error if `index` is out of range.
    pub fn register_callback(
        &mut self,
        index: usize,
        callback: LinearCollisionCallback<V>,
    ) -> Result<(), DynamicsError> {
        if index >= self.bodies.len() {
            return Err(DynamicsError::BodyNotFound);
        }
        self.callbacks[index] = Some(callback);
        Ok(())
    }

    pub fn get_body(&self, index: usize) -> Option<&LinearBody<V>> {
        self.bodies.get(index)
    }

    pub fn get_body_mut(&mut self, index: usize) -> Option<&mut LinearBody<V>> {
        self.bodies.get_mut(index)
    }

    pub fn get_bodies(&self) -> &[LinearBody<V>] {
        &self.bodies
    }

    pub fn get_shape(&self, index: usize) -> Option<&Bounds<V>> {
        self.shapes.get(index)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Advances the whole simulation by `dt`: broad phase, pair resolution,
    /// RK4 integration, and shape re-sync.
    ///
    /// # Errors
    /// Returns an error only if the body count exceeds the tree's key
    /// capacity.
    pub fn solve(&mut self, dt: f64, damping: f64) -> Result<(), DynamicsError> {
        self.tree.insert(&self.shapes)?;
        self.collect_pairs(true);
        self.resolve_pairs();
        self.integrate(dt, damping);
        Ok(())
    }

    /// Like [`solve`](Self::solve) but without the tree's sort/permutation
    /// step.
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

    /// Pure integration: no broad phase, no collisions
    pub fn solve_no_collide(&mut self, dt: f64, damping: f64) {
        self.integrate(dt, damping);
    }

    /// One-off resolution of a body against an immovable, body-less shape.
    ///
    /// # Returns
    /// Whether a contact was found and resolved.
    ///
    /// # Errors
    /// Returns an error if `index` is out of range.
    pub fn collide(&mut self, index: usize, static_shape: &Bounds<V>) -> Result<bool, DynamicsError> {
        if index >= self.bodies.len() {
            return Err(DynamicsError::BodyNotFound);
        }
        let contact = match resolve(&self.shapes[index], static_shape, self.contact_tolerance) {
            Some(contact) => contact,
            None => return Ok(false),
        };
        let body = &mut self.bodies[index];
        exchange_linear_impulse_static(body, contact.normal, self.elasticity, self.contact_tolerance);
        if body.inv_mass > 0.0 {
            body.position = body.position - contact.offset;
            let position = body.position;
            self.shapes[index].set_position(position);
        }
        Ok(true)
    }

    /// Sums kinetic and potential energy (referenced to the world floor)
    /// over all bodies. Diagnostic only.
    pub fn get_total_energy(&self) -> f64 {
        let mut total = 0.0;
        for body in &self.bodies {
            total += 0.5 * body.mass * body.velocity.length_squared();
            total += body.mass * self.gravity.dot(&(self.lower - body.position));
        }
        total
    }

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
            let contact = match resolve(&self.shapes[a], &self.shapes[b], self.contact_tolerance) {
                Some(contact) => contact,
                None => continue,
            };

            if let Some(callback) = self.callbacks[a].as_mut() {
                let (body_a, body_b) = split_pair(&mut self.bodies, a, b);
                callback(body_a, body_b);
            }
            if let Some(callback) = self.callbacks[b].as_mut() {
                let (body_b, body_a) = split_pair(&mut self.bodies, b, a);
                callback(body_b, body_a);
            }

            let (body_a, body_b) = split_pair(&mut self.bodies, a, b);
            exchange_linear_impulse(
                body_a,
                body_b,
                contact.normal,
                self.elasticity,
                self.contact_tolerance,
            );

            if let Some((share_a, share_b)) = correction_shares(body_a.inv_mass, body_b.inv_mass) {
                body_a.position = body_a.position - contact.offset * share_a;
                body_b.position = body_b.position + contact.offset * share_b;
            }
        }
    }

    fn integrate(&mut self, dt: f64, damping: f64) {
        for i in 0..self.bodies.len() {
            let lower = self.lower;
            let upper = self.upper;
            let gravity = self.gravity;

            let body = &mut self.bodies[i];
            let velocity = rk4(body.velocity, dt, |v| body.linear_acceleration(v, damping));
            body.update_position(velocity, dt, lower, upper);
            body.clear_force(gravity);

            let position = body.position;
            self.shapes[i].set_position(position);
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
