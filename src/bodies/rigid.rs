// src/bodies/rigid.rs

use crate::errors::DynamicsError;
use crate::math::{Quaternion, SpatialVector, Vec3};

/// Per-object dynamical state for the torque-carrying engine variant.
///
/// Mass and inertia are stored alongside their inverses; a zero inverse
/// encodes "infinite" (the body cannot be translated or rotated by forces,
/// impulses, or corrections). The torque accumulator is kept in body space.
#[derive(Debug)]
pub struct RigidBody {
    pub mass: f64,
    pub inv_mass: f64,
    /// Diagonal inertia tensor in body space
    pub inertia: Vec3,
    pub inv_inertia: Vec3,
    /// Center of mass in world space
    pub position: Vec3,
    pub rotation: Quaternion,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Force accumulator for the current step; starts each step as pure
    /// gravity, never naturally zero
    pub force: Vec3,
    /// Torque accumulator for the current step, in body space
    pub torque: Vec3,
    /// Opaque user data
    pub tag: u64,
    dead: bool,
}

impl RigidBody {
    /// Creates a new body at rest.
    ///
    /// # Arguments
    /// * `position` - The initial center of mass in world space.
    /// * `mass` - The mass of the body in kilograms.
    /// * `inertia` - The diagonal inertia tensor in body space.
    ///
    /// # Errors
    /// Returns an error if the mass is not positive or any inertia
    /// component is not positive.
    pub fn new(position: Vec3, mass: f64, inertia: Vec3) -> Result<Self, DynamicsError> {
        if mass <= 0.0 {
            return Err(DynamicsError::InvalidMass);
        }
        if inertia.x <= 0.0 || inertia.y <= 0.0 || inertia.z <= 0.0 {
            return Err(DynamicsError::InvalidMass);
        }
        Ok(Self {
            mass,
            inv_mass: 1.0 / mass,
            inertia,
            inv_inertia: Vec3::new(1.0 / inertia.x, 1.0 / inertia.y, 1.0 / inertia.z),
            position,
            rotation: Quaternion::identity(),
            velocity: Vec3::zero(),
            angular_velocity: Vec3::zero(),
            force: Vec3::zero(),
            torque: Vec3::zero(),
            tag: 0,
            dead: false,
        })
    }

    /// Locks the body against translation: mass and inverse mass are both
    /// held at zero from here on. There is no way to undo this.
    pub fn set_no_move(&mut self) {
        self.mass = 0.0;
        self.inv_mass = 0.0;
    }

    /// Locks the body against rotation from torque or collision response:
    /// inertia and inverse inertia are both held at zero. Irreversible.
    pub fn set_no_rotate(&mut self) {
        self.inertia = Vec3::zero();
        self.inv_inertia = Vec3::zero();
    }

    /// Accumulates a world-space force for the current step
    pub fn add_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Accumulates a world-space torque, rotated into body space through
    /// the current orientation
    pub fn add_torque(&mut self, torque: Vec3) {
        self.torque += self.rotation.rotate_inv(torque);
    }

    /// Accumulates a torque given directly in body space
    pub fn add_torque_local(&mut self, torque: Vec3) {
        self.torque += torque;
    }

    /// Resets the force accumulator to pure gravity for the next step
    pub fn clear_force(&mut self, gravity: Vec3) {
        self.force = gravity * self.mass;
    }

    /// Resets the torque accumulator
    pub fn clear_torque(&mut self) {
        self.torque = Vec3::zero();
    }

    /// Linear acceleration under the accumulated force and a velocity
    /// proportional damping term: `(force - v*damping) / mass`
    pub fn linear_acceleration(&self, velocity: Vec3, damping: f64) -> Vec3 {
        (self.force - velocity * damping) * self.inv_mass
    }

    /// Angular acceleration under the accumulated torque, componentwise
    /// against the diagonal inertia: `(torque - w*damping) / inertia`
    pub fn angular_acceleration(&self, angular_velocity: Vec3, damping: f64) -> Vec3 {
        (self.torque - angular_velocity * damping).component_mul(&self.inv_inertia)
    }

    /// Stores the integrated velocity and advances the position by
    /// `velocity * dt`, clamping the result into `[lower, upper]`.
    ///
    /// On a clamped axis the velocity component still pointing out of the
    /// world is canceled, not reflected, so bodies come to rest against
    /// the wall instead of jittering.
    pub fn update_position(&mut self, velocity: Vec3, dt: f64, lower: Vec3, upper: Vec3) {
        self.velocity = velocity;
        self.position += velocity * dt;
        for axis in 0..3 {
            let p = self.position.component(axis);
            let lo = lower.component(axis);
            let hi = upper.component(axis);
            if p < lo {
                self.position.set_component(axis, lo);
                if self.velocity.component(axis) < 0.0 {
                    self.velocity.set_component(axis, 0.0);
                }
            } else if p > hi {
                self.position.set_component(axis, hi);
                if self.velocity.component(axis) > 0.0 {
                    self.velocity.set_component(axis, 0.0);
                }
            }
        }
    }

    /// Stores the integrated angular velocity and advances the orientation
    /// by the rotation `angular_velocity * dt` encodes (axis = direction,
    /// angle = magnitude), renormalizing to counter numerical drift.
    pub fn update_rotation(&mut self, angular_velocity: Vec3, dt: f64) {
        self.angular_velocity = angular_velocity;
        let speed = angular_velocity.length();
        if speed < 1e-12 {
            return;
        }
        let increment = Quaternion::from_axis_angle(angular_velocity, speed * dt);
        self.rotation = increment.multiply(&self.rotation).normalized();
    }

    /// Marks the body as dead so the engine can recycle its slot
    pub fn kill(&mut self) {
        self.dead = true;
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }
}
