use crate::errors::DynamicsError;
use crate::math::SpatialVector;

/// Per-object dynamical state for the torque-free engine variant.
///
/// Carries linear state only; bodies of this kind never rotate, which makes
/// the type usable in any dimension the vector layer supports.
#[derive(Debug)]
pub struct LinearBody<V: SpatialVector> {
    pub mass: f64,
    pub inv_mass: f64,
    pub position: V,
    pub velocity: V,
    /// Force accumulator for the current step; starts each step as pure
    /// gravity, never naturally zero
    pub force: V,
    /// Opaque user data
    pub tag: u64,
}

impl<V: SpatialVector> LinearBody<V> {
    /// Creates a new body at rest.
    ///
    /// # Errors
    /// Returns an error if the mass is not positive.
    pub fn new(position: V, mass: f64) -> Result<Self, DynamicsError> {
        if mass <= 0.0 {
            return Err(DynamicsError::InvalidMass);
        }
        Ok(Self {
            mass,
            inv_mass: 1.0 / mass,
            position,
            velocity: V::zero(),
            force: V::zero(),
            tag: 0,
        })
    }

    /// Locks the body against translation: mass and inverse mass are both
    /// held at zero from here on. There is no way to undo this.
    pub fn set_no_move(&mut self) {
        self.mass = 0.0;
        self.inv_mass = 0.0;
    }

    /// Accumulates a force for the current step
    pub fn add_force(&mut self, force: V) {
        self.force = self.force + force;
    }

    /// Resets the force accumulator to pure gravity for the next step
    pub fn clear_force(&mut self, gravity: V) {
        self.force = gravity * self.mass;
    }

    /// Linear acceleration under the accumulated force and a velocity
    /// proportional damping term: `(force - v*damping) / mass`
    pub fn linear_acceleration(&self, velocity: V, damping: f64) -> V {
        (self.force - velocity * damping) * self.inv_mass
    }

    /// Stores the integrated velocity and advances the position by
    /// `velocity * dt`, clamping into `[lower, upper]` and canceling the
    /// outward velocity component on any clamped axis.
    pub fn update_position(&mut self, velocity: V, dt: f64, lower: V, upper: V) {
        self.velocity = velocity;
        self.position = self.position + velocity * dt;
        for axis in 0..V::DIM {
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
}
