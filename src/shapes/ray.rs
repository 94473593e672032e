use crate::math::SpatialVector;

/// A ray with an origin and a unit-length direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray<V: SpatialVector> {
    pub origin: V,
    pub direction: V,
}

impl<V: SpatialVector> Ray<V> {
    /// Creates a new ray; the direction is normalized on construction.
    pub fn new(origin: V, direction: V) -> Self {
        Self {
            origin,
            direction: direction.normalized(),
        }
    }

    /// Checks whether the ray hits a sphere (at or ahead of the origin)
    pub fn hits_sphere(&self, center: V, radius: f64) -> bool {
        let oc = center - self.origin;
        let b = oc.dot(&self.direction);
        let c = oc.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return false;
        }
        // The far root is non-negative whenever any part of the sphere
        // lies ahead of the origin (covers an origin inside the sphere)
        b + discriminant.sqrt() >= 0.0
    }

    /// Checks whether the ray hits an axis-aligned box (slab method)
    pub fn hits_box(&self, min: V, max: V) -> bool {
        self.box_entry(min, max).is_some()
    }

    /// Returns the parameter at which the ray enters an axis-aligned box,
    /// or `None` if the ray misses it. An origin inside the box enters at 0.
    pub fn box_entry(&self, min: V, max: V) -> Option<f64> {
        let mut t_near = f64::NEG_INFINITY;
        let mut t_far = f64::INFINITY;

        for axis in 0..V::DIM {
            let o = self.origin.component(axis);
            let d = self.direction.component(axis);
            let lo = min.component(axis);
            let hi = max.component(axis);

            if d.abs() < 1e-12 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let mut t1 = (lo - o) * inv;
            let mut t2 = (hi - o) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_near = t_near.max(t1);
            t_far = t_far.min(t2);
            if t_near > t_far {
                return None;
            }
        }

        if t_far < 0.0 {
            return None;
        }
        Some(t_near.max(0.0))
    }

    /// Returns the point at parameter `t` along the ray
    pub fn at(&self, t: f64) -> V {
        self.origin + self.direction * t
    }
}
