use crate::math::{Quaternion, SpatialVector, Vec3};
use crate::shapes::Ray;

/// Bounding volumes understood by the spatial tree and the physics engines.
///
/// Cuboids keep their intrinsic half-extents (`half`) separate from their
/// current world half-extents (`extent`); rotating a cuboid re-derives
/// `extent` from `half`, so repeated rotation never inflates the volume.
#[derive(Debug, Clone, PartialEq)]
pub enum Bounds<V: SpatialVector> {
    /// Sphere with a world-space center and a radius
    Sphere { center: V, radius: f64 },
    /// Axis-aligned cuboid with a world-space center, intrinsic half-extents,
    /// and current (possibly rotation-inflated) world half-extents
    Cuboid { center: V, half: V, extent: V },
}

/// Exact contact information produced by [`resolve`].
///
/// `normal` points from the first shape toward the second, `point` is the
/// representative contact location, and `offset` is the translation along the
/// normal that separates the shapes (`normal * penetration`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact<V: SpatialVector> {
    pub normal: V,
    pub point: V,
    pub offset: V,
}

impl<V: SpatialVector> Bounds<V> {
    /// Creates a new sphere with the given center and radius
    pub fn sphere(center: V, radius: f64) -> Self {
        Bounds::Sphere { center, radius }
    }

    /// Creates a new axis-aligned cuboid with the given center and half-extents
    pub fn cuboid(center: V, half: V) -> Self {
        Bounds::Cuboid { center, half, extent: half }
    }

    /// Returns the world-space center of the volume
    pub fn center(&self) -> V {
        match self {
            Bounds::Sphere { center, .. } => *center,
            Bounds::Cuboid { center, .. } => *center,
        }
    }

    /// Returns the minimum corner of the volume's world AABB
    pub fn min_extent(&self) -> V {
        match self {
            Bounds::Sphere { center, radius } => *center - V::splat(*radius),
            Bounds::Cuboid { center, extent, .. } => *center - *extent,
        }
    }

    /// Returns the maximum corner of the volume's world AABB
    pub fn max_extent(&self) -> V {
        match self {
            Bounds::Sphere { center, radius } => *center + V::splat(*radius),
            Bounds::Cuboid { center, extent, .. } => *center + *extent,
        }
    }

    /// Returns the squared diagonal of the world AABB.
    /// The spatial tree uses this as its cell-sizing metric.
    pub fn square_size(&self) -> f64 {
        (self.max_extent() - self.min_extent()).length_squared()
    }

    /// Moves the volume so its center sits at `position`
    pub fn set_position(&mut self, position: V) {
        match self {
            Bounds::Sphere { center, .. } => *center = position,
            Bounds::Cuboid { center, .. } => *center = position,
        }
    }

    /// Checks whether two volumes geometrically intersect
    pub fn intersects(&self, other: &Bounds<V>) -> bool {
        match (self, other) {
            (Bounds::Sphere { center: ca, radius: ra }, Bounds::Sphere { center: cb, radius: rb }) => {
                let d = *cb - *ca;
                d.length_squared() <= (ra + rb) * (ra + rb)
            }
            (Bounds::Cuboid { .. }, Bounds::Cuboid { .. }) => {
                // Axis-aligned overlap test on every axis
                let (min_a, max_a) = (self.min_extent(), self.max_extent());
                let (min_b, max_b) = (other.min_extent(), other.max_extent());
                for axis in 0..V::DIM {
                    if min_a.component(axis) > max_b.component(axis)
                        || min_b.component(axis) > max_a.component(axis)
                    {
                        return false;
                    }
                }
                true
            }
            (Bounds::Sphere { center, radius }, Bounds::Cuboid { .. }) => {
                sphere_touches_box(*center, *radius, other)
            }
            (Bounds::Cuboid { .. }, Bounds::Sphere { center, radius }) => {
                sphere_touches_box(*center, *radius, self)
            }
        }
    }

    /// Checks whether a ray pierces the volume
    pub fn intersects_ray(&self, ray: &Ray<V>) -> bool {
        match self {
            Bounds::Sphere { center, radius } => ray.hits_sphere(*center, *radius),
            Bounds::Cuboid { .. } => ray.hits_box(self.min_extent(), self.max_extent()),
        }
    }
}

impl Bounds<Vec3> {
    /// Returns the diagonal moment of inertia tensor for a solid volume of
    /// the given mass
    pub fn moment_of_inertia(&self, mass: f64) -> Vec3 {
        match self {
            Bounds::Sphere { radius, .. } => {
                // For a solid sphere, moment of inertia is (2/5) * m * r²
                let i = (2.0 / 5.0) * mass * radius * radius;
                Vec3::new(i, i, i)
            }
            Bounds::Cuboid { half, .. } => {
                // For a cuboid:
                // Ixx = (1/12) * m * (h² + d²)
                // Iyy = (1/12) * m * (w² + d²)
                // Izz = (1/12) * m * (w² + h²)
                let w = 2.0 * half.x;
                let h = 2.0 * half.y;
                let d = 2.0 * half.z;
                Vec3::new(
                    (1.0 / 12.0) * mass * (h * h + d * d),
                    (1.0 / 12.0) * mass * (w * w + d * d),
                    (1.0 / 12.0) * mass * (w * w + h * h),
                )
            }
        }
    }

    /// Re-derives the world half-extents of a cuboid from its intrinsic
    /// half-extents under an absolute rotation. Spheres are unaffected.
    pub fn rotate(&mut self, rotation: &Quaternion) {
        if let Bounds::Cuboid { half, extent, .. } = self {
            let ex = rotation.rotate(Vec3::new(half.x, 0.0, 0.0));
            let ey = rotation.rotate(Vec3::new(0.0, half.y, 0.0));
            let ez = rotation.rotate(Vec3::new(0.0, 0.0, half.z));
            *extent = Vec3::new(
                ex.x.abs() + ey.x.abs() + ez.x.abs(),
                ex.y.abs() + ey.y.abs() + ez.y.abs(),
                ex.z.abs() + ey.z.abs() + ez.z.abs(),
            );
        }
    }
}

/// Closest-point test between a sphere and a box
fn sphere_touches_box<V: SpatialVector>(center: V, radius: f64, cuboid: &Bounds<V>) -> bool {
    let closest = center.clamp(&cuboid.min_extent(), &cuboid.max_extent());
    (closest - center).length_squared() <= radius * radius
}

/// Computes the exact contact between two intersecting volumes.
///
/// Returns `None` when the volumes do not intersect or the penetration is
/// within `tolerance`. The normal points from `a` toward `b`; coincident
/// centers fall back to the first world axis rather than failing.
///
/// # Arguments
/// * `a` - The first volume.
/// * `b` - The second volume.
/// * `tolerance` - The minimum penetration depth worth resolving.
pub fn resolve<V: SpatialVector>(a: &Bounds<V>, b: &Bounds<V>, tolerance: f64) -> Option<Contact<V>> {
    match (a, b) {
        (Bounds::Sphere { center: ca, radius: ra }, Bounds::Sphere { center: cb, radius: rb }) => {
            let d = *cb - *ca;
            let dist_sq = d.length_squared();
            if dist_sq > (ra + rb) * (ra + rb) {
                return None;
            }
            let dist = dist_sq.sqrt();
            let normal = if dist < 1e-10 { axis_unit::<V>(0) } else { d * (1.0 / dist) };
            let penetration = ra + rb - dist;
            if penetration <= tolerance {
                return None;
            }
            Some(Contact {
                normal,
                point: *ca + normal * (ra - penetration / 2.0),
                offset: normal * penetration,
            })
        }
        (Bounds::Cuboid { .. }, Bounds::Cuboid { .. }) => resolve_box_box(a, b, tolerance),
        (Bounds::Sphere { center, radius }, Bounds::Cuboid { .. }) => {
            resolve_sphere_box(*center, *radius, b, tolerance)
        }
        (Bounds::Cuboid { .. }, Bounds::Sphere { center, radius }) => {
            // Flip the sphere-vs-box contact so the normal still points a -> b
            let contact = resolve_sphere_box(*center, *radius, a, tolerance)?;
            Some(Contact {
                normal: -contact.normal,
                point: contact.point,
                offset: -contact.offset,
            })
        }
    }
}

/// Minimum-penetration-axis contact between two axis-aligned boxes
fn resolve_box_box<V: SpatialVector>(a: &Bounds<V>, b: &Bounds<V>, tolerance: f64) -> Option<Contact<V>> {
    let d = b.center() - a.center();
    let (min_a, max_a) = (a.min_extent(), a.max_extent());
    let (min_b, max_b) = (b.min_extent(), b.max_extent());

    let mut best_axis = 0;
    let mut best_overlap = f64::MAX;
    for axis in 0..V::DIM {
        let half_a = (max_a.component(axis) - min_a.component(axis)) / 2.0;
        let half_b = (max_b.component(axis) - min_b.component(axis)) / 2.0;
        let overlap = half_a + half_b - d.component(axis).abs();
        if overlap <= 0.0 {
            return None;
        }
        if overlap < best_overlap {
            best_overlap = overlap;
            best_axis = axis;
        }
    }
    if best_overlap <= tolerance {
        return None;
    }

    let sign = if d.component(best_axis) >= 0.0 { 1.0 } else { -1.0 };
    let normal = axis_unit::<V>(best_axis) * sign;

    // Representative contact point: the midpoint of the overlap region
    let overlap_min = min_a.max(&min_b);
    let overlap_max = max_a.min(&max_b);
    let point = overlap_min.lerp(&overlap_max, 0.5);

    Some(Contact {
        normal,
        point,
        offset: normal * best_overlap,
    })
}

/// Closest-point contact between a sphere (first) and a box (second)
fn resolve_sphere_box<V: SpatialVector>(
    center: V,
    radius: f64,
    cuboid: &Bounds<V>,
    tolerance: f64,
) -> Option<Contact<V>> {
    let min_b = cuboid.min_extent();
    let max_b = cuboid.max_extent();
    let closest = center.clamp(&min_b, &max_b);
    let delta = closest - center;
    let dist_sq = delta.length_squared();
    if dist_sq > radius * radius {
        return None;
    }

    if dist_sq > 1e-20 {
        // Sphere center outside the box: push along the closest-point direction
        let dist = dist_sq.sqrt();
        let penetration = radius - dist;
        if penetration <= tolerance {
            return None;
        }
        let normal = delta * (1.0 / dist);
        return Some(Contact {
            normal,
            point: closest,
            offset: normal * penetration,
        });
    }

    // Sphere center inside the box: push out through the nearest face
    let box_center = cuboid.center();
    let mut best_axis = 0;
    let mut best_depth = f64::MAX;
    for axis in 0..V::DIM {
        let to_min = center.component(axis) - min_b.component(axis);
        let to_max = max_b.component(axis) - center.component(axis);
        let depth = to_min.min(to_max);
        if depth < best_depth {
            best_depth = depth;
            best_axis = axis;
        }
    }
    let toward_box = box_center.component(best_axis) - center.component(best_axis);
    let sign = if toward_box >= 0.0 { 1.0 } else { -1.0 };
    let normal = axis_unit::<V>(best_axis) * sign;
    let penetration = best_depth + radius;
    if penetration <= tolerance {
        return None;
    }
    Some(Contact {
        normal,
        point: center,
        offset: normal * penetration,
    })
}

fn axis_unit<V: SpatialVector>(axis: usize) -> V {
    let mut unit = V::zero();
    unit.set_component(axis, 1.0);
    unit
}
