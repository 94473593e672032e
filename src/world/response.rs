use crate::bodies::{LinearBody, RigidBody};
use crate::math::{SpatialVector, Vec3};
use crate::shapes::Contact;

/// Classic fourth-order Runge-Kutta step for `dv/dt = accel(v)`, with the
/// force accumulator held constant across the step.
///
/// # Arguments
/// * `v` - The velocity at the start of the step.
/// * `dt` - The step duration.
/// * `accel` - The acceleration as a function of velocity.
///
/// # Returns
/// The velocity at the end of the step.
///
/// # Example
/// ```
/// use rs_dynamics::math::{SpatialVector, Vec3};
/// use rs_dynamics::world::rk4;
///
/// // Constant acceleration integrates exactly
/// let v = rk4(Vec3::zero(), 0.5, |_| Vec3::new(0.0, -10.0, 0.0));
/// assert!((v.y + 5.0).abs() < 1e-12);
/// ```
pub fn rk4<V, F>(v: V, dt: f64, accel: F) -> V
where
    V: SpatialVector,
    F: Fn(V) -> V,
{
    let k1 = accel(v);
    let k2 = accel(v + k1 * (dt / 2.0));
    let k3 = accel(v + k2 * (dt / 2.0));
    let k4 = accel(v + k3 * dt);
    v + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

/// Splits a penetration-resolving offset between two bodies in proportion
/// to their inverse masses. Returns `None` when both bodies are immovable
/// (zero total inverse mass), in which case no correction applies.
pub fn correction_shares(inv_mass_a: f64, inv_mass_b: f64) -> Option<(f64, f64)> {
    let total = inv_mass_a + inv_mass_b;
    if total < 1e-12 {
        return None;
    }
    Some((inv_mass_a / total, inv_mass_b / total))
}

/// Exchanges an impulse between two rigid bodies at a contact.
///
/// The impulse magnitude is
/// `j = -(1+e) * (relVel·n) / (invM_a + invM_b + angular terms)`, where each
/// body's angular term is `(r × n)` rotated into body space, scaled by the
/// inverse inertia, dotted with itself. Bodies that are separating, or whose
/// relative normal speed is within `tolerance`, are left untouched; so is a
/// pair with zero total denominator.
pub(crate) fn exchange_impulse(
    a: &mut RigidBody,
    b: &mut RigidBody,
    contact: &Contact<Vec3>,
    elasticity: f64,
    tolerance: f64,
) {
    let n = contact.normal;
    let ra = contact.point - a.position;
    let rb = contact.point - b.position;

    let va = a.velocity + a.angular_velocity.cross(&ra);
    let vb = b.velocity + b.angular_velocity.cross(&rb);
    let approach = (vb - va).dot(&n);
    if approach >= -tolerance {
        return;
    }

    let ta = a.rotation.rotate_inv(ra.cross(&n)).component_mul(&a.inv_inertia);
    let tb = b.rotation.rotate_inv(rb.cross(&n)).component_mul(&b.inv_inertia);
    let denominator = a.inv_mass + b.inv_mass + ta.dot(&ta) + tb.dot(&tb);
    if denominator < 1e-12 {
        return;
    }

    let j = -(1.0 + elasticity) * approach / denominator;
    let impulse = n * j;

    a.velocity = a.velocity - impulse * a.inv_mass;
    b.velocity = b.velocity + impulse * b.inv_mass;

    a.angular_velocity += a
        .rotation
        .rotate_inv(ra.cross(&(-impulse)))
        .component_mul(&a.inv_inertia);
    b.angular_velocity += b
        .rotation
        .rotate_inv(rb.cross(&impulse))
        .component_mul(&b.inv_inertia);
}

/// Exchanges an impulse between a rigid body and an immovable, body-less
/// shape (the static side contributes no inverse mass and no velocity).
pub(crate) fn exchange_impulse_static(
    body: &mut RigidBody,
    contact: &Contact<Vec3>,
    elasticity: f64,
    tolerance: f64,
) {
    let n = contact.normal;
    let r = contact.point - body.position;

    let at_point = body.velocity + body.angular_velocity.cross(&r);
    let approach = (-at_point).dot(&n);
    if approach >= -tolerance {
        return;
    }

    let t = body.rotation.rotate_inv(r.cross(&n)).component_mul(&body.inv_inertia);
    let denominator = body.inv_mass + t.dot(&t);
    if denominator < 1e-12 {
        return;
    }

    let j = -(1.0 + elasticity) * approach / denominator;
    let impulse = n * j;

    body.velocity = body.velocity - impulse * body.inv_mass;
    body.angular_velocity += body
        .rotation
        .rotate_inv(r.cross(&(-impulse)))
        .component_mul(&body.inv_inertia);
}

/// Impulse exchange between two torque-free bodies: the rigid formula with
/// the angular terms absent.
pub(crate) fn exchange_linear_impulse<V: SpatialVector>(
    a: &mut LinearBody<V>,
    b: &mut LinearBody<V>,
    normal: V,
    elasticity: f64,
    tolerance: f64,
) {
    let approach = (b.velocity - a.velocity).dot(&normal);
    if approach >= -tolerance {
        return;
    }
    let denominator = a.inv_mass + b.inv_mass;
    if denominator < 1e-12 {
        return;
    }
    let j = -(1.0 + elasticity) * approach / denominator;
    let impulse = normal * j;
    a.velocity = a.velocity - impulse * a.inv_mass;
    b.velocity = b.velocity + impulse * b.inv_mass;
}

/// Torque-free impulse against an immovable, body-less shape.
pub(crate) fn exchange_linear_impulse_static<V: SpatialVector>(
    body: &mut LinearBody<V>,
    normal: V,
    elasticity: f64,
    tolerance: f64,
) {
    let approach = (-body.velocity).dot(&normal);
    if approach >= -tolerance {
        return;
    }
    if body.inv_mass < 1e-12 {
        return;
    }
    let j = -(1.0 + elasticity) * approach / body.inv_mass;
    body.velocity = body.velocity - normal * (j * body.inv_mass);
}
