use crate::math::{SpatialVector, Vec3};

/// Quaternion representation for 3D rotations to avoid gimbal lock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::identity()
    }
}

impl Quaternion {
    /// Creates a new identity quaternion (no rotation)
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Creates a quaternion from axis-angle representation.
    /// A degenerate axis produces the identity rotation.
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let magnitude = axis.length();
        if magnitude < 1e-10 {
            return Quaternion::identity();
        }

        let half_angle = angle / 2.0;
        let sin_half = half_angle.sin();
        let n = axis * (1.0 / magnitude);

        Quaternion {
            w: half_angle.cos(),
            x: n.x * sin_half,
            y: n.y * sin_half,
            z: n.z * sin_half,
        }
    }

    /// Returns the length/magnitude of the quaternion
    pub fn magnitude(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Returns a normalized version of the quaternion
    pub fn normalized(&self) -> Self {
        let mag = self.magnitude();
        if mag < 1e-10 {
            return Quaternion::identity();
        }
        Quaternion {
            w: self.w / mag,
            x: self.x / mag,
            y: self.y / mag,
            z: self.z / mag,
        }
    }

    /// Multiplies two quaternions (composition of rotations)
    pub fn multiply(&self, other: &Quaternion) -> Quaternion {
        Quaternion {
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            x: self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            y: self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            z: self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        }
    }

    /// Returns the conjugate of the quaternion
    pub fn conjugate(&self) -> Quaternion {
        Quaternion {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Returns the inverse of the quaternion
    pub fn inverse(&self) -> Quaternion {
        let mag_squared = self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z;
        if mag_squared < 1e-10 {
            return Quaternion::identity();
        }

        let conj = self.conjugate();
        Quaternion {
            w: conj.w / mag_squared,
            x: conj.x / mag_squared,
            y: conj.y / mag_squared,
            z: conj.z / mag_squared,
        }
    }

    /// Rotates a vector by this quaternion (world-space rotation: q * v * q^-1)
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        let p = Quaternion { w: 0.0, x: v.x, y: v.y, z: v.z };

        let q_normalized = self.normalized();
        let q_inv = q_normalized.inverse();
        let rotated = q_normalized.multiply(&p).multiply(&q_inv);

        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Rotates a vector by the inverse of this quaternion (world to body space)
    pub fn rotate_inv(&self, v: Vec3) -> Vec3 {
        self.inverse().rotate(v)
    }
}
