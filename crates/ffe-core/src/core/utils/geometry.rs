use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};

/// Squared norm below which a cross product is treated as zero.
const DEGENERATE_EPSILON: f64 = 1e-20;

/// Placement of a system in the world frame, as reported by the renderer.
///
/// `scale` is the viewer's zoom applied to the system. It is kept so the
/// renderer can round-trip the full transform, but measurements ignore it
/// (see [`RigidTransform::to_isometry`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub scale: f64,
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn new(scale: f64, rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            scale,
            rotation,
            translation,
        }
    }

    /// Builds a transform from an axis and an angle in degrees.
    pub fn from_axis_angle(
        scale: f64,
        axis: &Vector3<f64>,
        angle_degrees: f64,
        translation: Vector3<f64>,
    ) -> Self {
        let rotation = match Unit::try_new(*axis, f64::EPSILON) {
            Some(axis) => UnitQuaternion::from_axis_angle(&axis, angle_degrees.to_radians()),
            None => UnitQuaternion::identity(),
        };
        Self::new(scale, rotation, translation)
    }

    /// The same transform with the scale normalized to 1.
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.translation), self.rotation)
    }

    /// Maps a local point into the world frame with scale normalized to 1.
    pub fn apply_unscaled(&self, local: &Point3<f64>) -> Point3<f64> {
        self.to_isometry().transform_point(local)
    }

    /// Maps a local point into the world frame including the zoom scale.
    pub fn apply(&self, local: &Point3<f64>) -> Point3<f64> {
        self.rotation * (local * self.scale) + self.translation
    }
}

pub fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (a - b).norm()
}

/// Unsigned angle at `vertex` between the arms to `a` and `c`, in degrees.
///
/// Returns 0.0 when either arm has zero length.
pub fn bond_angle(a: &Point3<f64>, vertex: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let va = a - vertex;
    let vc = c - vertex;
    let denominator = va.norm() * vc.norm();
    if denominator == 0.0 {
        return 0.0;
    }
    (va.dot(&vc) / denominator).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Signed dihedral angle a-b-c-d about the b-c axis, in degrees (-180, 180].
///
/// Uses the IUPAC sign convention: looking along b→c, a clockwise rotation
/// taking a onto d is positive. Collinear input returns 0.0.
pub fn dihedral_angle(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
) -> f64 {
    let b1 = b - a;
    let b2 = c - b;
    let b3 = d - c;

    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    if n1.norm_squared() < DEGENERATE_EPSILON || n2.norm_squared() < DEGENERATE_EPSILON {
        return 0.0;
    }

    let y = b2.norm() * b1.dot(&n2);
    let x = n1.dot(&n2);
    y.atan2(x).to_degrees()
}
