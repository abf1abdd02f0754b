use glam::{DMat3, DVec3, EulerRot};
use strum::{Display, EnumString};

/// Unit that angles are written in by a source file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum AngleUnit {
    #[default]
    #[strum(to_string = "deg", serialize = "degrees")]
    Degrees,
    #[strum(to_string = "rad", serialize = "radians")]
    Radians,
}

impl AngleUnit {
    /// Normalize a value written in this unit to degrees.
    #[inline]
    pub fn to_degrees(self, value: f64) -> f64 {
        match self {
            AngleUnit::Degrees => value,
            AngleUnit::Radians => value.to_degrees(),
        }
    }

    /// [AngleUnit::to_degrees] for each component.
    #[inline]
    pub fn vec3_to_degrees(self, value: DVec3) -> DVec3 {
        DVec3::new(
            self.to_degrees(value.x),
            self.to_degrees(value.y),
            self.to_degrees(value.z),
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Component of a vector that holds this axis.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Order in which the three per-axis rotations of an Euler triple are applied.
///
/// For `Xyz` the rotation about X is applied first, giving `Rz * Ry * Rx`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RotationOrder {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

impl RotationOrder {
    pub fn axes(self) -> [Axis; 3] {
        use Axis::*;
        match self {
            RotationOrder::Xyz => [X, Y, Z],
            RotationOrder::Xzy => [X, Z, Y],
            RotationOrder::Yxz => [Y, X, Z],
            RotationOrder::Yzx => [Y, Z, X],
            RotationOrder::Zxy => [Z, X, Y],
            RotationOrder::Zyx => [Z, Y, X],
        }
    }

    /// Rotations about fixed axes, first axis applied first.
    fn euler_rot(self) -> EulerRot {
        match self {
            RotationOrder::Xyz => EulerRot::XYZEx,
            RotationOrder::Xzy => EulerRot::XZYEx,
            RotationOrder::Yxz => EulerRot::YXZEx,
            RotationOrder::Yzx => EulerRot::YZXEx,
            RotationOrder::Zxy => EulerRot::ZXYEx,
            RotationOrder::Zyx => EulerRot::ZYXEx,
        }
    }
}

/// Build a rotation matrix from per-axis angles in radians.
pub fn euler_to_matrix(radians: DVec3, order: RotationOrder) -> DMat3 {
    let [a, b, c] = order.axes().map(|axis| radians[axis.index()]);
    DMat3::from_euler(order.euler_rot(), a, b, c)
}

#[inline]
pub fn to_radians(degrees: DVec3) -> DVec3 {
    DVec3::new(
        degrees.x.to_radians(),
        degrees.y.to_radians(),
        degrees.z.to_radians(),
    )
}

/// World space state of a single joint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub rotation: DMat3,
    pub translation: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        rotation: DMat3::IDENTITY,
        translation: DVec3::ZERO,
    };

    pub fn new(rotation: DMat3, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create a new transform from a translation.
    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            rotation: DMat3::IDENTITY,
            translation,
        }
    }

    pub fn with_rotation(mut self, rotation: DMat3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Offset `length` units along `direction`, rotated into world space.
    #[inline]
    pub fn along(&self, direction: DVec3, length: f64) -> DVec3 {
        self.translation + length * (self.rotation * direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_v3(a: DVec3, b: DVec3) -> bool {
        a.abs_diff_eq(b, 1e-9)
    }

    #[test]
    fn parse_orders_and_units() {
        assert_eq!("XYZ".parse::<RotationOrder>(), Ok(RotationOrder::Xyz));
        assert_eq!("zyx".parse::<RotationOrder>(), Ok(RotationOrder::Zyx));
        assert!("XXY".parse::<RotationOrder>().is_err());
        assert_eq!(RotationOrder::Yzx.to_string(), "YZX");

        assert_eq!("deg".parse::<AngleUnit>(), Ok(AngleUnit::Degrees));
        assert_eq!("RAD".parse::<AngleUnit>(), Ok(AngleUnit::Radians));
        assert!((AngleUnit::Radians.to_degrees(std::f64::consts::PI) - 180.0).abs() < 1e-12);
    }

    #[test]
    fn xyz_applies_x_first() {
        let angles = DVec3::new(0.3, -0.7, 1.1);
        let expected = DMat3::from_rotation_z(angles.z)
            * DMat3::from_rotation_y(angles.y)
            * DMat3::from_rotation_x(angles.x);
        assert!(euler_to_matrix(angles, RotationOrder::Xyz).abs_diff_eq(expected, 1e-12));

        let expected = DMat3::from_rotation_x(angles.x)
            * DMat3::from_rotation_y(angles.y)
            * DMat3::from_rotation_z(angles.z);
        assert!(euler_to_matrix(angles, RotationOrder::Zyx).abs_diff_eq(expected, 1e-12));

        let expected = DMat3::from_rotation_x(angles.x)
            * DMat3::from_rotation_z(angles.z)
            * DMat3::from_rotation_y(angles.y);
        assert!(euler_to_matrix(angles, RotationOrder::Yzx).abs_diff_eq(expected, 1e-12));
    }

    #[test]
    fn quarter_turn_about_z() {
        let rotation = euler_to_matrix(to_radians(DVec3::new(0.0, 0.0, 90.0)), RotationOrder::Xyz);
        assert!(approx_v3(rotation * DVec3::Y, -DVec3::X));
    }

    #[test]
    fn along_direction() {
        let transform = Transform::from_translation(DVec3::new(1.0, 2.0, 3.0))
            .with_rotation(DMat3::from_rotation_z(std::f64::consts::FRAC_PI_2));
        assert!(approx_v3(
            transform.along(DVec3::Y, 10.0),
            DVec3::new(-9.0, 2.0, 3.0)
        ));
        assert_eq!(Transform::default(), Transform::IDENTITY);
    }
}
