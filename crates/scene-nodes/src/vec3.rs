//! Three-component vectors stored in node props
//!
//! Positions, velocities and rotations are props of the form
//! `{"x": .., "y": .., "z": ..}`. Arrays `[x, y, z]` are accepted on input.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

/// Axis of a [`Vec3`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Parse `"x"`, `"y"` or `"z"` (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    /// Read a vector from a prop value, if it has a usable shape
    pub fn from_value(value: Option<&Value>) -> Option<Self> {
        match value? {
            Value::Array(items) if items.len() == 3 => Some(Self::new(
                items[0].as_f64()?,
                items[1].as_f64()?,
                items[2].as_f64()?,
            )),
            object @ Value::Object(_) => serde_json::from_value(object.clone()).ok(),
            _ => None,
        }
    }

    pub fn to_value(self) -> Value {
        serde_json::json!({ "x": self.x, "y": self.y, "z": self.z })
    }

    pub fn get(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    pub fn add(self, other: Vec3) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_object_and_array() {
        assert_eq!(
            Vec3::from_value(Some(&json!({ "x": 1, "y": 2.5 }))),
            Some(Vec3::new(1.0, 2.5, 0.0))
        );
        assert_eq!(
            Vec3::from_value(Some(&json!([1, 2, 3]))),
            Some(Vec3::new(1.0, 2.0, 3.0))
        );
        assert_eq!(Vec3::from_value(Some(&json!([1, 2]))), None);
        assert_eq!(Vec3::from_value(Some(&json!("up"))), None);
        assert_eq!(Vec3::from_value(None), None);
    }

    #[test]
    fn test_axis_access() {
        let mut v = Vec3::ZERO;
        v.set(Axis::parse("Y").unwrap(), 4.0);
        assert_eq!(v.get(Axis::Y), 4.0);
        assert_eq!(v.add(Vec3::splat(1.0)).scale(2.0), Vec3::new(2.0, 10.0, 2.0));
        assert_eq!(Axis::parse("w"), None);
    }
}
