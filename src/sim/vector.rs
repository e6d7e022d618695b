//! Immutable 2D value types
//!
//! `Position` and `Velocity` share a representation but not an algebra:
//! arithmetic only combines values of the same type, so mixing the two is a
//! compile error rather than a runtime check.

use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::VectorError;

macro_rules! vector_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
        #[serde(try_from = "DVec2", into = "DVec2")]
        pub struct $name(DVec2);

        impl $name {
            pub const ZERO: Self = Self(DVec2::ZERO);

            /// Create a vector, rejecting NaN and infinite components
            pub fn new(x: f64, y: f64) -> Result<Self, VectorError> {
                if x.is_finite() && y.is_finite() {
                    Ok(Self(DVec2::new(x, y)))
                } else {
                    Err(VectorError::NonFinite { x, y })
                }
            }

            pub fn from_dvec2(v: DVec2) -> Result<Self, VectorError> {
                Self::new(v.x, v.y)
            }

            #[inline]
            pub fn x(&self) -> f64 {
                self.0.x
            }

            #[inline]
            pub fn y(&self) -> f64 {
                self.0.y
            }

            /// Raw components, for intermediate math
            #[inline]
            pub fn as_dvec2(&self) -> DVec2 {
                self.0
            }

            pub fn add(&self, other: &Self) -> Result<Self, VectorError> {
                Self::checked(self.0 + other.0, "addition")
            }

            pub fn sub(&self, other: &Self) -> Result<Self, VectorError> {
                Self::checked(self.0 - other.0, "subtraction")
            }

            pub fn scale(&self, k: f64) -> Result<Self, VectorError> {
                Self::checked(self.0 * k, "scaling")
            }

            pub fn dot(&self, other: &Self) -> Result<f64, VectorError> {
                let d = self.0.dot(other.0);
                if d.is_finite() {
                    Ok(d)
                } else {
                    Err(VectorError::Overflow("dot product"))
                }
            }

            fn checked(v: DVec2, op: &'static str) -> Result<Self, VectorError> {
                if v.is_finite() {
                    Ok(Self(v))
                } else {
                    Err(VectorError::Overflow(op))
                }
            }
        }

        impl TryFrom<DVec2> for $name {
            type Error = VectorError;

            fn try_from(v: DVec2) -> Result<Self, Self::Error> {
                Self::from_dvec2(v)
            }
        }

        impl From<$name> for DVec2 {
            fn from(v: $name) -> DVec2 {
                v.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "({:.3}, {:.3})", self.0.x, self.0.y)
            }
        }
    };
}

vector_type!(
    /// Location of an entity centre (km)
    Position
);

vector_type!(
    /// Velocity of an entity (km/s)
    Velocity
);

impl Position {
    /// Euclidean distance to another position
    pub fn distance(&self, other: &Position) -> f64 {
        self.0.distance(other.0)
    }

    /// Exact bit pattern of the centre, used as a map key
    pub fn key(&self) -> PositionKey {
        PositionKey(self.0.x.to_bits(), self.0.y.to_bits())
    }
}

impl Velocity {
    /// Magnitude of the velocity
    #[inline]
    pub fn speed(&self) -> f64 {
        self.0.x.hypot(self.0.y)
    }

    /// Same direction, magnitude capped at `limit`
    pub fn clamped(&self, limit: f64) -> Velocity {
        let speed = self.speed();
        if speed > limit && speed > 0.0 {
            Velocity(self.0 * (limit / speed))
        } else {
            *self
        }
    }
}

/// Hashable, bit-exact identity of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionKey(u64, u64);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_non_finite() {
        assert!(Position::new(f64::NAN, 0.0).is_err());
        assert!(Velocity::new(0.0, f64::INFINITY).is_err());
        assert!(Position::new(1.0, -2.0).is_ok());
    }

    #[test]
    fn test_overflow_is_rejected() {
        let big = Velocity::new(f64::MAX, f64::MAX).unwrap();
        assert_eq!(big.add(&big), Err(VectorError::Overflow("addition")));
        assert_eq!(big.dot(&big), Err(VectorError::Overflow("dot product")));
        assert!(big.scale(2.0).is_err());
    }

    #[test]
    fn test_speed() {
        let v = Velocity::new(3.0, 4.0).unwrap();
        assert_eq!(v.speed(), 5.0);
    }

    #[test]
    fn test_clamped_keeps_direction() {
        let v = Velocity::new(300.0, 400.0).unwrap().clamped(50.0);
        assert!((v.speed() - 50.0).abs() < 1e-9);
        assert!((v.x() - 30.0).abs() < 1e-9);
        assert!((v.y() - 40.0).abs() < 1e-9);

        let slow = Velocity::new(1.0, 1.0).unwrap();
        assert_eq!(slow.clamped(50.0), slow);
    }

    #[test]
    fn test_key_is_bit_exact() {
        let a = Position::new(1.0, 2.0).unwrap();
        let b = Position::new(1.0, 2.0 + f64::EPSILON * 2.0).unwrap();
        assert_eq!(a.key(), Position::new(1.0, 2.0).unwrap().key());
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Position = serde_json::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(ok, Position::new(1.0, 2.0).unwrap());
        assert!(Velocity::try_from(DVec2::new(f64::NAN, 0.0)).is_err());
    }

    proptest! {
        #[test]
        fn prop_add_then_sub_is_identity(
            ax in -1e6f64..1e6, ay in -1e6f64..1e6,
            bx in -1e6f64..1e6, by in -1e6f64..1e6,
        ) {
            let a = Position::new(ax, ay).unwrap();
            let b = Position::new(bx, by).unwrap();
            let back = a.add(&b).unwrap().sub(&b).unwrap();
            prop_assert!((back.x() - ax).abs() <= 1e-9 * (1.0 + ax.abs() + bx.abs()));
            prop_assert!((back.y() - ay).abs() <= 1e-9 * (1.0 + ay.abs() + by.abs()));
        }

        #[test]
        fn prop_scale_by_one_is_identity(x in -1e12f64..1e12, y in -1e12f64..1e12) {
            let v = Velocity::new(x, y).unwrap();
            prop_assert_eq!(v.scale(1.0).unwrap(), v);
        }
    }
}
