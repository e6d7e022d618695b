//! Error types
//!
//! Every violated precondition fails fast with one of these. Conditions that
//! degrade instead (speed clamping, density fallback) never show up here.

use crate::sim::EntityId;

/// Geometry errors raised by the vector types
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum VectorError {
    /// A component is NaN or infinite
    #[error("non-finite vector component ({x}, {y})")]
    NonFinite { x: f64, y: f64 },

    /// An operation overflowed to a non-finite result
    #[error("vector {0} overflowed to a non-finite result")]
    Overflow(&'static str),
}

/// Simulation errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Invalid vector input or result
    #[error(transparent)]
    Vector(#[from] VectorError),

    /// Operation on a terminated entity
    #[error("entity is terminated")]
    EntityTerminated,

    /// Operation on a terminated world
    #[error("world is terminated")]
    WorldTerminated,

    /// The id does not name a live entity of this world
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),

    /// The entity is not of the variant the operation needs
    #[error("entity {0:?} is not a {1}")]
    WrongKind(EntityId, &'static str),

    /// Two entities were expected to share a world
    #[error("entities are not in the same world")]
    NotInSameWorld,

    /// The entity was expected to be in a world
    #[error("entity is not in a world")]
    NotInWorld,

    /// The entity already belongs to a world
    #[error("entity already belongs to a world")]
    AlreadyInWorld,

    /// The entity and the world do not collide at this moment
    #[error("no apparent collision to resolve")]
    NoCollision,

    /// Unexpected overlap between two entities
    #[error("entities overlap")]
    Overlap,

    /// Position outside the (inset) boundary of the world
    #[error("position ({x}, {y}) lies outside the world boundary")]
    OutOfBounds { x: f64, y: f64 },

    /// Radius below the minimum or not finite
    #[error("invalid radius {radius} (minimum {minimal})")]
    InvalidRadius { radius: f64, minimal: f64 },

    /// Density not finite or below the minimum
    #[error("invalid density {0}")]
    InvalidDensity(f64),

    /// Mass not finite or not positive
    #[error("invalid mass {0}")]
    InvalidMass(f64),

    /// World dimensions outside (0, f64::MAX]
    #[error("invalid world dimensions {width} x {height}")]
    InvalidDimensions { width: f64, height: f64 },

    /// Negative or non-finite duration
    #[error("invalid duration {0}")]
    InvalidDuration(f64),

    /// Negative or non-finite travelled distance
    #[error("invalid distance {0}")]
    InvalidDistance(f64),

    /// Non-finite angle
    #[error("invalid angle {0}")]
    InvalidAngle(f64),

    /// The entity cannot be detached from its world yet
    #[error("entity {0:?} cannot be removed from its world")]
    CannotRemove(EntityId),
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The scenario describes an impossible world
    #[error("Invalid scenario: {0}")]
    Scenario(#[from] SimError),
}
