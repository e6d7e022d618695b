//! Asteroids Sim - event-driven collision simulation in a bounded 2D world
//!
//! Core modules:
//! - `sim`: Deterministic simulation (vectors, entities, collision response, world engine)
//! - `settings`: Scenario and world configuration loaded from JSON
//! - `error`: Error taxonomy shared by the simulation and the configuration layer

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{SettingsError, SimError, VectorError};
pub use settings::{BodyKind, BodySpec, Settings};

use glam::DVec2;

/// Simulation constants (units: km, s, kg)
pub mod consts {
    /// Tolerance band absorbing floating-point slack in "touching" tests
    pub const ACCURACY_FACTOR: f64 = 0.99;
    /// Default and maximal speed of any entity (km/s)
    pub const SPEED_OF_LIGHT: f64 = 300_000.0;

    /// Ship defaults
    pub const SHIP_MINIMAL_RADIUS: f64 = 10.0;
    pub const SHIP_MINIMAL_DENSITY: f64 = 1.42e12;
    /// Thruster force in Newton (kg·km/s²)
    pub const SHIP_THRUSTER_FORCE: f64 = 1.1e21;

    /// Bullet defaults
    pub const BULLET_MINIMAL_RADIUS: f64 = 1.0;
    pub const BULLET_DENSITY: f64 = 7.8e12;
    pub const BULLET_FIRING_SPEED: f64 = 250.0;
    /// Boundary bounces a bullet survives
    pub const BULLET_MAXIMAL_BOUNCES: u32 = 2;

    /// Minor planet defaults
    pub const MINOR_PLANET_MINIMAL_RADIUS: f64 = 5.0;
    pub const ASTEROID_DENSITY: f64 = 2.65e12;
    pub const PLANETOID_DENSITY: f64 = 0.917e12;
    /// Radius lost per km travelled by a planetoid
    pub const PLANETOID_SHRINK_FACTOR: f64 = 1e-6;
    /// Planetoids at least this large break up into two asteroids
    pub const PLANETOID_BREAKUP_RADIUS: f64 = 30.0;
    /// Speed multiplier applied to breakup fragments
    pub const PLANETOID_BREAKUP_SPEED_FACTOR: f64 = 1.5;

    /// Simulated time consumed by one onboard program action (s)
    pub const ACTION_DURATION: f64 = 0.2;
}

/// Normalized angle to [0, 2π)
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    use std::f64::consts::TAU;
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f64, theta: f64) -> DVec2 {
    DVec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: DVec2) -> (f64, f64) {
    (pos.length(), pos.y.atan2(pos.x))
}
