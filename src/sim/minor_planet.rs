//! Minor planets: asteroids and planetoids
//!
//! Both have a density fixed by their kind. Planetoids also erode as they
//! travel and break up into two asteroids when a large one is destroyed.

use super::Result;
use super::body::Body;
use super::entity::{Behaviour, MoveOutcome};
use super::vector::{Position, Velocity};
use crate::consts::*;
use crate::error::SimError;
use crate::polar_to_cartesian;

/// Shared traits of asteroids and planetoids
pub trait MinorPlanet: Behaviour {
    /// Density of every body of this kind (kg/km³)
    const DENSITY: f64;

    fn minor_planet_body(position: Position, velocity: Velocity, radius: f64) -> Result<Body> {
        Body::new(
            position,
            velocity,
            radius,
            MINOR_PLANET_MINIMAL_RADIUS,
            Self::DENSITY,
            Self::DENSITY,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Asteroid {
    body: Body,
}

impl Asteroid {
    pub fn new(position: Position, velocity: Velocity, radius: f64) -> Result<Self> {
        Ok(Self {
            body: Self::minor_planet_body(position, velocity, radius)?,
        })
    }
}

impl MinorPlanet for Asteroid {
    const DENSITY: f64 = ASTEROID_DENSITY;
}

impl Behaviour for Asteroid {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

#[derive(Debug, Clone)]
pub struct Planetoid {
    body: Body,
}

impl Planetoid {
    pub fn new(position: Position, velocity: Velocity, radius: f64) -> Result<Self> {
        Ok(Self {
            body: Self::minor_planet_body(position, velocity, radius)?,
        })
    }

    /// Planetoid that already eroded over `distance` km
    pub fn with_travelled_distance(
        position: Position,
        velocity: Velocity,
        radius: f64,
        distance: f64,
    ) -> Result<Self> {
        if !(distance.is_finite() && distance >= 0.0) {
            return Err(SimError::InvalidDistance(distance));
        }
        let mut planetoid = Self::new(position, velocity, radius)?;
        planetoid
            .body
            .set_radius(radius - distance * PLANETOID_SHRINK_FACTOR)?;
        planetoid.body.set_travelled_distance(distance);
        Ok(planetoid)
    }

    /// Whether destroying this planetoid spawns fragments
    pub fn breaks_up(&self) -> bool {
        self.body.radius() >= PLANETOID_BREAKUP_RADIUS
    }

    /// Two asteroids split along the axis at `angle`
    ///
    /// Each has half the radius, sits half a radius from the centre and flies
    /// off at 1.5 times the planetoid's speed. Empty for small planetoids.
    pub fn breakup_fragments(&self, angle: f64) -> Result<Vec<Asteroid>> {
        if !self.breaks_up() {
            return Ok(Vec::new());
        }
        let half = self.body.radius() / 2.0;
        let centre = self.body.position().as_dvec2();
        let offset = polar_to_cartesian(half, angle);
        let velocity = polar_to_cartesian(self.body.speed() * PLANETOID_BREAKUP_SPEED_FACTOR, angle);

        [1.0, -1.0]
            .into_iter()
            .map(|sign| {
                Asteroid::new(
                    Position::from_dvec2(centre + offset * sign)?,
                    Velocity::from_dvec2(velocity * sign)?,
                    half,
                )
            })
            .collect()
    }
}

impl MinorPlanet for Planetoid {
    const DENSITY: f64 = PLANETOID_DENSITY;
}

impl Behaviour for Planetoid {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn advance(&mut self, duration: f64) -> Result<MoveOutcome> {
        self.body.advance(duration)?;
        let shrunk = self.body.radius() - self.body.speed() * duration * PLANETOID_SHRINK_FACTOR;
        if shrunk < self.body.minimal_radius() {
            return Ok(MoveOutcome::Expired);
        }
        self.body.set_radius(shrunk)?;
        Ok(MoveOutcome::Alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at(x: f64, y: f64) -> Position {
        Position::new(x, y).unwrap()
    }

    #[test]
    fn test_densities_fixed_per_kind() {
        let a = Asteroid::new(at(0.0, 0.0), Velocity::ZERO, 10.0).unwrap();
        let p = Planetoid::new(at(0.0, 0.0), Velocity::ZERO, 10.0).unwrap();
        assert_eq!(a.body().density(), ASTEROID_DENSITY);
        assert_eq!(p.body().density(), PLANETOID_DENSITY);
        assert!(Asteroid::new(at(0.0, 0.0), Velocity::ZERO, 4.0).is_err());
    }

    #[test]
    fn test_planetoid_shrinks_with_travel() {
        let mut p = Planetoid::new(at(0.0, 0.0), Velocity::new(1000.0, 0.0).unwrap(), 20.0).unwrap();
        assert_eq!(p.advance(10.0).unwrap(), MoveOutcome::Alive);
        assert_relative_eq!(p.body().radius(), 20.0 - 0.01);
        assert_relative_eq!(p.body().travelled_distance(), 10_000.0);
        assert_eq!(p.body().initial_radius(), 20.0);
    }

    #[test]
    fn test_planetoid_expires_below_minimal_radius() {
        let mut p = Planetoid::new(at(0.0, 0.0), Velocity::new(1e5, 0.0).unwrap(), 5.5).unwrap();
        assert_eq!(p.advance(10.0).unwrap(), MoveOutcome::Expired);
        assert_eq!(p.body().radius(), 5.5);
    }

    #[test]
    fn test_travelled_distance_at_construction() {
        let p = Planetoid::with_travelled_distance(at(0.0, 0.0), Velocity::ZERO, 20.0, 1e6).unwrap();
        assert_relative_eq!(p.body().radius(), 19.0);
        assert_eq!(p.body().travelled_distance(), 1e6);

        // Further travel adds to the history
        let mut p = Planetoid::with_travelled_distance(at(0.0, 0.0), Velocity::new(10.0, 0.0).unwrap(), 20.0, 5.0)
            .unwrap();
        p.advance(2.0).unwrap();
        assert_relative_eq!(p.body().travelled_distance(), 25.0);
        assert!(Planetoid::with_travelled_distance(at(0.0, 0.0), Velocity::ZERO, 6.0, 2e6).is_err());
        assert!(Planetoid::with_travelled_distance(at(0.0, 0.0), Velocity::ZERO, 6.0, -1.0).is_err());
    }

    #[test]
    fn test_breakup_fragments_are_symmetric() {
        let p = Planetoid::new(at(500.0, 500.0), Velocity::new(10.0, 10.0).unwrap(), 40.0).unwrap();
        let fragments = p.breakup_fragments(0.3).unwrap();
        assert_eq!(fragments.len(), 2);

        let (a, b) = (fragments[0].body(), fragments[1].body());
        assert_eq!(a.radius(), 20.0);
        assert_relative_eq!(a.position().distance(&at(500.0, 500.0)), 20.0, epsilon = 1e-9);
        assert_relative_eq!((a.position().x() + b.position().x()) / 2.0, 500.0, epsilon = 1e-9);
        assert_relative_eq!((a.position().y() + b.position().y()) / 2.0, 500.0, epsilon = 1e-9);
        assert_relative_eq!(a.speed(), 1.5 * p.body().speed(), epsilon = 1e-9);
        assert_relative_eq!(a.velocity().x(), -b.velocity().x(), epsilon = 1e-9);
    }

    #[test]
    fn test_small_planetoid_leaves_no_fragments() {
        let p = Planetoid::new(at(500.0, 500.0), Velocity::ZERO, 29.0).unwrap();
        assert!(p.breakup_fragments(0.0).unwrap().is_empty());
    }
}
