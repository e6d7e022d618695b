//! Simulation settings and scenarios
//!
//! Stored as JSON. The default settings describe a small demo scenario so the
//! binary has something to run without a file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SettingsError, SimError};
use crate::sim::{ActionProgram, Asteroid, Bullet, Entity, Planetoid, Position, Ship, ShipAction, Velocity, World};

/// Kind of body in a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Ship,
    Bullet,
    Asteroid,
    Planetoid,
}

impl BodyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyKind::Ship => "ship",
            BodyKind::Bullet => "bullet",
            BodyKind::Asteroid => "asteroid",
            BodyKind::Planetoid => "planetoid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ship" => Some(BodyKind::Ship),
            "bullet" => Some(BodyKind::Bullet),
            "asteroid" | "rock" => Some(BodyKind::Asteroid),
            "planetoid" => Some(BodyKind::Planetoid),
            _ => None,
        }
    }
}

fn zero_velocity() -> Velocity {
    Velocity::ZERO
}

/// One body placed in the world at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    pub kind: BodyKind,
    pub position: Position,
    #[serde(default = "zero_velocity")]
    pub velocity: Velocity,
    pub radius: f64,

    // === Ships only ===
    /// Heading in radians
    #[serde(default)]
    pub orientation: f64,
    /// Mass in kg; minimal density when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    /// Bullets loaded into the magazine
    #[serde(default)]
    pub bullets: u32,
    /// Onboard program
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub program: Vec<ShipAction>,
}

impl BodySpec {
    pub fn new(kind: BodyKind, position: Position, velocity: Velocity, radius: f64) -> Self {
        Self {
            kind,
            position,
            velocity,
            radius,
            orientation: 0.0,
            mass: None,
            bullets: 0,
            program: Vec::new(),
        }
    }

    /// Free-floating entity described by this spec
    pub fn build(&self, bullet_radius: f64) -> Result<Entity, SimError> {
        let (p, v, r) = (self.position, self.velocity, self.radius);
        let entity = match self.kind {
            BodyKind::Ship => {
                let mut ship = match self.mass {
                    Some(mass) => Ship::with_mass(p, v, r, self.orientation, mass)?,
                    None => Ship::new(p, v, r, self.orientation)?,
                };
                for _ in 0..self.bullets {
                    ship.load_bullet(Bullet::new(p, Velocity::ZERO, bullet_radius)?)?;
                }
                if !self.program.is_empty() {
                    ship.set_program(Box::new(ActionProgram::new(self.program.iter().copied())));
                }
                Entity::from(ship)
            }
            BodyKind::Bullet => Bullet::new(p, v, r)?.into(),
            BodyKind::Asteroid => Asteroid::new(p, v, r)?.into(),
            BodyKind::Planetoid => Planetoid::new(p, v, r)?.into(),
        };
        Ok(entity)
    }
}

/// World and scenario configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === World ===
    /// Width in km
    pub width: f64,
    /// Height in km
    pub height: f64,
    /// Seed for teleports and breakup axes
    pub seed: u64,

    // === Run ===
    /// Total simulated time in seconds
    pub duration: f64,
    /// Simulated time between two reports
    pub report_interval: f64,

    // === Scenario ===
    /// Radius of the bullets loaded into ships
    pub bullet_radius: f64,
    pub bodies: Vec<BodySpec>,
}

impl Default for Settings {
    fn default() -> Self {
        let at = |x, y| Position::new(x, y).unwrap_or(Position::ZERO);
        let vel = |x, y| Velocity::new(x, y).unwrap_or(Velocity::ZERO);

        let mut ship = BodySpec::new(BodyKind::Ship, at(200.0, 500.0), vel(20.0, 0.0), 15.0);
        ship.bullets = 3;
        ship.program = vec![
            ShipAction::Fire,
            ShipAction::Turn(std::f64::consts::FRAC_PI_2),
            ShipAction::Wait,
            ShipAction::Fire,
            ShipAction::ThrustOn,
            ShipAction::Wait,
            ShipAction::ThrustOff,
        ];

        Self {
            width: 1000.0,
            height: 1000.0,
            seed: 42,

            duration: 60.0,
            report_interval: 10.0,

            bullet_radius: 2.0,
            bodies: vec![
                ship,
                BodySpec::new(BodyKind::Asteroid, at(700.0, 500.0), vel(-15.0, 5.0), 25.0),
                BodySpec::new(BodyKind::Asteroid, at(300.0, 200.0), vel(10.0, 25.0), 12.0),
                BodySpec::new(BodyKind::Planetoid, at(500.0, 800.0), vel(5.0, -20.0), 40.0),
            ],
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// World populated with every body of the scenario
    pub fn build_world(&self) -> Result<World, SettingsError> {
        let mut world = World::with_seed(self.width, self.height, self.seed)?;
        for spec in &self.bodies {
            let id = world.add_entity(spec.build(self.bullet_radius)?)?;
            log::debug!("{} {id:?} placed at {}", spec.kind.as_str(), spec.position);
        }
        Ok(world)
    }
}
