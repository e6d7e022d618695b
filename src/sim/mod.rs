//! Deterministic simulation module
//!
//! All physics lives here. This module must be pure and deterministic:
//! - Event-driven time steps only (exact collision times, no fixed frames)
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod body;
pub mod bullet;
pub mod collision;
pub mod entity;
pub mod evolve;
pub mod minor_planet;
pub mod program;
pub mod ship;
pub mod vector;
pub mod world;

pub use body::{Body, Wall, WorldId, WorldLink};
pub use bullet::Bullet;
pub use collision::{CollisionEvent, CollisionListener, PairResponse, bounce_off, pair_response};
pub use entity::{Behaviour, BoundaryResponse, Entity, EntityId, EntityType, MoveOutcome};
pub use minor_planet::{Asteroid, MinorPlanet, Planetoid};
pub use program::{ActionProgram, ProgramError, ShipAction, ShipControl, ShipProgram};
pub use ship::Ship;
pub use vector::{Position, PositionKey, Velocity};
pub use world::World;

/// Result of every fallible simulation operation
pub type Result<T> = std::result::Result<T, crate::error::SimError>;
