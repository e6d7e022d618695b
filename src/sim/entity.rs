//! Entity sum type and the per-variant capability trait

use super::Result;
use super::body::Body;
use super::bullet::Bullet;
use super::minor_planet::{Asteroid, Planetoid};
use super::ship::Ship;

slotmap::new_key_type! {
    /// Stable handle of an entity inside a world
    pub struct EntityId;
}

/// Variant tag, for queries and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Ship,
    Bullet,
    Asteroid,
    Planetoid,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Ship => "ship",
            EntityType::Bullet => "bullet",
            EntityType::Asteroid => "asteroid",
            EntityType::Planetoid => "planetoid",
        }
    }
}

/// Reaction to touching the world boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryResponse {
    Bounce,
    Destroy,
}

/// Whether an entity survived a move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Alive,
    /// The entity can no longer satisfy its invariants and must be terminated
    Expired,
}

/// What every variant decides for itself
pub trait Behaviour {
    fn body(&self) -> &Body;

    fn body_mut(&mut self) -> &mut Body;

    /// Mass of whatever the entity carries along
    fn carried_mass(&self) -> f64 {
        0.0
    }

    /// Own mass plus carried mass
    fn total_mass(&self) -> f64 {
        self.body().mass() + self.carried_mass()
    }

    fn can_be_removed_from_world(&self) -> bool {
        true
    }

    /// Whether a collision with `other` is worth reporting to a listener
    fn must_show_collision_with(&self, _other: EntityId) -> bool {
        true
    }

    /// Called once per resolved boundary collision
    fn on_boundary_collision(&mut self) -> BoundaryResponse {
        BoundaryResponse::Bounce
    }

    /// Integrate motion over `duration`
    fn advance(&mut self, duration: f64) -> Result<MoveOutcome> {
        self.body_mut().advance(duration)?;
        Ok(MoveOutcome::Alive)
    }
}

/// A circular physical body of one of the four kinds
#[derive(Debug)]
pub enum Entity {
    Ship(Ship),
    Bullet(Bullet),
    Asteroid(Asteroid),
    Planetoid(Planetoid),
}

impl Entity {
    pub fn behaviour(&self) -> &dyn Behaviour {
        match self {
            Entity::Ship(s) => s,
            Entity::Bullet(b) => b,
            Entity::Asteroid(a) => a,
            Entity::Planetoid(p) => p,
        }
    }

    pub fn behaviour_mut(&mut self) -> &mut dyn Behaviour {
        match self {
            Entity::Ship(s) => s,
            Entity::Bullet(b) => b,
            Entity::Asteroid(a) => a,
            Entity::Planetoid(p) => p,
        }
    }

    pub fn body(&self) -> &Body {
        self.behaviour().body()
    }

    pub(crate) fn body_mut(&mut self) -> &mut Body {
        self.behaviour_mut().body_mut()
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::Ship(_) => EntityType::Ship,
            Entity::Bullet(_) => EntityType::Bullet,
            Entity::Asteroid(_) => EntityType::Asteroid,
            Entity::Planetoid(_) => EntityType::Planetoid,
        }
    }

    /// Asteroids and planetoids
    pub fn is_minor_planet(&self) -> bool {
        matches!(self, Entity::Asteroid(_) | Entity::Planetoid(_))
    }

    pub fn total_mass(&self) -> f64 {
        self.behaviour().total_mass()
    }

    pub fn is_terminated(&self) -> bool {
        self.body().is_terminated()
    }

    pub fn as_ship(&self) -> Option<&Ship> {
        match self {
            Entity::Ship(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ship_mut(&mut self) -> Option<&mut Ship> {
        match self {
            Entity::Ship(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bullet(&self) -> Option<&Bullet> {
        match self {
            Entity::Bullet(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bullet_mut(&mut self) -> Option<&mut Bullet> {
        match self {
            Entity::Bullet(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_asteroid(&self) -> Option<&Asteroid> {
        match self {
            Entity::Asteroid(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_planetoid(&self) -> Option<&Planetoid> {
        match self {
            Entity::Planetoid(p) => Some(p),
            _ => None,
        }
    }

    /// Terminate a free-floating entity
    ///
    /// Entities inside a world are terminated through `World::destroy_entity`,
    /// which also severs their associations there.
    pub fn terminate(&mut self) {
        match self {
            Entity::Ship(s) => s.terminate(),
            other => other.body_mut().mark_terminated(),
        }
    }
}

impl From<Ship> for Entity {
    fn from(ship: Ship) -> Self {
        Entity::Ship(ship)
    }
}

impl From<Bullet> for Entity {
    fn from(bullet: Bullet) -> Self {
        Entity::Bullet(bullet)
    }
}

impl From<Asteroid> for Entity {
    fn from(asteroid: Asteroid) -> Self {
        Entity::Asteroid(asteroid)
    }
}

impl From<Planetoid> for Entity {
    fn from(planetoid: Planetoid) -> Self {
        Entity::Planetoid(planetoid)
    }
}
