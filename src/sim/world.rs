//! The world: a bounded rectangle holding entities at unique positions
//!
//! Entities live in a slot map and are addressed by `EntityId`. A second map
//! indexes them by the exact bit pattern of their centre. Every method that
//! moves, adds or removes an entity updates both maps before returning.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use slotmap::SlotMap;

use super::Result;
use super::body::{Body, WorldId, WorldLink};
use super::bullet::Bullet;
use super::entity::{Behaviour, Entity, EntityId, EntityType};
use super::minor_planet::{Asteroid, Planetoid};
use super::ship::Ship;
use super::vector::{Position, PositionKey, Velocity};
use crate::consts::BULLET_FIRING_SPEED;
use crate::error::SimError;
use crate::polar_to_cartesian;

pub struct World {
    id: WorldId,
    width: f64,
    height: f64,
    pub(crate) entities: SlotMap<EntityId, Entity>,
    positions: HashMap<PositionKey, EntityId>,
    seed: u64,
    rng: Pcg32,
    terminated: bool,
}

impl World {
    /// Largest allowed width or height
    pub const MAX_DIMENSION: f64 = f64::MAX;

    pub fn new(width: f64, height: f64) -> Result<Self> {
        Self::with_seed(width, height, 0)
    }

    /// World whose random choices (teleports, breakup axes) follow `seed`
    pub fn with_seed(width: f64, height: f64, seed: u64) -> Result<Self> {
        let valid = |d: f64| d > 0.0 && d <= Self::MAX_DIMENSION;
        if !(valid(width) && valid(height)) {
            return Err(SimError::InvalidDimensions { width, height });
        }
        Ok(Self {
            id: WorldId::next(),
            width,
            height,
            entities: SlotMap::with_key(),
            positions: HashMap::new(),
            seed,
            rng: Pcg32::seed_from_u64(seed),
            terminated: false,
        })
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub(crate) fn link(&self) -> WorldLink {
        WorldLink::new(self.id, self.width, self.height)
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.terminated {
            Err(SimError::WorldTerminated)
        } else {
            Ok(())
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity> {
        self.entities.get(id).ok_or(SimError::UnknownEntity(id))
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        self.entities.get_mut(id).ok_or(SimError::UnknownEntity(id))
    }

    /// Entity whose centre is exactly `position`
    pub fn entity_at(&self, position: &Position) -> Option<EntityId> {
        self.positions.get(&position.key()).copied()
    }

    /// All entities in stable id order
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter()
    }

    pub fn entities_of_type(&self, kind: EntityType) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities().filter(move |(_, e)| e.entity_type() == kind)
    }

    pub fn ships(&self) -> impl Iterator<Item = (EntityId, &Ship)> {
        self.entities().filter_map(|(id, e)| e.as_ship().map(|s| (id, s)))
    }

    pub fn bullets(&self) -> impl Iterator<Item = (EntityId, &Bullet)> {
        self.entities().filter_map(|(id, e)| e.as_bullet().map(|b| (id, b)))
    }

    pub fn asteroids(&self) -> impl Iterator<Item = (EntityId, &Asteroid)> {
        self.entities().filter_map(|(id, e)| e.as_asteroid().map(|a| (id, a)))
    }

    pub fn planetoids(&self) -> impl Iterator<Item = (EntityId, &Planetoid)> {
        self.entities().filter_map(|(id, e)| e.as_planetoid().map(|p| (id, p)))
    }

    pub fn minor_planets(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities().filter(|(_, e)| e.is_minor_planet())
    }

    pub fn ship(&self, id: EntityId) -> Result<&Ship> {
        self.entity(id)?.as_ship().ok_or(SimError::WrongKind(id, "ship"))
    }

    /// Ship controls; the position stays under the world's control
    pub fn ship_mut(&mut self, id: EntityId) -> Result<&mut Ship> {
        self.ensure_active()?;
        self.entity_mut(id)?
            .as_ship_mut()
            .ok_or(SimError::WrongKind(id, "ship"))
    }

    /// Whether `body` fits inside the boundary without overlapping anyone but `ignore`
    pub fn can_place(&self, body: &Body, ignore: Option<EntityId>) -> bool {
        self.link().surrounds(&body.position(), body.radius())
            && !self
                .entities
                .iter()
                .any(|(id, e)| Some(id) != ignore && body.overlaps(e.body()))
    }

    fn check_placement(&self, body: &Body, ignore: Option<EntityId>) -> Result<()> {
        let position = body.position();
        if !self.link().surrounds(&position, body.radius()) {
            return Err(SimError::OutOfBounds {
                x: position.x(),
                y: position.y(),
            });
        }
        if !self.can_place(body, ignore) {
            return Err(SimError::Overlap);
        }
        Ok(())
    }

    /// Attach a free-floating entity
    ///
    /// Fails when the world or the entity is terminated, the entity already
    /// has a world, lies outside the boundary or overlaps another entity.
    pub fn add_entity(&mut self, entity: impl Into<Entity>) -> Result<EntityId> {
        self.ensure_active()?;
        let entity = entity.into();
        entity.body().ensure_alive()?;
        if entity.body().world().is_some() {
            return Err(SimError::AlreadyInWorld);
        }
        self.check_placement(entity.body(), None)?;
        Ok(self.insert(entity))
    }

    /// Insert an entity whose placement was already checked
    fn insert(&mut self, mut entity: Entity) -> EntityId {
        entity.body_mut().attach(self.link());
        let key = entity.body().position().key();
        let kind = entity.entity_type();
        let id = self.entities.insert(entity);
        self.positions.insert(key, id);
        log::debug!("{} {id:?} added", kind.as_str());
        id
    }

    /// Detach an entity, handing it back to the caller
    ///
    /// A ship with bullets still flying cannot leave.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Entity> {
        self.ensure_active()?;
        if !self.entity(id)?.behaviour().can_be_removed_from_world() {
            return Err(SimError::CannotRemove(id));
        }
        self.detach(id)
    }

    /// Take an entity out of both maps and sever its world links
    fn detach(&mut self, id: EntityId) -> Result<Entity> {
        let mut entity = self.entities.remove(id).ok_or(SimError::UnknownEntity(id))?;
        let key = entity.body().position().key();
        if self.positions.get(&key) == Some(&id) {
            self.positions.remove(&key);
        }

        match &mut entity {
            Entity::Bullet(bullet) => {
                if let Some(source) = bullet.source_ship() {
                    if let Some(Entity::Ship(ship)) = self.entities.get_mut(source) {
                        ship.forget_fired(id);
                    }
                    bullet.clear_source();
                }
            }
            Entity::Ship(ship) => {
                for fired in ship.take_fired() {
                    if let Some(Entity::Bullet(bullet)) = self.entities.get_mut(fired) {
                        bullet.clear_source();
                    }
                }
            }
            Entity::Asteroid(_) | Entity::Planetoid(_) => {}
        }

        entity.body_mut().detach();
        Ok(entity)
    }

    /// Terminate an entity of this world
    ///
    /// A large planetoid leaves two asteroids behind. Returns the terminated
    /// entity.
    pub fn destroy_entity(&mut self, id: EntityId) -> Result<Entity> {
        self.ensure_active()?;
        let mut entity = self.detach(id)?;
        if let Entity::Planetoid(planetoid) = &entity {
            self.spawn_fragments(planetoid)?;
        }
        entity.terminate();
        log::debug!("{} {id:?} destroyed", entity.entity_type().as_str());
        Ok(entity)
    }

    fn spawn_fragments(&mut self, planetoid: &Planetoid) -> Result<()> {
        if !planetoid.breaks_up() {
            return Ok(());
        }
        let angle = self.rng.random_range(0.0..std::f64::consts::TAU);
        self.place_fragments(planetoid, angle).map(drop)
    }

    /// Insert the fragments split along `angle` that fit; returns how many did
    fn place_fragments(&mut self, planetoid: &Planetoid, angle: f64) -> Result<usize> {
        let mut placed = 0;
        for fragment in planetoid.breakup_fragments(angle)? {
            if self.can_place(fragment.body(), None) {
                self.insert(fragment.into());
                placed += 1;
            } else {
                log::debug!("breakup fragment at {} has no room", fragment.body().position());
            }
        }
        Ok(placed)
    }

    pub fn set_velocity(&mut self, id: EntityId, velocity: Velocity) -> Result<()> {
        self.ensure_active()?;
        self.entity_mut(id)?.body_mut().set_velocity(velocity)
    }

    /// Move an entity to a free spot, updating the position index atomically
    pub fn relocate(&mut self, id: EntityId, position: Position) -> Result<()> {
        self.ensure_active()?;
        let mut probe = self.entity(id)?.body().clone();
        probe.set_position(position)?;
        self.check_placement(&probe, Some(id))?;

        let entity = self.entity_mut(id)?;
        let old = entity.body().position().key();
        entity.body_mut().set_position(position)?;
        self.positions.remove(&old);
        self.positions.insert(position.key(), id);
        Ok(())
    }

    /// Rebuild the position index after every entity moved at once
    pub(crate) fn reindex(&mut self) {
        self.positions.clear();
        for (id, entity) in &self.entities {
            self.positions.insert(entity.body().position().key(), id);
        }
    }

    /// Fire the top bullet of a ship's magazine along its orientation
    ///
    /// The bullet starts tangent to the ship. If it does not fit inside the
    /// boundary it is destroyed; if it overlaps an entity, both are destroyed.
    /// Returns the id of the bullet when it made it into the world.
    pub fn fire_bullet(&mut self, ship_id: EntityId) -> Result<Option<EntityId>> {
        let ship = self.ship_mut(ship_id)?;
        let Some(mut bullet) = ship.take_bullet() else {
            return Ok(None);
        };
        let body = ship.body();
        let direction = polar_to_cartesian(1.0, ship.orientation());
        let centre = body.position().as_dvec2() + direction * (body.radius() + bullet.body().radius());
        let velocity = direction * BULLET_FIRING_SPEED;
        bullet.launch(
            ship_id,
            Position::from_dvec2(centre)?,
            Velocity::from_dvec2(velocity)?,
        )?;

        if !self.link().surrounds(&bullet.body().position(), bullet.body().radius()) {
            log::debug!("bullet of ship {ship_id:?} fired outside the boundary");
            bullet.body_mut().mark_terminated();
            return Ok(None);
        }
        let victim = self
            .entities
            .iter()
            .find(|(_, e)| bullet.body().overlaps(e.body()))
            .map(|(id, _)| id);
        if let Some(victim) = victim {
            log::debug!("bullet of ship {ship_id:?} fired into {victim:?}");
            bullet.body_mut().mark_terminated();
            self.destroy_entity(victim)?;
            return Ok(None);
        }

        let id = self.insert(bullet.into());
        self.ship_mut(ship_id)?.record_fired(id);
        Ok(Some(id))
    }

    /// Return a fired bullet to the magazine of its ship
    pub(crate) fn reload_bullet(&mut self, ship: EntityId, bullet: EntityId) -> Result<()> {
        self.ship(ship)?;
        match self.detach(bullet)? {
            Entity::Bullet(b) => {
                self.ship_mut(ship)?.load_bullet(b)?;
                log::debug!("bullet {bullet:?} reloaded into ship {ship:?}");
                Ok(())
            }
            other => {
                // Put it back untouched
                self.insert(other);
                Err(SimError::WrongKind(bullet, "bullet"))
            }
        }
    }

    /// Jump a ship to a random spot inside the boundary, destroying it if the
    /// spot is taken
    pub(crate) fn teleport(&mut self, ship: EntityId) -> Result<()> {
        let radius = self.ship(ship)?.body().radius();
        let x = self.random_coordinate(radius, self.width);
        let y = self.random_coordinate(radius, self.height);
        let target = Position::new(x, y)?;
        match self.relocate(ship, target) {
            Ok(()) => {
                log::debug!("ship {ship:?} teleported to {target}");
                Ok(())
            }
            Err(SimError::Overlap) => {
                log::debug!("ship {ship:?} teleported into another entity");
                self.destroy_entity(ship).map(drop)
            }
            Err(e) => Err(e),
        }
    }

    fn random_coordinate(&mut self, radius: f64, extent: f64) -> f64 {
        if extent - radius > radius {
            self.rng.random_range(radius..=extent - radius)
        } else {
            extent / 2.0
        }
    }

    /// Detach every entity and close the world for good
    ///
    /// Ship/bullet links are cut before the entities leave.
    pub fn terminate(&mut self) -> Vec<Entity> {
        if self.terminated {
            return Vec::new();
        }
        for (_, entity) in self.entities.iter_mut() {
            match entity {
                Entity::Ship(ship) => {
                    ship.take_fired();
                }
                Entity::Bullet(bullet) => bullet.clear_source(),
                Entity::Asteroid(_) | Entity::Planetoid(_) => {}
            }
        }
        self.positions.clear();
        let detached = self
            .entities
            .drain()
            .map(|(_, mut entity)| {
                entity.body_mut().detach();
                entity
            })
            .collect();
        self.terminated = true;
        log::debug!("world {:?} terminated", self.id);
        detached
    }

    /// Consistency of the maps, the boundary and the ship/bullet links
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.positions.len() != self.entities.len() {
            return Err(format!(
                "{} positions indexed for {} entities",
                self.positions.len(),
                self.entities.len()
            ));
        }
        let link = self.link();
        for (id, entity) in &self.entities {
            let body = entity.body();
            if self.positions.get(&body.position().key()) != Some(&id) {
                return Err(format!("{id:?} not indexed at {}", body.position()));
            }
            if body.world_id() != Some(self.id) {
                return Err(format!("{id:?} does not point back at its world"));
            }
            if !link.surrounds(&body.position(), body.radius()) {
                return Err(format!("{id:?} outside the boundary at {}", body.position()));
            }
            if let Entity::Ship(ship) = entity {
                for fired in ship.fired_bullets() {
                    let source = self
                        .entities
                        .get(fired)
                        .and_then(Entity::as_bullet)
                        .and_then(Bullet::source_ship);
                    if source != Some(id) {
                        return Err(format!("{id:?} lists {fired:?} as fired"));
                    }
                }
            }
        }
        let bodies: Vec<(EntityId, &Body)> = self.entities.iter().map(|(id, e)| (id, e.body())).collect();
        for (i, (a, ba)) in bodies.iter().enumerate() {
            for (b, bb) in &bodies[i + 1..] {
                if ba.overlaps(bb) {
                    return Err(format!("{a:?} overlaps {b:?}"));
                }
            }
        }
        Ok(())
    }
}
