//! Event-driven time evolution
//!
//! Instead of fixed steps the world jumps straight to the next collision:
//! find the earliest boundary or pair contact, move everything up to it,
//! resolve whatever is touching, and repeat until the duration is used up.
//! Fast bodies can never tunnel through each other this way. Each step scans
//! every pair, which is fine for the small populations this engine targets.

use super::Result;
use super::body::check_duration;
use super::collision::{CollisionListener, PairResponse, bounce_off, bounce_off_boundary, pair_response};
use super::entity::{BoundaryResponse, Entity, EntityId, EntityType, MoveOutcome};
use super::program::{ProgramError, ShipControl};
use super::ship::Ship;
use super::vector::Position;
use super::world::World;
use crate::error::SimError;

/// The next thing that will touch
#[derive(Debug, Clone, Copy, PartialEq)]
enum Contact {
    Boundary(EntityId),
    Pair(EntityId, EntityId),
}

impl World {
    /// Advance the world by `duration` seconds, resolving every collision on
    /// the way and reporting the visible ones to `listener`
    ///
    /// # Panics
    ///
    /// If the world ends up inconsistent (overlapping entities, a stale
    /// position index). That is a bug in the engine, not in the caller.
    pub fn evolve(&mut self, duration: f64, listener: &mut dyn CollisionListener) -> Result<()> {
        self.ensure_active()?;
        check_duration(duration)?;
        if self.is_empty() {
            return Ok(());
        }

        let mut remaining = duration;
        loop {
            let t = self.time_to_first_collision()?;
            if t > remaining {
                self.advance_all(remaining)?;
                break;
            }
            self.advance_all(t)?;
            let resolved = self.resolve_apparent_collisions(listener)?;
            remaining -= t;
            if remaining <= 0.0 {
                break;
            }
            if t == 0.0 && resolved == 0 {
                // A contact at t = 0 is always inside the tolerance band
                debug_assert!(false, "zero-time event with nothing to resolve");
                log::warn!("zero-time event with nothing to resolve, {remaining}s left unsimulated");
                break;
            }
        }

        if let Err(violation) = self.check_invariants() {
            log::error!("world {:?} inconsistent after evolve: {violation}", self.id());
            panic!("world inconsistent after evolve: {violation}");
        }
        Ok(())
    }

    /// Time until the earliest boundary or pair collision, `+∞` if none
    pub fn time_to_first_collision(&self) -> Result<f64> {
        Ok(self.next_collision()?.map_or(f64::INFINITY, |(t, _)| t))
    }

    /// Where the earliest collision will happen
    pub fn first_collision_position(&self) -> Result<Option<Position>> {
        match self.next_collision()? {
            None => Ok(None),
            Some((_, Contact::Boundary(id))) => self.entity(id)?.body().boundary_collision_position(),
            Some((_, Contact::Pair(a, b))) => {
                self.entity(a)?.body().collision_position(self.entity(b)?.body())
            }
        }
    }

    fn next_collision(&self) -> Result<Option<(f64, Contact)>> {
        let mut best: Option<(f64, Contact)> = None;
        let mut consider = |t: f64, contact: Contact| {
            if t.is_finite() && best.is_none_or(|(bt, _)| t < bt) {
                best = Some((t, contact));
            }
        };

        let bodies: Vec<_> = self.entities().map(|(id, e)| (id, e.body())).collect();
        for (i, &(a, ba)) in bodies.iter().enumerate() {
            consider(ba.time_to_boundary_collision(), Contact::Boundary(a));
            for &(b, bb) in &bodies[i + 1..] {
                consider(ba.time_to_collision(bb)?, Contact::Pair(a, b));
            }
        }
        Ok(best)
    }

    /// Move every entity, then let the ship programs act on the elapsed time
    fn advance_all(&mut self, duration: f64) -> Result<()> {
        let mut expired = Vec::new();
        for (id, entity) in self.entities.iter_mut() {
            if entity.behaviour_mut().advance(duration)? == MoveOutcome::Expired {
                expired.push(id);
            }
        }
        self.reindex();
        for id in expired {
            log::debug!("{id:?} eroded away");
            self.destroy_entity(id)?;
        }
        self.run_programs(duration);
        Ok(())
    }

    fn run_programs(&mut self, duration: f64) {
        let ids: Vec<EntityId> = self
            .ships()
            .filter(|(_, ship)| ship.has_program())
            .map(|(id, _)| id)
            .collect();

        for id in ids {
            // The program leaves the ship while it runs so it can drive the world
            let Some(mut program) = self
                .entities
                .get_mut(id)
                .and_then(Entity::as_ship_mut)
                .and_then(Ship::take_program)
            else {
                continue;
            };
            match program.execute(&mut ShipControl::new(self, id), duration) {
                Ok(()) | Err(ProgramError::InsufficientTime) => {}
                Err(e) => log::warn!("program of ship {id:?} failed: {e}"),
            }
            if let Some(ship) = self.entities.get_mut(id).and_then(Entity::as_ship_mut) {
                ship.restore_program(program);
            }
        }
    }

    /// Resolve everything that touches now; returns how many collisions were handled
    fn resolve_apparent_collisions(&mut self, listener: &mut dyn CollisionListener) -> Result<usize> {
        let ids: Vec<EntityId> = self.entities.keys().collect();
        let mut resolved = 0;

        for &id in &ids {
            let touching = self
                .get(id)
                .is_some_and(|e| e.body().apparent_wall_collision().is_some());
            if touching {
                self.resolve_boundary_collision(id, listener)?;
                resolved += 1;
            }
        }

        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                let touching = match (self.get(a), self.get(b)) {
                    (Some(ea), Some(eb)) => ea.body().apparently_collides_with(eb.body()),
                    _ => false,
                };
                if touching {
                    self.resolve_collision(a, b, listener)?;
                    resolved += 1;
                }
            }
        }
        Ok(resolved)
    }

    fn resolve_boundary_collision(&mut self, id: EntityId, listener: &mut dyn CollisionListener) -> Result<()> {
        let entity = self.entity(id)?;
        let wall = entity
            .body()
            .apparent_wall_collision()
            .ok_or(SimError::NoCollision)?;
        let contact = entity.body().wall_contact(wall)?;
        listener.boundary_collision(entity, contact.x(), contact.y());
        log::trace!("{id:?} hit the {wall:?} wall at {contact}");

        let entity = self.entity_mut(id)?;
        let response = entity.behaviour_mut().on_boundary_collision();
        match response {
            BoundaryResponse::Bounce => {
                bounce_off_boundary(entity)?;
            }
            BoundaryResponse::Destroy => {
                self.destroy_entity(id)?;
            }
        }
        Ok(())
    }

    /// Resolve the collision between two touching entities of this world
    ///
    /// The listener hears about it first, unless either side finds the
    /// collision not worth showing (a ship catching its own bullet).
    pub fn resolve_collision(
        &mut self,
        a: EntityId,
        b: EntityId,
        listener: &mut dyn CollisionListener,
    ) -> Result<()> {
        self.ensure_active()?;
        let (ea, eb) = (self.entity(a)?, self.entity(b)?);
        if a == b || !ea.body().apparently_collides_with(eb.body()) {
            return Err(SimError::NoCollision);
        }
        if ea.behaviour().must_show_collision_with(b) && eb.behaviour().must_show_collision_with(a) {
            let contact = ea.body().contact_point(eb.body())?;
            listener.object_collision(ea, eb, contact.x(), contact.y());
        }
        let response = pair_response((a, ea), (b, eb));
        log::trace!("{a:?} meets {b:?}: {response:?}");

        match response {
            PairResponse::Bounce => {
                let [ea, eb] = self
                    .entities
                    .get_disjoint_mut([a, b])
                    .ok_or(SimError::UnknownEntity(a))?;
                bounce_off(ea, eb)?;
            }
            PairResponse::Destroy(id) => {
                self.destroy_entity(id)?;
            }
            PairResponse::DestroyBoth => {
                // A planetoid goes last so its fragments find the other one gone
                let (first, second) = if self.entity(a)?.entity_type() == EntityType::Planetoid {
                    (b, a)
                } else {
                    (a, b)
                };
                self.destroy_entity(first)?;
                self.destroy_entity(second)?;
            }
            PairResponse::Teleport { ship } => self.teleport(ship)?,
            PairResponse::Reload { ship, bullet } => self.reload_bullet(ship, bullet)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::bullet::Bullet;
    use crate::sim::collision::CollisionEvent;
    use crate::sim::entity::Behaviour;
    use crate::sim::minor_planet::{Asteroid, Planetoid};
    use crate::sim::program::{ActionProgram, ShipAction};
    use crate::sim::vector::Velocity;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use proptest::prelude::*;

    fn at(x: f64, y: f64) -> Position {
        Position::new(x, y).unwrap()
    }

    fn vel(x: f64, y: f64) -> Velocity {
        Velocity::new(x, y).unwrap()
    }

    fn velocity_of(world: &World, id: EntityId) -> Velocity {
        world.entity(id).unwrap().body().velocity()
    }

    #[test]
    fn test_evolve_to_head_on_collision() {
        let mut world = World::new(1000.0, 1000.0).unwrap();
        let a = world.add_entity(Ship::new(at(400.0, 500.0), vel(10.0, 0.0), 10.0, 0.0).unwrap()).unwrap();
        let b = world.add_entity(Ship::new(at(600.0, 500.0), vel(-10.0, 0.0), 10.0, 0.0).unwrap()).unwrap();

        assert_eq!(world.time_to_first_collision().unwrap(), 9.0);
        assert_eq!(world.first_collision_position().unwrap(), Some(at(500.0, 500.0)));

        let mut events = Vec::new();
        world.evolve(9.0, &mut events).unwrap();
        assert_relative_eq!(velocity_of(&world, a).x(), -10.0, epsilon = 1e-9);
        assert_relative_eq!(velocity_of(&world, b).x(), 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(velocity_of(&world, a).y(), 0.0, epsilon = 1e-9);
        assert_eq!(
            events,
            vec![CollisionEvent::Object {
                first: EntityType::Ship,
                second: EntityType::Ship,
                x: 500.0,
                y: 500.0
            }]
        );
    }

    #[test]
    fn test_resolve_collision_head_on_ships() {
        let mut world = World::new(1000.0, 1000.0).unwrap();
        let a = world
            .add_entity(Ship::with_mass(at(100.0, 200.0), vel(10.0, 5.0), 10.0, 0.0, 1e20).unwrap())
            .unwrap();
        let b = world
            .add_entity(Ship::with_mass(at(130.0, 240.0), vel(-20.0, -30.0), 40.0, 0.0, 1e20).unwrap())
            .unwrap();

        world.resolve_collision(a, b, &mut ()).unwrap();
        let (va, vb) = (velocity_of(&world, a), velocity_of(&world, b));
        assert_relative_eq!(va.x(), -17.6, epsilon = 1e-6);
        assert_relative_eq!(va.y(), -31.8, epsilon = 1e-6);
        assert_relative_eq!(vb.x(), 7.6, epsilon = 1e-6);
        assert_relative_eq!(vb.y(), 6.8, epsilon = 1e-6);

        // Now separating
        assert_eq!(world.resolve_collision(a, b, &mut ()), Err(SimError::NoCollision));
    }

    #[test]
    fn test_bullet_returns_to_its_ship() {
        let mut world = World::new(1000.0, 1000.0).unwrap();
        let mut ship = Ship::new(at(100.0, 500.0), Velocity::ZERO, 10.0, 0.0).unwrap();
        ship.load_bullet(Bullet::new(at(0.0, 0.0), Velocity::ZERO, 2.0).unwrap()).unwrap();
        let s = world.add_entity(ship).unwrap();
        let b = world.fire_bullet(s).unwrap().unwrap();

        let mut events = Vec::new();
        world.evolve(8.0, &mut events).unwrap();

        let ship = world.ship(s).unwrap();
        assert_eq!(ship.magazine_len(), 1);
        assert!(!ship.has_fired(b));
        assert_eq!(ship.magazine()[0].bounces(), 0);
        assert!(!world.contains(b));
        assert_eq!(world.bullets().count(), 0);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            CollisionEvent::Boundary { entity: EntityType::Bullet, x, .. } if x == 1000.0
        ));
    }

    #[test]
    fn test_bullet_dies_on_third_bounce() {
        let mut world = World::new(100.0, 100.0).unwrap();
        let b = world
            .add_entity(Bullet::new(at(50.0, 50.0), vel(100.0, 0.0), 2.0).unwrap())
            .unwrap();

        let mut events = Vec::new();
        world.evolve(2.0, &mut events).unwrap();
        assert_eq!(world.entity(b).unwrap().as_bullet().unwrap().bounces(), 2);

        world.evolve(1.0, &mut events).unwrap();
        assert!(!world.contains(b));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_asteroid_destroys_ship() {
        let mut world = World::new(1000.0, 1000.0).unwrap();
        let s = world.add_entity(Ship::new(at(100.0, 500.0), vel(10.0, 0.0), 10.0, 0.0).unwrap()).unwrap();
        let rock = world
            .add_entity(Asteroid::new(at(200.0, 500.0), vel(-10.0, 0.0), 10.0).unwrap())
            .unwrap();

        let mut events = Vec::new();
        world.evolve(5.0, &mut events).unwrap();
        assert!(!world.contains(s));
        assert!(world.contains(rock));
        assert_relative_eq!(velocity_of(&world, rock).x(), -10.0);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_planetoid_teleports_ship() {
        let mut world = World::with_seed(1000.0, 1000.0, 11).unwrap();
        let s = world.add_entity(Ship::new(at(100.0, 500.0), vel(10.0, 0.0), 10.0, 0.0).unwrap()).unwrap();
        let p = world
            .add_entity(Planetoid::new(at(200.0, 500.0), Velocity::ZERO, 5.0).unwrap())
            .unwrap();

        // Contact after exactly 8.5 s, with the ship centred at (185, 500)
        let mut events = Vec::new();
        world.evolve(8.5, &mut events).unwrap();
        assert_eq!(events.len(), 1);
        assert!(world.contains(p));

        let ship = world.ship(s).unwrap();
        let planetoid = world.entity(p).unwrap();
        assert!(ship.body().position().distance(&at(185.0, 500.0)) > 1.0);
        assert!(world.link().surrounds(&ship.body().position(), ship.body().radius()));
        assert!(!ship.body().overlaps(planetoid.body()));
        assert_eq!(ship.body().velocity(), vel(10.0, 0.0));
        assert!(world.check_invariants().is_ok());
    }

    #[test]
    fn test_teleport_into_occupied_spot_destroys_ship() {
        // A world exactly one ship wide, so teleports only pick a new y. The
        // column above the ship is packed so every y lands on something.
        let mut world = World::with_seed(20.0, 200.0, 3).unwrap();
        let p = world
            .add_entity(Planetoid::new(at(10.0, 29.81), Velocity::ZERO, 10.0).unwrap())
            .unwrap();
        for k in 1..=8 {
            let y = 29.81 + 19.81 * f64::from(k);
            world.add_entity(Asteroid::new(at(10.0, y), Velocity::ZERO, 10.0).unwrap()).unwrap();
        }
        let s = world.add_entity(Ship::new(at(10.0, 10.0), vel(0.0, 10.0), 10.0, 0.0).unwrap()).unwrap();

        let mut events = Vec::new();
        world.evolve(1.0, &mut events).unwrap();
        assert_eq!(events.len(), 1);
        assert!(!world.contains(s));
        assert!(world.contains(p));
        assert_eq!(world.ships().count(), 0);
        assert_eq!(world.len(), 9);
    }

    #[test]
    fn test_planetoid_erodes_away_during_evolve() {
        let mut world = World::new(1e9, 1e9).unwrap();
        let p = world
            .add_entity(Planetoid::new(at(5e8, 5e8), vel(1e5, 0.0), 5.5).unwrap())
            .unwrap();
        let a = world
            .add_entity(Asteroid::new(at(1e8, 1e8), Velocity::ZERO, 20.0).unwrap())
            .unwrap();

        // 1e6 km travelled would shrink it by 1 km, below the minimal radius
        let mut events = Vec::new();
        world.evolve(10.0, &mut events).unwrap();
        assert!(events.is_empty());
        assert!(!world.contains(p));
        assert!(world.contains(a));
        assert_eq!(world.planetoids().count(), 0);
        assert_eq!(world.len(), 1);
        assert!(world.check_invariants().is_ok());
    }

    #[test]
    fn test_bullet_and_planetoid_destroy_each_other() {
        let mut world = World::with_seed(1000.0, 1000.0, 5).unwrap();
        let b = world
            .add_entity(Bullet::new(at(100.0, 500.0), vel(100.0, 0.0), 2.0).unwrap())
            .unwrap();
        let p = world
            .add_entity(Planetoid::new(at(500.0, 500.0), Velocity::ZERO, 40.0).unwrap())
            .unwrap();

        world.evolve(4.0, &mut ()).unwrap();
        assert!(!world.contains(b));
        assert!(!world.contains(p));
        // Standing still, the fragments do not move either
        assert_eq!(world.asteroids().count(), 2);
    }

    #[test]
    fn test_program_runs_during_evolve() {
        let mut world = World::new(1000.0, 1000.0).unwrap();
        let mut ship = Ship::new(at(500.0, 500.0), Velocity::ZERO, 10.0, 0.0)
            .unwrap()
            .with_thruster_force(1e15);
        ship.set_program(Box::new(ActionProgram::new([ShipAction::ThrustOn, ShipAction::Wait, ShipAction::ThrustOff])));
        let s = world.add_entity(ship).unwrap();

        world.evolve(0.5, &mut ()).unwrap();
        assert!(world.ship(s).unwrap().is_thruster_active());
        assert_eq!(world.ship(s).unwrap().body().speed(), 0.0);

        world.evolve(1.0, &mut ()).unwrap();
        let ship = world.ship(s).unwrap();
        assert!(ship.has_program());
        assert!(!ship.is_thruster_active());
        assert!(ship.body().speed() > 0.0);
    }

    #[test]
    fn test_evolve_rejects_bad_duration() {
        let mut world = World::new(1000.0, 1000.0).unwrap();
        assert_eq!(world.evolve(-1.0, &mut ()), Err(SimError::InvalidDuration(-1.0)));
        assert!(world.evolve(f64::NAN, &mut ()).is_err());
        // Empty world
        assert_eq!(world.evolve(10.0, &mut ()), Ok(()));
        assert_eq!(world.time_to_first_collision(), Ok(f64::INFINITY));
        assert_eq!(world.first_collision_position(), Ok(None));

        world.terminate();
        assert_eq!(world.evolve(1.0, &mut ()), Err(SimError::WorldTerminated));
    }

    #[test]
    fn test_corner_hit_reflects_both_axes() {
        let mut world = World::new(100.0, 100.0).unwrap();
        let id = world
            .add_entity(Asteroid::new(at(50.0, 50.0), vel(10.0, 10.0), 10.0).unwrap())
            .unwrap();

        let mut events = Vec::new();
        world.evolve(5.0, &mut events).unwrap();
        let v = velocity_of(&world, id);
        assert_relative_eq!(v.x(), -10.0);
        assert_relative_eq!(v.y(), -10.0);
        assert_eq!(events.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_evolve_keeps_bodies_inside(
            vx in -500.0f64..500.0,
            vy in -500.0f64..500.0,
            wx in -500.0f64..500.0,
            wy in -500.0f64..500.0,
            duration in 0.0f64..20.0,
        ) {
            let mut world = World::new(400.0, 300.0).unwrap();
            world.add_entity(Asteroid::new(at(100.0, 150.0), vel(vx, vy), 20.0).unwrap()).unwrap();
            world.add_entity(Ship::new(at(300.0, 150.0), vel(wx, wy), 15.0, 0.0).unwrap()).unwrap();

            world.evolve(duration, &mut ()).unwrap();
            let link = world.link();
            for (_, entity) in world.entities() {
                let body = entity.body();
                prop_assert!(link.surrounds(&body.position(), body.radius()));
            }
        }
    }
}
