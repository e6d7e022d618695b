//! Collision response
//!
//! Which pair of variants does what is decided in one table, `pair_response`,
//! so every combination is spelled out once and the compiler checks that none
//! is missing. The physics of a bounce lives in `bounce_off`.

use std::fmt;

use super::Result;
use super::body::Wall;
use super::entity::{Entity, EntityId, EntityType};
use super::vector::Velocity;
use crate::error::SimError;

/// Outcome of two entities touching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairResponse {
    /// Elastic collision
    Bounce,
    /// Only this entity is destroyed
    Destroy(EntityId),
    /// Both entities are destroyed
    DestroyBoth,
    /// The ship jumps to a random free spot (or dies trying)
    Teleport { ship: EntityId },
    /// The bullet returns to the magazine of the ship that fired it
    Reload { ship: EntityId, bullet: EntityId },
}

/// Look up the response for a touching pair
pub fn pair_response(first: (EntityId, &Entity), second: (EntityId, &Entity)) -> PairResponse {
    use Entity::*;

    let (a, b) = (first.0, second.0);
    match (first.1, second.1) {
        (Ship(_), Ship(_)) => PairResponse::Bounce,
        (Ship(_), Bullet(bullet)) => ship_meets_bullet(a, b, bullet.source_ship()),
        (Bullet(bullet), Ship(_)) => ship_meets_bullet(b, a, bullet.source_ship()),
        (Ship(_), Asteroid(_)) => PairResponse::Destroy(a),
        (Asteroid(_), Ship(_)) => PairResponse::Destroy(b),
        (Ship(_), Planetoid(_)) => PairResponse::Teleport { ship: a },
        (Planetoid(_), Ship(_)) => PairResponse::Teleport { ship: b },
        (Bullet(_), _) | (_, Bullet(_)) => PairResponse::DestroyBoth,
        (Asteroid(_) | Planetoid(_), Asteroid(_) | Planetoid(_)) => PairResponse::Bounce,
    }
}

fn ship_meets_bullet(ship: EntityId, bullet: EntityId, source: Option<EntityId>) -> PairResponse {
    if source == Some(ship) {
        PairResponse::Reload { ship, bullet }
    } else {
        PairResponse::DestroyBoth
    }
}

/// Symmetric elastic collision along the line of centres, using total masses
pub fn bounce_off(first: &mut Entity, second: &mut Entity) -> Result<()> {
    let (a, b) = (first.body(), second.body());
    if !a.shares_world_with(b) {
        return Err(SimError::NotInSameWorld);
    }
    if !a.apparently_collides_with(b) {
        return Err(SimError::NoCollision);
    }

    let sigma = a.radius() + b.radius();
    let dr = b.position().as_dvec2() - a.position().as_dvec2();
    let dv = b.velocity().as_dvec2() - a.velocity().as_dvec2();
    let (ma, mb) = (first.total_mass(), second.total_mass());

    let impulse = 2.0 * ma * mb * dv.dot(dr) / (sigma * (ma + mb));
    let j = dr * (impulse / sigma);
    let va = Velocity::from_dvec2(a.velocity().as_dvec2() + j / ma)?;
    let vb = Velocity::from_dvec2(b.velocity().as_dvec2() - j / mb)?;

    first.body_mut().set_velocity(va)?;
    second.body_mut().set_velocity(vb)?;
    Ok(())
}

/// Reflect off the wall the entity is touching
pub fn bounce_off_boundary(entity: &mut Entity) -> Result<Wall> {
    let body = entity.body();
    if body.world().is_none() {
        return Err(SimError::NotInWorld);
    }
    let wall = body.apparent_wall_collision().ok_or(SimError::NoCollision)?;
    entity.body_mut().bounce_off_wall(wall);
    Ok(wall)
}

/// Receives visually meaningful collisions, before they are resolved
pub trait CollisionListener {
    fn boundary_collision(&mut self, entity: &Entity, x: f64, y: f64);

    fn object_collision(&mut self, first: &Entity, second: &Entity, x: f64, y: f64);
}

/// Ignores every collision
impl CollisionListener for () {
    fn boundary_collision(&mut self, _entity: &Entity, _x: f64, _y: f64) {}

    fn object_collision(&mut self, _first: &Entity, _second: &Entity, _x: f64, _y: f64) {}
}

/// A reported collision
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionEvent {
    Boundary {
        entity: EntityType,
        x: f64,
        y: f64,
    },
    Object {
        first: EntityType,
        second: EntityType,
        x: f64,
        y: f64,
    },
}

impl fmt::Display for CollisionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionEvent::Boundary { entity, x, y } => {
                write!(f, "{} hit the boundary at ({x:.2}, {y:.2})", entity.as_str())
            }
            CollisionEvent::Object { first, second, x, y } => write!(
                f,
                "{} hit {} at ({x:.2}, {y:.2})",
                first.as_str(),
                second.as_str()
            ),
        }
    }
}

/// Records collisions in order
impl CollisionListener for Vec<CollisionEvent> {
    fn boundary_collision(&mut self, entity: &Entity, x: f64, y: f64) {
        self.push(CollisionEvent::Boundary {
            entity: entity.entity_type(),
            x,
            y,
        });
    }

    fn object_collision(&mut self, first: &Entity, second: &Entity, x: f64, y: f64) {
        self.push(CollisionEvent::Object {
            first: first.entity_type(),
            second: second.entity_type(),
            x,
            y,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::{WorldId, WorldLink};
    use crate::sim::bullet::Bullet;
    use crate::sim::minor_planet::{Asteroid, Planetoid};
    use crate::sim::ship::Ship;
    use crate::sim::vector::Position;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use slotmap::KeyData;

    fn id(n: u64) -> EntityId {
        EntityId::from(KeyData::from_ffi(n))
    }

    fn at(x: f64, y: f64) -> Position {
        Position::new(x, y).unwrap()
    }

    fn vel(x: f64, y: f64) -> Velocity {
        Velocity::new(x, y).unwrap()
    }

    fn in_world(mut entity: Entity, link: WorldLink) -> Entity {
        entity.body_mut().attach(link);
        entity
    }

    fn momentum(e: &Entity) -> glam::DVec2 {
        e.body().velocity().as_dvec2() * e.total_mass()
    }

    fn energy(e: &Entity) -> f64 {
        0.5 * e.total_mass() * e.body().velocity().as_dvec2().length_squared()
    }

    #[test]
    fn test_response_table() {
        let ship: Entity = Ship::new(at(0.0, 0.0), Velocity::ZERO, 10.0, 0.0).unwrap().into();
        let other_ship: Entity = Ship::new(at(0.0, 0.0), Velocity::ZERO, 10.0, 0.0).unwrap().into();
        let rock: Entity = Asteroid::new(at(0.0, 0.0), Velocity::ZERO, 10.0).unwrap().into();
        let planetoid: Entity = Planetoid::new(at(0.0, 0.0), Velocity::ZERO, 10.0).unwrap().into();
        let stray: Entity = Bullet::new(at(0.0, 0.0), Velocity::ZERO, 2.0).unwrap().into();

        let (s, t, r, p, b) = (id(1), id(2), id(3), id(4), id(5));
        assert_eq!(pair_response((s, &ship), (t, &other_ship)), PairResponse::Bounce);
        assert_eq!(pair_response((s, &ship), (r, &rock)), PairResponse::Destroy(s));
        assert_eq!(pair_response((r, &rock), (s, &ship)), PairResponse::Destroy(s));
        assert_eq!(
            pair_response((p, &planetoid), (s, &ship)),
            PairResponse::Teleport { ship: s }
        );
        assert_eq!(pair_response((s, &ship), (b, &stray)), PairResponse::DestroyBoth);
        assert_eq!(pair_response((b, &stray), (r, &rock)), PairResponse::DestroyBoth);
        assert_eq!(pair_response((p, &planetoid), (b, &stray)), PairResponse::DestroyBoth);
        assert_eq!(pair_response((r, &rock), (p, &planetoid)), PairResponse::Bounce);
    }

    #[test]
    fn test_own_bullet_is_reloaded() {
        let ship: Entity = Ship::new(at(0.0, 0.0), Velocity::ZERO, 10.0, 0.0).unwrap().into();
        let mut bullet = Bullet::new(at(0.0, 0.0), Velocity::ZERO, 2.0).unwrap();
        let (s, b) = (id(1), id(2));
        bullet.launch(s, at(12.0, 0.0), vel(250.0, 0.0)).unwrap();
        let bullet: Entity = bullet.into();

        let expected = PairResponse::Reload { ship: s, bullet: b };
        assert_eq!(pair_response((s, &ship), (b, &bullet)), expected);
        assert_eq!(pair_response((b, &bullet), (s, &ship)), expected);
        assert_eq!(pair_response((id(9), &ship), (b, &bullet)), PairResponse::DestroyBoth);
    }

    #[test]
    fn test_head_on_ship_bounce() {
        let link = WorldLink::new(WorldId::next(), 1000.0, 1000.0);
        let a = Ship::with_mass(at(100.0, 200.0), vel(10.0, 5.0), 10.0, 0.0, 1e20).unwrap();
        let b = Ship::with_mass(at(130.0, 240.0), vel(-20.0, -30.0), 40.0, 0.0, 1e20).unwrap();
        let mut a = in_world(a.into(), link);
        let mut b = in_world(b.into(), link);

        bounce_off(&mut a, &mut b).unwrap();
        let (va, vb) = (a.body().velocity(), b.body().velocity());
        assert_relative_eq!(va.x(), -17.6, epsilon = 1e-6);
        assert_relative_eq!(va.y(), -31.8, epsilon = 1e-6);
        assert_relative_eq!(vb.x(), 7.6, epsilon = 1e-6);
        assert_relative_eq!(vb.y(), 6.8, epsilon = 1e-6);
    }

    #[test]
    fn test_bounce_requires_shared_world_and_contact() {
        let link = WorldLink::new(WorldId::next(), 1000.0, 1000.0);
        let a: Entity = Asteroid::new(at(100.0, 100.0), vel(1.0, 0.0), 10.0).unwrap().into();
        let b: Entity = Asteroid::new(at(120.0, 100.0), vel(-1.0, 0.0), 10.0).unwrap().into();
        let (mut a, mut b_free) = (in_world(a, link), b);
        assert_eq!(bounce_off(&mut a, &mut b_free), Err(SimError::NotInSameWorld));

        let far: Entity = Asteroid::new(at(300.0, 100.0), vel(-1.0, 0.0), 10.0).unwrap().into();
        let mut far = in_world(far, link);
        assert_eq!(bounce_off(&mut a, &mut far), Err(SimError::NoCollision));
    }

    #[test]
    fn test_bounce_off_boundary() {
        let link = WorldLink::new(WorldId::next(), 1000.0, 1000.0);
        let rock: Entity = Asteroid::new(at(990.0, 500.0), vel(10.0, 3.0), 10.0).unwrap().into();
        let mut rock = in_world(rock, link);
        assert_eq!(bounce_off_boundary(&mut rock), Ok(Wall::Right));
        assert_eq!(rock.body().velocity(), vel(-10.0, 3.0));
        assert_eq!(bounce_off_boundary(&mut rock), Err(SimError::NoCollision));
    }

    #[test]
    fn test_event_display() {
        let event = CollisionEvent::Object {
            first: EntityType::Ship,
            second: EntityType::Asteroid,
            x: 1.0,
            y: 2.5,
        };
        assert_eq!(event.to_string(), "ship hit asteroid at (1.00, 2.50)");
    }

    proptest! {
        #[test]
        fn prop_bounce_conserves_momentum_and_energy(
            angle in 0.0f64..std::f64::consts::TAU,
            ra in 10.0f64..50.0,
            rb in 10.0f64..50.0,
            ma in 1e15f64..1e21,
            mb in 1e15f64..1e21,
            vax in -50.0f64..50.0, vay in -50.0f64..50.0,
            speed in 1.0f64..50.0,
        ) {
            let link = WorldLink::new(WorldId::next(), 1e4, 1e4);
            let dir = glam::DVec2::new(angle.cos(), angle.sin());
            let pa = glam::DVec2::new(5000.0, 5000.0);
            let pb = pa + dir * (ra + rb);
            // b closes in on a along the line of centres
            let vb = glam::DVec2::new(vax, vay) - dir * speed;

            let a = Ship::with_mass(at(pa.x, pa.y), vel(vax, vay), ra, 0.0, ma).unwrap();
            let b = Ship::with_mass(at(pb.x, pb.y), vel(vb.x, vb.y), rb, 0.0, mb).unwrap();
            let mut a = in_world(a.into(), link);
            let mut b = in_world(b.into(), link);

            let scale = momentum(&a).length() + momentum(&b).length();
            let p0 = momentum(&a) + momentum(&b);
            let e0 = energy(&a) + energy(&b);
            bounce_off(&mut a, &mut b).unwrap();
            let p1 = momentum(&a) + momentum(&b);
            let e1 = energy(&a) + energy(&b);

            prop_assert!((p1 - p0).length() <= 1e-9 * scale);
            prop_assert!((e1 - e0).abs() <= 1e-9 * e0.max(1.0));
        }
    }
}
