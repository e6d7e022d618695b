//! Shared physical record of every entity and the collision primitives on it
//!
//! Geometry lives here because it only needs centres, radii, velocities and
//! the world boundary. Anything that depends on what an entity *is* (mass it
//! carries, how it reacts) lives with the variants.

use std::sync::atomic::{AtomicU64, Ordering};

use glam::DVec2;

use super::Result;
use super::vector::{Position, Velocity};
use crate::consts::{ACCURACY_FACTOR, SPEED_OF_LIGHT};
use crate::error::SimError;

/// Process-unique identity of a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(u64);

impl WorldId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Back-reference from a body to the world it lives in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldLink {
    id: WorldId,
    width: f64,
    height: f64,
}

impl WorldLink {
    pub(crate) fn new(id: WorldId, width: f64, height: f64) -> Self {
        Self { id, width, height }
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

    /// Whether a circle at `position` lies inside the boundary inset by `radius * ACCURACY_FACTOR`
    pub fn surrounds(&self, position: &Position, radius: f64) -> bool {
        let inset = radius * ACCURACY_FACTOR;
        position.x() >= inset
            && position.x() <= self.width - inset
            && position.y() >= inset
            && position.y() <= self.height - inset
    }
}

/// One side of the rectangular boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wall {
    Left,
    Right,
    Bottom,
    Top,
}

impl Wall {
    /// Bottom and top walls; hitting one flips the vertical velocity
    pub fn is_horizontal(self) -> bool {
        matches!(self, Wall::Bottom | Wall::Top)
    }
}

/// Position, motion and matter of a circular body
#[derive(Debug, Clone)]
pub struct Body {
    position: Position,
    velocity: Velocity,
    radius: f64,
    initial_radius: f64,
    minimal_radius: f64,
    density: f64,
    minimal_density: f64,
    speed_limit: f64,
    travelled: f64,
    world: Option<WorldLink>,
    terminated: bool,
}

impl Body {
    /// Create a free-floating body
    ///
    /// The radius must be finite and at least `minimal_radius`. A density that
    /// cannot be honoured (non-finite or below `minimal_density`) falls back to
    /// the minimal density, and the velocity is clamped to the speed of light.
    pub fn new(
        position: Position,
        velocity: Velocity,
        radius: f64,
        minimal_radius: f64,
        density: f64,
        minimal_density: f64,
    ) -> Result<Self> {
        if !(minimal_radius.is_finite() && minimal_radius > 0.0) {
            return Err(SimError::InvalidRadius {
                radius,
                minimal: minimal_radius,
            });
        }
        check_radius(radius, minimal_radius)?;
        if !(minimal_density.is_finite() && minimal_density > 0.0) {
            return Err(SimError::InvalidDensity(minimal_density));
        }
        let density = if density.is_finite() && density >= minimal_density {
            density
        } else {
            log::debug!("density {density} not allowed, using minimum {minimal_density}");
            minimal_density
        };

        Ok(Self {
            position,
            velocity: velocity.clamped(SPEED_OF_LIGHT),
            radius,
            initial_radius: radius,
            minimal_radius,
            density,
            minimal_density,
            speed_limit: SPEED_OF_LIGHT,
            travelled: 0.0,
            world: None,
            terminated: false,
        })
    }

    /// Lower the speed limit; values outside (0, c] fall back to c
    pub(crate) fn with_speed_limit(mut self, limit: f64) -> Self {
        self.speed_limit = if limit.is_finite() && limit > 0.0 && limit <= SPEED_OF_LIGHT {
            limit
        } else {
            SPEED_OF_LIGHT
        };
        self.velocity = self.velocity.clamped(self.speed_limit);
        self
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    pub fn speed(&self) -> f64 {
        self.velocity.speed()
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn initial_radius(&self) -> f64 {
        self.initial_radius
    }

    pub fn minimal_radius(&self) -> f64 {
        self.minimal_radius
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn minimal_density(&self) -> f64 {
        self.minimal_density
    }

    pub fn speed_limit(&self) -> f64 {
        self.speed_limit
    }

    pub fn travelled_distance(&self) -> f64 {
        self.travelled
    }

    pub fn world(&self) -> Option<WorldLink> {
        self.world
    }

    pub fn world_id(&self) -> Option<WorldId> {
        self.world.map(|w| w.id)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// 4/3·π·r³
    pub fn volume(&self) -> f64 {
        4.0 / 3.0 * std::f64::consts::PI * self.radius.powi(3)
    }

    /// Bare mass, without anything the entity carries
    pub fn mass(&self) -> f64 {
        self.density * self.volume()
    }

    /// Change the velocity, clamping it to the speed limit in-direction
    pub fn set_velocity(&mut self, velocity: Velocity) -> Result<()> {
        self.ensure_alive()?;
        let clamped = velocity.clamped(self.speed_limit);
        if clamped != velocity {
            log::debug!("velocity {velocity} clamped to {clamped}");
        }
        self.velocity = clamped;
        Ok(())
    }

    pub(crate) fn ensure_alive(&self) -> Result<()> {
        if self.terminated {
            Err(SimError::EntityTerminated)
        } else {
            Ok(())
        }
    }

    /// Move the centre; inside a world the new centre must respect the boundary
    pub(crate) fn set_position(&mut self, position: Position) -> Result<()> {
        self.ensure_alive()?;
        if let Some(link) = self.world {
            if !link.surrounds(&position, self.radius) {
                return Err(SimError::OutOfBounds {
                    x: position.x(),
                    y: position.y(),
                });
            }
        }
        self.position = position;
        Ok(())
    }

    /// Put a free-floating body down at `position`, leaving any world
    pub(crate) fn park_at(&mut self, position: Position) {
        self.world = None;
        self.position = position;
    }

    pub(crate) fn set_travelled_distance(&mut self, distance: f64) {
        self.travelled = distance;
    }

    pub(crate) fn set_radius(&mut self, radius: f64) -> Result<()> {
        check_radius(radius, self.minimal_radius)?;
        self.radius = radius;
        Ok(())
    }

    pub(crate) fn attach(&mut self, link: WorldLink) {
        self.world = Some(link);
    }

    pub(crate) fn detach(&mut self) {
        self.world = None;
    }

    pub(crate) fn mark_terminated(&mut self) {
        self.world = None;
        self.terminated = true;
    }

    /// Integrate the position over `duration` at the current velocity
    pub(crate) fn advance(&mut self, duration: f64) -> Result<()> {
        self.ensure_alive()?;
        check_duration(duration)?;
        let moved = self.position.as_dvec2() + self.velocity.as_dvec2() * duration;
        self.position = Position::from_dvec2(moved)?;
        self.travelled += self.speed() * duration;
        Ok(())
    }

    pub(crate) fn bounce_off_wall(&mut self, wall: Wall) {
        let v = self.velocity.as_dvec2();
        let flipped = if wall.is_horizontal() {
            DVec2::new(v.x, -v.y)
        } else {
            DVec2::new(-v.x, v.y)
        };
        // Negating a finite component cannot fail
        if let Ok(v) = Velocity::from_dvec2(flipped) {
            self.velocity = v;
        }
    }

    /// Whether both bodies live in the same (existing) world
    pub fn shares_world_with(&self, other: &Body) -> bool {
        matches!((self.world, other.world), (Some(a), Some(b)) if a.id == b.id)
    }

    pub fn distance_between_centres(&self, other: &Body) -> f64 {
        self.position.distance(&other.position)
    }

    /// Gap between the two surfaces; negative when they overlap
    pub fn distance_between(&self, other: &Body) -> f64 {
        if std::ptr::eq(self, other) {
            return 0.0;
        }
        self.distance_between_centres(other) - (self.radius + other.radius)
    }

    /// Centres closer than the radii allow, beyond the tolerance band
    pub fn overlaps(&self, other: &Body) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        let sigma = self.radius + other.radius;
        self.distance_between(other) <= (ACCURACY_FACTOR - 1.0) * sigma
    }

    /// Touching within the tolerance band and closing in on each other
    pub fn apparently_collides_with(&self, other: &Body) -> bool {
        if std::ptr::eq(self, other) || !self.shares_world_with(other) {
            return false;
        }
        let sigma = self.radius + other.radius;
        let d = self.distance_between_centres(other);
        if d < ACCURACY_FACTOR * sigma || d > (2.0 - ACCURACY_FACTOR) * sigma {
            return false;
        }
        let dv = self.velocity.as_dvec2() - other.velocity.as_dvec2();
        let dp = self.position.as_dvec2() - other.position.as_dvec2();
        dv.dot(dp) < 0.0
    }

    /// Earliest time at which the two surfaces touch
    ///
    /// `+∞` when they do not share a world, are separating, or never meet.
    /// An overlapping pair is an error.
    pub fn time_to_collision(&self, other: &Body) -> Result<f64> {
        if !self.shares_world_with(other) {
            return Ok(f64::INFINITY);
        }
        if self.overlaps(other) {
            return Err(SimError::Overlap);
        }
        let dp = other.position.as_dvec2() - self.position.as_dvec2();
        let dv = other.velocity.as_dvec2() - self.velocity.as_dvec2();
        let dvdp = dv.dot(dp);
        if dvdp >= 0.0 {
            return Ok(f64::INFINITY);
        }
        let dvdv = dv.length_squared();
        let sigma = self.radius + other.radius;
        let d = dvdp * dvdp - dvdv * (dp.length_squared() - sigma * sigma);
        if d <= 0.0 {
            return Ok(f64::INFINITY);
        }
        let t = -(dvdp + d.sqrt()) / dvdv;
        Ok(t.max(0.0))
    }

    /// Contact point of the next collision, weighted by the other's radius
    pub fn collision_position(&self, other: &Body) -> Result<Option<Position>> {
        let t = self.time_to_collision(other)?;
        if t.is_infinite() {
            return Ok(None);
        }
        let pa = self.position.as_dvec2() + self.velocity.as_dvec2() * t;
        let pb = other.position.as_dvec2() + other.velocity.as_dvec2() * t;
        Ok(Some(self.weighted_contact(pa, pb, other.radius)?))
    }

    /// Where the two surfaces meet right now
    pub fn contact_point(&self, other: &Body) -> Result<Position> {
        self.weighted_contact(self.position.as_dvec2(), other.position.as_dvec2(), other.radius)
    }

    fn weighted_contact(&self, pa: DVec2, pb: DVec2, other_radius: f64) -> Result<Position> {
        let contact = (pa * other_radius + pb * self.radius) / (self.radius + other_radius);
        Ok(Position::from_dvec2(contact)?)
    }

    /// Advance copies of both bodies and test for an apparent collision
    pub fn collide_after_move(&self, other: &Body, duration: f64) -> Result<bool> {
        let mut a = self.clone();
        let mut b = other.clone();
        a.advance(duration)?;
        b.advance(duration)?;
        Ok(a.apparently_collides_with(&b))
    }

    /// Time until the body touches a wall and which wall that is
    ///
    /// Per axis only the wall in the direction of travel counts. On an exact
    /// tie the horizontal wall wins.
    pub fn next_wall_hit(&self) -> Option<(f64, Wall)> {
        let link = self.world?;
        let p = self.position.as_dvec2();
        let v = self.velocity.as_dvec2();
        let (tx, wx) = axis_hit(p.x, v.x, self.radius, link.width, Wall::Left, Wall::Right);
        let (ty, wy) = axis_hit(p.y, v.y, self.radius, link.height, Wall::Bottom, Wall::Top);
        if tx.is_infinite() && ty.is_infinite() {
            None
        } else if ty <= tx {
            Some((ty, wy))
        } else {
            Some((tx, wx))
        }
    }

    /// `+∞` outside a world or when standing still
    pub fn time_to_boundary_collision(&self) -> f64 {
        self.next_wall_hit().map_or(f64::INFINITY, |(t, _)| t)
    }

    /// Point on the struck wall where the next boundary collision happens
    pub fn boundary_collision_position(&self) -> Result<Option<Position>> {
        let (Some(link), Some((t, wall))) = (self.world, self.next_wall_hit()) else {
            return Ok(None);
        };
        let at = self.position.as_dvec2() + self.velocity.as_dvec2() * t;
        Ok(Some(wall_point(at, wall, link)?))
    }

    /// Point on `wall` facing the current centre
    pub fn wall_contact(&self, wall: Wall) -> Result<Position> {
        let link = self.world.ok_or(SimError::NotInWorld)?;
        wall_point(self.position.as_dvec2(), wall, link)
    }

    /// Wall the body is touching (within tolerance) and moving into, if any
    pub fn apparent_wall_collision(&self) -> Option<Wall> {
        let link = self.world?;
        let p = self.position.as_dvec2();
        let v = self.velocity.as_dvec2();
        let lo = ACCURACY_FACTOR * self.radius;
        let hi = (2.0 - ACCURACY_FACTOR) * self.radius;
        let touching = |gap: f64| gap >= lo && gap <= hi;

        [
            (Wall::Bottom, p.y, v.y < 0.0),
            (Wall::Top, link.height - p.y, v.y > 0.0),
            (Wall::Left, p.x, v.x < 0.0),
            (Wall::Right, link.width - p.x, v.x > 0.0),
        ]
        .into_iter()
        .find(|&(_, gap, closing)| closing && touching(gap))
        .map(|(wall, _, _)| wall)
    }
}

fn wall_point(centre: DVec2, wall: Wall, link: WorldLink) -> Result<Position> {
    let contact = match wall {
        Wall::Left => DVec2::new(0.0, centre.y),
        Wall::Right => DVec2::new(link.width, centre.y),
        Wall::Bottom => DVec2::new(centre.x, 0.0),
        Wall::Top => DVec2::new(centre.x, link.height),
    };
    Ok(Position::from_dvec2(contact)?)
}

fn axis_hit(p: f64, v: f64, r: f64, extent: f64, low: Wall, high: Wall) -> (f64, Wall) {
    if v > 0.0 {
        (((extent - r - p) / v).max(0.0), high)
    } else if v < 0.0 {
        (((r - p) / v).max(0.0), low)
    } else {
        (f64::INFINITY, high)
    }
}

fn check_radius(radius: f64, minimal: f64) -> Result<()> {
    if radius.is_finite() && radius >= minimal {
        Ok(())
    } else {
        Err(SimError::InvalidRadius { radius, minimal })
    }
}

pub(crate) fn check_duration(duration: f64) -> Result<()> {
    if duration.is_finite() && duration >= 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidDuration(duration))
    }
}
