//! Bullets: fired by ships, bounce off the boundary a limited number of times

use super::Result;
use super::body::Body;
use super::entity::{Behaviour, BoundaryResponse, EntityId};
use super::vector::{Position, Velocity};
use crate::consts::{BULLET_DENSITY, BULLET_MAXIMAL_BOUNCES, BULLET_MINIMAL_RADIUS};

#[derive(Debug, Clone)]
pub struct Bullet {
    body: Body,
    bounces: u32,
    /// Ship that fired this bullet, while it is live in the world
    source: Option<EntityId>,
}

impl Bullet {
    pub fn new(position: Position, velocity: Velocity, radius: f64) -> Result<Self> {
        let body = Body::new(
            position,
            velocity,
            radius,
            BULLET_MINIMAL_RADIUS,
            BULLET_DENSITY,
            BULLET_DENSITY,
        )?;
        Ok(Self {
            body,
            bounces: 0,
            source: None,
        })
    }

    /// Boundary bounces survived since the last reload
    pub fn bounces(&self) -> u32 {
        self.bounces
    }

    pub fn maximal_bounces(&self) -> u32 {
        BULLET_MAXIMAL_BOUNCES
    }

    pub fn source_ship(&self) -> Option<EntityId> {
        self.source
    }

    /// Prepare for a magazine: no source, no bounces, parked on the ship centre
    pub(crate) fn reload(&mut self, ship_centre: Position) {
        self.bounces = 0;
        self.source = None;
        self.body.park_at(ship_centre);
    }

    /// Leave the magazine of `source` at `position` with `velocity`
    pub(crate) fn launch(&mut self, source: EntityId, position: Position, velocity: Velocity) -> Result<()> {
        self.body.set_position(position)?;
        self.body.set_velocity(velocity)?;
        self.source = Some(source);
        Ok(())
    }

    pub(crate) fn clear_source(&mut self) {
        self.source = None;
    }
}

impl Behaviour for Bullet {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn must_show_collision_with(&self, other: EntityId) -> bool {
        self.source != Some(other)
    }

    fn on_boundary_collision(&mut self) -> BoundaryResponse {
        self.bounces += 1;
        if self.bounces > BULLET_MAXIMAL_BOUNCES {
            BoundaryResponse::Destroy
        } else {
            BoundaryResponse::Bounce
        }
    }
}
