//! Ships: thrusters, orientation, a magazine of owned bullets and the set of
//! bullets they have fired into the world

use std::collections::BTreeSet;

use super::Result;
use super::body::Body;
use super::bullet::Bullet;
use super::entity::{Behaviour, EntityId, MoveOutcome};
use super::program::ShipProgram;
use super::vector::{Position, Velocity};
use crate::consts::{SHIP_MINIMAL_DENSITY, SHIP_MINIMAL_RADIUS, SHIP_THRUSTER_FORCE};
use crate::error::SimError;
use crate::{normalize_angle, polar_to_cartesian};

#[derive(Debug)]
pub struct Ship {
    body: Body,
    /// Heading in radians, [0, 2π)
    orientation: f64,
    thruster_force: f64,
    thruster_on: bool,
    magazine: Vec<Bullet>,
    /// Bullets of this ship currently live in the same world
    fired: BTreeSet<EntityId>,
    program: Option<Box<dyn ShipProgram>>,
}

impl Ship {
    /// Ship at minimal density
    pub fn new(position: Position, velocity: Velocity, radius: f64, orientation: f64) -> Result<Self> {
        Self::build(position, velocity, radius, orientation, SHIP_MINIMAL_DENSITY)
    }

    /// Ship of the given mass; the density is derived from it
    pub fn with_mass(
        position: Position,
        velocity: Velocity,
        radius: f64,
        orientation: f64,
        mass: f64,
    ) -> Result<Self> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(SimError::InvalidMass(mass));
        }
        let volume = 4.0 / 3.0 * std::f64::consts::PI * radius.powi(3);
        Self::build(position, velocity, radius, orientation, mass / volume)
    }

    fn build(
        position: Position,
        velocity: Velocity,
        radius: f64,
        orientation: f64,
        density: f64,
    ) -> Result<Self> {
        if !orientation.is_finite() {
            return Err(SimError::InvalidAngle(orientation));
        }
        let body = Body::new(
            position,
            velocity,
            radius,
            SHIP_MINIMAL_RADIUS,
            density,
            SHIP_MINIMAL_DENSITY,
        )?;
        Ok(Self {
            body,
            orientation: normalize_angle(orientation),
            thruster_force: SHIP_THRUSTER_FORCE,
            thruster_on: false,
            magazine: Vec::new(),
            fired: BTreeSet::new(),
            program: None,
        })
    }

    /// Cap the speed below the speed of light; limits outside (0, c] are ignored
    pub fn with_speed_limit(mut self, limit: f64) -> Self {
        self.body = self.body.with_speed_limit(limit);
        self
    }

    /// Replace the thruster force; negative or non-finite forces are ignored
    pub fn with_thruster_force(mut self, force: f64) -> Self {
        if force.is_finite() && force >= 0.0 {
            self.thruster_force = force;
        }
        self
    }

    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    pub fn thruster_force(&self) -> f64 {
        self.thruster_force
    }

    pub fn is_thruster_active(&self) -> bool {
        self.thruster_on
    }

    pub fn thrust_on(&mut self) -> Result<()> {
        self.body.ensure_alive()?;
        self.thruster_on = true;
        Ok(())
    }

    pub fn thrust_off(&mut self) -> Result<()> {
        self.body.ensure_alive()?;
        self.thruster_on = false;
        Ok(())
    }

    /// Rotate by `angle` radians (counter-clockwise)
    pub fn turn(&mut self, angle: f64) -> Result<()> {
        self.body.ensure_alive()?;
        if !angle.is_finite() {
            return Err(SimError::InvalidAngle(angle));
        }
        self.orientation = normalize_angle(self.orientation + angle);
        Ok(())
    }

    /// Acceleration produced by the thruster right now (km/s²)
    pub fn acceleration(&self) -> f64 {
        if self.thruster_on {
            self.thruster_force / self.total_mass()
        } else {
            0.0
        }
    }

    pub fn magazine(&self) -> &[Bullet] {
        &self.magazine
    }

    pub fn magazine_len(&self) -> usize {
        self.magazine.len()
    }

    pub fn fired_bullets(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.fired.iter().copied()
    }

    pub fn has_fired(&self, bullet: EntityId) -> bool {
        self.fired.contains(&bullet)
    }

    /// Put a free-floating bullet into the magazine
    pub fn load_bullet(&mut self, mut bullet: Bullet) -> Result<()> {
        self.body.ensure_alive()?;
        bullet.body().ensure_alive()?;
        if bullet.body().world().is_some() {
            return Err(SimError::AlreadyInWorld);
        }
        bullet.reload(self.body.position());
        self.magazine.push(bullet);
        Ok(())
    }

    pub fn load_bullets(&mut self, bullets: impl IntoIterator<Item = Bullet>) -> Result<()> {
        for bullet in bullets {
            self.load_bullet(bullet)?;
        }
        Ok(())
    }

    pub fn set_program(&mut self, program: Box<dyn ShipProgram>) {
        self.program = Some(program);
    }

    pub fn has_program(&self) -> bool {
        self.program.is_some()
    }

    pub(crate) fn take_program(&mut self) -> Option<Box<dyn ShipProgram>> {
        self.program.take()
    }

    pub(crate) fn restore_program(&mut self, program: Box<dyn ShipProgram>) {
        if self.program.is_none() {
            self.program = Some(program);
        }
    }

    pub(crate) fn take_bullet(&mut self) -> Option<Bullet> {
        self.magazine.pop()
    }

    pub(crate) fn record_fired(&mut self, bullet: EntityId) {
        self.fired.insert(bullet);
    }

    pub(crate) fn forget_fired(&mut self, bullet: EntityId) -> bool {
        self.fired.remove(&bullet)
    }

    pub(crate) fn take_fired(&mut self) -> BTreeSet<EntityId> {
        std::mem::take(&mut self.fired)
    }

    /// Terminate the ship and every bullet in its magazine
    pub(crate) fn terminate(&mut self) {
        for bullet in &mut self.magazine {
            bullet.body_mut().mark_terminated();
        }
        self.magazine.clear();
        self.fired.clear();
        self.program = None;
        self.thruster_on = false;
        self.body.mark_terminated();
    }
}

impl Behaviour for Ship {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn carried_mass(&self) -> f64 {
        self.magazine.iter().map(|b| b.body().mass()).sum()
    }

    fn can_be_removed_from_world(&self) -> bool {
        self.fired.is_empty()
    }

    fn must_show_collision_with(&self, other: EntityId) -> bool {
        !self.fired.contains(&other)
    }

    fn advance(&mut self, duration: f64) -> Result<MoveOutcome> {
        self.body.advance(duration)?;
        if self.thruster_on {
            let boost = polar_to_cartesian(self.acceleration() * duration, self.orientation);
            let velocity = Velocity::from_dvec2(self.body.velocity().as_dvec2() + boost)?;
            self.body.set_velocity(velocity)?;
        }
        Ok(MoveOutcome::Alive)
    }
}
