//! Onboard ship programs
//!
//! A program runs once per advance of the world with the simulated time that
//! elapsed. It steers its ship through `ShipControl` and may run out of time
//! before its next step, which only ends its turn for that advance.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entity::EntityId;
use super::ship::Ship;
use super::world::World;
use crate::consts::ACTION_DURATION;
use crate::error::SimError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProgramError {
    /// Not enough time left in this advance to finish the next step
    #[error("insufficient time to execute the next action")]
    InsufficientTime,

    #[error(transparent)]
    Sim(#[from] SimError),
}

pub trait ShipProgram: fmt::Debug {
    fn execute(&mut self, ship: &mut ShipControl<'_>, duration: f64) -> Result<(), ProgramError>;
}

/// The handle a program steers its ship with
pub struct ShipControl<'w> {
    world: &'w mut World,
    ship: EntityId,
}

impl<'w> ShipControl<'w> {
    pub(crate) fn new(world: &'w mut World, ship: EntityId) -> Self {
        Self { world, ship }
    }

    pub fn id(&self) -> EntityId {
        self.ship
    }

    pub fn ship(&self) -> Result<&Ship, SimError> {
        self.world.ship(self.ship)
    }

    pub fn world(&self) -> &World {
        self.world
    }

    pub fn thrust_on(&mut self) -> Result<(), SimError> {
        self.world.ship_mut(self.ship)?.thrust_on()
    }

    pub fn thrust_off(&mut self) -> Result<(), SimError> {
        self.world.ship_mut(self.ship)?.thrust_off()
    }

    pub fn turn(&mut self, angle: f64) -> Result<(), SimError> {
        self.world.ship_mut(self.ship)?.turn(angle)
    }

    pub fn fire_bullet(&mut self) -> Result<Option<EntityId>, SimError> {
        self.world.fire_bullet(self.ship)
    }
}

/// One scripted step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipAction {
    ThrustOn,
    ThrustOff,
    Turn(f64),
    Fire,
    Wait,
}

/// Fixed queue of actions, each costing `ACTION_DURATION` of simulated time
///
/// Unused time carries over to the next advance.
#[derive(Debug, Clone, Default)]
pub struct ActionProgram {
    actions: VecDeque<ShipAction>,
    banked: f64,
    executed: usize,
}

impl ActionProgram {
    pub fn new(actions: impl IntoIterator<Item = ShipAction>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
            banked: 0.0,
            executed: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.actions.len()
    }

    pub fn executed(&self) -> usize {
        self.executed
    }

    pub fn is_finished(&self) -> bool {
        self.actions.is_empty()
    }
}

impl ShipProgram for ActionProgram {
    fn execute(&mut self, ship: &mut ShipControl<'_>, duration: f64) -> Result<(), ProgramError> {
        if self.actions.is_empty() {
            return Ok(());
        }
        self.banked += duration;
        while let Some(&action) = self.actions.front() {
            if self.banked < ACTION_DURATION {
                return Err(ProgramError::InsufficientTime);
            }
            self.banked -= ACTION_DURATION;
            self.actions.pop_front();
            self.executed += 1;
            match action {
                ShipAction::ThrustOn => ship.thrust_on()?,
                ShipAction::ThrustOff => ship.thrust_off()?,
                ShipAction::Turn(angle) => ship.turn(angle)?,
                ShipAction::Fire => {
                    ship.fire_bullet()?;
                }
                ShipAction::Wait => {}
            }
        }
        self.banked = 0.0;
        Ok(())
    }
}
