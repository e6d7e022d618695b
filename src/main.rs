//! Asteroids Sim entry point
//!
//! Builds a world from a settings file (or the built-in demo scenario) and
//! evolves it in reporting intervals, logging every visible collision.
//!
//! Usage: `asteroids-sim [settings.json]`

use std::process::ExitCode;

use asteroids_sim::Settings;
use asteroids_sim::cartesian_to_polar;
use asteroids_sim::sim::{Behaviour, CollisionListener, Entity, EntityType, World};

/// Logs collisions as they happen
#[derive(Debug, Default)]
struct LoggingListener {
    boundary: usize,
    objects: usize,
}

impl CollisionListener for LoggingListener {
    fn boundary_collision(&mut self, entity: &Entity, x: f64, y: f64) {
        self.boundary += 1;
        log::info!("{} hit the boundary at ({x:.2}, {y:.2})", entity.entity_type().as_str());
    }

    fn object_collision(&mut self, first: &Entity, second: &Entity, x: f64, y: f64) {
        self.objects += 1;
        log::info!(
            "{} hit {} at ({x:.2}, {y:.2})",
            first.entity_type().as_str(),
            second.entity_type().as_str()
        );
    }
}

fn census(world: &World, elapsed: f64) {
    let count = |kind| world.entities_of_type(kind).count();
    log::info!(
        "t={elapsed:.1}s: {} ships, {} bullets, {} asteroids, {} planetoids",
        count(EntityType::Ship),
        count(EntityType::Bullet),
        count(EntityType::Asteroid),
        count(EntityType::Planetoid)
    );
    for (id, ship) in world.ships() {
        let body = ship.body();
        let (speed, heading) = cartesian_to_polar(body.velocity().as_dvec2());
        log::info!(
            "  ship {id:?} at {} moving {speed:.1} km/s heading {:.1}°, {} bullets loaded",
            body.position(),
            heading.to_degrees(),
            ship.magazine_len()
        );
    }
}

fn run(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let mut world = settings.build_world()?;
    log::info!(
        "World {}x{} km with {} entities (seed {})",
        world.width(),
        world.height(),
        world.len(),
        world.seed()
    );

    let interval = if settings.report_interval > 0.0 {
        settings.report_interval
    } else {
        settings.duration
    };
    let mut listener = LoggingListener::default();
    let mut elapsed = 0.0;
    census(&world, elapsed);
    while elapsed < settings.duration {
        let step = interval.min(settings.duration - elapsed);
        world.evolve(step, &mut listener)?;
        elapsed += step;
        census(&world, elapsed);
    }

    log::info!(
        "Done: {} boundary and {} object collisions in {:.1}s",
        listener.boundary,
        listener.objects,
        elapsed
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Asteroids Sim starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => match Settings::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Could not load {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            log::info!("No settings file given, running the demo scenario");
            Settings::default()
        }
    };

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Simulation failed: {e}");
            ExitCode::FAILURE
        }
    }
}
