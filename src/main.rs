//! Zone Slide entry point
//!
//! Headless native runner: loads a map (or the built-in demo map), drives the
//! player with a scripted input track at a fixed timestep, and logs what
//! happens. Set `RUST_LOG=debug` to see handler dispatch and rebuilds.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use glam::DVec2;

    use zone_slide::consts::SIM_DT;
    use zone_slide::mapdef::MapDef;
    use zone_slide::overlay;
    use zone_slide::sim::{EventKind, FIGHT_HANDLER, TickInput, World, tick};
    use zone_slide::{Settings, WorldError};

    const DEMO_MAP: &str = r#"{
        "player": "hero",
        "layers": [
            {
                "name": "ground",
                "zones": [
                    { "name": "hall", "points": [[0,0],[160,0],[160,96],[0,96]],
                      "flags": { "walkable": true } },
                    { "name": "yard", "points": [[160,32],[288,32],[288,160],[160,160]],
                      "flags": { "walkable": true }, "events": { "onEnter": "enter_yard" } }
                ],
                "obstructions": [
                    { "x1": 224, "y1": 32, "x2": 224, "y2": 96, "name": "fence" }
                ],
                "triggers": [
                    { "name": "lever", "x": 192, "y": 96, "width": 16, "height": 16,
                      "obstructions": ["fence"] }
                ],
                "actors": [
                    { "id": "hero", "name": "hero", "x": 24, "y": 48, "triggersEvents": true,
                      "pushStrength": 2 },
                    { "id": "crate", "name": "crate", "x": 96, "y": 48, "pushWeight": 1 },
                    { "name": "cat", "x": 120, "y": 80, "behavior": "wander" },
                    { "name": "sentry", "x": 264, "y": 136, "behavior": "guard_up" }
                ]
            }
        ]
    }"#;

    /// Scripted input: (seconds, move_x, move_y, confirm)
    const SCRIPT: &[(f64, f64, f64, bool)] = &[
        (1.5, 1.0, 0.0, false),
        (0.8, 1.0, 0.3, false),
        (0.5, 0.0, 1.0, false),
        (0.1, 0.0, 1.0, true),
        (1.0, 1.0, 0.0, false),
        (3.0, 0.0, 0.0, false),
    ];

    pub fn run() -> Result<(), WorldError> {
        let mut args = std::env::args().skip(1);
        let map = match args.next() {
            Some(path) => MapDef::load(path)?,
            None => MapDef::from_json_str(DEMO_MAP)?,
        };
        let settings = match args.next() {
            Some(path) => Settings::load_or_default(path),
            None => Settings::default(),
        };

        let mut world = World::from_map_def(&map, settings)?;
        register_handlers(&mut world);

        let mut accumulator = 0.0;
        let mut elapsed = 0.0;
        let mut frame = 0u64;
        for &(seconds, move_x, move_y, confirm) in SCRIPT {
            let mut input = TickInput {
                move_x,
                move_y,
                confirm,
            };
            accumulator += seconds;
            while accumulator >= SIM_DT {
                tick(&mut world, &input, SIM_DT);
                accumulator -= SIM_DT;
                elapsed += SIM_DT;
                frame += 1;

                // Clear one-shot inputs after processing
                input.confirm = false;

                if frame % 60 == 0 {
                    report(&world, elapsed);
                }
            }
        }

        if world.settings().debug_overlay {
            for layer in 0..world.layers().len() {
                let shapes = overlay::collect(&world, zone_slide::sim::LayerId(layer));
                let vertices = overlay::line_vertices(&shapes);
                log::info!(
                    "overlay layer {layer}: {} shapes, {} vertices",
                    shapes.len(),
                    vertices.len()
                );
            }
        }
        Ok(())
    }

    fn register_handlers(world: &mut World) {
        world.handlers.register("enter_yard", |world: &mut World, ctx| {
            let name = world.actor(ctx.actor).map(|a| a.name.clone()).unwrap_or_default();
            log::info!("{name} entered the yard at tile {:?}", ctx.tile);
        });
        world.handlers.register("lever", |world: &mut World, ctx| {
            let Some(layer) = world.actor(ctx.actor).map(|a| a.layer()) else {
                return;
            };
            if let (EventKind::Trigger { trigger }, Some(l)) = (&ctx.kind, world.layer_mut(layer)) {
                let solid = !l.triggers[*trigger].solid();
                l.set_trigger_solid(*trigger, solid);
                log::info!("lever pulled, fence {}", if solid { "closed" } else { "open" });
            }
        });
        world.handlers.register(FIGHT_HANDLER, |world: &mut World, ctx| {
            log::info!("fight! {} caught the player", ctx.actor);
            world.stun(ctx.actor, 2.0);
        });
    }

    fn report(world: &World, elapsed: f64) {
        for id in world.actor_ids() {
            let Some(actor) = world.actor(id) else {
                continue;
            };
            let DVec2 { x, y } = actor.position;
            log::info!(
                "t={elapsed:.1}s {:<6} ({x:7.2}, {y:7.2}) {:?}{}",
                actor.name,
                actor.animation,
                if actor.is_stationary() { "" } else { " moving" }
            );
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Zone Slide (native) starting...");

    if let Err(e) = native::run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the host on wasm; there is no standalone runner
}
