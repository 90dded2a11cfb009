//! Headless demo that lights a procedurally generated park.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p parklight-demo -- --frames 120 --no-worker`.

use std::time::{Duration, Instant};

use clap::Parser;
use parklight_config::{CliArgs, Config, MapConfig, default_config_dir};
use parklight_lighting::LightingEngine;
use parklight_world::{
    Direction, ElementKind, EntityKind, MapError, MovingEntity, TILE_SIZE, TileCoord, TileElement,
    TileMap, WorldPos, Z_STEP,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use tracing::{error, info, warn};

/// Ground height of the park in element height units.
const GROUND: u8 = 8;

/// Frames between two lamp toggles.
const TOGGLE_INTERVAL: u32 = 45;

/// Frames between two progress reports.
const REPORT_INTERVAL: u32 = 30;

struct Park {
    map: TileMap,
    /// Row the train runs along.
    track_row: i32,
    /// Path tiles carrying a lamp, toggled during the run.
    lamp_tiles: Vec<TileCoord>,
}

/// Lays out terrain, a path grid with lamps, trees, a walled plaza and a
/// straight track for the train.
fn build_park(size: &MapConfig, seed: u64) -> Result<Park, MapError> {
    let (w, h) = (size.tiles_x as i32, size.tiles_y as i32);
    let mut map = TileMap::new(size.tiles_x, size.tiles_y);
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let track_row = h / 2;
    let mut lamp_tiles = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let tile = TileCoord::new(x, y);
            map.push_element(tile, TileElement::surface(GROUND))?;

            let on_path = x % 8 == 4 || y % 8 == 4;
            if on_path && y != track_row {
                let mut edges = 0;
                for dir in Direction::ALL {
                    let (dx, dy) = dir.offset();
                    let (nx, ny) = (x + dx, y + dy);
                    let inside = (0..w).contains(&nx) && (0..h).contains(&ny);
                    if inside && ny != track_row && (nx % 8 == 4 || ny % 8 == 4) {
                        edges |= dir.bit();
                    }
                }
                let has_lamp = rng.gen_bool(0.2);
                map.push_element(tile, TileElement::path(GROUND, edges, has_lamp))?;
                if has_lamp {
                    lamp_tiles.push(tile);
                }
            } else if y == track_row {
                map.push_element(tile, TileElement::track(GROUND, GROUND + 12, true))?;
            } else if rng.gen_bool(0.08) {
                let height = rng.gen_range(GROUND + 16..=GROUND + 56);
                map.push_element(tile, TileElement::scenery(GROUND, height))?;
            }
        }
    }

    // A small glass-walled plaza in one corner.
    for i in 1..4 {
        let colour = rng.gen_range(0..100);
        let glass = TileElement::glass_wall(GROUND, GROUND + 24, Direction::NegY, colour);
        map.push_element(TileCoord::new(i, 1), glass)?;
        let wall = TileElement::wall(GROUND, GROUND + 24, Direction::PosY);
        map.push_element(TileCoord::new(i, 3), wall)?;
    }

    Ok(Park {
        map,
        track_row,
        lamp_tiles,
    })
}

/// Train head position at `frame`, looping along the track row.
fn train_position(frame: u32, track_row: i32, tiles_x: u32) -> WorldPos {
    let span = tiles_x as i32 * TILE_SIZE;
    let x = (frame as i32 * 6).rem_euclid(span);
    WorldPos::new(x, track_row * TILE_SIZE + TILE_SIZE / 2, (GROUND as i32 + 4) * Z_STEP)
}

/// Slowly swings the skylight direction around the vertical axis.
fn sun_direction(frame: u32) -> [f32; 3] {
    let angle = frame as f32 * 0.01;
    [0.4 * angle.cos(), 0.4 * angle.sin(), -1.0]
}

/// Flips the lamp on `tile`. Returns whether the lamp is now lit.
fn toggle_lamp(map: &mut TileMap, tile: TileCoord) -> Result<bool, MapError> {
    let mut lit = false;
    let mut edges = 0;
    map.remove_elements(tile, |e| match e.kind {
        ElementKind::Path { edges: e_edges, has_lamp } => {
            edges = e_edges;
            lit = !has_lamp;
            true
        }
        _ => false,
    })?;
    map.push_element(tile, TileElement::path(GROUND, edges, lit))?;
    Ok(lit)
}

fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let Park {
        mut map,
        track_row,
        lamp_tiles,
    } = build_park(&config.map, config.demo.seed)?;
    info!(
        "Built {}x{} park with {} lamp tiles (seed {})",
        config.map.tiles_x,
        config.map.tiles_y,
        lamp_tiles.len(),
        config.demo.seed
    );
    // The initial layout is covered by the full invalidation below.
    map.take_modified();

    let mut engine = LightingEngine::new(&config.lighting, &config.map)?;
    let start = Instant::now();
    if let Err(e) = engine.invalidate_all(&map) {
        warn!("Some static lights were dropped: {e}");
    }
    info!("Full invalidation took {:?}", start.elapsed());

    let frame_time = Duration::from_millis(config.demo.frame_ms);
    let mut uploaded_chunks = 0usize;
    let mut uploaded_bytes = 0usize;
    let mut toggles = 0usize;

    for frame in 0..config.demo.frames {
        let frame_start = Instant::now();

        if frame > 0 && frame % TOGGLE_INTERVAL == 0 && !lamp_tiles.is_empty() {
            let tile = lamp_tiles[(frame / TOGGLE_INTERVAL) as usize % lamp_tiles.len()];
            match toggle_lamp(&mut map, tile) {
                Ok(lit) => {
                    toggles += 1;
                    let state = if lit { "on" } else { "off" };
                    info!("Lamp at ({}, {}) switched {state}", tile.x, tile.y);
                }
                Err(e) => warn!("Could not toggle lamp: {e}"),
            }
        }
        for tile in map.take_modified() {
            if let Err(e) = engine.invalidate_around(&map, tile) {
                warn!("Invalidation at ({}, {}) dropped lights: {e}", tile.x, tile.y);
            }
        }

        if frame % REPORT_INTERVAL == 0 {
            engine.set_skylight_direction(sun_direction(frame));
        }

        let train = MovingEntity::new(
            train_position(frame, track_row, config.map.tiles_x),
            EntityKind::TrainHead,
        );
        let car_pos = train_position(frame.saturating_sub(6), track_row, config.map.tiles_x);
        let car = MovingEntity::new(car_pos, EntityKind::TrainCar);

        let batch = engine.update(&map, &[train, car]);
        uploaded_chunks += batch.len();
        uploaded_bytes += batch.iter().map(|u| u.as_bytes().len()).sum::<usize>();

        if frame % REPORT_INTERVAL == 0 {
            let stats = engine.stats();
            info!(
                "Frame {frame}: {} uploads, backlog gpu={} static={} skylight={}, dynamic chunks={}, skylight idle={}",
                batch.len(),
                stats.outdated_gpu,
                stats.outdated_static,
                stats.outdated_skylight,
                stats.dynamic_chunks,
                engine.is_skylight_idle()
            );
        }

        if let Some(rest) = frame_time.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    let stats = engine.stats();
    info!(
        "Done: {} frames, {uploaded_chunks} chunk uploads ({} KiB), {toggles} lamp toggles, {} static light entries",
        config.demo.frames,
        uploaded_bytes / 1024,
        stats.static_lights
    );
    engine.shutdown()?;
    Ok(())
}

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    parklight_log::init_logging(
        Some(&log_dir),
        cfg!(debug_assertions) && config.debug.log_to_file,
        Some(&config),
    );

    if let Err(e) = run(&config) {
        error!("Lighting failed: {e}");
        std::process::exit(1);
    }
}
