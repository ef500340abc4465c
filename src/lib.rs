#![warn(missing_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Generation
//!
//! A chunked voxel world generation engine: noise-driven terrain with
//! biomes and foliage, block editing, and chunk meshing, streamed around an
//! observer on background worker threads.
//!
//! The crate is a library first. It owns no window, GPU device or input
//! stack; the host engine drives [`engine_state::EngineState::tick`] with an
//! observer position and uploads the mesh buffers it finds in the
//! [`engine_state::meshing::MeshStore`]. The bundled binary is a headless
//! demo driver that exercises the same surface.
//!
//! ## Key Modules
//!
//! * `core` - the shared-resource handle used across threads
//! * `engine_state` - world state, generation, meshing, streaming and the
//!   task system
//!
//! ## Architecture
//!
//! The world is a sparse 2D grid of chunks, each `chunk_size`² columns of
//! `chunk_height` blocks. A streaming controller loads, generates and
//! meshes chunks around the observer: chunk generation and mesh building
//! run as tasks on a worker pool, while all world mutation happens on the
//! main thread when task results are applied. Meshes are split per material
//! class (opaque / water / masked) and carry their texture indices in the
//! vertex color alpha, ready for a host renderer to upload.
//!
//! ## Usage
//!
//! ```no_run
//! use cgmath::Point3;
//! use voxel_generation::engine_state::{EngineConfig, EngineState};
//!
//! let mut engine = EngineState::new(EngineConfig::default());
//! let observer = Point3::new(0.0, 0.0, 2000.0);
//! loop {
//!     engine.tick(observer);
//!     if engine.is_settled() {
//!         break;
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use cgmath::{Point3, Vector3};
use log::{error, info};

use engine_state::voxels::block::BlockType;
use engine_state::{EngineConfig, EngineState};

pub mod core;
pub mod engine_state;

/// Ticks the engine until all visible chunks are meshed, with a safety
/// timeout.
fn settle(engine: &mut EngineState, observer: Point3<f32>, label: &str) {
    let started = Instant::now();
    loop {
        engine.tick(observer);
        if engine.is_settled() {
            break;
        }
        if started.elapsed() > Duration::from_secs(60) {
            error!("{}: streaming did not settle within 60s", label);
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    info!("{}: settled in {:?}", label, started.elapsed());
}

/// Runs the headless demo: loads the configuration (first CLI argument,
/// JSON, optional), streams the world in around an observer, walks east a
/// few chunks, digs and places some blocks, and logs world statistics.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("could not load config {:?}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let mut engine = EngineState::new(config);
    let scaled = engine.settings().scaled_block_size();
    let chunk_span = engine.settings().chunk_size as f32 * scaled;
    let eye_height = engine.settings().chunk_height as f32 * scaled;

    // Initial load, the way the original paused the game until the world
    // around the player finished streaming in.
    let mut observer = Point3::new(0.5 * chunk_span, 0.5 * chunk_span, eye_height);
    settle(&mut engine, observer, "initial load");
    log_world_stats(&engine);

    // Walk east across a few chunk borders.
    for _ in 0..3 {
        observer.x += chunk_span;
        settle(&mut engine, observer, "walk east");
    }
    log_world_stats(&engine);

    // Dig a small hole below the observer, then cap it with stone.
    let down = Vector3::new(0.0, 0.0, -1.0);
    let reach = engine.settings().chunk_height as f32 * scaled * 2.0;
    for _ in 0..3 {
        if !engine.destroy_block_from_ray(observer, down, reach) {
            break;
        }
        settle(&mut engine, observer, "dig");
    }
    if engine.spawn_block_from_ray(observer, down, reach, BlockType::Stone) {
        settle(&mut engine, observer, "place");
    }

    if let Some(hit) = engine.pick_block(observer, down, reach) {
        info!(
            "surface under observer: {:?} at z {}",
            hit.block,
            hit.block_position.z
        );
    }
    log_world_stats(&engine);
}

fn log_world_stats(engine: &EngineState) {
    let world = engine.world().get();
    let meshes = engine.meshes().get();
    info!(
        "world: {} chunks loaded, {} meshed, {} vertices, {} triangles",
        world.chunk_count(),
        meshes.len(),
        meshes.total_vertices(),
        meshes.total_triangles()
    );
}
