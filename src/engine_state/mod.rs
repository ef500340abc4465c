//! # Engine State
//!
//! The top-level engine object and the services background tasks use to
//! apply their results.
//!
//! [`EngineState`] owns the world, the mesh store, the terrain generator,
//! the worker pool and the streaming controller, and exposes the operations
//! a host drives it with: tick it with an observer position, edit blocks
//! through raycasts, regenerate the world with a new seed, and read the
//! finished meshes out of the store.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use cgmath::{Point3, Vector3};
use log::info;
use serde::Deserialize;

use crate::core::MtResource;
use crate::engine_state::generation::biome::BiomeTable;
use crate::engine_state::generation::{TerrainGenerator, TerrainSettings};
use crate::engine_state::meshing::{MesherKind, MeshStore};
use crate::engine_state::settings::{ConfigError, WorldSettings};
use crate::engine_state::task_management::TaskManager;
use crate::engine_state::voxels::block::{BlockRegistry, BlockType};
use crate::engine_state::voxels::raycast::{raycast, RaycastHit};
use crate::engine_state::voxels::streaming::ChunkStreamer;
use crate::engine_state::voxels::world::World;

pub mod generation;
pub mod meshing;
pub mod settings;
pub mod task_management;
pub mod voxels;

/// The complete engine configuration, loadable from one JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// World dimensions, seed and streaming distances.
    pub world: WorldSettings,
    /// Terrain shape, noise and biome thresholds.
    pub terrain: TerrainSettings,
    /// Which mesher builds chunk geometry.
    pub mesher: MesherKind,
}

impl EngineConfig {
    /// Loads the configuration from a JSON file.
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Shared handles handed to task results when they are applied on the main
/// thread.
pub struct EngineServices {
    /// The world map.
    pub world: MtResource<World>,
    /// The mesh store.
    pub meshes: MtResource<MeshStore>,
    /// Counter of mesh build tasks currently in flight, shared with the
    /// streaming controller that enforces the concurrency cap.
    pub mesh_tasks_in_flight: Arc<AtomicUsize>,
}

/// The engine: world state, generation, meshing and streaming behind one
/// facade.
pub struct EngineState {
    settings: Arc<WorldSettings>,
    registry: Arc<BlockRegistry>,
    terrain_settings: TerrainSettings,
    biomes: BiomeTable,
    generator: Arc<TerrainGenerator>,
    world: MtResource<World>,
    meshes: MtResource<MeshStore>,
    task_manager: TaskManager,
    streamer: ChunkStreamer,
    current_seed: i32,
}

impl EngineState {
    /// Builds an engine from a configuration, with the default block
    /// registry and biome table.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_tables(
            config,
            BlockRegistry::with_defaults(),
            BiomeTable::with_defaults(),
        )
    }

    /// Builds an engine with explicit block and biome tables (for hosts that
    /// load their own data files).
    pub fn with_tables(config: EngineConfig, registry: BlockRegistry, biomes: BiomeTable) -> Self {
        let settings = Arc::new(config.world);
        let registry = Arc::new(registry);
        let current_seed = settings.seed;

        let generator = Arc::new(TerrainGenerator::with_seed(
            settings.clone(),
            config.terrain.clone(),
            biomes.clone(),
            current_seed,
        ));
        let world = MtResource::new(World::new(settings.clone(), registry.clone()));
        let meshes = MtResource::new(MeshStore::new());
        let task_manager = TaskManager::new(settings.worker_threads);
        let streamer = ChunkStreamer::new(settings.clone(), registry.clone(), config.mesher);

        info!(
            "engine initialized: seed {}, chunk {}x{}x{}, draw distance {}",
            current_seed,
            settings.chunk_size,
            settings.chunk_size,
            settings.chunk_height,
            settings.draw_distance
        );

        EngineState {
            settings,
            registry,
            terrain_settings: config.terrain,
            biomes,
            generator,
            world,
            meshes,
            task_manager,
            streamer,
            current_seed,
        }
    }

    /// The services view used by task results.
    pub fn services(&self) -> EngineServices {
        EngineServices {
            world: self.world.clone(),
            meshes: self.meshes.clone(),
            mesh_tasks_in_flight: self.streamer.mesh_tasks_in_flight(),
        }
    }

    /// One engine tick: stream chunks around the observer, apply completed
    /// background work, and keep the workers fed.
    pub fn tick(&mut self, observer: Point3<f32>) {
        let services = self.services();
        self.streamer
            .update(observer, &services, &self.generator, &mut self.task_manager);
        self.task_manager.process_completed_tasks(&services);
        self.task_manager.process_queued_tasks();
    }

    /// Runs all queued background work inline. Only meaningful when the
    /// engine was configured with zero worker threads; tests use this to
    /// drive streaming deterministically.
    pub fn drain_background_work(&mut self) {
        let services = self.services();
        self.task_manager.drain_synchronously(&services);
    }

    /// Whether every visible chunk is loaded and meshed and no background
    /// work is pending. Meaningful after the first tick.
    pub fn is_settled(&self) -> bool {
        !self.task_manager.has_pending_work() && self.streamer.is_settled(&self.services())
    }

    /// Casts a ray from `eye` along `direction` against solid blocks.
    pub fn pick_block(
        &self,
        eye: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<RaycastHit> {
        raycast(&self.world.get(), &self.settings, eye, direction, max_distance)
    }

    /// Places a block against the face hit by the ray. Returns whether a
    /// block was placed.
    pub fn spawn_block_from_ray(
        &mut self,
        eye: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        block: BlockType,
    ) -> bool {
        let Some(hit) = self.pick_block(eye, direction, max_distance) else {
            return false;
        };
        let Some(normal) = hit.face_normal else {
            return false;
        };

        let chunk_position = self.settings.chunk_containing_block(hit.block_position);
        let local = self.settings.local_block_position(hit.block_position) + normal;
        let affected = self.world.get().spawn_block(chunk_position, local, block);
        let placed = !affected.is_empty();
        self.streamer.request_remesh(&affected);
        placed
    }

    /// Destroys the block hit by the ray. Returns whether a block was
    /// destroyed.
    pub fn destroy_block_from_ray(
        &mut self,
        eye: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> bool {
        let Some(hit) = self.pick_block(eye, direction, max_distance) else {
            return false;
        };

        let chunk_position = self.settings.chunk_containing_block(hit.block_position);
        let local = self.settings.local_block_position(hit.block_position);
        let affected = self.world.get().destroy_block(chunk_position, local);
        let destroyed = !affected.is_empty();
        self.streamer.request_remesh(&affected);
        destroyed
    }

    /// Throws the world away and starts over, optionally with a new seed.
    /// The next tick rebuilds everything around the observer.
    pub fn regenerate_world(&mut self, seed: Option<i32>) {
        self.current_seed = seed.unwrap_or(self.current_seed);
        info!("regenerating world with seed {}", self.current_seed);

        self.world.get_mut().clear();
        self.meshes.get_mut().clear();
        self.streamer.reset();
        self.generator = Arc::new(TerrainGenerator::with_seed(
            self.settings.clone(),
            self.terrain_settings.clone(),
            self.biomes.clone(),
            self.current_seed,
        ));
    }

    /// The world settings.
    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    /// The block registry.
    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// The world map handle.
    pub fn world(&self) -> &MtResource<World> {
        &self.world
    }

    /// The mesh store handle.
    pub fn meshes(&self) -> &MtResource<MeshStore> {
        &self.meshes
    }

    /// The seed the current world was generated with.
    pub fn current_seed(&self) -> i32 {
        self.current_seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point2;

    fn test_config() -> EngineConfig {
        let world = WorldSettings::from_json_str(
            r#"{
                "chunk_size": 8,
                "chunk_height": 32,
                "draw_distance": 1,
                "water_level": 6,
                "worker_threads": 0,
                "max_concurrent_mesh_tasks": 64,
                "seed": 99
            }"#,
        )
        .unwrap();
        let mut terrain = TerrainSettings::default();
        terrain.base_height = 12.0;
        terrain.amplitude = 6.0;
        EngineConfig {
            world,
            terrain,
            mesher: MesherKind::Greedy,
        }
    }

    fn settle(engine: &mut EngineState, observer: Point3<f32>) {
        for _ in 0..64 {
            engine.tick(observer);
            engine.drain_background_work();
            if engine.is_settled() {
                return;
            }
        }
        panic!("engine did not settle");
    }

    #[test]
    fn initial_load_fills_the_streaming_radii() {
        let mut engine = EngineState::new(test_config());
        let observer = Point3::new(0.0, 0.0, 500.0);
        settle(&mut engine, observer);

        let load = engine.settings().load_distance();
        let draw = engine.settings().draw_distance;
        let expected_loaded = ((2 * load + 1) * (2 * load + 1)) as usize;
        let expected_meshed = ((2 * draw + 1) * (2 * draw + 1)) as usize;

        assert_eq!(engine.world().get().chunk_count(), expected_loaded);
        assert_eq!(engine.meshes().get().len(), expected_meshed);
        assert!(engine.meshes().get().total_vertices() > 0);
    }

    #[test]
    fn crossing_a_chunk_border_restreams() {
        let mut engine = EngineState::new(test_config());
        let scaled = engine.settings().scaled_block_size();
        let chunk_span = engine.settings().chunk_size as f32 * scaled;

        settle(&mut engine, Point3::new(0.0, 0.0, 500.0));
        assert!(engine.world().get().contains(Point2::new(-2, 0)));

        // Move three chunks east; the far western chunks must unload.
        settle(&mut engine, Point3::new(3.0 * chunk_span + 1.0, 0.0, 500.0));
        assert!(!engine.world().get().contains(Point2::new(-2, 0)));
        assert!(engine.world().get().contains(Point2::new(5, 0)));
        assert!(engine.meshes().get().get(Point2::new(3, 0)).is_some());
        assert!(engine.meshes().get().get(Point2::new(-1, 0)).is_none());
    }

    #[test]
    fn ray_edits_modify_the_world_and_remesh() {
        let mut engine = EngineState::new(test_config());
        let scaled = engine.settings().scaled_block_size();
        let observer = Point3::new(4.5 * scaled, 4.5 * scaled, 30.0 * scaled);
        settle(&mut engine, observer);

        let down = Vector3::new(0.0, 0.0, -1.0);
        let hit = engine
            .pick_block(observer, down, 40.0 * scaled)
            .expect("terrain below the observer");
        let surface_z = hit.block_position.z;

        assert!(engine.destroy_block_from_ray(observer, down, 40.0 * scaled));
        settle(&mut engine, observer);

        let after = engine
            .pick_block(observer, down, 40.0 * scaled)
            .expect("terrain below after digging");
        assert!(after.block_position.z < surface_z);

        // Place a block back onto the newly exposed surface.
        assert!(engine.spawn_block_from_ray(observer, down, 40.0 * scaled, BlockType::Stone));
        settle(&mut engine, observer);
        let rebuilt = engine
            .pick_block(observer, down, 40.0 * scaled)
            .expect("placed block");
        assert_eq!(rebuilt.block_position.z, after.block_position.z + 1);
        assert_eq!(rebuilt.block, BlockType::Stone);
    }

    #[test]
    fn edits_survive_streaming_out_and_back() {
        let mut engine = EngineState::new(test_config());
        let scaled = engine.settings().scaled_block_size();
        let chunk_span = engine.settings().chunk_size as f32 * scaled;
        let home = Point3::new(4.5 * scaled, 4.5 * scaled, 30.0 * scaled);
        settle(&mut engine, home);

        let down = Vector3::new(0.0, 0.0, -1.0);
        let before = engine.pick_block(home, down, 40.0 * scaled).unwrap();
        engine.destroy_block_from_ray(home, down, 40.0 * scaled);
        settle(&mut engine, home);

        // Walk far enough that the home chunk unloads, then come back.
        let away = Point3::new(10.0 * chunk_span, 0.0, 30.0 * scaled);
        settle(&mut engine, away);
        assert!(!engine.world().get().contains(Point2::new(0, 0)));
        settle(&mut engine, home);

        let after = engine.pick_block(home, down, 40.0 * scaled).unwrap();
        // The block destroyed before leaving is still gone.
        assert!(after.block_position.z < before.block_position.z);
    }

    #[test]
    fn regeneration_rebuilds_with_the_new_seed() {
        let mut engine = EngineState::new(test_config());
        let observer = Point3::new(0.0, 0.0, 500.0);
        settle(&mut engine, observer);

        let heights_before: Vec<i32> = {
            let world = engine.world().get();
            let chunk = world.chunk_at(Point2::new(0, 0)).unwrap();
            let columns = chunk.get().columns().iter().map(|c| c.height).collect();
            columns
        };

        engine.regenerate_world(Some(12345));
        assert_eq!(engine.world().get().chunk_count(), 0);
        assert!(engine.meshes().get().is_empty());

        settle(&mut engine, observer);
        let heights_after: Vec<i32> = {
            let world = engine.world().get();
            let chunk = world.chunk_at(Point2::new(0, 0)).unwrap();
            let columns = chunk.get().columns().iter().map(|c| c.height).collect();
            columns
        };
        assert_ne!(heights_before, heights_after);
        assert_eq!(engine.current_seed(), 12345);
    }

    #[test]
    fn engine_config_parses_from_json() {
        let config: EngineConfig = serde_json::from_str(
            r#"{
                "world": { "seed": 5 },
                "mesher": "culled",
                "terrain": { "base_height": 40.0 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.world.seed, 5);
        assert_eq!(config.mesher, MesherKind::Culled);
        assert_eq!(config.terrain.base_height, 40.0);
    }
}
