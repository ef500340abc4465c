//! # Chunk Streaming
//!
//! Keeps the set of loaded chunks centered on the observer and drives mesh
//! building for the visible ones.
//!
//! ## Update cycle
//!
//! On every tick the controller maps the observer position to a chunk. When
//! the observer crosses into a new chunk it:
//!
//! 1. unloads every chunk beyond the load distance, saving its columns
//! 2. loads every missing chunk inside the load distance, nearest first —
//!    restored from saved columns when possible, otherwise via a background
//!    generation task
//! 3. rebuilds the visible list (the draw-distance square), nearest first
//!
//! Every tick it then dispatches mesh build tasks for visible chunks whose
//! meshes are stale, bounded by `max_concurrent_mesh_tasks`. Chunks dirtied
//! by block edits are remeshed through the same path.
//!
//! The load distance exceeds the draw distance by one ring so border faces
//! of visible chunks always have real neighbor data by the time they mesh.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cgmath::{Point2, Point3};
use log::{debug, info};

use crate::engine_state::generation::TerrainGenerator;
use crate::engine_state::meshing::MesherKind;
use crate::engine_state::settings::WorldSettings;
use crate::engine_state::task_management::TaskManager;
use crate::engine_state::voxels::block::BlockRegistry;
use crate::engine_state::voxels::tasks::{ChunkGenerationTask, ChunkMeshGenerationTask};
use crate::engine_state::EngineServices;

fn chunk_distance_sq(a: Point2<i32>, b: Point2<i32>) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

/// Every chunk position within `distance` of `center`, as a square.
pub fn positions_within(center: Point2<i32>, distance: i32) -> Vec<Point2<i32>> {
    let mut positions = Vec::with_capacity(((2 * distance + 1) * (2 * distance + 1)) as usize);
    for y in center.y - distance..=center.y + distance {
        for x in center.x - distance..=center.x + distance {
            positions.push(Point2::new(x, y));
        }
    }
    positions
}

/// Observer-driven chunk load/unload and mesh scheduling.
pub struct ChunkStreamer {
    settings: Arc<WorldSettings>,
    registry: Arc<BlockRegistry>,
    mesher: MesherKind,
    current_observer_chunk: Point2<i32>,
    visible_chunks: Vec<Point2<i32>>,
    pending_generation: HashSet<Point2<i32>>,
    pending_edits: HashSet<Point2<i32>>,
    mesh_tasks_in_flight: Arc<AtomicUsize>,
    initialized: bool,
}

impl ChunkStreamer {
    /// Creates a streamer. Nothing is loaded until the first
    /// [`ChunkStreamer::update`].
    pub fn new(
        settings: Arc<WorldSettings>,
        registry: Arc<BlockRegistry>,
        mesher: MesherKind,
    ) -> Self {
        ChunkStreamer {
            settings,
            registry,
            mesher,
            current_observer_chunk: Point2::new(0, 0),
            visible_chunks: Vec::new(),
            pending_generation: HashSet::new(),
            pending_edits: HashSet::new(),
            mesh_tasks_in_flight: Arc::new(AtomicUsize::new(0)),
            initialized: false,
        }
    }

    /// The shared in-flight counter, for wiring into [`EngineServices`].
    pub fn mesh_tasks_in_flight(&self) -> Arc<AtomicUsize> {
        self.mesh_tasks_in_flight.clone()
    }

    /// The visible chunk positions, nearest first.
    pub fn visible_chunks(&self) -> &[Point2<i32>] {
        &self.visible_chunks
    }

    /// The chunk the observer was last seen in.
    pub fn observer_chunk(&self) -> Point2<i32> {
        self.current_observer_chunk
    }

    /// Marks chunks whose meshes a block edit invalidated.
    pub fn request_remesh(&mut self, positions: &[Point2<i32>]) {
        self.pending_edits.extend(positions.iter().copied());
    }

    /// Forgets all streaming state. Used by world regeneration; the next
    /// update rebuilds everything around the observer.
    pub fn reset(&mut self) {
        self.visible_chunks.clear();
        self.pending_generation.clear();
        self.pending_edits.clear();
        self.initialized = false;
    }

    /// One streaming tick for the given observer position.
    pub fn update(
        &mut self,
        observer: Point3<f32>,
        services: &EngineServices,
        generator: &Arc<TerrainGenerator>,
        tasks: &mut TaskManager,
    ) {
        let observer_chunk = self.settings.chunk_position_at(observer);
        if !self.initialized || observer_chunk != self.current_observer_chunk {
            debug!(
                "observer crossed into chunk ({}, {})",
                observer_chunk.x, observer_chunk.y
            );
            self.current_observer_chunk = observer_chunk;
            self.initialized = true;
            self.update_chunk_set(services, generator, tasks);
            self.rebuild_visible_list();
        }

        {
            let world = services.world.get();
            self.pending_generation
                .retain(|position| !world.contains(*position));
        }
        self.dispatch_mesh_builds(services, tasks);
    }

    /// Whether all visible chunks are loaded and meshed and no work is
    /// pending. The demo uses this to pause until the initial load is done,
    /// and tests to know when draining is complete.
    pub fn is_settled(&self, services: &EngineServices) -> bool {
        if !self.pending_generation.is_empty() || !self.pending_edits.is_empty() {
            return false;
        }
        if self.mesh_tasks_in_flight.load(Ordering::SeqCst) > 0 {
            return false;
        }
        let world = services.world.get();
        self.visible_chunks.iter().all(|position| {
            world
                .chunk_at(*position)
                .map(|chunk| chunk.get().is_mesh_built)
                .unwrap_or(false)
        })
    }

    fn update_chunk_set(
        &mut self,
        services: &EngineServices,
        generator: &Arc<TerrainGenerator>,
        tasks: &mut TaskManager,
    ) {
        let load_distance = self.settings.load_distance();
        let required: HashSet<Point2<i32>> =
            positions_within(self.current_observer_chunk, load_distance)
                .into_iter()
                .collect();

        let mut world = services.world.get_mut();

        // Unload everything that left the load radius.
        let mut unloaded = 0usize;
        for position in world.chunk_positions() {
            if !required.contains(&position) {
                world.unload_chunk(position);
                services.meshes.get_mut().remove(position);
                unloaded += 1;
            }
        }

        // Load what entered it, nearest chunks first.
        let mut to_add: Vec<Point2<i32>> = required
            .iter()
            .copied()
            .filter(|position| !world.contains(*position))
            .collect();
        to_add.sort_by_key(|position| chunk_distance_sq(self.current_observer_chunk, *position));

        let mut restored = 0usize;
        let mut requested = 0usize;
        for position in to_add {
            if world.try_restore_saved(position) {
                restored += 1;
            } else if self.pending_generation.insert(position) {
                tasks.publish_task(Box::new(ChunkGenerationTask::new(
                    generator.clone(),
                    position,
                )));
                requested += 1;
            }
        }

        self.pending_generation
            .retain(|position| required.contains(position));
        self.pending_edits
            .retain(|position| required.contains(position));

        if unloaded + restored + requested > 0 {
            info!(
                "chunk set update: {} unloaded, {} restored, {} generation tasks",
                unloaded, restored, requested
            );
        }
    }

    fn rebuild_visible_list(&mut self) {
        let mut visible = positions_within(self.current_observer_chunk, self.settings.draw_distance);
        let center = self.current_observer_chunk;
        visible.sort_by_key(|position| chunk_distance_sq(center, *position));
        self.visible_chunks = visible;
    }

    fn dispatch_mesh_builds(&mut self, services: &EngineServices, tasks: &mut TaskManager) {
        let max_tasks = self.settings.max_concurrent_mesh_tasks.max(1);
        let world = services.world.get();

        // Visible chunks first (nearest first), then edit-dirtied chunks
        // that are outside the visible set.
        let mut candidates: Vec<Point2<i32>> = self.visible_chunks.clone();
        candidates.extend(
            self.pending_edits
                .iter()
                .copied()
                .filter(|position| !self.visible_chunks.contains(position)),
        );

        for position in candidates {
            if self.mesh_tasks_in_flight.load(Ordering::SeqCst) >= max_tasks {
                break;
            }
            let Some(chunk) = world.chunk_at(position) else {
                continue;
            };

            // First-time builds wait for all four lateral neighbors so
            // border faces compare against real data; visible chunks sit
            // inside the load radius, so the neighbors always arrive.
            // Edit-driven rebuilds go ahead with whatever is loaded.
            let neighbors = world.neighbor_handles(position);
            if neighbors.iter().any(|neighbor| neighbor.is_none())
                && !self.pending_edits.contains(&position)
            {
                continue;
            }

            {
                let mut chunk = chunk.get_mut();
                if chunk.is_mesh_built || chunk.is_mesh_queued {
                    self.pending_edits.remove(&position);
                    continue;
                }
                chunk.is_mesh_queued = true;
            }

            self.mesh_tasks_in_flight.fetch_add(1, Ordering::SeqCst);
            self.pending_edits.remove(&position);

            tasks.publish_task(Box::new(ChunkMeshGenerationTask::new(
                chunk,
                neighbors,
                self.registry.clone(),
                self.mesher,
                self.settings.scaled_block_size(),
                self.settings.seed,
                position,
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_within_is_the_full_square() {
        let positions = positions_within(Point2::new(2, -1), 2);
        assert_eq!(positions.len(), 25);
        assert!(positions.contains(&Point2::new(0, -3)));
        assert!(positions.contains(&Point2::new(4, 1)));
        assert!(!positions.contains(&Point2::new(5, 0)));
    }

    #[test]
    fn positions_within_zero_is_just_the_center() {
        assert_eq!(
            positions_within(Point2::new(7, 7), 0),
            vec![Point2::new(7, 7)]
        );
    }
}
