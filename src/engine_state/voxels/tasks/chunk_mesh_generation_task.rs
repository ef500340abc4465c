//! # Chunk Mesh Generation Task
//!
//! Builds a chunk's mesh on a worker thread. The task captures handles to
//! the chunk and its lateral neighbors so border faces can compare against
//! real neighbor data; the result stores the finished bundle in the mesh
//! store and releases the chunk's in-flight flag.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use cgmath::Point2;

use crate::core::MtResource;
use crate::engine_state::meshing::{culled, greedy, ChunkMeshBundle, ChunkView, MesherKind};
use crate::engine_state::task_management::task::{Task, TaskResult};
use crate::engine_state::voxels::block::BlockRegistry;
use crate::engine_state::voxels::chunk::Chunk;
use crate::engine_state::EngineServices;

/// Builds the mesh of one chunk.
pub struct ChunkMeshGenerationTask {
    chunk: MtResource<Chunk>,
    neighbors: [Option<MtResource<Chunk>>; 4],
    registry: Arc<BlockRegistry>,
    mesher: MesherKind,
    scaled_block_size: f32,
    world_seed: i32,
    position: Point2<i32>,
}

impl ChunkMeshGenerationTask {
    /// Creates a mesh build task. `neighbors` is in `[-x, +x, -y, +y]`
    /// order, as produced by `World::neighbor_handles`.
    pub fn new(
        chunk: MtResource<Chunk>,
        neighbors: [Option<MtResource<Chunk>>; 4],
        registry: Arc<BlockRegistry>,
        mesher: MesherKind,
        scaled_block_size: f32,
        world_seed: i32,
        position: Point2<i32>,
    ) -> Self {
        ChunkMeshGenerationTask {
            chunk,
            neighbors,
            registry,
            mesher,
            scaled_block_size,
            world_seed,
            position,
        }
    }
}

impl Task for ChunkMeshGenerationTask {
    fn process(&self) -> Box<dyn TaskResult + Send> {
        let center = self.chunk.get();
        let neighbor_guards = [
            self.neighbors[0].as_ref().map(|chunk| chunk.get()),
            self.neighbors[1].as_ref().map(|chunk| chunk.get()),
            self.neighbors[2].as_ref().map(|chunk| chunk.get()),
            self.neighbors[3].as_ref().map(|chunk| chunk.get()),
        ];
        let view = ChunkView::new(
            &center,
            [
                neighbor_guards[0].as_deref(),
                neighbor_guards[1].as_deref(),
                neighbor_guards[2].as_deref(),
                neighbor_guards[3].as_deref(),
            ],
        );

        let bundle = match self.mesher {
            MesherKind::Greedy => greedy::build_mesh(&view, &self.registry, self.scaled_block_size),
            MesherKind::Culled => culled::build_mesh(
                &view,
                &self.registry,
                self.scaled_block_size,
                self.world_seed,
            ),
        };

        Box::new(ChunkMeshGenerationTaskResult {
            position: self.position,
            bundle,
        })
    }
}

/// Carries a finished mesh back to the main thread.
pub struct ChunkMeshGenerationTaskResult {
    position: Point2<i32>,
    bundle: ChunkMeshBundle,
}

impl TaskResult for ChunkMeshGenerationTaskResult {
    fn handle_result(self: Box<Self>, services: &EngineServices) -> Vec<Box<dyn Task + Send>> {
        services.mesh_tasks_in_flight.fetch_sub(1, Ordering::SeqCst);

        let chunk = services.world.get().chunk_at(self.position);
        match chunk {
            Some(chunk) => {
                {
                    let mut chunk = chunk.get_mut();
                    chunk.is_mesh_queued = false;
                    chunk.is_mesh_built = true;
                }
                services.meshes.get_mut().insert(self.position, self.bundle);
            }
            // The chunk was unloaded while its mesh was building; the mesh
            // is stale and simply dropped.
            None => {}
        }

        Vec::new()
    }
}
