//! # Chunk Generation Task
//!
//! Generates a chunk's column data on a worker thread. The result inserts
//! the finished chunk into the world on the main thread; the streaming
//! controller picks it up from there and queues its mesh build.

use std::sync::Arc;

use cgmath::Point2;

use crate::engine_state::generation::TerrainGenerator;
use crate::engine_state::task_management::task::{Task, TaskResult};
use crate::engine_state::voxels::chunk::ChunkColumn;
use crate::engine_state::EngineServices;

/// Generates the columns of one chunk.
pub struct ChunkGenerationTask {
    generator: Arc<TerrainGenerator>,
    position: Point2<i32>,
}

impl ChunkGenerationTask {
    /// Creates a generation task for the chunk at `position`.
    pub fn new(generator: Arc<TerrainGenerator>, position: Point2<i32>) -> Self {
        ChunkGenerationTask {
            generator,
            position,
        }
    }
}

impl Task for ChunkGenerationTask {
    fn process(&self) -> Box<dyn TaskResult + Send> {
        let columns = self.generator.generate_chunk_columns(self.position);
        Box::new(ChunkGenerationTaskResult {
            position: self.position,
            columns,
        })
    }
}

/// Carries generated columns back to the main thread.
pub struct ChunkGenerationTaskResult {
    position: Point2<i32>,
    columns: Vec<ChunkColumn>,
}

impl TaskResult for ChunkGenerationTaskResult {
    fn handle_result(self: Box<Self>, services: &EngineServices) -> Vec<Box<dyn Task + Send>> {
        // A chunk restored from save in the meantime wins; insert is a no-op
        // then. Chunks that left the load radius while generating are
        // cleaned up by the next streaming pass.
        services
            .world
            .get_mut()
            .insert_chunk_from_columns(self.position, self.columns);
        Vec::new()
    }
}
