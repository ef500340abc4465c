//! # Voxel Tasks
//!
//! The background tasks the streaming controller publishes: chunk data
//! generation and chunk mesh building.

pub mod chunk_generation_task;
pub mod chunk_mesh_generation_task;

pub use chunk_generation_task::ChunkGenerationTask;
pub use chunk_mesh_generation_task::ChunkMeshGenerationTask;
