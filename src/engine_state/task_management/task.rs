//! # Task System Core Traits
//!
//! The two halves of a unit of background work: `Task`, which runs on a
//! worker thread, and `TaskResult`, which is applied on the main thread and
//! may spawn follow-up tasks. Chunk generation chains into mesh building
//! this way: the generation result inserts the chunk into the world, and the
//! streaming controller queues a mesh task for it on a later tick.

use crate::engine_state::EngineServices;

/// A unit of work that can be executed on a worker thread.
///
/// Tasks own all the data they need (shared state goes in behind
/// `MtResource`/`Arc` handles captured at creation), so they can be shipped
/// to any worker without further coordination.
pub trait Task: Send {
    /// Performs the work. Runs on a worker thread; must not assume access to
    /// main-thread state beyond the handles the task owns.
    fn process(&self) -> Box<dyn TaskResult + Send>;
}

/// The result of a completed task.
///
/// Applied on the main thread, where it may mutate engine state through the
/// services and return follow-up tasks to schedule.
pub trait TaskResult: Send {
    /// Applies the result. Keep this cheap; it runs inside the frame.
    fn handle_result(self: Box<Self>, services: &EngineServices) -> Vec<Box<dyn Task + Send>>;
}
