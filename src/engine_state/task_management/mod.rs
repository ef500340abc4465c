//! # Task Management System
//!
//! A small worker-thread pool for CPU-bound background work, used for chunk
//! generation and mesh building.
//!
//! ## Architecture
//!
//! - `TaskManager`: owns the workers and distributes tasks round-robin
//! - `Task` / `TaskResult`: the work and its main-thread completion
//! - `TaskChannel`: one worker thread plus its mpsc channels
//!
//! Each worker has a dedicated task channel and a bounded number of tasks in
//! flight; excess tasks wait in a FIFO queue. Results are pumped on the main
//! thread once per tick, where they can mutate the world and spawn follow-up
//! tasks.
//!
//! A manager built with zero workers never executes anything on its own;
//! [`TaskManager::drain_synchronously`] then runs the whole queue inline,
//! which is how the tests drive the engine deterministically.

pub mod task;

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::info;

use crate::engine_state::EngineServices;
use task::{Task, TaskResult};

/// One worker thread and its communication channels.
struct TaskChannel {
    task_sender: Sender<Box<dyn Task + Send>>,
    result_receiver: Receiver<Box<dyn TaskResult + Send>>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Maximum number of tasks in flight per worker channel. One keeps workers
/// busy without reordering work within a channel.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

/// Manages a pool of worker threads and coordinates task execution.
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task + Send>>,
    current_channel: usize,
}

impl TaskManager {
    /// Creates a manager with `num_workers` worker threads. Zero workers is
    /// valid; every task then stays queued for synchronous draining.
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        for _ in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task + Send>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult + Send>>();

            let worker = thread::spawn(move || {
                while let Ok(task) = task_rx.recv() {
                    let result = task.process();
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                _worker: worker,
            });
        }

        info!("task manager started with {} workers", num_workers);

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        }
    }

    fn try_send_task(
        &mut self,
        task: Box<dyn Task + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task + Send>> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(send_error) => Err(send_error.0),
        }
    }

    /// Finds a worker that can accept another task, round-robin from the
    /// last used channel.
    fn find_available_channel(&self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }
        if self
            .channels
            .iter()
            .all(|channel| channel.num_tasks_in_flight >= MAX_TASKS_IN_FLIGHT)
        {
            return None;
        }

        let start_channel = self.current_channel;
        let mut current = start_channel;
        loop {
            if self.channels[current].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT {
                return Some(current);
            }
            current = (current + 1) % self.channels.len();
            if current == start_channel {
                return None;
            }
        }
    }

    /// Publishes a task for execution. Returns whether the task was handed
    /// to a worker immediately (`false` means it was queued).
    pub fn publish_task(&mut self, task: Box<dyn Task + Send>) -> bool {
        if self.channels.is_empty() {
            self.queued_tasks.push_back(task);
            return false;
        }

        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    self.queued_tasks.push_back(task);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Moves queued tasks onto workers as channels free up. Call once per
    /// tick.
    pub fn process_queued_tasks(&mut self) {
        if self.queued_tasks.is_empty() || self.channels.is_empty() {
            return;
        }

        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                return;
            };
            if let Err(task) = self.try_send_task(task, channel_idx) {
                self.queued_tasks.push_front(task);
                return;
            }
        }
    }

    /// Pumps completed results on the main thread, applying each and
    /// publishing any follow-up tasks it spawns. Call once per tick.
    pub fn process_completed_tasks(&mut self, services: &EngineServices) {
        let mut results = Vec::new();
        for channel in self.channels.iter_mut() {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight -= 1;
                results.push(result);
            }
        }

        for result in results {
            for follow_up in result.handle_result(services) {
                self.publish_task(follow_up);
            }
        }
    }

    /// Whether any task is queued or running.
    pub fn has_pending_work(&self) -> bool {
        !self.queued_tasks.is_empty()
            || self
                .channels
                .iter()
                .any(|channel| channel.num_tasks_in_flight > 0)
    }

    /// Runs every queued task (and the tasks their results spawn) inline on
    /// the calling thread. Only meaningful with zero workers, where it makes
    /// the whole engine deterministic for tests.
    pub fn drain_synchronously(&mut self, services: &EngineServices) {
        while let Some(task) = self.queued_tasks.pop_front() {
            let result = task.process();
            for follow_up in result.handle_result(services) {
                self.queued_tasks.push_back(follow_up);
            }
        }
    }
}
