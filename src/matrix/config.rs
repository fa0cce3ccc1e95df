//! Configuration and system parameters for the element-wise engine

use std::sync::Arc;

use crate::constants::{DEFAULT_CHUNK, DEFAULT_TASKS_PER_THREAD};
use crate::matrix::block::{system_allocator, Allocator};

/// System parameters for performance tuning
#[derive(Debug, Clone)]
pub struct SystemParameters {
    /// Number of threads to use
    pub n_threads: usize,
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            n_threads: num_cpus::get(), // Use all available cores
        }
    }
}

/// Configuration for one element-wise operation
#[derive(Debug, Clone)]
pub struct EwiseConfig {
    /// System parameters for performance tuning
    pub system_params: SystemParameters,

    /// Work a thread should be given before another thread is used.
    /// Output vectors with more work than this may be split across tasks.
    pub chunk: usize,

    /// Tasks created per thread when more than one thread is used
    pub tasks_per_thread: usize,

    /// Route built-in operators through the generic byte path
    pub force_generic: bool,

    /// If set, the result is converted between hypersparse and sparse by
    /// comparing `nvec_nonempty / vdim` against this ratio
    pub hyper_switch: Option<f64>,

    /// Admission control for every array the operation allocates
    pub allocator: Arc<dyn Allocator>,
}

impl Default for EwiseConfig {
    fn default() -> Self {
        Self {
            system_params: SystemParameters::default(),
            chunk: DEFAULT_CHUNK,
            tasks_per_thread: DEFAULT_TASKS_PER_THREAD,
            force_generic: false,
            hyper_switch: None,
            allocator: system_allocator(),
        }
    }
}

impl EwiseConfig {
    /// Use exactly `n_threads` threads (values below one mean one)
    pub fn with_threads(mut self, n_threads: usize) -> Self {
        self.system_params.n_threads = n_threads.max(1);
        self
    }

    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    pub fn with_tasks_per_thread(mut self, tasks_per_thread: usize) -> Self {
        self.tasks_per_thread = tasks_per_thread.max(1);
        self
    }

    pub fn with_allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn with_force_generic(mut self, force_generic: bool) -> Self {
        self.force_generic = force_generic;
        self
    }

    pub fn with_hyper_switch(mut self, ratio: f64) -> Self {
        self.hyper_switch = Some(ratio);
        self
    }

    /// Number of threads, never zero
    pub fn n_threads(&self) -> usize {
        self.system_params.n_threads.max(1)
    }
}
