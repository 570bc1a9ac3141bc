use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of rayon work items handed to each thread when building neighbor
/// lists in parallel.
pub const PARALLEL_TASKS_PER_THREAD: usize = 64;

// Below this atom count the serial neighbor search wins over the rayon pool.
const DEFAULT_PARALLEL_THRESHOLD: usize = 300;

static PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_PARALLEL_THRESHOLD);

pub fn get_parallel_threshold() -> usize {
    PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

pub fn set_parallel_threshold(val: usize) {
    PARALLEL_THRESHOLD.store(val, Ordering::Relaxed);
}

// 2^24 cells: a 128 MiB `head` array on 64-bit targets.
const DEFAULT_MAX_CELLS: usize = 1 << 24;

static MAX_CELLS: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_CELLS);

/// Largest linked-list cell grid a build may allocate.
pub fn get_max_cells() -> usize {
    MAX_CELLS.load(Ordering::Relaxed)
}

pub fn set_max_cells(val: usize) {
    MAX_CELLS.store(val, Ordering::Relaxed);
}

pub fn num_threads() -> usize {
    rayon::current_num_threads()
}

/// Sizes the global rayon pool. Only the first call takes effect; later
/// calls are ignored because the global pool can be built once.
pub fn set_num_threads(n: usize) {
    let _ = rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .build_global();
}
