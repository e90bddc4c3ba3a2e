//! Simulator parameters.

/// Number of general-purpose registers per thread.
pub const REGISTER_COUNT: usize = slate_asm::REGISTER_COUNT;

/// Shared memory size, in byte addresses, of the default controller.
pub const MEMORY_SIZE: usize = 1024;

/// Default number of cores in a multi-core simulation.
pub const NUM_CORES: usize = 2;

/// Default number of pipelined threads per core.
pub const NUM_THREADS_PER_CORE: usize = 2;

/// Capacity of the controller's write-through cache, in entries.
pub const CACHE_CAPACITY: usize = 64;

/// Number of segment locks guarding controller reads.
pub const SEGMENT_COUNT: usize = 16;

/// Span of addresses mapped to one segment lock.
pub const SEGMENT_SIZE: usize = 64;
