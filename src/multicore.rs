//! Multi-core substrate: cores of pipelined threads over one shared
//! memory controller, each core on its own worker.

use crate::error::InterpreterError;
use crate::params::Params;
use crate::pipeline::ThreadContext;
use crate::storage::MemoryController;

use slate_asm::{Fault, Word};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// A core: an ordered set of pipelined threads scheduled cooperatively,
/// round-robin, against the shared memory controller.
#[derive(Debug)]
pub struct Core {
    core_id: usize,
    threads: Vec<ThreadContext>,
    active_thread: usize,
}

impl Core {
    /// Create a core of `thread_count` threads sharing `memory`.
    pub fn new(core_id: usize, memory: &Arc<MemoryController>, thread_count: usize) -> Self {
        Self {
            core_id,
            threads: (0..thread_count)
                .map(|_| ThreadContext::with_controller(Arc::clone(memory)))
                .collect(),
            active_thread: 0,
        }
    }

    /// This core's identifier.
    pub const fn core_id(&self) -> usize {
        self.core_id
    }

    /// The thread contexts, in scheduling order.
    pub fn threads(&self) -> &[ThreadContext] {
        self.threads.as_slice()
    }

    /// One thread context.
    pub fn thread(&self, thread_id: usize) -> Option<&ThreadContext> {
        self.threads.get(thread_id)
    }

    /// Index of the thread the scheduler will step next.
    pub const fn active_thread(&self) -> usize {
        self.active_thread
    }

    /// Whether every thread of this core has halted.
    pub fn is_complete(&self) -> bool {
        self.threads.iter().all(ThreadContext::is_halted)
    }

    /// Load a program image onto one thread and point its PC at it.
    ///
    /// # Panics
    ///
    /// Panics when `thread_id` is out of range.
    pub fn load_program(
        &mut self,
        thread_id: usize,
        program: &[Word],
        start_addr: Word,
    ) -> Result<(), Fault> {
        self.threads[thread_id].load_program(program, start_addr)
    }

    /// Advance this core by one cycle.
    ///
    /// The active thread keeps the core until it halts; then the scheduler
    /// rotates to the next live thread. Returns `Ok(false)` when every
    /// thread has halted (core idle). A thread whose step faults is
    /// marked halted and the error is surfaced; the remaining threads
    /// keep running on later cycles.
    pub fn cycle(&mut self) -> Result<bool, InterpreterError> {
        if self.threads[self.active_thread].is_halted() {
            let count = self.threads.len();
            let next = (1..=count)
                .map(|offset| (self.active_thread + offset) % count)
                .find(|&index| !self.threads[index].is_halted());

            match next {
                Some(index) => {
                    tracing::debug!(core_id = self.core_id, thread = index, "rotating to thread");
                    self.active_thread = index;
                }
                None => return Ok(false),
            }
        }

        let thread = &mut self.threads[self.active_thread];
        match thread.pipeline_step() {
            Ok(()) => Ok(true),
            Err(e) => {
                thread.halt();

                Err(e)
            }
        }
    }
}

/// Outcome of one core's worker: cycles consumed and the faults its
/// threads surfaced.
#[derive(Debug, Clone)]
pub struct CoreReport {
    /// The core this report belongs to.
    pub core_id: usize,
    /// Cycles consumed, faulting cycles included.
    pub cycles: u64,
    /// Faults surfaced by this core's threads.
    pub errors: Vec<InterpreterError>,
    /// Whether the external stop signal ended the worker early.
    pub stopped: bool,
}

impl CoreReport {
    fn new(core_id: usize) -> Self {
        Self {
            core_id,
            cycles: 0,
            errors: Vec::new(),
            stopped: false,
        }
    }
}

/// Outcome of a parallel simulation run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Per-core reports, in core order.
    pub cores: Vec<CoreReport>,
}

impl SimulationReport {
    /// Cycles consumed across every core.
    pub fn total_cycles(&self) -> u64 {
        self.cores.iter().map(|core| core.cycles).sum()
    }

    /// Every fault surfaced during the run, in core order.
    pub fn errors(&self) -> impl Iterator<Item = &InterpreterError> {
        self.cores.iter().flat_map(|core| core.errors.iter())
    }
}

/// A multi-core simulation over one shared memory controller.
///
/// Cores execute in parallel, each on its own worker; within a core the
/// threads are scheduled cooperatively. The controller's backing array is
/// the sole shared mutable state.
#[derive(Debug)]
pub struct Simulation {
    params: Params,
    memory: Arc<MemoryController>,
    cores: Vec<Core>,
    stop: Arc<AtomicBool>,
}

impl Simulation {
    /// Build a simulation from parameters.
    pub fn new(params: Params) -> Self {
        let memory = Arc::new(MemoryController::with_params(&params));
        let cores = (0..params.num_cores)
            .map(|core_id| Core::new(core_id, &memory, params.threads_per_core))
            .collect();

        Self {
            params,
            memory,
            cores,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The parameters this simulation was built from.
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// The shared memory controller.
    pub fn memory(&self) -> &MemoryController {
        &self.memory
    }

    /// A clonable handle onto the shared controller, e.g. for seeding
    /// data from the driver.
    pub fn shared_memory(&self) -> Arc<MemoryController> {
        Arc::clone(&self.memory)
    }

    /// The cores, in identifier order.
    pub fn cores(&self) -> &[Core] {
        self.cores.as_slice()
    }

    /// One core.
    pub fn core(&self, core_id: usize) -> Option<&Core> {
        self.cores.get(core_id)
    }

    /// A handle the driver may set to request early termination between
    /// cycles. There are no cancellation points inside a cycle.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Load a program image onto one thread of one core.
    ///
    /// # Panics
    ///
    /// Panics when `core_id` or `thread_id` is out of range.
    pub fn load_program(
        &mut self,
        core_id: usize,
        thread_id: usize,
        program: &[Word],
        start_addr: Word,
    ) -> Result<(), Fault> {
        self.cores[core_id].load_program(thread_id, program, start_addr)
    }

    /// Whether every thread of every core has halted.
    pub fn is_complete(&self) -> bool {
        self.cores.iter().all(Core::is_complete)
    }

    /// Run every core on its own worker for at most `max_cycles` cycles
    /// each, joining a per-core report.
    pub fn run(&mut self, max_cycles: u64) -> SimulationReport {
        let stop = Arc::clone(&self.stop);
        let cycle_delay = self.params.cycle_delay;

        let cores = thread::scope(|scope| {
            let workers: Vec<_> = self
                .cores
                .iter_mut()
                .map(|core| {
                    let stop = Arc::clone(&stop);

                    scope.spawn(move || {
                        let span = tracing::debug_span!("core", core_id = core.core_id());
                        let _enter = span.enter();

                        let mut report = CoreReport::new(core.core_id());
                        for _ in 0..max_cycles {
                            if stop.load(Ordering::Relaxed) {
                                report.stopped = true;
                                break;
                            }

                            match core.cycle() {
                                Ok(true) => report.cycles += 1,
                                Ok(false) => break,
                                Err(e) => {
                                    report.cycles += 1;
                                    report.errors.push(e);
                                }
                            }

                            if let Some(delay) = cycle_delay {
                                thread::sleep(delay);
                            }
                        }

                        report
                    })
                })
                .collect();

            workers
                .into_iter()
                .map(|worker| worker.join().expect("core worker panicked"))
                .collect()
        });

        let report = SimulationReport { cores };
        tracing::info!(
            total_cycles = report.total_cycles(),
            complete = self.is_complete(),
            "simulation run finished"
        );

        report
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(Params::default())
    }
}
