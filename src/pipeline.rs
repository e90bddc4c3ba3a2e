//! Three-stage pipelined interpreter.
//!
//! One [`Pipeline::pipeline_step`] is one cycle. Each cycle either stalls
//! on a data hazard (a bubble replaces the E slot and nothing advances) or
//! advances E←D, D←F and fetches; whatever now sits in E is committed, and
//! a committed PC redirect flushes F and D. There is no forwarding and no
//! branch prediction, so both hazard kinds are observable from the
//! outside.

use crate::error::InterpreterError;
use crate::exec::Executor;
use crate::state::{CpuState, Flags, ProgramState};
use crate::storage::{MemoryBackend, MemoryController, SparseMemory};

use crate::consts::REGISTER_COUNT;

use slate_asm::{Fault, RawInstruction, RegisterId, Word};

use std::collections::BTreeSet;
use std::sync::Arc;

mod hazard;

/// Pipelined interpreter over a private sparse memory: the single-core
/// substrate.
pub type PipelinedInterpreter = Pipeline<SparseMemory>;

/// Pipelined thread context routing every access through a shared
/// [`MemoryController`].
pub type ThreadContext = Pipeline<Arc<MemoryController>>;

/// The three pipeline slots. An empty slot is a bubble: it retires as
/// nothing and never reaches the execution log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSlots {
    fetch: Option<RawInstruction>,
    decode: Option<RawInstruction>,
    execute: Option<RawInstruction>,
}

impl PipelineSlots {
    /// Contents of the fetch slot.
    pub const fn fetch(&self) -> Option<RawInstruction> {
        self.fetch
    }

    /// Contents of the decode slot.
    pub const fn decode(&self) -> Option<RawInstruction> {
        self.decode
    }

    /// Contents of the execute slot.
    pub const fn execute(&self) -> Option<RawInstruction> {
        self.execute
    }

    /// Whether every slot is a bubble.
    pub const fn is_empty(&self) -> bool {
        self.fetch.is_none() && self.decode.is_none() && self.execute.is_none()
    }
}

/// Three-stage pipelined interpreter, generic over its memory backend.
#[derive(Debug, Clone)]
pub struct Pipeline<M> {
    state: CpuState,
    memory: M,
    slots: PipelineSlots,
    stall_detected: bool,
    flush_detected: bool,
    modified_registers: BTreeSet<RegisterId>,
    log: Vec<String>,
    step_count: u64,
}

impl<M> Pipeline<M> {
    /// The register bank.
    pub const fn registers(&self) -> &[Word; REGISTER_COUNT] {
        self.state.registers()
    }

    /// Seed one register, e.g. to set up a program's inputs.
    pub fn set_register(&mut self, index: RegisterId, value: Word) -> Result<(), Fault> {
        self.state.set_reg(index, value)
    }

    /// The program counter. In a filled pipeline this runs ahead of the
    /// executing instruction by up to two slots.
    pub const fn pc(&self) -> Word {
        self.state.pc()
    }

    /// The condition flags.
    pub const fn flags(&self) -> Flags {
        self.state.flags()
    }

    /// Snapshot of the software stack, bottom first.
    pub fn stack(&self) -> &[Word] {
        self.state.stack()
    }

    /// The pipeline slot contents.
    pub const fn slots(&self) -> &PipelineSlots {
        &self.slots
    }

    /// Whether the last cycle stalled on a data hazard.
    pub const fn stall_detected(&self) -> bool {
        self.stall_detected
    }

    /// Whether the last cycle flushed on a control hazard.
    pub const fn flush_detected(&self) -> bool {
        self.flush_detected
    }

    /// Registers written by the instruction retired in the last cycle.
    pub const fn modified_registers(&self) -> &BTreeSet<RegisterId> {
        &self.modified_registers
    }

    /// Whether HALT has retired.
    pub const fn is_halted(&self) -> bool {
        self.state.is_halted()
    }

    /// A thread is complete when it has halted and its slots have
    /// drained.
    pub const fn is_complete(&self) -> bool {
        self.state.is_halted() && self.slots.is_empty()
    }

    /// Number of elapsed cycles.
    pub const fn step_count(&self) -> u64 {
        self.step_count
    }

    /// The full execution log, oldest first.
    pub fn log(&self) -> &[String] {
        self.log.as_slice()
    }

    /// The most recent `n` log entries.
    pub fn last_log(&self, n: usize) -> &[String] {
        &self.log[self.log.len().saturating_sub(n)..]
    }

    /// The memory backend.
    pub const fn memory(&self) -> &M {
        &self.memory
    }

    /// Render the register bank in rows of four.
    pub fn dump_registers(&self) -> String {
        self.state.dump_registers()
    }

    /// Park the thread: a faulting thread is treated as halted by its
    /// core.
    pub(crate) fn halt(&mut self) {
        self.state.halted = true;
    }
}

impl<M> Pipeline<M>
where
    M: MemoryBackend,
{
    /// Create a pipeline over the given memory backend.
    pub fn with_memory(memory: M) -> Self {
        Self {
            state: CpuState::default(),
            memory,
            slots: PipelineSlots::default(),
            stall_detected: false,
            flush_detected: false,
            modified_registers: BTreeSet::new(),
            log: Vec::new(),
            step_count: 0,
        }
    }

    /// Load a program image and point the program counter at it.
    pub fn load_program(&mut self, program: &[Word], start_addr: Word) -> Result<(), Fault> {
        self.state.pc = start_addr;

        self.memory.load_words(program, start_addr)
    }

    /// Advance the pipeline by one cycle.
    ///
    /// A fault raised by the E-stage commit is surfaced to the caller; the
    /// enclosing core treats the failing thread as halted.
    pub fn pipeline_step(&mut self) -> Result<(), InterpreterError> {
        self.step_count += 1;
        self.modified_registers.clear();

        let hazard = match (self.slots.decode, self.slots.execute) {
            (Some(decode), Some(execute)) => hazard::has_data_hazard(decode, execute),
            _ => false,
        };

        if hazard {
            // Suppress D→E for one cycle so the producer's result commits
            // before the consumer reads it.
            self.slots.execute = None;
            self.stall_detected = true;
            self.flush_detected = false;
            self.log
                .push(format!("[{}] DATA HAZARD: Stall inserted", self.step_count));
            tracing::debug!(cycle = self.step_count, "data hazard stall");
        } else {
            self.stall_detected = false;
            self.flush_detected = false;
            self.slots.execute = self.slots.decode.take();
            self.slots.decode = self.slots.fetch.take();
            self.fetch_slot();
        }

        let mut redirected = false;
        if let Some(raw) = self.slots.execute {
            let result = Executor::new(
                &mut self.state,
                &mut self.memory,
                &mut self.log,
                self.step_count,
            )
            .execute(raw);

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(fault) => {
                    self.log
                        .push(format!("[{}] FAULT: {fault}", self.step_count));

                    return Err(InterpreterError::FaultInstruction {
                        fault,
                        pc: self.state.pc,
                        instruction: raw,
                    });
                }
            };

            if let Some(rd) = hazard::destination(raw) {
                self.modified_registers.insert(rd);
            }

            redirected = outcome.is_jump();
        }

        if redirected {
            self.slots.fetch = None;
            self.slots.decode = None;
            self.flush_detected = true;
            self.stall_detected = false;
            self.log.push(format!(
                "[{}] CONTROL HAZARD: Pipeline flushed",
                self.step_count
            ));
            tracing::debug!(cycle = self.step_count, "control hazard flush");
        }

        tracing::trace!(
            cycle = self.step_count,
            slots = ?self.slots,
            pc = self.state.pc,
            "cycle complete"
        );

        Ok(())
    }

    /// Drive cycles from `start_addr` until the pipeline drains or the
    /// cycle budget is exhausted.
    pub fn run(&mut self, start_addr: Word, max_cycles: u64) -> Result<ProgramState, InterpreterError> {
        self.state.pc = start_addr;

        for _ in 0..max_cycles {
            self.pipeline_step()?;

            if self.slots.is_empty() {
                return Ok(if self.state.halted {
                    ProgramState::Halted
                } else {
                    ProgramState::Drained
                });
            }
        }

        Ok(ProgramState::StepLimit)
    }

    /// Fetch the next word into F. Past the backed range a bubble is
    /// parked instead and the program counter stays put.
    fn fetch_slot(&mut self) {
        match self.memory.fetch(self.state.pc) {
            Some(raw) => {
                self.slots.fetch = Some(raw);
                self.state.pc = self.state.pc.wrapping_add(RawInstruction::LEN as Word);
            }
            None => self.slots.fetch = None,
        }
    }
}

impl Default for Pipeline<SparseMemory> {
    fn default() -> Self {
        Self::with_memory(SparseMemory::default())
    }
}

impl Pipeline<SparseMemory> {
    /// Create a pipelined interpreter over a fresh private memory.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThreadContext {
    /// Create a thread context over a shared memory controller.
    pub fn with_controller(memory: Arc<MemoryController>) -> Self {
        Self::with_memory(memory)
    }
}
