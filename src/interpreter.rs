//! Sequential [`Interpreter`] implementation.

use crate::error::InterpreterError;
use crate::exec::Executor;
use crate::state::{CpuState, Debugger, ExecuteState, Flags, ProgramState};
use crate::storage::{MemoryBackend, SparseMemory};

use crate::consts::REGISTER_COUNT;

use slate_asm::{Fault, RawInstruction, RegisterId, Word};

/// Sequential fetch/decode/execute interpreter over a private sparse
/// memory.
///
/// One [`Interpreter::step`] retires one instruction. Fetching from an
/// unmapped address faults with [`Fault::InvalidPc`]; every fault is
/// logged and returned to the driver.
#[derive(Debug, Default, Clone)]
pub struct Interpreter {
    state: CpuState,
    memory: SparseMemory,
    debugger: Debugger,
    log: Vec<String>,
    step_count: u64,
}

impl Interpreter {
    /// Create an interpreter with zeroed state and empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a program image at consecutive word-aligned addresses. Does
    /// not move the program counter; [`Interpreter::run`] does.
    pub fn load_program(&mut self, program: &[Word], start_addr: Word) {
        self.memory.load(program, start_addr);
    }

    /// Reset registers, flags, stack, program counter, log, and step
    /// counter. The loaded program and the breakpoint list survive.
    pub fn reset(&mut self) {
        self.state = CpuState::default();
        self.log.clear();
        self.step_count = 0;
    }

    /// Fetch, decode, and execute one instruction.
    pub fn step(&mut self) -> Result<ExecuteState, InterpreterError> {
        let fetch_pc = self.state.pc;
        let raw = self.memory.fetch(fetch_pc).ok_or(InterpreterError::Fault {
            fault: Fault::InvalidPc,
            pc: fetch_pc,
        })?;
        self.state.pc = fetch_pc.wrapping_add(RawInstruction::LEN as Word);

        let outcome = Executor::new(&mut self.state, &mut self.memory, &mut self.log, self.step_count)
            .execute(raw)
            .map_err(|fault| InterpreterError::FaultInstruction {
                fault,
                pc: fetch_pc,
                instruction: raw,
            })?;
        self.step_count += 1;

        Ok(outcome)
    }

    /// Run from `start_addr` until HALT, a breakpoint, a fault, or the
    /// step budget.
    pub fn run(&mut self, start_addr: Word, max_steps: u64) -> Result<ProgramState, InterpreterError> {
        self.state.pc = start_addr;

        self.resume(max_steps)
    }

    /// Continue from the current program counter; the way back into
    /// execution after a [`ProgramState::Breakpoint`].
    pub fn resume(&mut self, max_steps: u64) -> Result<ProgramState, InterpreterError> {
        while !self.state.halted && self.step_count < max_steps {
            if self.debugger.eval(self.state.pc) {
                tracing::debug!(pc = self.state.pc, "breakpoint hit");

                return Ok(ProgramState::Breakpoint(self.state.pc));
            }

            if let Err(e) = self.step() {
                self.log
                    .push(format!("Execution stopped at step {}: {e}", self.step_count));

                return Err(e);
            }
        }

        Ok(if self.state.halted {
            ProgramState::Halted
        } else {
            ProgramState::StepLimit
        })
    }

    /// Arm a breakpoint; execution suspends before fetching from `addr`.
    pub fn set_breakpoint(&mut self, addr: Word) {
        self.debugger.set_breakpoint(addr);
    }

    /// Disarm the breakpoint at `addr`.
    pub fn remove_breakpoint(&mut self, addr: Word) {
        self.debugger.remove_breakpoint(addr);
    }

    /// Breakpoint handler.
    pub const fn debugger(&self) -> &Debugger {
        &self.debugger
    }

    /// The register bank.
    pub const fn registers(&self) -> &[Word; REGISTER_COUNT] {
        self.state.registers()
    }

    /// Seed one register, e.g. to set up a program's inputs.
    pub fn set_register(&mut self, index: RegisterId, value: Word) -> Result<(), Fault> {
        self.state.set_reg(index, value)
    }

    /// The program counter.
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

    /// Whether HALT has retired.
    pub const fn is_halted(&self) -> bool {
        self.state.is_halted()
    }

    /// Read a memory word; unmapped addresses read as zero.
    pub fn read_memory(&self, addr: Word) -> Word {
        self.memory.read(addr)
    }

    /// Number of retired instructions.
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

    /// Render the register bank in rows of four.
    pub fn dump_registers(&self) -> String {
        self.state.dump_registers()
    }
}
