use slate_asm::Word;

use std::collections::BTreeSet;

/// Breakpoint bookkeeping for the sequential substrate.
///
/// Holds the ordered breakpoint addresses plus the resume latch: after a
/// run suspends at a breakpoint, the next evaluation at the same address
/// passes through instead of re-triggering.
#[derive(Debug, Default, Clone)]
pub struct Debugger {
    breakpoints: BTreeSet<Word>,
    last_break: Option<Word>,
}

impl Debugger {
    /// Arm a breakpoint at `addr`.
    pub fn set_breakpoint(&mut self, addr: Word) {
        self.breakpoints.insert(addr);
    }

    /// Disarm the breakpoint at `addr`.
    pub fn remove_breakpoint(&mut self, addr: Word) {
        self.breakpoints.remove(&addr);
    }

    /// The armed breakpoint addresses, in address order.
    pub fn breakpoints(&self) -> impl Iterator<Item = Word> + '_ {
        self.breakpoints.iter().copied()
    }

    /// Evaluate the breakpoint state before a fetch at `pc`.
    ///
    /// Returns true when execution should suspend. A hit latches, so the
    /// immediately following evaluation at the same address continues.
    pub(crate) fn eval(&mut self, pc: Word) -> bool {
        let last = self.last_break.take();

        if self.breakpoints.contains(&pc) && last != Some(pc) {
            self.last_break = Some(pc);

            true
        } else {
            false
        }
    }
}
