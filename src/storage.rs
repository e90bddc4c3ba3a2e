//! Memory backends for the execution substrates.
//!
//! The interpreters are generic over [`MemoryBackend`]: the sequential and
//! single-core pipelined substrates run against a private [`SparseMemory`],
//! while multi-core thread contexts route every access through a shared
//! [`MemoryController`].

use slate_asm::{Fault, RawInstruction, Word};

use std::collections::BTreeMap;
use std::sync::Arc;

mod controller;

pub use controller::{MemoryController, MemoryStats};

/// Word-addressable memory as seen by an interpreter.
pub trait MemoryBackend {
    /// Fetch the instruction word at `addr`; `None` when the address is
    /// outside the backed range (an unmapped sparse address, or past the
    /// end of controller memory).
    fn fetch(&self, addr: Word) -> Option<RawInstruction>;

    /// Read the word at `addr`; absent or out-of-range addresses read as
    /// zero.
    fn read_word(&self, addr: Word) -> Word;

    /// Write the word at `addr`, reporting whether the address was
    /// writable.
    fn write_word(&mut self, addr: Word, value: Word) -> bool;

    /// Write a program image at consecutive word-aligned addresses
    /// starting at `start_addr`.
    fn load_words(&mut self, words: &[Word], start_addr: Word) -> Result<(), Fault>;
}

/// Unbounded sparse memory: a map from byte address to word, in which
/// absent addresses read as zero.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SparseMemory {
    words: BTreeMap<Word, Word>,
}

impl SparseMemory {
    /// Create an empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `addr` has ever been written.
    pub fn is_mapped(&self, addr: Word) -> bool {
        self.words.contains_key(&addr)
    }

    /// Read the word at `addr`, zero when unmapped.
    pub fn read(&self, addr: Word) -> Word {
        self.words.get(&addr).copied().unwrap_or(0)
    }

    /// Map `addr` to `value`.
    pub fn write(&mut self, addr: Word, value: Word) {
        self.words.insert(addr, value);
    }

    /// Write a program image at consecutive word-aligned addresses.
    pub fn load(&mut self, words: &[Word], start_addr: Word) {
        for (offset, word) in words.iter().enumerate() {
            let addr = start_addr.wrapping_add((offset as Word) * RawInstruction::LEN as Word);
            self.words.insert(addr, *word);
        }
    }
}

impl MemoryBackend for SparseMemory {
    fn fetch(&self, addr: Word) -> Option<RawInstruction> {
        self.words.get(&addr).copied().map(RawInstruction::from)
    }

    fn read_word(&self, addr: Word) -> Word {
        self.read(addr)
    }

    fn write_word(&mut self, addr: Word, value: Word) -> bool {
        self.write(addr, value);

        true
    }

    fn load_words(&mut self, words: &[Word], start_addr: Word) -> Result<(), Fault> {
        self.load(words, start_addr);

        Ok(())
    }
}

impl MemoryBackend for Arc<MemoryController> {
    fn fetch(&self, addr: Word) -> Option<RawInstruction> {
        ((addr as usize) < self.size()).then(|| RawInstruction::from(self.read(addr)))
    }

    fn read_word(&self, addr: Word) -> Word {
        self.read(addr)
    }

    fn write_word(&mut self, addr: Word, value: Word) -> bool {
        self.write(addr, value)
    }

    fn load_words(&mut self, words: &[Word], start_addr: Word) -> Result<(), Fault> {
        self.bulk_load(words, start_addr)
    }
}
