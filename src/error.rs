//! Error taxa surfaced by the decoder, memories, and the execute
//! dispatch. Propagation is unchanged `?`-style: a failure aborts the
//! current cycle without mutating state, and the PC is not advanced.

use thiserror::Error;

use crate::Uxlen;

/// The simulator's unified error type. Every memory (register file,
/// CSR file, instruction/data memory, bus, ranged view) and the
/// decoder return this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Raised by the decoder only: the raw instruction word does not
    /// correspond to any legal RV32I/Zicsr encoding.
    #[error("illegal instruction 0x{word:08x}: {detail}")]
    IllegalInstruction { word: Uxlen, detail: String },

    /// Raised by a memory when an address falls outside its legal
    /// domain (unrecognised CSR, out-of-range word, uncovered bus
    /// address, never-written sparse byte).
    #[error("illegal address 0x{addr:08x}: {detail}")]
    IllegalAddr { addr: Uxlen, detail: String },

    /// Raised by the LSU when an access width does not match address
    /// alignment.
    #[error("misaligned access at 0x{addr:08x}: {detail}")]
    Misalignment { addr: Uxlen, detail: String },

    /// Raised on any write to a read-only memory (instruction
    /// memory).
    #[error("write to read-only memory: {0}")]
    ReadOnly(String),

    /// Generic configuration fault (empty bus, double-attach, etc).
    #[error("{0}")]
    Error(String),
}

impl Error {
    pub fn illegal_instruction(word: Uxlen, detail: impl Into<String>) -> Self {
        Self::IllegalInstruction { word, detail: detail.into() }
    }

    pub fn illegal_addr(addr: Uxlen, detail: impl Into<String>) -> Self {
        Self::IllegalAddr { addr, detail: detail.into() }
    }

    pub fn misalignment(addr: Uxlen, detail: impl Into<String>) -> Self {
        Self::Misalignment { addr, detail: detail.into() }
    }

    pub fn read_only(detail: impl Into<String>) -> Self {
        Self::ReadOnly(detail.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
