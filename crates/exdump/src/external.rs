//! Capabilities that the report renderer needs from the outside world.
//!
//! Disassembling code and saving memory images both need a process or a file
//! system, neither of which belong in this crate. The renderer only sees these
//! traits and recovers from their errors on its own.

use alloc::string::String;

/// A request to disassemble a block of ARM code.
#[derive(Copy, Clone, Debug)]
pub struct DisassemblyRequest<'a> {
    /// The address of the first byte of `code`.
    pub address: u32,

    /// The raw instruction bytes.
    pub code: &'a [u8],

    /// Decode the code as Thumb instead of ARM.
    pub thumb: bool,
}

/// The disassembler could not produce a listing.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("disassembly unavailable: {reason}")]
pub struct DisassemblyUnavailable {
    reason: String,
}

impl DisassemblyUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Turns code bytes into a textual listing.
pub trait Disassembler {
    fn disassemble(&self, request: &DisassemblyRequest<'_>) -> Result<String, DisassemblyUnavailable>;
}

/// A [`Disassembler`] that is never available.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoDisassembler;

impl Disassembler for NoDisassembler {
    fn disassemble(&self, _: &DisassemblyRequest<'_>) -> Result<String, DisassemblyUnavailable> {
        Err(DisassemblyUnavailable::new("no disassembler configured"))
    }
}

/// A memory image could not be saved.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{reason}")]
pub struct SinkError {
    reason: String,
}

impl SinkError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Persists the Arm9 memory image carried in a dump's additional data.
pub trait MemorySink {
    /// Save `bytes` and return a description of where they went, usually a
    /// file path.
    fn persist(&self, bytes: &[u8]) -> Result<String, SinkError>;
}
