//! Render a decoded [`ExceptionDump`] as a human readable report.
//!
//! The report consists of these sections, in order:
//! - the processor and exception summary, including the fault status and
//!   the current process where available,
//! - the register dump,
//! - the code dump, disassembled if a [`Disassembler`] is available and as a
//!   hex dump otherwise,
//! - the stack dump.

use alloc::string::String;
use core::fmt::{self, Write};

use crate::classify::{exception_detail, fault_status};
use crate::external::{Disassembler, DisassemblyRequest, MemorySink};
use crate::hexdump::HexDump;
use crate::raw::ExceptionType;
use crate::registers::{RegisterName, Registers};
use crate::{ExceptionDump, ReadError};

/// An error that aborted rendering a report.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("failed to write the report")]
    Fmt(#[from] fmt::Error),
}

/// Options controlling how a report is laid out.
#[derive(Copy, Clone, Debug)]
pub struct Options {
    hexdump_width: usize,
    placeholder: char,
}

impl Options {
    pub fn new() -> Self {
        Self {
            hexdump_width: HexDump::DEFAULT_WIDTH,
            placeholder: HexDump::DEFAULT_PLACEHOLDER,
        }
    }

    /// The number of bytes shown on each line of the code and stack dumps.
    ///
    /// Defaults to 16.
    ///
    /// # Panics
    /// Panics if `width` is 0.
    pub fn hexdump_width(mut self, width: usize) -> Self {
        assert!(width != 0, "hexdump width must be non-zero");

        self.hexdump_width = width;
        self
    }

    /// The character shown in place of non-printable bytes in hex dumps.
    ///
    /// Defaults to `.`.
    pub fn placeholder(mut self, placeholder: char) -> Self {
        self.placeholder = placeholder;
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders exception dumps using a disassembler and a sink for memory images.
pub struct Renderer<'c> {
    options: Options,
    disassembler: &'c dyn Disassembler,
    sink: &'c dyn MemorySink,
}

impl<'c> Renderer<'c> {
    pub fn new(disassembler: &'c dyn Disassembler, sink: &'c dyn MemorySink) -> Self {
        Self {
            options: Options::new(),
            disassembler,
            sink,
        }
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Render the full report into a string.
    pub fn render_to_string(&self, dump: &ExceptionDump<'_>) -> Result<String, ReportError> {
        let mut output = String::new();
        self.render(&mut output, dump)?;
        Ok(output)
    }

    /// Render the full report into `w`.
    ///
    /// Sections are written as soon as they are ready, so on error `w` holds
    /// everything that came before the failing section.
    pub fn render<W: Write>(&self, w: &mut W, dump: &ExceptionDump<'_>) -> Result<(), ReportError> {
        self.summary(w, dump)?;
        self.registers(w, dump)?;
        self.code(w, dump)?;
        self.stack(w, dump)?;

        Ok(())
    }

    fn summary<W: Write>(&self, w: &mut W, dump: &ExceptionDump<'_>) -> Result<(), ReportError> {
        match dump.processor().is_arm9() {
            true => writeln!(w, "Processor: Arm9")?,
            false => writeln!(w, "Processor: Arm11 (core {})", dump.core())?,
        }

        let name = dump.exception_type().description();
        match exception_detail(dump) {
            Some(detail) => writeln!(w, "Exception type: {name} {detail}")?,
            None => writeln!(w, "Exception type: {name}")?,
        }

        if let Some(status) = fault_status(dump) {
            writeln!(w, "Fault status: {status}")?;
        }

        let additional = dump.additional_data();
        match dump.current_process()? {
            Some(process) => writeln!(
                w,
                "Current process: {} ({:016x})",
                process.name(),
                process.title_id()
            )?,
            None if !additional.is_empty() => match self.sink.persist(additional) {
                Ok(location) => writeln!(
                    w,
                    "Arm9 RAM dumped to {location}, size {:x}",
                    additional.len()
                )?,
                Err(e) => {
                    log::warn!("failed to save the Arm9 memory image: {e}");
                    writeln!(
                        w,
                        "Arm9 RAM (size {:x}) could not be saved: {e}",
                        additional.len()
                    )?;
                }
            },
            None => (),
        }

        Ok(())
    }

    /// Registers are laid out two per line. A trailing register without a
    /// partner gets a line of its own, and the status registers starting at
    /// `cpsr` are separated from the core registers by a blank line.
    fn registers<W: Write>(&self, w: &mut W, dump: &ExceptionDump<'_>) -> Result<(), ReportError> {
        let regs = dump.registers();

        writeln!(w)?;
        writeln!(w, "Register dump:")?;
        writeln!(w)?;

        for index in (0..regs.len()).step_by(2) {
            if index == Registers::CPSR {
                writeln!(w)?;
            }

            let Some(first) = regs.get(index) else {
                break;
            };

            write!(w, "{:<15}{first:08x}{:12}", RegisterName(index), "")?;
            if let Some(second) = regs.get(index + 1) {
                write!(w, "{:<15}{second:08x}{:12}", RegisterName(index + 1), "")?;
            }
            writeln!(w)?;
        }

        if dump.processor().is_arm11() && dump.exception_type() == ExceptionType::DATA_ABORT {
            if let Some(far) = regs.far() {
                let access = match regs.is_write_access() {
                    true => "Write",
                    false => "Read",
                };

                writeln!(w, "{:<15}{far:08x}{:12}Access type: {access}", "FAR", "")?;
            }
        }

        Ok(())
    }

    fn code<W: Write>(&self, w: &mut W, dump: &ExceptionDump<'_>) -> Result<(), ReportError> {
        let request = DisassemblyRequest {
            address: dump.code_address(),
            code: dump.code(),
            thumb: dump.registers().is_thumb(),
        };

        writeln!(w)?;
        writeln!(w, "Code dump:")?;
        writeln!(w)?;

        match self.disassemble(&request) {
            Some(listing) => writeln!(w, "{}", listing.trim_end())?,
            None => writeln!(w, "{}", self.hexdump(request.address, request.code))?,
        }

        Ok(())
    }

    fn stack<W: Write>(&self, w: &mut W, dump: &ExceptionDump<'_>) -> Result<(), ReportError> {
        let sp = dump.registers().sp().unwrap_or(0);

        writeln!(w)?;
        writeln!(w, "Stack dump:")?;
        writeln!(w)?;
        writeln!(w, "{}", self.hexdump(sp, dump.stack()))?;

        Ok(())
    }

    fn disassemble(&self, request: &DisassemblyRequest<'_>) -> Option<String> {
        if request.code.is_empty() {
            return None;
        }

        match self.disassembler.disassemble(request) {
            Ok(listing) if !listing.trim().is_empty() => Some(listing),
            Ok(_) => {
                log::warn!("the disassembler produced no output, falling back to a hex dump");
                None
            }
            Err(e) => {
                log::warn!("{e}, falling back to a hex dump");
                None
            }
        }
    }

    fn hexdump<'a>(&self, address: u32, bytes: &'a [u8]) -> HexDump<'a> {
        HexDump::new(address, bytes)
            .width(self.options.hexdump_width)
            .placeholder(self.options.placeholder)
    }
}
