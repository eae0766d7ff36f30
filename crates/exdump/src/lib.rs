//! `luma-exdump` is a library for reading the exception dumps that Luma3DS
//! writes when the Arm9 or Arm11 raises an unhandled exception.
//!
//! A dump is a fixed header followed by the saved registers, the code around
//! the faulting instruction, part of the stack and some processor-specific
//! data. [`ExceptionDump::load`] validates and slices all of these out of a
//! byte buffer, and [`report::Renderer`] turns them into the familiar text
//! report.
//!
//! # Modules
//! - Types to read an exception dump are available in the crate root.
//! - [`raw`] - Raw types as they are laid out in the file.
//! - [`report`] - Render a decoded dump as text.
//! - [`hexdump`] - The byte formatter used for code and stack dumps.

#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod classify;
mod error;
mod external;
pub mod hexdump;
pub mod raw;
mod read;
mod registers;
pub mod report;

pub use self::classify::*;
pub use self::error::{ReadError, Region};
pub use self::external::*;
pub use self::read::{ExceptionDump, ProcessInfo};
pub use self::registers::{RegisterIter, RegisterName, Registers};
