use alloc::format;
use core::fmt;
use core::iter::FusedIterator;

use zerocopy::{LittleEndian, U32};

use crate::raw::{Cpsr, Fpexc, Fsr};

const NAMES: [&str; 23] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp", "lr",
    "pc", "cpsr", "dfsr", "ifsr", "far", "fpexc", "fpinst", "fpinst2",
];

/// The registers saved in an exception dump.
///
/// A dump may contain fewer registers than the full set, in which case the
/// trailing registers are simply absent and every accessor for them returns
/// `None`.
#[derive(Copy, Clone, Debug)]
pub struct Registers<'a> {
    words: &'a [U32<LittleEndian>],
}

impl<'a> Registers<'a> {
    pub const SP: usize = 13;
    pub const LR: usize = 14;
    pub const PC: usize = 15;
    pub const CPSR: usize = 16;
    pub const DFSR: usize = 17;
    pub const IFSR: usize = 18;
    pub const FAR: usize = 19;
    pub const FPEXC: usize = 20;
    pub const FPINST: usize = 21;
    pub const FPINST2: usize = 22;

    pub(crate) fn new(words: &'a [U32<LittleEndian>]) -> Self {
        Self { words }
    }

    /// The number of registers present in the dump.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Read the register at `index`, if it was saved.
    pub fn get(&self, index: usize) -> Option<u32> {
        self.words.get(index).map(|word| word.get())
    }

    /// Iterate over all saved registers in index order.
    pub fn iter(&self) -> RegisterIter<'a> {
        RegisterIter {
            words: self.words.iter().enumerate(),
        }
    }

    pub fn sp(&self) -> Option<u32> {
        self.get(Self::SP)
    }

    pub fn lr(&self) -> Option<u32> {
        self.get(Self::LR)
    }

    pub fn pc(&self) -> Option<u32> {
        self.get(Self::PC)
    }

    pub fn cpsr(&self) -> Option<Cpsr> {
        self.get(Self::CPSR).map(Cpsr::from_bits_retain)
    }

    pub fn dfsr(&self) -> Option<Fsr> {
        self.get(Self::DFSR).map(Fsr::from_bits_retain)
    }

    pub fn ifsr(&self) -> Option<Fsr> {
        self.get(Self::IFSR).map(Fsr::from_bits_retain)
    }

    pub fn far(&self) -> Option<u32> {
        self.get(Self::FAR)
    }

    pub fn fpexc(&self) -> Option<Fpexc> {
        self.get(Self::FPEXC).map(Fpexc::from_bits_retain)
    }

    /// Whether the processor was in Thumb state when the exception was raised.
    pub fn is_thumb(&self) -> bool {
        self.cpsr().is_some_and(|cpsr| cpsr.contains(Cpsr::THUMB))
    }

    /// Whether the VFP had a pending exception.
    pub fn has_vfp_exception(&self) -> bool {
        self.fpexc().is_some_and(|fpexc| fpexc.contains(Fpexc::EX))
    }

    /// Whether the aborted data access was a write.
    pub fn is_write_access(&self) -> bool {
        self.dfsr().is_some_and(|dfsr| dfsr.contains(Fsr::WNR))
    }
}

/// The conventional name of a register index.
///
/// Indices past `fpinst2` are shown as `reg<N>`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RegisterName(pub usize);

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match NAMES.get(self.0) {
            Some(name) => f.pad(name),
            None => f.pad(&format!("reg{}", self.0)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RegisterIter<'a> {
    words: core::iter::Enumerate<core::slice::Iter<'a, U32<LittleEndian>>>,
}

impl<'a> Iterator for RegisterIter<'a> {
    type Item = (RegisterName, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, word) = self.words.next()?;
        Some((RegisterName(index), word.get()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.words.size_hint()
    }
}

impl<'a> ExactSizeIterator for RegisterIter<'a> {}
impl<'a> FusedIterator for RegisterIter<'a> {}
