//! Raw types describing the on-disk layout of an exception dump.
//!
//! Every multi-byte field in a dump is little-endian. The fixed-size
//! [`Header`] is followed by four variable-length regions whose sizes are
//! declared in the header: the saved registers, the code around the faulting
//! instruction, the stack and some processor-specific additional data.

use core::fmt;

use bitflags::bitflags;
use c_enum::c_enum;
use zerocopy::{AsBytes, FromBytes, FromZeroes, LittleEndian, Unaligned, U32, U64};

/// The two words every exception dump starts with.
pub const MAGIC: [u32; 2] = [0xDEADC0DE, 0xDEADCAFE];

/// The size of [`Header`] in bytes. Registers start right after it.
pub const HEADER_SIZE: usize = core::mem::size_of::<Header>();

/// The fixed header at the start of an exception dump.
#[repr(C)]
#[derive(Copy, Clone, Debug, AsBytes, FromBytes, FromZeroes, Unaligned)]
pub struct Header {
    /// Must be equal to [`MAGIC`].
    pub magic: [U32<LittleEndian>; 2],

    /// The format version, see [`FormatVersion`].
    pub version: U32<LittleEndian>,

    /// The processor id in the low 16 bits and the core index in the high 16
    /// bits.
    pub processor: U32<LittleEndian>,

    /// The kind of exception that was raised, see [`ExceptionType`].
    pub exception_type: U32<LittleEndian>,

    #[doc(hidden)]
    pub _reserved: U32<LittleEndian>,

    /// The size of the register region in bytes.
    ///
    /// Each register is 4 bytes wide. A trailing partial register is ignored.
    pub register_bytes: U32<LittleEndian>,

    /// The size of the code region in bytes.
    pub code_dump_size: U32<LittleEndian>,

    /// The size of the stack region in bytes.
    pub stack_dump_size: U32<LittleEndian>,

    /// The size of the additional data region in bytes.
    pub additional_data_size: U32<LittleEndian>,
}

const _: () = assert!(HEADER_SIZE == 40);

impl Header {
    /// The number of whole registers stored in the register region.
    pub fn register_count(&self) -> usize {
        self.register_bytes.get() as usize / 4
    }

    pub fn processor_id(&self) -> ProcessorId {
        ProcessorId(self.processor.get() as u16)
    }

    pub fn core(&self) -> u16 {
        (self.processor.get() >> 16) as u16
    }
}

/// The leading part of the additional data written by the Arm11.
#[repr(C)]
#[derive(Copy, Clone, Debug, AsBytes, FromBytes, FromZeroes, Unaligned)]
pub struct ProcessInfo {
    /// The ASCII name of the faulting process, padded with NULs.
    pub name: [u8; 8],

    /// The title id of the faulting process.
    pub title_id: U64<LittleEndian>,
}

/// A dump format version: the major version in the high 16 bits and the minor
/// version in the low 16 bits.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormatVersion(pub u32);

impl FormatVersion {
    /// The oldest version with the layout that this crate understands.
    pub const MIN_SUPPORTED: Self = Self::new(1, 2);

    pub const fn new(major: u16, minor: u16) -> Self {
        Self((major as u32) << 16 | minor as u32)
    }

    pub const fn major(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn minor(&self) -> u16 {
        self.0 as u16
    }

    pub fn is_supported(&self) -> bool {
        *self >= Self::MIN_SUPPORTED
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

c_enum! {
    /// The processor that raised the exception.
    ///
    /// Ids other than the two named ones are preserved as-is.
    #[repr(transparent)]
    #[derive(Copy, Clone, Eq, PartialEq, Hash)]
    pub enum ProcessorId: u16 {
        /// The secondary processor. Its additional data is a memory image.
        ARM9 = 9,

        /// The primary, multi-core processor. Its additional data describes
        /// the faulting process.
        ARM11 = 11,
    }
}

impl ProcessorId {
    pub fn is_arm9(&self) -> bool {
        *self == Self::ARM9
    }

    pub fn is_arm11(&self) -> bool {
        *self == Self::ARM11
    }
}

c_enum! {
    /// The kind of exception recorded in a dump.
    #[repr(transparent)]
    #[derive(Copy, Clone, Eq, PartialEq, Hash)]
    pub enum ExceptionType: u32 {
        FIQ = 0,
        UNDEFINED_INSTRUCTION = 1,
        PREFETCH_ABORT = 2,
        DATA_ABORT = 3,
    }
}

impl ExceptionType {
    /// A human readable name, `"unknown"` for unrecognized values.
    pub fn description(&self) -> &'static str {
        match *self {
            Self::FIQ => "FIQ",
            Self::UNDEFINED_INSTRUCTION => "undefined instruction",
            Self::PREFETCH_ABORT => "prefetch abort",
            Self::DATA_ABORT => "data abort",
            _ => "unknown",
        }
    }
}

/// The current program status register.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Cpsr(u32);

bitflags! {
    impl Cpsr: u32 {
        /// The processor was executing Thumb instructions.
        const THUMB = 1 << 5;

        const _ = !0;
    }
}

/// The VFP exception register.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Fpexc(u32);

bitflags! {
    impl Fpexc: u32 {
        /// The VFP raised an exception that has not been handled yet.
        const EX = 1 << 31;

        /// The VFP is enabled.
        const EN = 1 << 30;

        const _ = !0;
    }
}

/// A data or instruction fault status register.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Fsr(u32);

bitflags! {
    impl Fsr: u32 {
        /// The faulting access was a write (only meaningful for the DFSR).
        const WNR = 1 << 11;

        const _ = !0;
    }
}

impl Fsr {
    /// The low 4 bits of the status field.
    pub fn status(&self) -> u32 {
        self.bits() & 0xF
    }
}
