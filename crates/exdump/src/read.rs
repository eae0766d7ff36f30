use zerocopy::{FromBytes, LittleEndian, U32};

use crate::error::{ReadError, Region};
use crate::raw::{self, ExceptionType, FormatVersion, Header, ProcessorId, HEADER_SIZE, MAGIC};
use crate::registers::Registers;

/// A decoded exception dump.
///
/// All regions borrow from the buffer that the dump was loaded from.
#[derive(Copy, Clone, Debug)]
pub struct ExceptionDump<'a> {
    header: Header,
    registers: Registers<'a>,
    code: &'a [u8],
    stack: &'a [u8],
    additional: &'a [u8],
}

impl<'a> ExceptionDump<'a> {
    /// Validate and decode an exception dump.
    ///
    /// Every region is bounds-checked against `data` before it is sliced, so
    /// a header that declares more data than is present results in
    /// [`ReadError::Truncated`].
    pub fn load(data: &'a [u8]) -> Result<Self, ReadError> {
        let magic = <[U32<LittleEndian>; 2]>::read_from_prefix(data).ok_or(ReadError::InvalidMagic)?;
        if magic.map(|word| word.get()) != MAGIC {
            return Err(ReadError::InvalidMagic);
        }

        let header = Header::read_from_prefix(data).ok_or(ReadError::Truncated {
            region: Region::Header,
            needed: HEADER_SIZE,
            available: data.len(),
        })?;

        let version = FormatVersion(header.version.get());
        if !version.is_supported() {
            return Err(ReadError::UnsupportedVersion(version));
        }

        let mut regions = Regions::new(data);
        let registers = regions.take(Region::Registers, header.register_count() * 4)?;
        let code = regions.take(Region::Code, header.code_dump_size.get() as usize)?;
        let stack = regions.take(Region::Stack, header.stack_dump_size.get() as usize)?;
        let additional = regions.take(
            Region::AdditionalData,
            header.additional_data_size.get() as usize,
        )?;

        // The register region is always a whole number of words.
        let registers = <U32<LittleEndian>>::slice_from(registers).ok_or(ReadError::Truncated {
            region: Region::Registers,
            needed: header.register_count() * 4,
            available: registers.len(),
        })?;

        log::debug!(
            "decoded v{version} dump: {} registers, {:#x} code bytes, {:#x} stack bytes, {:#x} additional bytes",
            registers.len(),
            code.len(),
            stack.len(),
            additional.len(),
        );

        Ok(Self {
            header,
            registers: Registers::new(registers),
            code,
            stack,
            additional,
        })
    }

    /// The raw dump header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn version(&self) -> FormatVersion {
        FormatVersion(self.header.version.get())
    }

    /// The processor that raised the exception.
    pub fn processor(&self) -> ProcessorId {
        self.header.processor_id()
    }

    /// The index of the core that raised the exception.
    ///
    /// This is only meaningful when [`processor`] is not the Arm9.
    ///
    /// [`processor`]: ExceptionDump::processor
    pub fn core(&self) -> u16 {
        self.header.core()
    }

    pub fn exception_type(&self) -> ExceptionType {
        ExceptionType(self.header.exception_type.get())
    }

    pub fn registers(&self) -> Registers<'a> {
        self.registers
    }

    /// The bytes of code leading up to and including the faulting
    /// instruction.
    pub fn code(&self) -> &'a [u8] {
        self.code
    }

    /// The stack contents, starting at `sp`.
    pub fn stack(&self) -> &'a [u8] {
        self.stack
    }

    /// The processor-specific data at the end of the dump.
    pub fn additional_data(&self) -> &'a [u8] {
        self.additional
    }

    /// The offset of the code region within the dump.
    pub fn code_offset(&self) -> usize {
        HEADER_SIZE + self.registers.len() * 4
    }

    /// The address of the first byte of the code region.
    ///
    /// `pc` reads ahead of the faulting instruction by two instructions, so
    /// the code region ends one instruction past `pc - 2 * width`. A missing
    /// `pc` is treated as 0.
    pub fn code_address(&self) -> u32 {
        let width = if self.registers.is_thumb() { 2 } else { 4 };

        self.registers
            .pc()
            .unwrap_or(0)
            .wrapping_sub(self.code.len() as u32)
            .wrapping_add(width)
    }

    /// The process that was running on the Arm11 when the exception was
    /// raised.
    ///
    /// Returns `None` for other processors and when no additional data was
    /// saved. The name field is always 8 bytes on disk; its NUL padding is
    /// stripped rather than kept as part of the name.
    ///
    /// # Errors
    /// Returns [`ReadError::InvalidProcessName`] if the process name is not
    /// ASCII and [`ReadError::Truncated`] if the additional data is too short
    /// to hold the process info.
    pub fn current_process(&self) -> Result<Option<ProcessInfo<'a>>, ReadError> {
        if !self.processor().is_arm11() || self.additional.is_empty() {
            return Ok(None);
        }

        let info = raw::ProcessInfo::ref_from_prefix(self.additional).ok_or(ReadError::Truncated {
            region: Region::ProcessInfo,
            needed: core::mem::size_of::<raw::ProcessInfo>(),
            available: self.additional.len(),
        })?;

        if !info.name.is_ascii() {
            return Err(ReadError::InvalidProcessName);
        }

        let name = core::str::from_utf8(&info.name).map_err(|_| ReadError::InvalidProcessName)?;

        Ok(Some(ProcessInfo {
            name: name.trim_end_matches('\0'),
            title_id: info.title_id.get(),
        }))
    }
}

/// The name and title id of the process that faulted.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ProcessInfo<'a> {
    name: &'a str,
    title_id: u64,
}

impl<'a> ProcessInfo<'a> {
    /// The process name, without its NUL padding.
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn title_id(&self) -> u64 {
        self.title_id
    }
}

/// Hands out the contiguous regions that follow the header.
struct Regions<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Regions<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: HEADER_SIZE,
        }
    }

    fn take(&mut self, region: Region, len: usize) -> Result<&'a [u8], ReadError> {
        let truncated = |needed| ReadError::Truncated {
            region,
            needed,
            available: self.data.len(),
        };

        let end = self.offset.checked_add(len).ok_or(truncated(usize::MAX))?;
        let bytes = self.data.get(self.offset..end).ok_or(truncated(end))?;

        self.offset = end;
        Ok(bytes)
    }
}
