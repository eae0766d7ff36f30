#![allow(dead_code)]

use std::cell::RefCell;

use luma_exdump::raw::{FormatVersion, Header, MAGIC};
use luma_exdump::{
    Disassembler, DisassemblyRequest, DisassemblyUnavailable, MemorySink, NoDisassembler,
    SinkError,
};
use zerocopy::{AsBytes, FromZeroes, U32};

/// Builds exception dump images for tests.
#[derive(Clone, Debug)]
pub struct DumpBuilder {
    pub version: FormatVersion,
    pub processor: u32,
    pub exception_type: u32,
    pub registers: Vec<u32>,
    pub register_bytes: Option<u32>,
    pub code: Vec<u8>,
    pub stack: Vec<u8>,
    pub additional: Vec<u8>,
}

impl DumpBuilder {
    pub fn new(processor: u32, exception_type: u32) -> Self {
        Self {
            version: FormatVersion::new(1, 2),
            processor,
            exception_type,
            registers: vec![0; 23],
            register_bytes: None,
            code: Vec::new(),
            stack: Vec::new(),
            additional: Vec::new(),
        }
    }

    pub fn register(mut self, index: usize, value: u32) -> Self {
        self.registers[index] = value;
        self
    }

    pub fn registers(mut self, registers: &[u32]) -> Self {
        self.registers = registers.to_vec();
        self
    }

    pub fn code(mut self, code: &[u8]) -> Self {
        self.code = code.to_vec();
        self
    }

    pub fn stack(mut self, stack: &[u8]) -> Self {
        self.stack = stack.to_vec();
        self
    }

    pub fn additional(mut self, additional: &[u8]) -> Self {
        self.additional = additional.to_vec();
        self
    }

    pub fn process(self, name: &[u8; 8], title_id: u64) -> Self {
        let mut additional = name.to_vec();
        additional.extend_from_slice(&title_id.to_le_bytes());
        self.additional(&additional)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut header = Header::new_zeroed();
        header.magic = MAGIC.map(U32::new);
        header.version = U32::new(self.version.0);
        header.processor = U32::new(self.processor);
        header.exception_type = U32::new(self.exception_type);
        header.register_bytes = U32::new(
            self.register_bytes
                .unwrap_or(self.registers.len() as u32 * 4),
        );
        header.code_dump_size = U32::new(self.code.len() as u32);
        header.stack_dump_size = U32::new(self.stack.len() as u32);
        header.additional_data_size = U32::new(self.additional.len() as u32);

        let mut data = header.as_bytes().to_vec();
        for register in &self.registers {
            data.extend_from_slice(&register.to_le_bytes());
        }
        data.extend_from_slice(&self.code);
        data.extend_from_slice(&self.stack);
        data.extend_from_slice(&self.additional);
        data
    }
}

/// A sink that remembers everything it was asked to save.
#[derive(Default)]
pub struct RecordingSink {
    pub saved: RefCell<Vec<Vec<u8>>>,
}

impl MemorySink for RecordingSink {
    fn persist(&self, bytes: &[u8]) -> Result<String, SinkError> {
        self.saved.borrow_mut().push(bytes.to_vec());
        Ok("crash_arm9mem.bin".to_string())
    }
}

/// A sink that always fails.
pub struct FailingSink;

impl MemorySink for FailingSink {
    fn persist(&self, _: &[u8]) -> Result<String, SinkError> {
        Err(SinkError::new("read-only file system"))
    }
}

/// A disassembler that returns a fixed listing and records its requests.
pub struct FixedDisassembler {
    pub listing: String,
    pub requests: RefCell<Vec<(u32, usize, bool)>>,
}

impl FixedDisassembler {
    pub fn new(listing: &str) -> Self {
        Self {
            listing: listing.to_string(),
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl Disassembler for FixedDisassembler {
    fn disassemble(
        &self,
        request: &DisassemblyRequest<'_>,
    ) -> Result<String, DisassemblyUnavailable> {
        self.requests
            .borrow_mut()
            .push((request.address, request.code.len(), request.thumb));
        Ok(self.listing.clone())
    }
}

pub const NO_DISASSEMBLER: NoDisassembler = NoDisassembler;
