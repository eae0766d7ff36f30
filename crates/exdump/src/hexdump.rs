//! A classic `hexdump -C` style byte formatter.
//!
//! ```
//! use luma_exdump::hexdump::HexDump;
//!
//! let dump = HexDump::new(0x0800_0000, b"Hello, exception\x00\x01");
//! let text = dump.to_string();
//!
//! assert_eq!(
//!     text,
//!     "08000000:  48 65 6c 6c 6f 2c 20 65  78 63 65 70 74 69 6f 6e   |Hello, exception|\n\
//!      08000010:  00 01                                              |..|"
//! );
//! ```

use core::fmt::{self, Write};
use core::iter::FusedIterator;
use core::slice::Chunks;

/// Formats a byte slice as lines of address, hex bytes and printable ASCII.
#[derive(Copy, Clone, Debug)]
pub struct HexDump<'a> {
    address: u32,
    bytes: &'a [u8],
    width: usize,
    placeholder: char,
}

impl<'a> HexDump<'a> {
    /// The number of bytes shown on each line unless configured otherwise.
    pub const DEFAULT_WIDTH: usize = 16;

    /// The character shown in place of non-printable bytes unless configured
    /// otherwise.
    pub const DEFAULT_PLACEHOLDER: char = '.';

    pub fn new(address: u32, bytes: &'a [u8]) -> Self {
        Self {
            address,
            bytes,
            width: Self::DEFAULT_WIDTH,
            placeholder: Self::DEFAULT_PLACEHOLDER,
        }
    }

    /// Set the number of bytes per line.
    ///
    /// # Panics
    /// Panics if `width` is 0.
    pub fn width(mut self, width: usize) -> Self {
        assert!(width != 0, "hexdump width must be non-zero");

        self.width = width;
        self
    }

    /// Set the character shown in place of bytes outside of `0x20..=0x7E`.
    pub fn placeholder(mut self, placeholder: char) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Iterate over the formatted lines of this dump.
    pub fn lines(&self) -> HexLines<'a> {
        HexLines {
            chunks: self.bytes.chunks(self.width),
            address: self.address,
            width: self.width,
            placeholder: self.placeholder,
        }
    }
}

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, line) in self.lines().enumerate() {
            if index != 0 {
                f.write_char('\n')?;
            }

            write!(f, "{line}")?;
        }

        Ok(())
    }
}

/// A single line of a [`HexDump`].
#[derive(Copy, Clone, Debug)]
pub struct HexLine<'a> {
    address: u32,
    bytes: &'a [u8],
    width: usize,
    placeholder: char,
}

impl<'a> HexLine<'a> {
    /// The address of the first byte on this line.
    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl fmt::Display for HexLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}:  ", self.address)?;

        // Room for every byte plus the separator at the midpoint.
        let column = self.width * 3 + 1;
        // Odd widths have no midpoint and so no extra gap.
        let midpoint = (self.width % 2 == 0).then_some(self.width / 2);
        let mut written = 0;

        for (index, byte) in self.bytes.iter().enumerate() {
            if index != 0 {
                f.write_char(' ')?;
                written += 1;
            }
            if Some(index) == midpoint {
                f.write_char(' ')?;
                written += 1;
            }

            write!(f, "{byte:02x}")?;
            written += 2;
        }

        for _ in written..column {
            f.write_char(' ')?;
        }

        f.write_str("  |")?;
        for &byte in self.bytes {
            match byte {
                0x20..=0x7E => f.write_char(byte as char)?,
                _ => f.write_char(self.placeholder)?,
            }
        }
        f.write_char('|')
    }
}

#[derive(Clone, Debug)]
pub struct HexLines<'a> {
    chunks: Chunks<'a, u8>,
    address: u32,
    width: usize,
    placeholder: char,
}

impl<'a> Iterator for HexLines<'a> {
    type Item = HexLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.chunks.next()?;
        let line = HexLine {
            address: self.address,
            bytes,
            width: self.width,
            placeholder: self.placeholder,
        };

        self.address = self.address.wrapping_add(bytes.len() as u32);
        Some(line)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl<'a> ExactSizeIterator for HexLines<'a> {}
impl<'a> FusedIterator for HexLines<'a> {}
