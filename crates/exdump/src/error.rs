use core::fmt;

use crate::raw::FormatVersion;

/// An error encountered while reading an exception dump.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ReadError {
    /// The buffer does not start with the exception dump magic.
    #[error("invalid file format")]
    InvalidMagic,

    /// The dump was written with a format version older than 1.2.
    #[error("incompatible format version {0}, please use the appropriate parser")]
    UnsupportedVersion(FormatVersion),

    /// A region extends past the end of its enclosing buffer.
    #[error("dump is truncated: the {region} needs {needed} bytes but only {available} are available")]
    Truncated {
        region: Region,
        needed: usize,
        available: usize,
    },

    /// The process name in the additional data is not ASCII.
    #[error("the current process name is not valid ASCII")]
    InvalidProcessName,
}

/// The part of a dump that a [`ReadError::Truncated`] refers to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Region {
    Header,
    Registers,
    Code,
    Stack,
    AdditionalData,
    ProcessInfo,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Registers => "register dump",
            Self::Code => "code dump",
            Self::Stack => "stack dump",
            Self::AdditionalData => "additional data",
            Self::ProcessInfo => "process info",
        })
    }
}
