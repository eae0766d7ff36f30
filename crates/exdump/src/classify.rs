//! Classification of the exception beyond its raw type.

use core::fmt;

use crate::raw::ExceptionType;
use crate::ExceptionDump;

/// `bkpt 0xfffe`, emitted by the kernel when it panics.
pub const ARM_KERNEL_PANIC: u32 = 0xE12FFF7E;

/// `svc 0x3c` (`svcBreak`) in ARM state.
pub const ARM_SVC_BREAK: u32 = 0xEF00003C;

/// `svc 0x3c` (`svcBreak`) in Thumb state.
pub const THUMB_SVC_BREAK: u16 = 0xDF3C;

/// Additional detail about why an exception was raised.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ExceptionDetail {
    KernelPanic,
    SvcBreak(SvcBreakReason),
    VfpException,
}

impl fmt::Display for ExceptionDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KernelPanic => f.write_str("(kernel panic)"),
            Self::SvcBreak(reason) => fmt::Display::fmt(reason, f),
            Self::VfpException => f.write_str("(VFP exception)"),
        }
    }
}

/// The reason passed in `r0` to `svcBreak`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SvcBreakReason {
    Panic,
    AssertionFailed,
    UserRelated,
    Other,
}

impl SvcBreakReason {
    pub fn from_r0(r0: Option<u32>) -> Self {
        match r0 {
            Some(0) => Self::Panic,
            Some(1) => Self::AssertionFailed,
            Some(2) => Self::UserRelated,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for SvcBreakReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Panic => "(svcBreak: panic)",
            Self::AssertionFailed => "(svcBreak: assertion failed)",
            Self::UserRelated => "(svcBreak: user-related)",
            Self::Other => "(svcBreak)",
        })
    }
}

/// Work out the detail suffix for the exception recorded in `dump`, if any.
///
/// Prefetch aborts are checked for the breakpoint and `svcBreak` conventions
/// by looking at the last instruction of the code dump. Any other exception
/// raised on the Arm11 while the VFP has a pending exception is reported as a
/// VFP exception.
pub fn exception_detail(dump: &ExceptionDump<'_>) -> Option<ExceptionDetail> {
    let regs = dump.registers();
    let svc_break = || ExceptionDetail::SvcBreak(SvcBreakReason::from_r0(regs.get(0)));

    if dump.exception_type() == ExceptionType::PREFETCH_ABORT {
        let code = dump.code();

        return match regs.is_thumb() {
            false => match u32::from_le_bytes(*code.last_chunk::<4>()?) {
                ARM_KERNEL_PANIC => Some(ExceptionDetail::KernelPanic),
                ARM_SVC_BREAK => Some(svc_break()),
                _ => None,
            },
            true => match u16::from_le_bytes(*code.last_chunk::<2>()?) {
                THUMB_SVC_BREAK => Some(svc_break()),
                _ => None,
            },
        };
    }

    if !dump.processor().is_arm9() && regs.has_vfp_exception() {
        return Some(ExceptionDetail::VfpException);
    }

    None
}

/// A named fault status code.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FaultStatus {
    Alignment,
    InstructionCacheMaintenance,
    TranslationExternalAbortFirstLevel,
    TranslationExternalAbortSecondLevel,
    TranslationSection,
    TranslationPage,
    AccessBitSection,
    AccessBitPage,
    DomainSection,
    DomainPage,
    PermissionSection,
    PermissionPage,
    PreciseExternalAbort,
    ImpreciseExternalAbort,
    DebugEvent,
}

impl FaultStatus {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0b1 => Self::Alignment,
            0b100 => Self::InstructionCacheMaintenance,
            0b1100 => Self::TranslationExternalAbortFirstLevel,
            0b1110 => Self::TranslationExternalAbortSecondLevel,
            0b101 => Self::TranslationSection,
            0b111 => Self::TranslationPage,
            0b11 => Self::AccessBitSection,
            0b110 => Self::AccessBitPage,
            0b1001 => Self::DomainSection,
            0b1011 => Self::DomainPage,
            0b1101 => Self::PermissionSection,
            0b1111 => Self::PermissionPage,
            0b1000 => Self::PreciseExternalAbort,
            0b10110 => Self::ImpreciseExternalAbort,
            0b10 => Self::DebugEvent,
            _ => return None,
        })
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Alignment => "Alignment",
            Self::InstructionCacheMaintenance => "Instruction cache maintenance operation fault",
            Self::TranslationExternalAbortFirstLevel => {
                "External Abort on translation - First-level"
            }
            Self::TranslationExternalAbortSecondLevel => {
                "External Abort on translation - Second-level"
            }
            Self::TranslationSection => "Translation - Section",
            Self::TranslationPage => "Translation - Page",
            Self::AccessBitSection => "Access bit - Section",
            Self::AccessBitPage => "Access bit - Page",
            Self::DomainSection => "Domain - Section",
            Self::DomainPage => "Domain - Page",
            Self::PermissionSection => "Permission - Section",
            Self::PermissionPage => "Permission - Page",
            Self::PreciseExternalAbort => "Precise External Abort",
            Self::ImpreciseExternalAbort => "Imprecise External Abort",
            Self::DebugEvent => "Debug event",
        }
    }
}

/// A masked fault status code as read from the DFSR or IFSR.
///
/// Displays as the description of the code, or `Unknown` for codes that have
/// no name.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FaultStatusCode(pub u32);

impl FaultStatusCode {
    pub fn status(&self) -> Option<FaultStatus> {
        FaultStatus::from_code(self.0)
    }
}

impl fmt::Display for FaultStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status() {
            Some(status) => f.write_str(status.description()),
            None => f.write_str("Unknown"),
        }
    }
}

/// The fault status of an Arm11 abort.
///
/// Prefetch aborts report through the IFSR and everything else through the
/// DFSR. Returns `None` for the Arm9, for exceptions that are not aborts and
/// when the relevant register was not saved.
pub fn fault_status(dump: &ExceptionDump<'_>) -> Option<FaultStatusCode> {
    if !dump.processor().is_arm11() || dump.exception_type().0 < ExceptionType::PREFETCH_ABORT.0 {
        return None;
    }

    let regs = dump.registers();
    let fsr = match dump.exception_type() {
        ExceptionType::PREFETCH_ABORT => regs.ifsr()?,
        _ => regs.dfsr()?,
    };

    Some(FaultStatusCode(fsr.status()))
}
