use std::fmt;
use std::io::{self, BufWriter, StdoutLock, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser};
use luma_exdump::report::{ReportError, Renderer};
use luma_exdump::{Disassembler, ExceptionDump, NoDisassembler};

use crate::objdump::Objdump;
use crate::sink::FileSink;
use crate::source::DumpSource;

mod objdump;
mod sink;
mod source;

/// Print a Luma3DS exception dump in a human readable format.
///
/// The code around the faulting instruction is disassembled with
/// `arm-none-eabi-objdump` when one can be found, either through the
/// `--objdump` flag, a devkitARM installation pointed to by `DEVKITARM`, or
/// `PATH`. Arm9 dumps carry a memory image which is saved next to the input
/// as `<name>_arm9mem.bin`.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// The dump to read. Either a path or an http(s) URL, optionally pointing
    /// to a zip archive containing a single `.dmp` file.
    input: String,

    /// Path to the objdump binary used to disassemble the code dump.
    #[arg(long)]
    objdump: Option<PathBuf>,

    /// Always print the code dump as a hex dump.
    #[arg(long)]
    no_disasm: bool,

    /// Directory to save Arm9 memory images to.
    ///
    /// Defaults to the directory containing the input.
    #[arg(long, short)]
    output_dir: Option<PathBuf>,

    /// Increase logging verbosity. May be repeated.
    #[arg(long, short, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let source = DumpSource::open(&args.input)?;
    let dump = ExceptionDump::load(source.bytes())?;

    let disassembler: Box<dyn Disassembler> = match args.no_disasm {
        true => Box::new(NoDisassembler),
        false => match Objdump::locate(args.objdump.as_deref()) {
            Some(objdump) => {
                log::debug!("using `{}`", objdump.program().display());
                Box::new(objdump)
            }
            None => {
                log::info!("arm-none-eabi-objdump not found, code will not be disassembled");
                Box::new(NoDisassembler)
            }
        },
    };

    let dir = args
        .output_dir
        .as_deref()
        .or(source.dir())
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let sink = FileSink::new(dir, source.stem());
    log::trace!("arm9 memory images go to `{}`", sink.path().display());

    let stdout = io::stdout();
    let mut w = IoWriter::new(BufWriter::new(stdout.lock()));
    let result = Renderer::new(&*disassembler, &sink).render(&mut w, &dump);

    // Keep whatever was rendered before a failure.
    let flushed = w.inner.flush();

    match result {
        Ok(()) => (),
        Err(ReportError::Fmt(_)) => {
            if let Some(e) = w.error {
                return Err(e).context("failed to write to stdout");
            }

            anyhow::bail!("failed to render the report");
        }
        Err(e) => return Err(e.into()),
    }

    flushed.context("failed to write to stdout")
}

/// Adapts an [`io::Write`] for use as a [`fmt::Write`], remembering the
/// underlying error.
struct IoWriter<'a> {
    inner: BufWriter<StdoutLock<'a>>,
    error: Option<io::Error>,
}

impl<'a> IoWriter<'a> {
    fn new(inner: BufWriter<StdoutLock<'a>>) -> Self {
        Self { inner, error: None }
    }
}

impl fmt::Write for IoWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.inner.write_all(s.as_bytes()).map_err(|e| {
            self.error = Some(e);
            fmt::Error
        })
    }
}
