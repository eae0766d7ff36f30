//! Disassembly through devkitARM's `arm-none-eabi-objdump`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use luma_exdump::{Disassembler, DisassemblyRequest, DisassemblyUnavailable};

const OBJDUMP: &str = "arm-none-eabi-objdump";

pub struct Objdump {
    program: PathBuf,
}

impl Objdump {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find an objdump binary to use.
    ///
    /// An explicitly provided path always wins. Otherwise the copy shipped
    /// with devkitARM is used if `DEVKITARM` is set, and as a last resort
    /// `PATH` is searched.
    pub fn locate(explicit: Option<&Path>) -> Option<Self> {
        if let Some(program) = explicit {
            return Some(Self::new(program));
        }

        if let Some(root) = std::env::var_os("DEVKITARM") {
            let program = devkitarm_objdump(&root.to_string_lossy());
            if program.is_file() {
                return Some(Self::new(program));
            }

            log::debug!("`{}` does not exist", program.display());
        }

        which::which(OBJDUMP).ok().map(Self::new)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Disassembler for Objdump {
    fn disassemble(
        &self,
        request: &DisassemblyRequest<'_>,
    ) -> Result<String, DisassemblyUnavailable> {
        let mut file = tempfile::NamedTempFile::new().map_err(|e| {
            DisassemblyUnavailable::new(format!("failed to create a temporary file: {e}"))
        })?;
        file.write_all(request.code)
            .and_then(|()| file.flush())
            .map_err(|e| {
                DisassemblyUnavailable::new(format!("failed to write a temporary file: {e}"))
            })?;

        // objdump has to be able to open the file on its own.
        let path = file.into_temp_path();

        let mut options = String::from("reg-names-std");
        if request.thumb {
            options.push_str(",force-thumb");
        }

        log::debug!(
            "running `{}` on {:#x} bytes at {:#010x}",
            self.program.display(),
            request.code.len(),
            request.address
        );

        let output = Command::new(&self.program)
            .args(["-marm", "-b", "binary"])
            .arg(format!("--adjust-vma={:#x}", request.address))
            .args(["-D", "-z", "-M"])
            .arg(options)
            .arg(&*path)
            .output()
            .map_err(|e| {
                DisassemblyUnavailable::new(format!(
                    "failed to run `{}`: {e}",
                    self.program.display()
                ))
            })?;

        if !output.status.success() {
            return Err(DisassemblyUnavailable::new(format!(
                "`{}` exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| DisassemblyUnavailable::new("objdump output is not valid UTF-8"))?;

        listing(&stdout)
            .map(str::to_owned)
            .ok_or_else(|| DisassemblyUnavailable::new("objdump output has no .data section"))
    }
}

/// Strip everything up to and including the `<.data>:` label line.
pub(crate) fn listing(output: &str) -> Option<&str> {
    let label = output.find("<.data")?;
    let rest = &output[label..];
    let newline = rest.find('\n')?;

    Some(&rest[newline + 1..])
}

/// The objdump binary within a devkitARM installation.
///
/// devkitPro's MSYS environment sets `DEVKITARM` to a path like
/// `/opt/devkitpro/devkitARM`, or `/c/devkitPro/devkitARM` on Windows which
/// native programs cannot use.
fn devkitarm_objdump(root: &str) -> PathBuf {
    let root = match cfg!(windows) {
        true => msys_to_windows(root),
        false => root.to_owned(),
    };

    Path::new(&root).join("bin").join(OBJDUMP)
}

fn msys_to_windows(path: &str) -> String {
    let mut chars = path.chars();
    match (chars.next(), chars.next()) {
        (Some('/'), Some(drive)) if drive.is_ascii_alphabetic() => {
            format!("{drive}:{}", chars.as_str())
        }
        _ => path.to_owned(),
    }
}
