//! Loading the raw bytes of a dump from a file, a URL or a zip archive.

use std::fs::File;
use std::io::{Cursor, Read};
use std::ops::Deref;
use std::path::{Path, PathBuf};

use anyhow::Context;

/// Downloads and archive entries larger than this are refused.
const MAX_INPUT_SIZE: u64 = 64 * 1024 * 1024;

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

/// The stem used when nothing better can be derived from the input.
const DEFAULT_STEM: &str = "crash_dump";

enum Bytes {
    Mapped(memmap2::Mmap),
    Owned(Vec<u8>),
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(map) => map,
            Self::Owned(vec) => vec,
        }
    }
}

/// The bytes of a dump along with where they came from.
pub struct DumpSource {
    bytes: Bytes,
    stem: String,
    dir: Option<PathBuf>,
}

impl DumpSource {
    /// Load a dump from a local path or an `http(s)://` URL.
    ///
    /// If the input is a zip archive then the single `.dmp` file within it is
    /// extracted.
    pub fn open(input: &str) -> anyhow::Result<Self> {
        let mut source = match is_url(input) {
            true => Self {
                bytes: Bytes::Owned(fetch(input)?),
                stem: url_stem(input),
                dir: None,
            },
            false => {
                let path = Path::new(input);
                let file = File::open(path)
                    .with_context(|| format!("failed to open `{}`", path.display()))?;
                let map = unsafe { memmap2::Mmap::map(&file) }
                    .with_context(|| format!("failed to mmap `{}`", path.display()))?;

                Self {
                    bytes: Bytes::Mapped(map),
                    stem: path_stem(path),
                    dir: path.parent().map(Path::to_path_buf),
                }
            }
        };

        if source.bytes.starts_with(ZIP_SIGNATURE) {
            let (name, bytes) = extract_dump(&source.bytes)
                .with_context(|| format!("failed to extract a dump from `{input}`"))?;

            log::info!("extracted `{name}` from `{input}`");
            source.stem = path_stem(Path::new(&name));
            source.bytes = Bytes::Owned(bytes);
        }

        Ok(source)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The file stem to name derived files after.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// The directory containing a local input file.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn fetch(url: &str) -> anyhow::Result<Vec<u8>> {
    log::info!("downloading `{url}`");

    let response = ureq::get(url)
        .call()
        .with_context(|| format!("failed to download `{url}`"))?;

    let mut data = Vec::new();
    response
        .into_reader()
        .take(MAX_INPUT_SIZE + 1)
        .read_to_end(&mut data)
        .with_context(|| format!("failed to read the response from `{url}`"))?;

    if data.len() as u64 > MAX_INPUT_SIZE {
        anyhow::bail!("`{url}` is larger than {MAX_INPUT_SIZE} bytes");
    }

    log::debug!("downloaded {} bytes", data.len());
    Ok(data)
}

/// Extract the only `.dmp` file in a zip archive.
///
/// Returns the name of the extracted entry and its contents.
pub(crate) fn extract_dump(data: &[u8]) -> anyhow::Result<(String, Vec<u8>)> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).context("failed to open the zip archive")?;

    let mut matches = Vec::new();
    for index in 0..archive.len() {
        let file = archive.by_index(index)?;
        if !file.is_dir() && has_extension(file.name(), "dmp") {
            matches.push(index);
        }
    }

    let index = match matches.as_slice() {
        [index] => *index,
        [] => anyhow::bail!("the archive does not contain a .dmp file"),
        many => anyhow::bail!(
            "the archive contains {} .dmp files, expected exactly one",
            many.len()
        ),
    };

    let mut file = archive.by_index(index)?;
    let name = file.name().to_owned();
    let mut bytes = Vec::with_capacity(file.size().min(MAX_INPUT_SIZE) as usize);
    (&mut file)
        .take(MAX_INPUT_SIZE + 1)
        .read_to_end(&mut bytes)
        .with_context(|| format!("failed to decompress `{name}`"))?;

    if bytes.len() as u64 > MAX_INPUT_SIZE {
        anyhow::bail!("`{name}` is larger than {MAX_INPUT_SIZE} bytes");
    }

    Ok((name, bytes))
}

fn has_extension(name: &str, extension: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

fn path_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_STEM.to_owned())
}

/// The stem of the last path segment of a URL.
pub(crate) fn url_stem(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    let segment = path
        .split_once('/')
        .and_then(|(_, path)| path.rsplit('/').next());

    match segment {
        Some(segment) if !segment.is_empty() => path_stem(Path::new(segment)),
        _ => DEFAULT_STEM.to_owned(),
    }
}
