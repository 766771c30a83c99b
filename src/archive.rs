//! Zip ingestion: every entry becomes an in-memory frame, except the embedded manifest which is
//! set aside.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek};
use std::path::Path;

use tracing::{debug, info};

use crate::{
    foundation::error::{UgoiraError, UgoiraResult},
    frame::{Frame, FrameSequence},
    sequence::{NodeId, Sequence},
};

/// Entry name reserved for a manifest stored inside the archive.
pub const MANIFEST_ENTRY_NAME: &str = "animation.json";

/// Upper bound on a single read while extracting an entry.
pub const READ_CHUNK_SIZE: usize = 4096;

// Entry sizes come from the archive; don't trust them for up-front allocation.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// What an archive yields: the frames in entry order plus the embedded manifest, if any.
pub struct ArchiveContents<T> {
    pub frames: FrameSequence<T>,
    pub head: NodeId,
    /// Raw bytes of the `animation.json` entry.
    pub manifest: Option<Vec<u8>>,
}

impl<T> fmt::Debug for ArchiveContents<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveContents")
            .field("frames", &self.frames)
            .field("head", &self.head)
            .field("manifest_len", &self.manifest.as_ref().map(Vec::len))
            .finish()
    }
}

/// Open the zip at `path` and extract all of it into memory.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn read_whole_archive<T>(path: &Path) -> UgoiraResult<ArchiveContents<T>> {
    let file = File::open(path)
        .map_err(|e| UgoiraError::archive(format!("open '{}': {e}", path.display())))?;
    read_archive(BufReader::new(file))
}

/// Extract a zip from any seekable reader.
pub fn read_archive<R, T>(reader: R) -> UgoiraResult<ArchiveContents<T>>
where
    R: Read + Seek,
{
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| UgoiraError::archive(format!("not a zip archive: {e}")))?;

    // (sequence, head, tail)
    let mut built: Option<(FrameSequence<T>, NodeId, NodeId)> = None;
    let mut manifest = None;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| UgoiraError::archive(format!("read entry #{i}: {e}")))?;
        if entry.is_dir() {
            debug!(entry = entry.name(), "skipping directory entry");
            continue;
        }

        let name = entry.name().to_owned();
        let declared = entry.size();
        debug!(entry = %name, size = declared, "reading archive entry");
        let bytes = read_entry(&mut entry, declared, &name)?;

        if name == MANIFEST_ENTRY_NAME {
            manifest = Some(bytes);
            continue;
        }

        let frame = Frame::from_entry(&name, bytes)?;
        built = Some(match built {
            None => {
                let (seq, head) = Sequence::create(frame);
                (seq, head, head)
            }
            Some((mut seq, head, tail)) => {
                let tail = seq.insert_after(tail, frame);
                (seq, head, tail)
            }
        });
    }

    let (frames, head, _) = built.ok_or(UgoiraError::NoFrames)?;
    info!(
        frames = frames.len(),
        embedded_manifest = manifest.is_some(),
        "archive ingested"
    );

    Ok(ArchiveContents {
        frames,
        head,
        manifest,
    })
}

/// Read exactly `declared` bytes from `reader` in bounded chunks.
///
/// Fewer bytes than declared, or any byte past the declared size, is corruption.
pub(crate) fn read_entry<R: Read>(
    reader: &mut R,
    declared: u64,
    name: &str,
) -> UgoiraResult<Vec<u8>> {
    let expected = usize::try_from(declared).map_err(|_| {
        UgoiraError::corrupt(format!("entry '{name}' declares {declared} bytes"))
    })?;

    let mut out = Vec::with_capacity(expected.min(MAX_PREALLOC));
    let mut buf = [0u8; READ_CHUNK_SIZE];

    while out.len() < expected {
        let want = (expected - out.len()).min(READ_CHUNK_SIZE);
        let n = read_retrying(reader, &mut buf[..want], name)?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }

    let trailing = read_retrying(reader, &mut buf[..1], name)?;
    if out.len() != expected || trailing != 0 {
        return Err(UgoiraError::corrupt(format!(
            "entry '{name}': read {} bytes, declared {declared}",
            out.len() + trailing
        )));
    }

    Ok(out)
}

fn read_retrying<R: Read>(reader: &mut R, buf: &mut [u8], name: &str) -> UgoiraResult<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(UgoiraError::corrupt(format!("read entry '{name}': {e}"))),
        }
    }
}
