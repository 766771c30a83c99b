//! Frame-delay manifest: parsing, correlation with ingested frames, and ffconcat export.
//!
//! The manifest is the `ugokuIllustData` document published alongside an ugoira zip:
//!
//! ```json
//! {"frames": [{"file": "000000.jpg", "delay": 100}, {"file": "000001.jpg", "delay": 60}]}
//! ```
//!
//! Any other top-level fields (`src`, `mime_type`, ...) are ignored.

use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    foundation::error::{UgoiraError, UgoiraResult},
    frame::{FrameSequence, find_by_name},
    sequence::NodeId,
};

/// One `{file, delay}` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Archive entry name of the frame.
    pub file: String,
    /// Display time in milliseconds.
    pub delay: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub frames: Vec<ManifestRecord>,
}

impl Manifest {
    /// Parse and validate the manifest shape. Nothing is applied on failure.
    pub fn parse(bytes: &[u8]) -> UgoiraResult<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| UgoiraError::manifest(e.to_string()))?;

        // serde would also accept arrays in place of structs; the format only has objects.
        let Some(root) = value.as_object() else {
            return Err(UgoiraError::manifest("root JSON value is not an object"));
        };
        let Some(serde_json::Value::Array(records)) = root.get("frames") else {
            return Err(UgoiraError::manifest("the value of \"frames\" is not an array"));
        };
        if let Some(i) = records.iter().position(|r| !r.is_object()) {
            return Err(UgoiraError::manifest(format!("frames[{i}] is not an object")));
        }

        serde_json::from_value(value).map_err(|e| UgoiraError::manifest(e.to_string()))
    }

    /// Render an ffmpeg concat-demuxer script listing the frames in manifest order.
    pub fn to_ffconcat(&self) -> String {
        let mut out = String::from("ffconcat version 1.0\n");
        for rec in &self.frames {
            let _ = writeln!(out, "file '{}'", rec.file.replace('\'', r"'\''"));
            let _ = writeln!(out, "duration {}.{:03}", rec.delay / 1000, rec.delay % 1000);
        }
        out
    }
}

/// Which manifest a playback run trusts. Exactly one is consulted per run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestSource {
    /// `<archive stem>.json` next to the archive, as written by downloaders.
    #[default]
    Sibling,
    /// The `animation.json` entry inside the archive.
    Embedded,
}

/// Outcome of correlating a manifest against the frames.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CorrelationReport {
    /// Records whose frame was found and updated.
    pub applied: usize,
    /// Record names with no matching frame, in manifest order.
    pub missing: Vec<String>,
}

/// Path of the sibling manifest for `archive`: same path, extension replaced by `json`.
///
/// Only the last extension is swapped (`a.ugoira.zip` -> `a.ugoira.json`), and a path without
/// one gains `.json`. This differs from blindly overwriting the last four characters, which only
/// agrees for a three-letter extension such as `.zip`.
pub fn sibling_manifest_path(archive: &Path) -> PathBuf {
    archive.with_extension("json")
}

/// Fetch the raw manifest bytes from the chosen source.
///
/// Returns `Ok(None)` when that source simply has no manifest.
pub fn load_manifest(
    source: ManifestSource,
    archive: &Path,
    embedded: Option<&[u8]>,
) -> UgoiraResult<Option<Vec<u8>>> {
    match source {
        ManifestSource::Embedded => Ok(embedded.map(<[u8]>::to_vec)),
        ManifestSource::Sibling => {
            let path = sibling_manifest_path(archive);
            match std::fs::read(&path) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(UgoiraError::manifest(format!(
                    "read '{}': {e}",
                    path.display()
                ))),
            }
        }
    }
}

/// Load the manifest from `source`, then parse and apply it.
///
/// Nothing here stops playback: a read failure, a missing manifest or a structural error is
/// logged and every duration stays as it was. Returns the report when a manifest was applied.
pub fn apply_manifest_source<T>(
    frames: &mut FrameSequence<T>,
    head: NodeId,
    source: ManifestSource,
    archive: &Path,
    embedded: Option<&[u8]>,
) -> Option<CorrelationReport> {
    let bytes = match load_manifest(source, archive, embedded) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            info!(?source, "no manifest; every frame uses the default duration");
            return None;
        }
        Err(e) => {
            warn!(?source, error = %e, "couldn't load manifest; using default durations");
            return None;
        }
    };

    match apply_durations(frames, head, &bytes) {
        Ok(report) => {
            info!(
                applied = report.applied,
                missing = report.missing.len(),
                "manifest applied"
            );
            Some(report)
        }
        Err(e) => {
            warn!(error = %e, "couldn't apply manifest; using default durations");
            None
        }
    }
}

/// Parse `manifest_bytes` and assign each record's delay to the frame of the same name.
pub fn apply_durations<T>(
    frames: &mut FrameSequence<T>,
    head: NodeId,
    manifest_bytes: &[u8],
) -> UgoiraResult<CorrelationReport> {
    let manifest = Manifest::parse(manifest_bytes)?;
    Ok(apply_manifest(frames, head, &manifest))
}

/// Assign durations from an already parsed manifest. Unknown names are reported and skipped.
pub fn apply_manifest<T>(
    frames: &mut FrameSequence<T>,
    head: NodeId,
    manifest: &Manifest,
) -> CorrelationReport {
    let mut report = CorrelationReport::default();

    for rec in &manifest.frames {
        let Some(node) = find_by_name(frames, head, &rec.file) else {
            warn!(file = %rec.file, "couldn't find frame named in manifest");
            report.missing.push(rec.file.clone());
            continue;
        };
        debug!(file = %rec.file, delay = rec.delay, "frame duration set");
        frames.get_mut(node).set_duration_ms(rec.delay);
        report.applied += 1;
    }

    report
}
