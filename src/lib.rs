//! Ugoira playback: a zip of still images plus a JSON manifest of per-frame delays, played
//! back as a looping animation.
//!
//! The pipeline runs one way at startup:
//!
//! - [`read_whole_archive`] extracts every entry into a [`FrameSequence`]
//! - [`apply_durations`] assigns manifest delays to frames by name
//! - [`Player`] drives the loop, decoding textures lazily through a [`RenderBackend`]
//!
//! The `viewer` feature adds a `winit` + `wgpu` window that implements [`RenderBackend`].
#![forbid(unsafe_code)]

pub mod archive;
pub mod assets;
pub mod foundation;
pub mod frame;
pub mod manifest;
pub mod playback;
pub mod render;
pub mod sequence;
#[cfg(feature = "viewer")]
pub mod viewer;

pub use archive::{ArchiveContents, MANIFEST_ENTRY_NAME, read_archive, read_whole_archive};
pub use assets::{DecodedImage, decode::decode_image};
pub use foundation::core::{Clock, ManualClock, ScaleMode, SystemClock};
pub use foundation::error::{UgoiraError, UgoiraResult};
pub use frame::{Frame, FrameSequence, MAX_FRAME_NAME_LEN, find_by_name};
pub use manifest::{
    CorrelationReport, Manifest, ManifestRecord, ManifestSource, apply_durations, apply_manifest,
    apply_manifest_source, load_manifest, sibling_manifest_path,
};
pub use playback::{Flow, PlaybackConfig, PlaybackState, Player, PlayerCommand, TickReport};
pub use render::RenderBackend;
pub use sequence::{NodeId, Sequence};
