//! One animation still: identity, timing, encoded source and its lazily built texture.

use std::fmt;

use crate::{
    foundation::core::ScaleMode,
    foundation::error::{UgoiraError, UgoiraResult},
    render::RenderBackend,
    sequence::{NodeId, Sequence},
};

/// Longest accepted frame name, in bytes.
pub const MAX_FRAME_NAME_LEN: usize = 255;

/// Name carried by a frame that was never bound to an archive entry.
pub const UNNAMED_FRAME: &str = "undefined";

/// Playback-ordered frames.
pub type FrameSequence<T> = Sequence<Frame<T>>;

/// A single still of the animation.
///
/// `T` is the backend's texture handle. The texture is absent until first needed and is
/// rebuilt whenever the frame is dirty and gets revisited.
pub struct Frame<T> {
    name: String,
    duration_ms: u32,
    source: Vec<u8>,
    texture: Option<T>,
    dirty: bool,
}

impl<T> Frame<T> {
    /// Frame with the sentinel name, unset duration and nothing decoded.
    pub fn empty() -> Self {
        Self {
            name: UNNAMED_FRAME.to_owned(),
            duration_ms: 0,
            source: Vec::new(),
            texture: None,
            dirty: true,
        }
    }

    /// Frame built from an archive entry's path and bytes.
    pub fn from_entry(name: &str, source: Vec<u8>) -> UgoiraResult<Self> {
        let mut frame = Self::empty();
        frame.set_name(name)?;
        frame.source = source;
        Ok(frame)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the frame. Names longer than [`MAX_FRAME_NAME_LEN`] bytes are rejected.
    pub fn set_name(&mut self, name: &str) -> UgoiraResult<()> {
        if name.len() > MAX_FRAME_NAME_LEN {
            return Err(UgoiraError::validation(format!(
                "frame name '{name}' is {} bytes, limit is {MAX_FRAME_NAME_LEN}",
                name.len()
            )));
        }
        self.name.clear();
        self.name.push_str(name);
        Ok(())
    }

    /// Stored display duration in milliseconds; `0` means unset.
    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    pub fn set_duration_ms(&mut self, ms: u32) {
        self.duration_ms = ms;
    }

    /// Encoded image bytes as extracted from the archive.
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn texture(&self) -> Option<&T> {
        self.texture.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force the texture to be regenerated on the next visit.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Decode the source bytes and install the result as the frame's texture.
    ///
    /// The previous texture is dropped only once the new one exists; on failure the frame keeps
    /// whatever it had and stays dirty so a later visit retries.
    pub fn generate_texture<B>(&mut self, backend: &mut B, mode: ScaleMode) -> UgoiraResult<()>
    where
        B: RenderBackend<Texture = T>,
    {
        let texture = backend.decode_texture(&self.source, mode)?;
        self.texture = Some(texture);
        self.dirty = false;
        Ok(())
    }

    /// Release the source bytes and the texture. Calling this again is a no-op.
    pub fn destroy(&mut self) {
        self.source = Vec::new();
        self.texture = None;
    }
}

impl<T> Default for Frame<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for Frame<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("name", &self.name)
            .field("duration_ms", &self.duration_ms)
            .field("source_len", &self.source.len())
            .field("has_texture", &self.texture.is_some())
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// Find the first frame named exactly `name`, scanning forward from the head of the sequence
/// that contains `node`.
pub fn find_by_name<T>(frames: &FrameSequence<T>, node: NodeId, name: &str) -> Option<NodeId> {
    let head = frames.head(node);
    frames
        .ids_from(head)
        .find(|&id| frames.get(id).name() == name)
}
