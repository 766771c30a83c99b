use crate::{foundation::core::ScaleMode, foundation::error::UgoiraResult};

/// The graphics capabilities the playback driver needs.
///
/// Textures are owned by the frame that requested them and released by `Drop`, so "destroy
/// texture" is simply dropping the handle.
pub trait RenderBackend {
    type Texture;

    /// Decode encoded image bytes into a presentable texture sampled with `mode`.
    fn decode_texture(&mut self, bytes: &[u8], mode: ScaleMode) -> UgoiraResult<Self::Texture>;

    /// Clear the surface, draw `texture` (if any) over it, and present.
    fn present(&mut self, texture: Option<&Self::Texture>) -> UgoiraResult<()>;
}
