//! Single-window player: `winit` for the window and input, `wgpu` for textures and present.

mod app;
mod gpu;

pub use app::{command_for_key, run};
pub use gpu::{GpuBackend, GpuTexture};
