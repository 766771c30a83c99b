use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use super::gpu::{GpuBackend, GpuTexture};
use crate::{
    foundation::core::{Clock, SystemClock},
    foundation::error::{UgoiraError, UgoiraResult},
    playback::{Flow, PlaybackConfig, Player, PlayerCommand},
};

// Placeholder size until the first frame is decoded.
const INITIAL_WINDOW_SIZE: PhysicalSize<u32> = PhysicalSize::new(640, 420);

/// Map a key event to a player command.
///
/// Keys act on release, and only when no modifier is held.
pub fn command_for_key(
    code: KeyCode,
    state: ElementState,
    modifiers: ModifiersState,
) -> Option<PlayerCommand> {
    if state != ElementState::Released || !modifiers.is_empty() {
        return None;
    }
    match code {
        KeyCode::KeyA => Some(PlayerCommand::ToggleScaleMode),
        KeyCode::Space => Some(PlayerCommand::TogglePause),
        KeyCode::KeyQ => Some(PlayerCommand::Quit),
        _ => None,
    }
}

struct ViewerApp {
    // Frames hold GPU textures; they must drop before the device does.
    player: Option<Player<GpuTexture>>,
    backend: Option<GpuBackend>,
    window: Option<Arc<Window>>,
    clock: SystemClock,
    modifiers: ModifiersState,
    title: String,
    tick_interval: Duration,
    fatal: Option<UgoiraError>,
}

impl ViewerApp {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> UgoiraResult<()> {
        let attrs = WindowAttributes::default()
            .with_title(self.title.clone())
            .with_inner_size(INITIAL_WINDOW_SIZE)
            .with_visible(false);
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| UgoiraError::render(format!("create window: {e}")))?,
        );

        let mut backend = GpuBackend::new(window.clone())?;
        let Some(player) = self.player.as_mut() else {
            return Err(UgoiraError::validation("player already shut down"));
        };

        if let Err(e) = player.prime(&mut backend, self.clock.ticks_ms()) {
            warn!(error = %e, "couldn't decode first frame");
        }
        if let Some((w, h)) = player
            .frames()
            .get(player.current())
            .texture()
            .map(GpuTexture::size)
        {
            info!(width = w, height = h, "sizing window to first frame");
            if let Some(actual) = window.request_inner_size(PhysicalSize::new(w, h)) {
                backend.resize(actual.width, actual.height);
            }
        }
        window.set_visible(true);

        self.backend = Some(backend);
        self.window = Some(window);
        Ok(())
    }

    fn dispatch(&mut self, event_loop: &ActiveEventLoop, cmd: PlayerCommand) {
        let (Some(player), Some(backend)) = (self.player.as_mut(), self.backend.as_mut()) else {
            return;
        };
        if player.handle(cmd, backend) == Flow::Quit {
            self.shutdown(event_loop);
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(player) = self.player.take() {
            let released = player.quit();
            info!(frames = released, "frames released");
        }
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: UgoiraError) {
        error!(error = %err, "viewer failed");
        self.fatal = Some(err);
        self.shutdown(event_loop);
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window.as_ref().map(|w| w.id()) != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.dispatch(event_loop, PlayerCommand::Quit),
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                if let Some(cmd) = command_for_key(code, event.state, self.modifiers) {
                    self.dispatch(event_loop, cmd);
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(backend) = self.backend.as_mut() {
                    backend.resize(size.width, size.height);
                }
                self.dispatch(event_loop, PlayerCommand::Redraw);
            }
            WindowEvent::RedrawRequested => self.dispatch(event_loop, PlayerCommand::Redraw),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let (Some(player), Some(backend)) = (self.player.as_mut(), self.backend.as_mut()) {
            player.tick(backend, self.clock.ticks_ms());
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(
            Instant::now() + self.tick_interval,
        ));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(player) = self.player.take() {
            player.quit();
        }
    }
}

/// Open a window titled `title` and play `player` until the user quits.
pub fn run(
    player: Player<GpuTexture>,
    title: impl Into<String>,
    config: &PlaybackConfig,
) -> UgoiraResult<()> {
    let event_loop =
        EventLoop::new().map_err(|e| UgoiraError::render(format!("create event loop: {e}")))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp {
        player: Some(player),
        backend: None,
        window: None,
        clock: SystemClock::new(),
        modifiers: ModifiersState::empty(),
        title: title.into(),
        tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
        fatal: None,
    };

    event_loop
        .run_app(&mut app)
        .map_err(|e| UgoiraError::render(format!("event loop: {e}")))?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
