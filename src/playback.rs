//! Timer-gated playback over a [`FrameSequence`].
//!
//! Two cursors walk the same sequence. The playback cursor (`current`) advances when the
//! frame deadline passes. The redraw cursor advances on every tick and regenerates at most
//! one dirty texture per tick, so a full invalidation is caught up gradually instead of in a
//! single stall.
//!
//! Timing follows the manifest convention observed in every revision of the player: before
//! `current` is shown, the driver waits on the duration stored on the frame *preceding*
//! `current` (the tail, when `current` is the head). The check itself is bucketed:
//! `now / d > frame_time / d`, where `frame_time` is the tick of the last frame change.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    foundation::core::ScaleMode,
    foundation::error::UgoiraResult,
    frame::FrameSequence,
    render::RenderBackend,
    sequence::NodeId,
};

/// Duration used for frames whose manifest delay is unset (`0`).
pub const DEFAULT_FRAME_DURATION_MS: u32 = 1000;

/// Pause between loop iterations.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 16;

/// Tunables for a playback run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Filtering applied to textures decoded from now on.
    pub scale_mode: ScaleMode,
    /// Stand-in for frames without a duration.
    pub default_duration_ms: u32,
    /// Delay between loop iterations.
    pub tick_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            scale_mode: ScaleMode::Smooth,
            default_duration_ms: DEFAULT_FRAME_DURATION_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    /// Deadline checks are suspended; the redraw cursor keeps running.
    Paused,
}

/// User-facing actions, independent of how they were triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Switch nearest/smooth filtering and re-decode every frame.
    ToggleScaleMode,
    TogglePause,
    /// Re-present the last shown frame (the surface was exposed or resized).
    Redraw,
    Quit,
}

/// Whether the loop should keep going after a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// What a single tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Frame whose texture was (re)generated successfully.
    pub regenerated: Option<NodeId>,
    /// Frame that was presented.
    pub presented: Option<NodeId>,
}

/// Playback state machine owning the frames.
pub struct Player<T> {
    frames: FrameSequence<T>,
    current: NodeId,
    redraw: NodeId,
    shown: Option<NodeId>,
    paused: bool,
    frame_time: u64,
    scale_mode: ScaleMode,
    default_duration_ms: u32,
}

impl<T> Player<T> {
    /// Start at the head of `frames`, playing, with every cursor on the head.
    pub fn new(frames: FrameSequence<T>, node: NodeId, config: &PlaybackConfig) -> Self {
        let head = frames.head(node);
        Self {
            frames,
            current: head,
            redraw: head,
            shown: None,
            paused: false,
            frame_time: 0,
            scale_mode: config.scale_mode,
            default_duration_ms: config.default_duration_ms.max(1),
        }
    }

    pub fn frames(&self) -> &FrameSequence<T> {
        &self.frames
    }

    /// Frame that will be presented at the next deadline.
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Frame the redraw cursor will inspect on the next tick.
    pub fn redraw_cursor(&self) -> NodeId {
        self.redraw
    }

    /// Frame most recently presented, if any.
    pub fn shown(&self) -> Option<NodeId> {
        self.shown
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.scale_mode
    }

    pub fn state(&self) -> PlaybackState {
        if self.paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        }
    }

    /// Tick of the last frame change.
    pub fn frame_time(&self) -> u64 {
        self.frame_time
    }

    /// Decode the first frame ahead of the loop and anchor the deadline clock at `now_ms`.
    pub fn prime<B>(&mut self, backend: &mut B, now_ms: u64) -> UgoiraResult<()>
    where
        B: RenderBackend<Texture = T>,
    {
        self.frame_time = now_ms;
        let mode = self.scale_mode;
        self.frames
            .get_mut(self.current)
            .generate_texture(backend, mode)
    }

    /// Time `node` waits before being shown: its predecessor's duration, or the default when
    /// that is unset.
    pub fn effective_duration_ms(&self, node: NodeId) -> u32 {
        let prev = self.frames.prev_wrapping(node);
        match self.frames.get(prev).duration_ms() {
            0 => self.default_duration_ms,
            d => d,
        }
    }

    /// Run one loop iteration at tick `now_ms`.
    pub fn tick<B>(&mut self, backend: &mut B, now_ms: u64) -> TickReport
    where
        B: RenderBackend<Texture = T>,
    {
        let mut report = TickReport::default();

        let duration = u64::from(self.effective_duration_ms(self.current));

        if self.frames.get(self.redraw).is_dirty() {
            let mode = self.scale_mode;
            let frame = self.frames.get_mut(self.redraw);
            debug!(frame = frame.name(), ?mode, "generating texture");
            match frame.generate_texture(backend, mode) {
                Ok(()) => report.regenerated = Some(self.redraw),
                Err(e) => warn!(frame = frame.name(), error = %e, "couldn't create texture"),
            }
        }
        self.redraw = self.frames.next_wrapping(self.redraw);

        if !self.paused && now_ms / duration > self.frame_time / duration {
            let frame = self.frames.get(self.current);
            debug!(
                frame = frame.name(),
                duration_ms = frame.duration_ms(),
                "presenting frame"
            );
            if let Err(e) = backend.present(frame.texture()) {
                warn!(frame = frame.name(), error = %e, "present failed");
            }
            report.presented = Some(self.current);
            self.shown = Some(self.current);

            let next = self.frames.next_wrapping(self.current);
            if self.frames.next(self.current).is_none() {
                debug!("wrapped to head");
            }
            self.current = next;
            self.frame_time = now_ms;
        }

        report
    }

    /// Flip the filtering mode, invalidate every texture, and restart the redraw cursor at the
    /// playback cursor.
    pub fn toggle_scale_mode(&mut self) -> ScaleMode {
        self.scale_mode = self.scale_mode.toggled();
        self.frames.for_each_mut(|_, frame| frame.mark_dirty());
        self.redraw = self.current;
        info!(mode = ?self.scale_mode, "filtering mode switched");
        self.scale_mode
    }

    pub fn toggle_pause(&mut self) -> PlaybackState {
        self.paused = !self.paused;
        info!(state = ?self.state(), "pause toggled");
        self.state()
    }

    /// Present the last shown frame again (or the current one before anything was shown).
    pub fn redraw_shown<B>(&mut self, backend: &mut B)
    where
        B: RenderBackend<Texture = T>,
    {
        let node = self.shown.unwrap_or(self.current);
        let frame = self.frames.get(node);
        if let Err(e) = backend.present(frame.texture()) {
            warn!(frame = frame.name(), error = %e, "present failed");
        }
    }

    /// Apply a user command. `Quit` only reports intent; call [`Player::quit`] to tear down.
    pub fn handle<B>(&mut self, cmd: PlayerCommand, backend: &mut B) -> Flow
    where
        B: RenderBackend<Texture = T>,
    {
        match cmd {
            PlayerCommand::ToggleScaleMode => {
                self.toggle_scale_mode();
            }
            PlayerCommand::TogglePause => {
                self.toggle_pause();
            }
            PlayerCommand::Redraw => self.redraw_shown(backend),
            PlayerCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Release every frame's bytes and texture, head to tail. Returns the number of frames.
    pub fn quit(self) -> usize {
        info!("got quit event");
        let mut frames = self.frames.into_payloads();
        for frame in &mut frames {
            frame.destroy();
        }
        frames.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::UgoiraError;
    use crate::foundation::core::{Clock, ManualClock};
    use crate::frame::Frame;
    use crate::sequence::Sequence;

    struct Tex {
        name: String,
        mode: ScaleMode,
        drops: Rc<Cell<u32>>,
    }

    impl Drop for Tex {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[derive(Default)]
    struct Mock {
        decodes: Vec<(String, ScaleMode)>,
        presented: Vec<Option<String>>,
        fail_on: Option<String>,
        drops: Rc<Cell<u32>>,
    }

    impl RenderBackend for Mock {
        type Texture = Tex;

        fn decode_texture(&mut self, bytes: &[u8], mode: ScaleMode) -> UgoiraResult<Tex> {
            let name = String::from_utf8(bytes.to_vec()).unwrap();
            self.decodes.push((name.clone(), mode));
            if self.fail_on.as_deref() == Some(name.as_str()) {
                return Err(UgoiraError::decode("bad bytes"));
            }
            Ok(Tex {
                name,
                mode,
                drops: self.drops.clone(),
            })
        }

        fn present(&mut self, texture: Option<&Tex>) -> UgoiraResult<()> {
            self.presented.push(texture.map(|t| t.name.clone()));
            Ok(())
        }
    }

    // Source bytes are the frame name so the mock can tell frames apart.
    fn player(delays: &[(&str, u32)]) -> Player<Tex> {
        let mut it = delays.iter();
        let (name, delay) = it.next().unwrap();
        let mut first = Frame::from_entry(name, name.as_bytes().to_vec()).unwrap();
        first.set_duration_ms(*delay);
        let (mut seq, head) = Sequence::create(first);
        let mut tail = head;
        for (name, delay) in it {
            let mut f = Frame::from_entry(name, name.as_bytes().to_vec()).unwrap();
            f.set_duration_ms(*delay);
            tail = seq.insert_after(tail, f);
        }
        Player::new(seq, head, &PlaybackConfig::default())
    }

    fn name_of(p: &Player<Tex>, id: NodeId) -> &str {
        p.frames().get(id).name()
    }

    fn abc() -> Player<Tex> {
        player(&[("a.png", 100), ("b.png", 200), ("c.png", 50)])
    }

    #[test]
    fn predecessor_duration_gates_each_frame() {
        let p = abc();
        let ids: Vec<_> = p.frames().ids().collect();
        assert_eq!(p.effective_duration_ms(ids[0]), 50);
        assert_eq!(p.effective_duration_ms(ids[1]), 100);
        assert_eq!(p.effective_duration_ms(ids[2]), 200);

        let unset = player(&[("x.png", 0), ("y.png", 30)]);
        let y = unset.frames().tail(unset.current());
        assert_eq!(unset.effective_duration_ms(y), DEFAULT_FRAME_DURATION_MS);
    }

    #[test]
    fn advance_times_follow_bucketed_predecessor_rule() {
        let mut p = abc();
        let mut backend = Mock::default();
        let clock = ManualClock::new(0);
        p.prime(&mut backend, clock.ticks_ms()).unwrap();

        let mut shown = vec![];
        for _ in 0..30 {
            clock.advance(10);
            let now = clock.ticks_ms();
            if let Some(id) = p.tick(&mut backend, now).presented {
                shown.push((now, name_of(&p, id).to_owned()));
            }
        }

        let expected: Vec<(u64, String)> = [
            (50, "a.png"),
            (100, "b.png"),
            (200, "c.png"),
            (250, "a.png"),
            (300, "b.png"),
        ]
        .into_iter()
        .map(|(t, n)| (t, n.to_owned()))
        .collect();
        assert_eq!(shown, expected);
    }

    #[test]
    fn pause_suspends_advance_but_not_redraw() {
        let mut p = abc();
        let mut backend = Mock::default();
        let head = p.current();

        assert_eq!(p.toggle_pause(), PlaybackState::Paused);
        for now in [5_000, 10_000, 15_000] {
            let r = p.tick(&mut backend, now);
            assert!(r.presented.is_none());
            assert!(r.regenerated.is_some());
        }
        assert_eq!(p.current(), head);
        assert!(backend.presented.is_empty());
        assert!(p.frames().iter().all(|f| !f.is_dirty()));

        assert_eq!(p.toggle_pause(), PlaybackState::Playing);
        let r = p.tick(&mut backend, 20_000);
        assert_eq!(r.presented, Some(head));
    }

    #[test]
    fn clean_frames_are_not_decoded_again() {
        let mut p = abc();
        let mut backend = Mock::default();
        for now in 1..=3 {
            p.tick(&mut backend, now);
        }
        assert_eq!(backend.decodes.len(), 3);

        for now in 4..=12 {
            assert!(p.tick(&mut backend, now).regenerated.is_none());
        }
        assert_eq!(backend.decodes.len(), 3);
    }

    #[test]
    fn toggling_scale_mode_dirties_everything_and_restarts_redraw_at_current() {
        let mut p = abc();
        let mut backend = Mock::default();
        p.prime(&mut backend, 0).unwrap();
        for now in (10..=60).step_by(10) {
            p.tick(&mut backend, now);
        }
        let current = p.current();
        assert_eq!(name_of(&p, current), "b.png");

        assert_eq!(p.toggle_scale_mode(), ScaleMode::Nearest);
        assert!(p.frames().iter().all(|f| f.is_dirty()));
        assert_eq!(p.redraw_cursor(), current);

        backend.decodes.clear();
        for now in 61..=63 {
            p.tick(&mut backend, now);
        }
        assert_eq!(
            backend.decodes,
            vec![
                ("b.png".to_owned(), ScaleMode::Nearest),
                ("c.png".to_owned(), ScaleMode::Nearest),
                ("a.png".to_owned(), ScaleMode::Nearest),
            ]
        );
        assert!(
            p.frames()
                .iter()
                .all(|f| f.texture().map(|t| t.mode) == Some(ScaleMode::Nearest))
        );
    }

    #[test]
    fn decode_failure_leaves_frame_dirty_and_playback_running() {
        let mut p = abc();
        let mut backend = Mock {
            fail_on: Some("b.png".to_owned()),
            ..Mock::default()
        };
        p.prime(&mut backend, 0).unwrap();

        let mut presented = 0;
        for now in (10..=1_000).step_by(10) {
            if p.tick(&mut backend, now).presented.is_some() {
                presented += 1;
            }
        }
        assert!(presented > 3);

        let b = p.frames().next(p.frames().first()).unwrap();
        assert!(p.frames().get(b).is_dirty());
        assert!(p.frames().get(b).texture().is_none());
        let b_attempts = backend.decodes.iter().filter(|(n, _)| n == "b.png").count();
        assert!(b_attempts > 1);
        assert!(backend.presented.contains(&None));
    }

    #[test]
    fn redraw_command_represents_last_shown_frame() {
        let mut p = abc();
        let mut backend = Mock::default();
        p.prime(&mut backend, 0).unwrap();

        assert_eq!(p.handle(PlayerCommand::Redraw, &mut backend), Flow::Continue);
        assert_eq!(backend.presented, vec![Some("a.png".to_owned())]);

        p.tick(&mut backend, 50);
        assert_eq!(name_of(&p, p.shown().unwrap()), "a.png");
        p.handle(PlayerCommand::Redraw, &mut backend);
        assert_eq!(backend.presented.last().unwrap().as_deref(), Some("a.png"));
    }

    #[test]
    fn quit_releases_every_texture_exactly_once() {
        let mut p = abc();
        let mut backend = Mock::default();
        p.prime(&mut backend, 0).unwrap();
        for now in 1..=3 {
            p.tick(&mut backend, now);
        }
        assert_eq!(p.handle(PlayerCommand::Quit, &mut backend), Flow::Quit);

        let drops = backend.drops.clone();
        assert_eq!(drops.get(), 0);
        assert_eq!(p.quit(), 3);
        assert_eq!(drops.get(), 3);
    }

    #[test]
    fn config_defaults_and_partial_json() {
        let c = PlaybackConfig::default();
        assert_eq!(c.default_duration_ms, 1000);
        assert_eq!(c.tick_interval_ms, 16);
        assert_eq!(c.scale_mode, ScaleMode::Smooth);

        let c: PlaybackConfig = serde_json::from_str(r#"{"scale_mode":"nearest"}"#).unwrap();
        assert_eq!(c.scale_mode, ScaleMode::Nearest);
        assert_eq!(c.default_duration_ms, 1000);
    }
}
