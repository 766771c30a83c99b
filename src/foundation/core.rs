use std::cell::Cell;
use std::time::Instant;

/// Texture filtering used when a decoded frame is scaled onto the surface.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// Nearest-neighbour sampling (hard pixel edges).
    Nearest,
    /// Linear sampling.
    #[default]
    Smooth,
}

impl ScaleMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            Self::Nearest => Self::Smooth,
            Self::Smooth => Self::Nearest,
        }
    }
}

/// Monotonic millisecond tick source driving playback.
pub trait Clock {
    fn ticks_ms(&self) -> u64;
}

/// Ticks measured from the moment the clock was created.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn ticks_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Clock advanced by hand; used by tests and headless drivers.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }
}

impl Clock for ManualClock {
    fn ticks_ms(&self) -> u64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_mode_toggles_both_ways() {
        assert_eq!(ScaleMode::Nearest.toggled(), ScaleMode::Smooth);
        assert_eq!(ScaleMode::Smooth.toggled(), ScaleMode::Nearest);
        assert_eq!(ScaleMode::default(), ScaleMode::Smooth);
    }

    #[test]
    fn scale_mode_serde_names() {
        let s = serde_json::to_string(&ScaleMode::Nearest).unwrap();
        assert_eq!(s, "\"nearest\"");
        let m: ScaleMode = serde_json::from_str("\"smooth\"").unwrap();
        assert_eq!(m, ScaleMode::Smooth);
    }

    #[test]
    fn manual_clock_advances() {
        let c = ManualClock::new(10);
        c.advance(5);
        assert_eq!(c.ticks_ms(), 15);
        c.set(3);
        assert_eq!(c.ticks_ms(), 3);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let c = SystemClock::new();
        let a = c.ticks_ms();
        let b = c.ticks_ms();
        assert!(b >= a);
    }
}
