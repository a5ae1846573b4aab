//! Indicator pattern engine with priority-based pattern selection.
//!
//! The gateway has one single-colour status LED.  The main loop sets the
//! layers each tick and asks [`LedPatternEngine::level`] for the output.
//!
//! ## Priority hierarchy (highest first)
//!
//! 1. **Activity**: lit while an IR frame goes out this tick
//! 2. **Connectivity**: blink during connect backoff
//! 3. otherwise off

/// Pattern identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    Off,
    Solid,
    /// Square wave, `half_period_ms` on then off.
    Blink { half_period_ms: u64 },
}

/// LED pattern engine.  Stack-allocated, no heap.
#[derive(Debug, Clone, Copy)]
pub struct LedPatternEngine {
    activity: bool,
    connectivity: PatternId,
    /// Start of the current connectivity pattern, for phase.
    since_ms: u64,
}

impl LedPatternEngine {
    pub fn new() -> Self {
        Self {
            activity: false,
            connectivity: PatternId::Off,
            since_ms: 0,
        }
    }

    /// Transmission in progress this tick (priority 1).
    pub fn set_activity(&mut self, active: bool) {
        self.activity = active;
    }

    /// Connectivity layer (priority 2).  Re-setting the same pattern keeps
    /// its phase.
    pub fn set_connectivity_pattern(&mut self, pattern: PatternId, now_ms: u64) {
        if pattern != self.connectivity {
            self.connectivity = pattern;
            self.since_ms = now_ms;
        }
    }

    /// Output level at `now_ms` (`true` = lit).
    pub fn level(&self, now_ms: u64) -> bool {
        if self.activity {
            return true;
        }
        match self.connectivity {
            PatternId::Off => false,
            PatternId::Solid => true,
            PatternId::Blink { half_period_ms } => {
                let phase = now_ms.saturating_sub(self.since_ms);
                half_period_ms == 0 || (phase / half_period_ms) % 2 == 0
            }
        }
    }
}

impl Default for LedPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}
