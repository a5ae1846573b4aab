//! Trigger button: level sampling and debounced edge detection.
//!
//! ## Hardware
//!
//! Momentary switch on the trigger GPIO.  Debug boards wire it active-high
//! (pull-down), production boards active-low (pull-up); the active level
//! comes from config.
//!
//! ## Edge detection
//!
//! The main loop samples the pin once per tick and feeds the level to
//! [`EdgeDetector::update`].  A level change is accepted immediately, then
//! further changes are ignored for [`BUTTON_DEBOUNCE_MS`].
//!
//! | Accepted level | New level | Within lockout | Result         |
//! |----------------|-----------|----------------|----------------|
//! | released       | pressed   | no             | `Edge::Pressed`  |
//! | pressed        | released  | no             | `Edge::Released` |
//! | any            | changed   | yes            | ignored        |

use embedded_hal::digital::InputPin;
use log::warn;

use crate::config::BUTTON_DEBOUNCE_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    Released,
}

/// Debounced edge detector.  Pure state, no pin access.
#[derive(Debug, Clone, Copy)]
pub struct EdgeDetector {
    accepted: bool,
    last_change_ms: Option<u64>,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self {
            accepted: false,
            last_change_ms: None,
        }
    }

    /// Currently accepted level (`true` = pressed).
    pub fn is_pressed(&self) -> bool {
        self.accepted
    }

    /// Feed one sample.  Returns the edge if the accepted level changed.
    pub fn update(&mut self, now_ms: u64, pressed: bool) -> Option<Edge> {
        if pressed == self.accepted {
            return None;
        }
        if let Some(t) = self.last_change_ms {
            if now_ms.saturating_sub(t) < BUTTON_DEBOUNCE_MS {
                return None;
            }
        }
        self.accepted = pressed;
        self.last_change_ms = Some(now_ms);
        Some(if pressed { Edge::Pressed } else { Edge::Released })
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Trigger button on any `embedded-hal` input pin.
pub struct TriggerButton<P: InputPin> {
    pin: P,
    active_high: bool,
}

impl<P: InputPin> TriggerButton<P> {
    pub fn new(pin: P, active_high: bool) -> Self {
        Self { pin, active_high }
    }

    /// Sample the pin.  A read error counts as released.
    pub fn is_pressed(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => high == self.active_high,
            Err(e) => {
                warn!("Button: pin read failed: {:?}", e);
                false
            }
        }
    }
}

/// Input that never changes level.  Stands in for the trigger button on
/// the host simulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleInput {
    pub high: bool,
}

impl embedded_hal::digital::ErrorType for IdleInput {
    type Error = core::convert::Infallible;
}

impl InputPin for IdleInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}
