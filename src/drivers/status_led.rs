//! Status LED driver.
//!
//! One GPIO, any `embedded-hal` output pin.  The on-board LED of the
//! reference boards is wired to VCC, so it is usually active-low.

use embedded_hal::digital::OutputPin;
use log::warn;

pub struct StatusLed<P: OutputPin> {
    pin: P,
    active_low: bool,
    lit: bool,
}

impl<P: OutputPin> StatusLed<P> {
    /// Starts dark.
    pub fn new(pin: P, active_low: bool) -> Self {
        let mut led = Self {
            pin,
            active_low,
            lit: true,
        };
        led.set(false);
        led
    }

    /// Drive the LED.  Writes the pin only when the level changes.
    pub fn set(&mut self, lit: bool) {
        if lit == self.lit {
            return;
        }
        let high = lit != self.active_low;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match res {
            Ok(()) => self.lit = lit,
            Err(e) => warn!("StatusLed: pin write failed: {:?}", e),
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}

/// Output that only remembers its level.  Host simulator LED.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutput {
    pub high: bool,
}

impl embedded_hal::digital::ErrorType for NullOutput {
    type Error = core::convert::Infallible;
}

impl OutputPin for NullOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}
