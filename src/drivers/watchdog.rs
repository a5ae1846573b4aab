//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the device if the main loop stops ticking.  The timeout must
//! exceed a blocking WiFi rejoin.

/// Main loop stall tolerated before reset.
pub const WATCHDOG_TIMEOUT_MS: u32 = 30_000;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Subscribe the calling task to the TWDT.
    pub fn new() -> Self {
        #[cfg(target_os = "espidf")]
        {
            let cfg = esp_task_wdt_config_t {
                timeout_ms: WATCHDOG_TIMEOUT_MS,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            // SAFETY: plain FFI calls on the current task; `cfg` outlives them.
            let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
            if ret != ESP_OK {
                log::warn!("Watchdog: reconfigure returned {}", ret);
            }
            let subscribed = unsafe { esp_task_wdt_add(core::ptr::null_mut()) } == ESP_OK;
            if subscribed {
                info!("Watchdog: subscribed ({} ms timeout)", WATCHDOG_TIMEOUT_MS);
            } else {
                log::warn!("Watchdog: failed to subscribe");
            }
            Self { subscribed }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): no-op");
            Self {}
        }
    }

    /// Call once per loop iteration.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
