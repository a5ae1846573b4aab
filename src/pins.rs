//! GPIO assignments for the IR gateway boards.
//!
//! Single source of truth: `main` takes every pin number from here.
//!
//! Two board revisions exist.  The development board keeps the IR parts
//! away from the strapping pins so that flashing never disturbs them; the
//! production board packs them onto the low GPIOs next to the connector.
//! Debug builds target the development board.

/// One board revision's wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardPins {
    /// IR demodulator output (TSOP-style, idle high).
    pub ir_recv: i32,
    /// IR LED driver transistor.
    pub ir_send: i32,
    /// Momentary trigger button.
    pub trigger: i32,
    /// Status LED (active low).
    pub status_led: i32,
}

pub const DEV_BOARD: BoardPins = BoardPins {
    ir_recv: 13,
    ir_send: 14,
    trigger: 15,
    status_led: 2,
};

pub const PRODUCTION_BOARD: BoardPins = BoardPins {
    ir_recv: 0,
    ir_send: 3,
    trigger: 2,
    status_led: 2,
};

/// Wiring for this build.
pub const BOARD: BoardPins = if cfg!(debug_assertions) {
    DEV_BOARD
} else {
    PRODUCTION_BOARD
};
