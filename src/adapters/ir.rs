//! IR transceiver adapter.
//!
//! Implements [`IrPort`].
//!
//! - **`target_os = "espidf"`**: RMT channel 0 transmits with a hardware
//!   carrier, RMT channel 1 captures mark/space durations.  Captures are
//!   reported undecoded; protocol encoders are not built into this driver.
//! - **all other targets**: [`SimIr`] logs every frame and replays captures
//!   injected by the caller.
//!
//! Global Caché sequences are expanded to microsecond marks/spaces by
//! [`gc_to_raw`] on both targets.

use log::info;

use crate::app::ports::{IrError, IrPort, IrProtocol, ReceivedIr};

/// Index of the first on/off pair in a Global Caché sequence.
const GC_START_OFFSET: usize = 3;
/// Cap on Global Caché repeat passes.
const GC_MAX_PASSES: u32 = 16;

/// Expand `freq,repeat,offset,on,off,...` (durations in carrier cycles).
///
/// Returns the marks/spaces in microseconds and the carrier in kHz.  The
/// whole frame is sent once, then the section from `offset` (1-based) is
/// repeated until `repeat` passes are done.
pub fn gc_to_raw(sequence: &[u32]) -> Result<(Vec<u32>, u32), IrError> {
    if sequence.len() <= GC_START_OFFSET {
        return Err(IrError::EmptyWaveform);
    }
    let freq_hz = sequence[0];
    if freq_hz == 0 {
        return Err(IrError::Unsupported);
    }
    let passes = sequence[1].clamp(1, GC_MAX_PASSES) as usize;
    let repeat_from = (sequence[2] as usize)
        .saturating_add(GC_START_OFFSET - 1)
        .clamp(GC_START_OFFSET, sequence.len());

    let cycles_to_us = |c: u32| ((u64::from(c) * 1_000_000) / u64::from(freq_hz)) as u32;
    let mut out = Vec::new();
    for pass in 0..passes {
        let start = if pass == 0 { GC_START_OFFSET } else { repeat_from };
        out.extend(sequence[start..].iter().map(|&c| cycles_to_us(c)));
    }
    if out.is_empty() {
        return Err(IrError::EmptyWaveform);
    }
    Ok((out, freq_hz.div_ceil(1000)))
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

/// One frame as handed to the transmitter.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transmission {
    Raw { ticks: Vec<u32>, khz: u32 },
    Encoded { protocol: IrProtocol, value: u64, bits: u32 },
}

#[cfg(not(target_os = "espidf"))]
pub struct SimIr {
    captures: std::collections::VecDeque<ReceivedIr>,
    sent: Vec<Transmission>,
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimIr {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl SimIr {
    pub fn new() -> Self {
        Self {
            captures: std::collections::VecDeque::new(),
            sent: Vec::new(),
        }
    }

    /// Queue a capture for the next [`IrPort::receive`].
    pub fn inject(&mut self, capture: ReceivedIr) {
        self.captures.push_back(capture);
    }

    pub fn transmissions(&self) -> &[Transmission] {
        &self.sent
    }
}

#[cfg(not(target_os = "espidf"))]
impl IrPort for SimIr {
    fn send_raw(&mut self, ticks: &[u32], khz: u32) -> Result<(), IrError> {
        if ticks.is_empty() {
            return Err(IrError::EmptyWaveform);
        }
        info!("IR(sim): raw {} ticks @ {} kHz", ticks.len(), khz);
        self.sent.push(Transmission::Raw {
            ticks: ticks.to_vec(),
            khz,
        });
        Ok(())
    }

    fn send_gc(&mut self, sequence: &[u32]) -> Result<(), IrError> {
        let (ticks, khz) = gc_to_raw(sequence)?;
        self.send_raw(&ticks, khz)
    }

    fn send_encoded(&mut self, protocol: IrProtocol, value: u64, bits: u32) -> Result<(), IrError> {
        info!("IR(sim): {} 0x{:x} ({} bits)", protocol.as_str(), value, bits);
        self.sent.push(Transmission::Encoded {
            protocol,
            value,
            bits,
        });
        Ok(())
    }

    fn receive(&mut self) -> Option<ReceivedIr> {
        self.captures.pop_front()
    }
}

// ───────────────────────────────────────────────────────────────
// Device: RMT
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod rmt {
    use super::*;
    use core::time::Duration;
    use esp_idf_svc::hal::gpio::{InputPin, OutputPin};
    use esp_idf_svc::hal::peripheral::Peripheral;
    use esp_idf_svc::hal::rmt::config::{CarrierConfig, DutyPercent, ReceiveConfig, TransmitConfig};
    use esp_idf_svc::hal::rmt::{
        PinState, Pulse, Receive, RmtChannel, RxRmtDriver, TxRmtDriver, VariableLengthSignal,
    };
    use esp_idf_svc::hal::units::FromValueType;
    use esp_idf_svc::sys::{rmt_carrier_level_t_RMT_CARRIER_LEVEL_HIGH, rmt_set_tx_carrier, EspError};
    use log::warn;

    /// 80 MHz APB / 80 = 1 µs per RMT tick.
    const CLOCK_DIVIDER: u8 = 80;
    const APB_HZ: u32 = 80_000_000;
    const CARRIER_DUTY: u32 = 33;
    /// Silence that ends a capture, in µs.
    const IDLE_THRESHOLD_US: u16 = 12_000;
    const RX_PAIRS: usize = 128;

    pub struct RmtIr<'d> {
        tx: TxRmtDriver<'d>,
        rx: RxRmtDriver<'d>,
        rx_buf: Box<[(Pulse, Pulse); RX_PAIRS]>,
        carrier_khz: u32,
    }

    impl<'d> RmtIr<'d> {
        pub fn new<CT: RmtChannel, CR: RmtChannel>(
            tx_channel: impl Peripheral<P = CT> + 'd,
            tx_pin: impl Peripheral<P = impl OutputPin> + 'd,
            rx_channel: impl Peripheral<P = CR> + 'd,
            rx_pin: impl Peripheral<P = impl InputPin> + 'd,
        ) -> Result<Self, EspError> {
            let carrier = CarrierConfig::new()
                .frequency(crate::config::TRANSMITTER_FREQ_KHZ.kHz().into())
                .duty_percent(DutyPercent::new(CARRIER_DUTY as u8)?);
            let tx_conf = TransmitConfig::new()
                .clock_divider(CLOCK_DIVIDER)
                .carrier(Some(carrier));
            let tx = TxRmtDriver::new(tx_channel, tx_pin, &tx_conf)?;

            let rx_conf = ReceiveConfig::new()
                .clock_divider(CLOCK_DIVIDER)
                .idle_threshold(IDLE_THRESHOLD_US);
            let mut rx = RxRmtDriver::new(rx_channel, rx_pin, &rx_conf, RX_PAIRS * 4)?;
            rx.start()?;

            info!("IR(rmt): transmitter and receiver ready");
            Ok(Self {
                tx,
                rx,
                rx_buf: Box::new([(Pulse::zero(), Pulse::zero()); RX_PAIRS]),
                carrier_khz: crate::config::TRANSMITTER_FREQ_KHZ,
            })
        }

        fn set_carrier(&mut self, khz: u32) -> Result<(), IrError> {
            if khz == self.carrier_khz {
                return Ok(());
            }
            let period = APB_HZ / khz.clamp(1, 1000).saturating_mul(1000);
            let high = (period * CARRIER_DUTY / 100) as u16;
            let low = (period as u16).saturating_sub(high);
            // SAFETY: the channel is owned by `self.tx` and idle between frames.
            let ret = unsafe {
                rmt_set_tx_carrier(
                    self.tx.channel(),
                    true,
                    high,
                    low,
                    rmt_carrier_level_t_RMT_CARRIER_LEVEL_HIGH,
                )
            };
            if ret != esp_idf_svc::sys::ESP_OK {
                warn!("IR(rmt): carrier {} kHz rejected ({})", khz, ret);
                return Err(IrError::TransmitFailed);
            }
            self.carrier_khz = khz;
            Ok(())
        }

        fn signal(&self, ticks: &[u32]) -> Result<VariableLengthSignal, EspError> {
            let hz = self.tx.counter_clock()?;
            let mut signal = VariableLengthSignal::with_capacity(ticks.len());
            for (i, &us) in ticks.iter().enumerate() {
                let level = if i % 2 == 0 { PinState::High } else { PinState::Low };
                let pulse = Pulse::new_with_duration(hz, level, &Duration::from_micros(us.into()))?;
                signal.push([&pulse])?;
            }
            Ok(signal)
        }
    }

    impl IrPort for RmtIr<'_> {
        fn send_raw(&mut self, ticks: &[u32], khz: u32) -> Result<(), IrError> {
            if ticks.is_empty() {
                return Err(IrError::EmptyWaveform);
            }
            self.set_carrier(khz)?;
            let signal = self.signal(ticks).map_err(|e| {
                warn!("IR(rmt): bad waveform: {}", e);
                IrError::TransmitFailed
            })?;
            self.tx.start_blocking(&signal).map_err(|e| {
                warn!("IR(rmt): transmit failed: {}", e);
                IrError::TransmitFailed
            })
        }

        fn send_gc(&mut self, sequence: &[u32]) -> Result<(), IrError> {
            let (ticks, khz) = gc_to_raw(sequence)?;
            self.send_raw(&ticks, khz)
        }

        fn send_encoded(
            &mut self,
            protocol: IrProtocol,
            _value: u64,
            _bits: u32,
        ) -> Result<(), IrError> {
            warn!("IR(rmt): no encoder for {}", protocol.as_str());
            Err(IrError::Unsupported)
        }

        fn receive(&mut self) -> Option<ReceivedIr> {
            match self.rx.receive(&mut self.rx_buf[..], 0) {
                Ok(Receive::Read(n)) if n > 0 => {
                    let mut durations_us = Vec::with_capacity(n * 2);
                    for (mark, space) in &self.rx_buf[..n] {
                        for p in [mark, space] {
                            let t = u32::from(p.ticks.ticks());
                            if t > 0 {
                                durations_us.push(t);
                            }
                        }
                    }
                    Some(ReceivedIr::Raw { durations_us })
                }
                Ok(_) => None,
                Err(e) => {
                    warn!("IR(rmt): receive failed: {}", e);
                    None
                }
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use rmt::RmtIr;
