//! Chip and network facts for the `sysinfo` reply and the `info/ip` topic.
//!
//! Implements [`SystemPort`].
//!
//! - **`target_os = "espidf"`**: MAC-derived chip id, SPI flash queries via
//!   `esp_flash_*`; the station IP is pushed in by the WiFi bring-up.
//! - **all other targets**: fixed chip facts; the IP is the address of the
//!   interface that routes outbound traffic.

use core::net::Ipv4Addr;

use crate::adapters::device_id;
use crate::app::ports::{ChipInfo, FlashMode, SystemPort};

pub struct SystemInfo {
    ip: Option<Ipv4Addr>,
}

/// Lower 24 bits of the MAC, the customary chip id.
fn chip_id_from_mac(mac: &device_id::MacAddress) -> u32 {
    u32::from_be_bytes([0, mac[3], mac[4], mac[5]])
}

impl SystemInfo {
    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            ip: probe_local_ip(),
        }
    }

    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        Self { ip: None }
    }

    pub fn set_ip(&mut self, ip: Option<Ipv4Addr>) {
        self.ip = ip;
    }
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Local address of the default route; a UDP `connect` sends no packet.
#[cfg(not(target_os = "espidf"))]
fn probe_local_ip() -> Option<Ipv4Addr> {
    use std::net::{IpAddr, UdpSocket};

    let sock = UdpSocket::bind("0.0.0.0:0").ok()?;
    sock.connect("192.0.2.1:9").ok()?;
    match sock.local_addr().ok()?.ip() {
        IpAddr::V4(v4) if !v4.is_unspecified() => Some(v4),
        _ => None,
    }
}

#[cfg(target_os = "espidf")]
#[allow(unexpected_cfgs)]
fn flash_mode() -> FlashMode {
    if cfg!(esp_idf_esptoolpy_flashmode_qio) {
        FlashMode::Qio
    } else if cfg!(esp_idf_esptoolpy_flashmode_qout) {
        FlashMode::Qout
    } else if cfg!(esp_idf_esptoolpy_flashmode_dio) {
        FlashMode::Dio
    } else if cfg!(esp_idf_esptoolpy_flashmode_dout) {
        FlashMode::Dout
    } else {
        FlashMode::Unknown
    }
}

impl SystemPort for SystemInfo {
    #[cfg(not(target_os = "espidf"))]
    fn chip_info(&self) -> ChipInfo {
        ChipInfo {
            chip_id: chip_id_from_mac(&device_id::read_mac()),
            flash_id: 0x0016_40EF,
            flash_real_size: 4 * 1024 * 1024,
            flash_config_size: 4 * 1024 * 1024,
            flash_mode: FlashMode::Dio,
        }
    }

    #[cfg(target_os = "espidf")]
    fn chip_info(&self) -> ChipInfo {
        use esp_idf_svc::sys::{esp_flash_get_physical_size, esp_flash_get_size, esp_flash_read_id};

        let mut flash_id: u32 = 0;
        let mut real: u32 = 0;
        let mut configured: u32 = 0;
        // SAFETY: a null chip selects the default flash chip, initialised by
        // the bootloader; every out-pointer is a valid local.  Failed calls
        // leave the value at 0, which the reply shows as-is.
        unsafe {
            esp_flash_read_id(core::ptr::null_mut(), &mut flash_id);
            esp_flash_get_physical_size(core::ptr::null_mut(), &mut real);
            esp_flash_get_size(core::ptr::null_mut(), &mut configured);
        }
        ChipInfo {
            chip_id: chip_id_from_mac(&device_id::read_mac()),
            flash_id,
            flash_real_size: real,
            flash_config_size: configured,
            flash_mode: flash_mode(),
        }
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }
}
