//! Device identity derived from the factory MAC address.
//!
//! The broker client id is `IRGW-<mac>-<salt>`: the MAC bytes as unpadded
//! lowercase hex joined by `:`, then one random-ish byte in hex so that two
//! sessions of the same board never collide on the broker.

use core::fmt::Write;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// `de:ad:be:ef:ca:fe`, bytes below 0x10 keep a single digit.
pub fn mac_string(mac: &MacAddress) -> String {
    let mut s = String::with_capacity(17);
    for (i, b) in mac.iter().enumerate() {
        if i > 0 {
            s.push(':');
        }
        let _ = write!(s, "{:x}", b);
    }
    s
}

/// Broker client id; `salt` is truncated to its low byte.
pub fn client_name(mac: &MacAddress, salt: u64) -> String {
    format!("IRGW-{}-{:x}", mac_string(mac), salt & 0xFF)
}
