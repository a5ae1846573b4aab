//! Application core: gateway logic with all I/O behind port traits.
//!
//! Topic grammar and payload codecs, the command dispatcher, receive
//! forwarding and the [`service::GatewayService`] tick loop.  Everything
//! here runs against the mocks in `tests/integration` without hardware.

pub mod codec;
pub mod commands;
pub mod dispatcher;
pub mod ports;
pub mod receiver;
pub mod service;
