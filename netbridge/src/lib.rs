#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Completion-event network adapters for a device SDK.
//!
//! Each adapter implements one capability trait of [`shared::interfaces`]
//! on top of the callback-driven stack in [`stack`]: requests are issued
//! under the core lock and answered through [`shared::Completion`]s,
//! resolved either at once or later from a stack callback. [`Platform`]
//! builds the whole set over one stack.

pub mod dns;
pub mod ip;
pub mod local_ip;
pub mod platform;
pub mod responder;
pub mod tcp;
pub mod timestamp;
pub mod udp;

#[cfg(test)]
mod fixture;

pub use dns::StackDns;
pub use local_ip::StackLocalIp;
pub use platform::{Platform, PlatformConfig};
pub use responder::MdnsResponder;
pub use tcp::{StackTcp, StackTcpSocket};
pub use timestamp::StackTimestamp;
pub use udp::{StackUdp, StackUdpSocket};
