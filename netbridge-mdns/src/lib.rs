#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! DNS-SD responder state and the DNS wire codec it is built on.
//!
//! The crate does no I/O. [`MdnsServer`] decides which inbound queries it
//! answers and builds the response packets; the owner of the multicast
//! socket moves the bytes.

pub mod config;
pub mod message;
pub mod server;

pub use config::{MDNS_GROUP_V4, MDNS_GROUP_V6, MDNS_PORT, ResponderConfig};
pub use server::{MdnsServer, ServiceInfo};
