#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! A callback-driven network stack with a single-threaded core.
//!
//! All state lives in [`Core`], reachable only through the core lock
//! returned by [`Stack::lock`]. Input, connection events and DNS answers
//! are queued and later dispatched from the worker context, which invokes
//! the callbacks registered on pcbs with the core lock held.

pub mod addr;
pub mod config;
mod netcore;
pub mod dns;
pub mod echo;
pub mod error;
pub mod netif;
pub mod tcp;
pub mod udp;
mod worker;

pub use crate::netcore::{Core, Outbound};
pub use addr::{IP_ANY_TYPE, IP4_ADDR_ANY, IP6_ADDR_ANY, IpAddrT, IpAddrType};
pub use config::StackConfig;
pub use dns::{DnsAddrType, DnsFoundFn};
pub use error::Err;
pub use netif::{Netif, NetifId};
pub use tcp::{TcpAcceptFn, TcpConnectedFn, TcpErrFn, TcpPcbId, TcpRecvFn, TcpSentFn, TcpState};
pub use udp::{UdpPcbId, UdpRecvFn};
pub use worker::{CoreGuard, Stack};
