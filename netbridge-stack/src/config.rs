//! Configuration for the network stack.
//!
//! ```rust
//! use netbridge_stack::{IpAddrT, StackConfig};
//! use std::net::Ipv4Addr;
//!
//! let config = StackConfig::default()
//!     .with_max_udp_pcbs(4)
//!     .with_tcp_wnd(1024)
//!     .with_dns_entry("device.example", IpAddrT::from(Ipv4Addr::new(10, 0, 0, 7)));
//! ```

use crate::addr::IpAddrT;

/// Default number of UDP pcbs that may be alive at once.
pub(crate) const DEFAULT_MAX_UDP_PCBS: usize = 8;

/// Default number of TCP pcbs, listeners and accepted connections included.
pub(crate) const DEFAULT_MAX_TCP_PCBS: usize = 8;

/// Default TCP maximum segment size.
pub(crate) const DEFAULT_TCP_MSS: usize = 536;

/// Default receive window: four segments.
pub(crate) const DEFAULT_TCP_WND: usize = 4 * DEFAULT_TCP_MSS;

/// Default send buffer, matching the window.
pub(crate) const DEFAULT_TCP_SND_BUF: usize = 4 * DEFAULT_TCP_MSS;

/// StackConfig sizes the stack's pools and seeds its DNS cache.
#[derive(Clone, Debug)]
pub struct StackConfig {
    /// Maximum simultaneously allocated UDP pcbs. `udp_new` fails beyond it.
    pub max_udp_pcbs: usize,

    /// Maximum simultaneously allocated TCP pcbs. An incoming connection
    /// that cannot get a pcb is refused.
    pub max_tcp_pcbs: usize,

    /// Largest chunk a single receive callback delivers.
    pub tcp_mss: usize,

    /// Receive window; the sender stalls once this many bytes are
    /// unacknowledged by `tcp_recved`.
    pub tcp_wnd: usize,

    /// Bytes `tcp_write` may queue before it reports `Err::Mem`.
    pub tcp_snd_buf: usize,

    /// Deliver datagrams addressed to a local address back into the stack
    /// instead of putting them on the wire.
    pub loopback: bool,

    /// Entries answered from the DNS cache without a query.
    pub dns_entries: Vec<(String, IpAddrT)>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            max_udp_pcbs: DEFAULT_MAX_UDP_PCBS,
            max_tcp_pcbs: DEFAULT_MAX_TCP_PCBS,
            tcp_mss: DEFAULT_TCP_MSS,
            tcp_wnd: DEFAULT_TCP_WND,
            tcp_snd_buf: DEFAULT_TCP_SND_BUF,
            loopback: true,
            dns_entries: Vec::new(),
        }
    }
}

impl StackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_udp_pcbs(mut self, max: usize) -> Self {
        self.max_udp_pcbs = max;
        self
    }

    pub fn with_max_tcp_pcbs(mut self, max: usize) -> Self {
        self.max_tcp_pcbs = max;
        self
    }

    pub fn with_tcp_mss(mut self, mss: usize) -> Self {
        self.tcp_mss = mss.max(1);
        self
    }

    pub fn with_tcp_wnd(mut self, wnd: usize) -> Self {
        self.tcp_wnd = wnd.max(1);
        self
    }

    pub fn with_tcp_snd_buf(mut self, snd_buf: usize) -> Self {
        self.tcp_snd_buf = snd_buf;
        self
    }

    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    pub fn with_dns_entry(mut self, host: impl Into<String>, addr: IpAddrT) -> Self {
        self.dns_entries.push((host.into(), addr));
        self
    }
}
