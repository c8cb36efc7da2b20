//! Configuration for the service-discovery responder.
//!
//! ```rust
//! use netbridge_mdns::ResponderConfig;
//!
//! let config = ResponderConfig::default()
//!     .with_service_type("_printer._udp.local")
//!     .with_ttl(60)
//!     .with_max_local_ips(4);
//! ```

use std::net::{Ipv4Addr, Ipv6Addr};

/// Well-known multicast DNS port.
pub const MDNS_PORT: u16 = 5353;

/// IPv4 multicast group 224.0.0.251.
pub const MDNS_GROUP_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// IPv6 multicast group ff02::fb.
pub const MDNS_GROUP_V6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

/// Service type enumerated by DNS-SD browsers.
pub const SERVICES_DNS_SD: &str = "_services._dns-sd._udp.local.";

/// Service type answered for when none is configured.
pub const DEFAULT_SERVICE_TYPE: &str = "_device._udp.local";

/// Default TTL for response records (120 seconds)
pub(crate) const RESPONSE_TTL: u32 = 120;

/// Largest datagram received or sent.
pub(crate) const DEFAULT_BUFFER_SIZE: usize = 1500;

/// Local addresses placed in a response.
pub(crate) const DEFAULT_MAX_LOCAL_IPS: usize = 2;

/// ResponderConfig controls what a responder answers for and how large its
/// packets may grow.
#[derive(Clone, Debug)]
pub struct ResponderConfig {
    /// DNS-SD service type, e.g. `_device._udp.local`.
    pub service_type: String,

    /// Port the responder socket binds to and announces to.
    pub port: u16,

    /// Receive and build buffer size. Larger inbound packets are truncated;
    /// larger responses are not sent.
    pub buffer_size: usize,

    /// TTL of every record in a non-goodbye response.
    pub ttl: u32,

    /// How many local addresses are snapshotted into A/AAAA records.
    pub max_local_ips: usize,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            service_type: DEFAULT_SERVICE_TYPE.to_owned(),
            port: MDNS_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            ttl: RESPONSE_TTL,
            max_local_ips: DEFAULT_MAX_LOCAL_IPS,
        }
    }
}

impl ResponderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = service_type.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_local_ips(mut self, max_local_ips: usize) -> Self {
        self.max_local_ips = max_local_ips;
        self
    }
}
