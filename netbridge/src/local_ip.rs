#[cfg(test)]
mod local_ip_test;

use std::sync::Arc;

use shared::IpAddress;
use shared::interfaces::LocalIp;
use stack::{Core, Stack};

use crate::ip;

/// Addresses of the default netif.
pub struct StackLocalIp {
    stack: Arc<Stack>,
}

impl StackLocalIp {
    pub fn new(stack: Arc<Stack>) -> Self {
        Self { stack }
    }
}

impl LocalIp for StackLocalIp {
    fn local_ips(&self, max: usize) -> Vec<IpAddress> {
        default_netif_ips(&self.stack.lock(), max)
    }
}

/// The default netif's IPv4 address then its IPv6 address, at most `max`.
/// For callers that already hold the core lock.
pub(crate) fn default_netif_ips(core: &Core, max: usize) -> Vec<IpAddress> {
    let Some(netif) = core.netif_default() else {
        return Vec::new();
    };
    [core.netif_ip4_addr(netif), core.netif_ip6_addr(netif)]
        .iter()
        .flatten()
        .filter_map(ip::from_stack)
        .take(max)
        .collect()
}
