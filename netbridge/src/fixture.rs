use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use shared::IpAddress;
use stack::{IpAddrT, NetifId, Stack, StackConfig};

pub(crate) const LOCAL_V4: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
pub(crate) const LOCAL_V6: Ipv6Addr = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0x10);
pub(crate) const PEER_V4: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 77);

/// A stack with one netif, `en0`, carrying both local addresses.
pub(crate) fn stack_with(config: StackConfig) -> (Arc<Stack>, NetifId) {
    let _ = env_logger::builder().is_test(true).try_init();
    let stack = Arc::new(Stack::new(config));
    let netif = stack.lock().netif_add(
        "en0",
        Some(IpAddrT::from(LOCAL_V4)),
        Some(IpAddrT::from(LOCAL_V6)),
    );
    (stack, netif)
}

pub(crate) fn stack() -> (Arc<Stack>, NetifId) {
    stack_with(StackConfig::default())
}

pub(crate) fn local_v4() -> IpAddress {
    IpAddress::from(LOCAL_V4)
}

pub(crate) fn local_v6() -> IpAddress {
    IpAddress::from(LOCAL_V6)
}
