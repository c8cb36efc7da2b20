use super::*;
use crate::fixture;

#[test]
fn test_default_netif_addresses() {
    let (stack, _) = fixture::stack();
    let local = StackLocalIp::new(Arc::clone(&stack));
    assert_eq!(local.local_ips(2), vec![fixture::local_v4(), fixture::local_v6()]);
    assert_eq!(local.local_ips(1), vec![fixture::local_v4()]);
    assert!(local.local_ips(0).is_empty());
}

#[test]
fn test_follows_default_netif() {
    let (stack, _) = fixture::stack();
    let v6_only = stack.lock().netif_add(
        "wl0",
        None,
        Some(stack::IpAddrT::from(std::net::Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0x20))),
    );
    stack.lock().netif_set_default(v6_only).unwrap();

    let local = StackLocalIp::new(Arc::clone(&stack));
    let ips = local.local_ips(2);
    assert_eq!(ips.len(), 1);
    assert!(ips[0].is_v6());
}

#[test]
fn test_no_netif() {
    let stack = Arc::new(Stack::new(stack::StackConfig::default()));
    assert!(StackLocalIp::new(stack).local_ips(2).is_empty());
}
