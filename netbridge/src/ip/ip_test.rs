use std::net::{Ipv4Addr, Ipv6Addr};

use super::*;

#[test]
fn test_v4_byte_order() {
    let ip = IpAddress::V4([192, 168, 1, 20]);
    let converted = to_stack(&ip);
    assert_eq!(converted, IpAddrT::V4(0xC0A8_0114));
    assert_eq!(converted, IpAddrT::from(Ipv4Addr::new(192, 168, 1, 20)));
    assert_eq!(from_stack(&converted), Some(ip));
}

#[test]
fn test_v6_matches_std() {
    let std_ip = Ipv6Addr::new(0xfe80, 0, 0, 0, 0x0211, 0x22ff, 0xfe33, 0x4455);
    let ip = IpAddress::from(std_ip);
    assert_eq!(to_stack(&ip), IpAddrT::from(std_ip));
    assert_eq!(from_stack(&to_stack(&ip)), Some(ip));
    assert_eq!(to_stack(&ip).to_string(), std_ip.to_string());
}

#[test]
fn test_wildcard_has_no_boundary_form() {
    assert_eq!(from_stack(&IpAddrT::Any), None);
    assert_eq!(
        from_stack(&stack::IP4_ADDR_ANY),
        Some(IpAddress::V4([0; 4]))
    );
}
