#[cfg(test)]
mod ip_test;

use shared::IpAddress;
use stack::IpAddrT;

/// Converts a boundary address into the stack's representation.
///
/// The stack keeps addresses as host-order words, so the raw bytes are read
/// big-endian.
pub fn to_stack(ip: &IpAddress) -> IpAddrT {
    match ip {
        IpAddress::V4(b) => IpAddrT::V4(u32::from_be_bytes(*b)),
        IpAddress::V6(b) => {
            let mut words = [0u32; 4];
            for (w, chunk) in words.iter_mut().zip(b.chunks_exact(4)) {
                *w = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
            IpAddrT::V6(words)
        }
    }
}

/// Converts a stack address into the boundary representation. The
/// dual-stack wildcard has no boundary form.
pub fn from_stack(ip: &IpAddrT) -> Option<IpAddress> {
    match ip {
        IpAddrT::V4(a) => Some(IpAddress::V4(a.to_be_bytes())),
        IpAddrT::V6(words) => {
            let mut b = [0u8; 16];
            for (chunk, w) in b.chunks_exact_mut(4).zip(words) {
                chunk.copy_from_slice(&w.to_be_bytes());
            }
            Some(IpAddress::V6(b))
        }
        IpAddrT::Any => None,
    }
}
