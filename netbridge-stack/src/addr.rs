use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Address family selector for pcbs and DNS lookups.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum IpAddrType {
    V4,
    V6,
    /// Dual stack: accepts and sends either family.
    #[default]
    Any,
}

/// The stack's address representation.
///
/// A v4 address is one word in host order (`0xC0A80001` is 192.168.0.1);
/// a v6 address is four such words, most significant first. `Any` is the
/// dual-stack wildcard used to bind a pcb to every local address of both
/// families.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IpAddrT {
    V4(u32),
    V6([u32; 4]),
    Any,
}

pub const IP4_ADDR_ANY: IpAddrT = IpAddrT::V4(0);
pub const IP6_ADDR_ANY: IpAddrT = IpAddrT::V6([0; 4]);
pub const IP_ANY_TYPE: IpAddrT = IpAddrT::Any;

impl Default for IpAddrT {
    fn default() -> Self {
        IP_ANY_TYPE
    }
}

impl IpAddrT {
    pub fn addr_type(&self) -> IpAddrType {
        match self {
            IpAddrT::V4(_) => IpAddrType::V4,
            IpAddrT::V6(_) => IpAddrType::V6,
            IpAddrT::Any => IpAddrType::Any,
        }
    }

    pub fn is_any(&self) -> bool {
        match self {
            IpAddrT::V4(a) => *a == 0,
            IpAddrT::V6(a) => *a == [0; 4],
            IpAddrT::Any => true,
        }
    }

    pub fn is_multicast(&self) -> bool {
        match self {
            IpAddrT::V4(a) => (*a >> 28) == 0xE,
            IpAddrT::V6(a) => (a[0] >> 24) == 0xFF,
            IpAddrT::Any => false,
        }
    }

    pub fn is_loopback(&self) -> bool {
        match self {
            IpAddrT::V4(a) => (*a >> 24) == 127,
            IpAddrT::V6(a) => *a == [0, 0, 0, 1],
            IpAddrT::Any => false,
        }
    }

    /// Whether a pcb bound to `self` accepts traffic addressed to `dst`.
    pub fn matches(&self, dst: &IpAddrT) -> bool {
        match (self, dst) {
            (IpAddrT::Any, _) => true,
            (IpAddrT::V4(0), IpAddrT::V4(_)) => true,
            (IpAddrT::V6([0, 0, 0, 0]), IpAddrT::V6(_)) => true,
            _ => self == dst,
        }
    }

    /// Whether a pcb of type `ty` may exchange traffic with this address.
    pub fn compatible_with(&self, ty: IpAddrType) -> bool {
        matches!(
            (ty, self.addr_type()),
            (IpAddrType::Any, _) | (IpAddrType::V4, IpAddrType::V4) | (IpAddrType::V6, IpAddrType::V6)
        )
    }
}

impl From<Ipv4Addr> for IpAddrT {
    fn from(ip: Ipv4Addr) -> Self {
        IpAddrT::V4(u32::from(ip))
    }
}

impl From<Ipv6Addr> for IpAddrT {
    fn from(ip: Ipv6Addr) -> Self {
        let o = ip.octets();
        let mut words = [0u32; 4];
        for (i, w) in words.iter_mut().enumerate() {
            *w = u32::from_be_bytes([o[4 * i], o[4 * i + 1], o[4 * i + 2], o[4 * i + 3]]);
        }
        IpAddrT::V6(words)
    }
}

impl fmt::Display for IpAddrT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpAddrT::V4(a) => write!(f, "{}", Ipv4Addr::from(*a)),
            IpAddrT::V6(words) => {
                let mut o = [0u8; 16];
                for (i, w) in words.iter().enumerate() {
                    o[4 * i..4 * i + 4].copy_from_slice(&w.to_be_bytes());
                }
                write!(f, "{}", Ipv6Addr::from(o))
            }
            IpAddrT::Any => write!(f, "*"),
        }
    }
}
