use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use shared::error::{Error, Result};

use super::name::*;
use super::packer::*;
use super::*;

/// Record data of the types the responder produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceBody {
    A([u8; 4]),
    Aaaa([u8; 16]),
    Ptr(Name),
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: Name,
    },
    Txt(Vec<String>),
    /// Any other type, kept as raw bytes.
    Unknown(DnsType, Vec<u8>),
}

impl fmt::Display for ResourceBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceBody::A(a) => write!(f, "dnsmessage.AResource{{A: {}}}", Ipv4Addr::from(*a)),
            ResourceBody::Aaaa(a) => {
                write!(f, "dnsmessage.AAAAResource{{AAAA: {}}}", Ipv6Addr::from(*a))
            }
            ResourceBody::Ptr(ptr) => write!(f, "dnsmessage.PTRResource{{PTR: {ptr}}}"),
            ResourceBody::Srv {
                priority,
                weight,
                port,
                target,
            } => write!(
                f,
                "dnsmessage.SRVResource{{priority: {priority}, weight: {weight}, port: {port}, target: {target}}}"
            ),
            ResourceBody::Txt(txt) => write!(f, "dnsmessage.TXTResource{{TXT: {}}}", txt.join(",")),
            ResourceBody::Unknown(typ, data) => {
                write!(f, "dnsmessage.UnknownResource{{Type: {typ}, Length: {}}}", data.len())
            }
        }
    }
}

impl ResourceBody {
    pub fn real_type(&self) -> DnsType {
        match self {
            ResourceBody::A(_) => DnsType::A,
            ResourceBody::Aaaa(_) => DnsType::Aaaa,
            ResourceBody::Ptr(_) => DnsType::Ptr,
            ResourceBody::Srv { .. } => DnsType::Srv,
            ResourceBody::Txt(_) => DnsType::Txt,
            ResourceBody::Unknown(typ, _) => *typ,
        }
    }

    fn pack(
        &self,
        mut msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        match self {
            ResourceBody::A(a) => Ok(pack_bytes(msg, a)),
            ResourceBody::Aaaa(a) => Ok(pack_bytes(msg, a)),
            ResourceBody::Ptr(ptr) => ptr.pack(msg, compression, compression_off),
            ResourceBody::Srv {
                priority,
                weight,
                port,
                target,
            } => {
                msg = pack_uint16(msg, *priority);
                msg = pack_uint16(msg, *weight);
                msg = pack_uint16(msg, *port);
                // RFC 2782 forbids compressing the target.
                target.pack(msg, &mut None, compression_off)
            }
            ResourceBody::Txt(txt) => {
                if txt.is_empty() {
                    // An empty TXT record still carries one empty string.
                    msg.push(0);
                    return Ok(msg);
                }
                for s in txt {
                    msg = pack_str(msg, s)?;
                }
                Ok(msg)
            }
            ResourceBody::Unknown(_, data) => Ok(pack_bytes(msg, data)),
        }
    }

    fn unpack(typ: DnsType, msg: &[u8], off: usize, length: usize) -> Result<(Self, usize)> {
        let end = off + length;
        if end > msg.len() {
            return Err(Error::ErrResourceLen);
        }
        let body = match typ {
            DnsType::A => {
                let mut a = [0u8; 4];
                unpack_bytes(msg, off, &mut a)?;
                ResourceBody::A(a)
            }
            DnsType::Aaaa => {
                let mut a = [0u8; 16];
                unpack_bytes(msg, off, &mut a)?;
                ResourceBody::Aaaa(a)
            }
            DnsType::Ptr => {
                let mut name = Name::default();
                name.unpack(msg, off)?;
                ResourceBody::Ptr(name)
            }
            DnsType::Srv => {
                let (priority, o) = unpack_uint16(msg, off)?;
                let (weight, o) = unpack_uint16(msg, o)?;
                let (port, o) = unpack_uint16(msg, o)?;
                let mut target = Name::default();
                target.unpack(msg, o)?;
                ResourceBody::Srv {
                    priority,
                    weight,
                    port,
                    target,
                }
            }
            DnsType::Txt => {
                let mut txt = Vec::new();
                let mut o = off;
                while o < end {
                    let (s, next) = unpack_str(msg, o)?;
                    if next > end {
                        return Err(Error::ErrCalcLen);
                    }
                    txt.push(s);
                    o = next;
                }
                ResourceBody::Txt(txt)
            }
            _ => ResourceBody::Unknown(typ, msg[off..end].to_vec()),
        };
        Ok((body, end))
    }
}

// A Resource is a DNS resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub header: ResourceHeader,
    pub body: ResourceBody,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.Resource{{Header: {}, Body: {}}}",
            self.header, self.body
        )
    }
}

impl Resource {
    pub fn new(name: Name, ttl: u32, cache_flush: bool, body: ResourceBody) -> Self {
        let mut class = DNSCLASS_INET;
        if cache_flush {
            class.0 |= CLASS_FLAG_MASK;
        }
        Resource {
            header: ResourceHeader {
                name,
                typ: body.real_type(),
                class,
                ttl,
                length: 0,
            },
            body,
        }
    }

    pub fn cache_flush(&self) -> bool {
        self.header.class.0 & CLASS_FLAG_MASK != 0
    }

    // pack appends the wire format of the Resource to msg.
    pub(crate) fn pack(
        &mut self,
        msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        self.header.typ = self.body.real_type();
        let (mut msg, len_off) = self.header.pack(msg, compression, compression_off)?;
        let pre_len = msg.len();
        msg = self.body.pack(msg, compression, compression_off)?;
        self.header.fix_len(&mut msg, len_off, pre_len)?;
        Ok(msg)
    }

    pub(crate) fn unpack(msg: &[u8], off: usize) -> Result<(Self, usize)> {
        let mut header = ResourceHeader::default();
        let off = header.unpack(msg, off)?;
        let (body, off) = ResourceBody::unpack(header.typ, msg, off, header.length as usize)?;
        Ok((Resource { header, body }, off))
    }
}

// A ResourceHeader is the header of a DNS resource record. There are
// many types of DNS resource records, but they all share the same header.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct ResourceHeader {
    // Name is the domain name for which this resource record pertains.
    pub name: Name,

    // Type is the type of DNS resource record.
    //
    // This field will be set automatically during packing.
    pub typ: DnsType,

    // Class is the class of network to which this DNS resource record
    // pertains. In mDNS the top bit is the cache-flush flag.
    pub class: DnsClass,

    // TTL is the length of time (measured in seconds) which this resource
    // record is valid for (time to live).
    pub ttl: u32,

    // Length is the length of data in the resource record after the header.
    //
    // This field will be set automatically during packing.
    pub length: u16,
}

impl fmt::Display for ResourceHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.ResourceHeader{{Name: {}, Type: {}, Class: {}, TTL: {}, Length: {}}}",
            self.name, self.typ, self.class, self.ttl, self.length,
        )
    }
}

impl ResourceHeader {
    // pack appends the wire format of the ResourceHeader to msg.
    //
    // len_off is the offset in msg where the Length field was packed.
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<(Vec<u8>, usize)> {
        msg = self.name.pack(msg, compression, compression_off)?;
        msg = self.typ.pack(msg);
        msg = self.class.pack(msg);
        msg = pack_uint32(msg, self.ttl);
        let len_off = msg.len();
        msg = pack_uint16(msg, self.length);
        Ok((msg, len_off))
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let mut new_off = self.name.unpack(msg, off)?;
        new_off = self.typ.unpack(msg, new_off)?;
        new_off = self.class.unpack(msg, new_off)?;
        let (ttl, new_off) = unpack_uint32(msg, new_off)?;
        self.ttl = ttl;
        let (l, new_off) = unpack_uint16(msg, new_off)?;
        self.length = l;
        Ok(new_off)
    }

    // fix_len updates a packed ResourceHeader to include the length of the
    // ResourceBody.
    //
    // len_off is the offset of the ResourceHeader.Length field in msg.
    //
    // pre_len is the length that msg was before the ResourceBody was packed.
    pub(crate) fn fix_len(&mut self, msg: &mut [u8], len_off: usize, pre_len: usize) -> Result<()> {
        if msg.len() < pre_len || msg.len() > pre_len + u16::MAX as usize {
            return Err(Error::ErrResTooLong);
        }

        let con_len = msg.len() - pre_len;

        // Fill in the length now that we know how long the content is.
        msg[len_off] = ((con_len >> 8) & 0xFF) as u8;
        msg[len_off + 1] = (con_len & 0xFF) as u8;
        self.length = con_len as u16;

        Ok(())
    }
}
