#[cfg(test)]
mod message_test;

pub mod header;
pub mod name;
mod packer;
pub mod question;
pub mod resource;

use std::collections::HashMap;
use std::fmt;

use header::*;
use packer::*;
use question::*;
use resource::*;

use shared::error::{Error, Result};

// A Type is a type of DNS request and response.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum DnsType {
    A = 1,
    Ptr = 12,
    Txt = 16,
    Aaaa = 28,
    Srv = 33,
    Nsec = 47,

    // question.Type
    All = 255,

    #[default]
    Unsupported = 0,
}

impl From<u16> for DnsType {
    fn from(v: u16) -> Self {
        match v {
            1 => DnsType::A,
            12 => DnsType::Ptr,
            16 => DnsType::Txt,
            28 => DnsType::Aaaa,
            33 => DnsType::Srv,
            47 => DnsType::Nsec,
            255 => DnsType::All,
            _ => DnsType::Unsupported,
        }
    }
}

impl fmt::Display for DnsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            DnsType::A => "A",
            DnsType::Ptr => "PTR",
            DnsType::Txt => "TXT",
            DnsType::Aaaa => "AAAA",
            DnsType::Srv => "SRV",
            DnsType::Nsec => "NSEC",
            DnsType::All => "ALL",
            DnsType::Unsupported => "Unsupported",
        };
        write!(f, "{s}")
    }
}

impl DnsType {
    // pack appends the wire format of the type to msg.
    pub(crate) fn pack(&self, msg: Vec<u8>) -> Vec<u8> {
        pack_uint16(msg, *self as u16)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let (t, o) = unpack_uint16(msg, off)?;
        *self = DnsType::from(t);
        Ok(o)
    }
}

// A Class is a type of network.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct DnsClass(pub u16);

pub const DNSCLASS_INET: DnsClass = DnsClass(1);
pub const DNSCLASS_ANY: DnsClass = DnsClass(255);

// In mDNS the top bit of a question's class asks for a unicast reply and the
// top bit of a record's class is the cache-flush flag.
pub(crate) const CLASS_FLAG_MASK: u16 = 0x8000;

impl fmt::Display for DnsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flagged = if self.0 & CLASS_FLAG_MASK != 0 { "|flag" } else { "" };
        match DnsClass(self.0 & !CLASS_FLAG_MASK) {
            DNSCLASS_INET => write!(f, "ClassINET{flagged}"),
            DNSCLASS_ANY => write!(f, "ClassANY{flagged}"),
            other => write!(f, "{}{flagged}", other.0),
        }
    }
}

impl DnsClass {
    /// The class with the mDNS flag bit cleared.
    pub fn base(&self) -> DnsClass {
        DnsClass(self.0 & !CLASS_FLAG_MASK)
    }

    pub(crate) fn pack(&self, msg: Vec<u8>) -> Vec<u8> {
        pack_uint16(msg, self.0)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let (c, o) = unpack_uint16(msg, off)?;
        *self = DnsClass(c);
        Ok(o)
    }
}

// An OpCode is a DNS operation code.
pub type OpCode = u16;

// An RCode is a DNS response status code.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum RCode {
    #[default]
    Success = 0,
    FormatError = 1,
    ServerFailure = 2,
    NameError = 3,
    NotImplemented = 4,
    Refused = 5,
    Unsupported,
}

impl From<u8> for RCode {
    fn from(v: u8) -> Self {
        match v {
            0 => RCode::Success,
            1 => RCode::FormatError,
            2 => RCode::ServerFailure,
            3 => RCode::NameError,
            4 => RCode::NotImplemented,
            5 => RCode::Refused,
            _ => RCode::Unsupported,
        }
    }
}

impl fmt::Display for RCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RCode::Success => "RCodeSuccess",
            RCode::FormatError => "RCodeFormatError",
            RCode::ServerFailure => "RCodeServerFailure",
            RCode::NameError => "RCodeNameError",
            RCode::NotImplemented => "RCodeNotImplemented",
            RCode::Refused => "RCodeRefused",
            RCode::Unsupported => "RCodeUnsupported",
        };
        write!(f, "{s}")
    }
}

// UINT16LEN is the length (in bytes) of a uint16.
const UINT16LEN: usize = 2;

// UINT32LEN is the length (in bytes) of a uint32.
const UINT32LEN: usize = 4;

// HEADER_LEN is the length (in bytes) of a DNS header.
//
// A header is comprised of 6 uint16s and no padding.
pub(crate) const HEADER_LEN: usize = 6 * UINT16LEN;

const HEADER_BIT_QR: u16 = 1 << 15; // query/response (response=1)
const HEADER_BIT_AA: u16 = 1 << 10; // authoritative
const HEADER_BIT_TC: u16 = 1 << 9; // truncated
const HEADER_BIT_RD: u16 = 1 << 8; // recursion desired
const HEADER_BIT_RA: u16 = 1 << 7; // recursion available

// Message is a representation of a DNS message.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<Resource>,
    pub authorities: Vec<Resource>,
    pub additionals: Vec<Resource>,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = "dnsmessage.Message{Header: ".to_owned();
        s += self.header.to_string().as_str();

        s += ", Questions: ";
        let v: Vec<String> = self.questions.iter().map(|q| q.to_string()).collect();
        s += &v.join(", ");

        s += ", Answers: ";
        let v: Vec<String> = self.answers.iter().map(|q| q.to_string()).collect();
        s += &v.join(", ");

        s += ", Authorities: ";
        let v: Vec<String> = self.authorities.iter().map(|q| q.to_string()).collect();
        s += &v.join(", ");

        s += ", Additionals: ";
        let v: Vec<String> = self.additionals.iter().map(|q| q.to_string()).collect();
        s += &v.join(", ");

        write!(f, "{s}")
    }
}

impl Message {
    /// Parses only the header and the question section, which is all a
    /// responder looks at.
    pub fn unpack_questions(msg: &[u8]) -> Result<(Header, Vec<Question>)> {
        let mut h = HeaderInternal::default();
        let mut off = h.unpack(msg, 0)?;
        let mut questions = Vec::with_capacity(h.questions as usize);
        for _ in 0..h.questions {
            let mut q = Question::default();
            off = q.unpack(msg, off)?;
            questions.push(q);
        }
        Ok((h.header(), questions))
    }

    // unpack parses a full Message.
    pub fn unpack(msg: &[u8]) -> Result<Message> {
        let mut h = HeaderInternal::default();
        let mut off = h.unpack(msg, 0)?;

        let mut m = Message {
            header: h.header(),
            ..Default::default()
        };
        for _ in 0..h.questions {
            let mut q = Question::default();
            off = q.unpack(msg, off)?;
            m.questions.push(q);
        }
        for (count, section) in [
            (h.answers, &mut m.answers),
            (h.authorities, &mut m.authorities),
            (h.additionals, &mut m.additionals),
        ] {
            for _ in 0..count {
                let (r, o) = Resource::unpack(msg, off)?;
                section.push(r);
                off = o;
            }
        }
        Ok(m)
    }

    // pack packs a full Message.
    pub fn pack(&mut self) -> Result<Vec<u8>> {
        if self.questions.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyQuestions);
        }
        if self.answers.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAnswers);
        }
        if self.authorities.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAuthorities);
        }
        if self.additionals.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAdditionals);
        }

        let (id, bits) = self.header.pack();
        let h = HeaderInternal {
            id,
            bits,
            questions: self.questions.len() as u16,
            answers: self.answers.len() as u16,
            authorities: self.authorities.len() as u16,
            additionals: self.additionals.len() as u16,
        };

        let mut msg = h.pack(Vec::with_capacity(512));

        // Names repeat heavily in a service announcement, so compression is
        // always on.
        let mut compression = Some(HashMap::new());

        for question in &self.questions {
            msg = question.pack(msg, &mut compression, 0)?;
        }
        for answer in &mut self.answers {
            msg = answer.pack(msg, &mut compression, 0)?;
        }
        for authority in &mut self.authorities {
            msg = authority.pack(msg, &mut compression, 0)?;
        }
        for additional in &mut self.additionals {
            msg = additional.pack(msg, &mut compression, 0)?;
        }

        Ok(msg)
    }
}
