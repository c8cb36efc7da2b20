use std::collections::HashMap;
use std::fmt;

use shared::error::Result;

use super::name::*;
use super::*;

// A Question is a DNS query.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct Question {
    pub name: Name,
    pub typ: DnsType,
    pub class: DnsClass,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.question{{Name: {}, Type: {}, Class: {}}}",
            self.name, self.typ, self.class
        )
    }
}

impl Question {
    /// Whether the querier asked for a unicast reply (the top class bit).
    pub fn unicast_response(&self) -> bool {
        self.class.0 & CLASS_FLAG_MASK != 0
    }

    // pack appends the wire format of the Question to msg.
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        msg = self.name.pack(msg, compression, compression_off)?;
        msg = self.typ.pack(msg);
        Ok(self.class.pack(msg))
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let mut off = self.name.unpack(msg, off)?;
        off = self.typ.unpack(msg, off)?;
        self.class.unpack(msg, off)
    }
}
