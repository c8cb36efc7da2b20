
use std::net::IpAddr;

use crate::addr::IpAddrT;
use crate::error::{Err, Result};
use crate::netcore::{Core, Event};

/// Maximum length of a host name accepted for lookup.
pub const DNS_MAX_NAME_LENGTH: usize = 255;

/// Which families a lookup accepts, in order of preference.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DnsAddrType {
    Ipv4,
    Ipv6,
    Ipv4Ipv6,
    Ipv6Ipv4,
}

/// Called once with the answer, or `None` when the name did not resolve.
pub type DnsFoundFn = Box<dyn FnOnce(&mut Core, &str, Option<IpAddrT>) + Send>;

struct PendingQuery {
    host: String,
    addr_type: DnsAddrType,
    found: DnsFoundFn,
}

pub(crate) struct DnsState {
    cache: Vec<(String, IpAddrT)>,
    pending: Vec<PendingQuery>,
}

impl DnsState {
    pub(crate) fn new(entries: &[(String, IpAddrT)]) -> Self {
        Self {
            cache: entries
                .iter()
                .map(|(host, addr)| (host.to_ascii_lowercase(), *addr))
                .collect(),
            pending: Vec::new(),
        }
    }

    fn lookup(&self, host: &str, addr_type: DnsAddrType) -> Option<IpAddrT> {
        let find = |v4: bool| {
            self.cache
                .iter()
                .find(|(name, addr)| name.eq_ignore_ascii_case(host) && matches!(addr, IpAddrT::V4(_)) == v4)
                .map(|(_, addr)| *addr)
        };
        match addr_type {
            DnsAddrType::Ipv4 => find(true),
            DnsAddrType::Ipv6 => find(false),
            DnsAddrType::Ipv4Ipv6 => find(true).or_else(|| find(false)),
            DnsAddrType::Ipv6Ipv4 => find(false).or_else(|| find(true)),
        }
    }
}

impl Core {
    /// Resolves `host`.
    ///
    /// Returns the address at once for literals and cached names of an
    /// accepted family. Otherwise a query is started, `Err::InProgress` is
    /// returned and `found` runs from the worker context when the answer
    /// comes in. An unusable name is `Err::Arg`.
    pub fn dns_gethostbyname_addrtype(
        &mut self,
        host: &str,
        addr_type: DnsAddrType,
        found: DnsFoundFn,
    ) -> Result<IpAddrT> {
        if host.is_empty() || host.len() > DNS_MAX_NAME_LENGTH || host.contains(char::is_whitespace) {
            return Err(Err::Arg);
        }

        if let Ok(literal) = host.parse::<IpAddr>() {
            let addr = match literal {
                IpAddr::V4(v4) => IpAddrT::from(v4),
                IpAddr::V6(v6) => IpAddrT::from(v6),
            };
            return Ok(addr);
        }

        if let Some(addr) = self.dns.lookup(host, addr_type) {
            log::trace!("dns cache hit for {host}: {addr}");
            return Ok(addr);
        }

        log::debug!("dns query for {host} ({addr_type:?})");
        self.dns.pending.push(PendingQuery {
            host: host.to_owned(),
            addr_type,
            found,
        });
        Err(Err::InProgress)
    }

    /// Feeds the answer for `host` into the resolver: caches it and queues
    /// the callbacks of every query waiting on that name. The answer may be
    /// of either family regardless of what was asked. Returns how many
    /// queries were answered.
    pub fn dns_answer(&mut self, host: &str, addr: Option<IpAddrT>) -> usize {
        if let Some(addr) = addr {
            self.dns.cache.push((host.to_ascii_lowercase(), addr));
        }
        let (answered, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.dns.pending)
            .into_iter()
            .partition(|q| q.host.eq_ignore_ascii_case(host));
        self.dns.pending = waiting;

        let n = answered.len();
        for query in answered {
            log::trace!("answering {} ({:?})", query.host, query.addr_type);
            self.post(Event::DnsFound {
                host: query.host,
                addr,
                found: query.found,
            });
        }
        n
    }

    /// Names with a query in flight.
    pub fn dns_pending(&self) -> Vec<String> {
        self.dns.pending.iter().map(|q| q.host.clone()).collect()
    }
}
