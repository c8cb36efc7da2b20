
use std::sync::Arc;

use log::{debug, error, trace};
use parking_lot::Mutex;

use shared::interfaces::Dns;
use shared::{Completion, ErrorCode, IpAddress, IpFamily, NetResult};
use stack::{Core, DnsAddrType, Err, IpAddrT, Stack};

use crate::ip;

type Lookup = Arc<Mutex<Option<Completion<Vec<IpAddress>>>>>;

/// Hostname resolution through the stack's DNS client.
pub struct StackDns {
    stack: Arc<Stack>,
}

impl StackDns {
    pub fn new(stack: Arc<Stack>) -> Self {
        Self { stack }
    }

    fn resolve(&self, host: &str, family: IpFamily, done: Completion<Vec<IpAddress>>) {
        let addr_type = match family {
            IpFamily::V4 => DnsAddrType::Ipv4,
            IpFamily::V6 => DnsAddrType::Ipv6,
        };
        // Taken by whichever of the immediate answer and the callback comes
        // first; the stack never produces both.
        let lookup: Lookup = Arc::new(Mutex::new(Some(done)));
        let found = {
            let lookup = Arc::clone(&lookup);
            Box::new(move |_core: &mut Core, host: &str, addr: Option<IpAddrT>| {
                trace!("dns answer for {host}: {addr:?}");
                let done = lookup.lock().take();
                if let Some(done) = done {
                    done.resolve(answer(host, family, addr));
                }
            })
        };

        let result = self
            .stack
            .lock()
            .dns_gethostbyname_addrtype(host, addr_type, found);
        let outcome = match result {
            Ok(addr) => answer(host, family, Some(addr)),
            Err(Err::InProgress) => {
                debug!("dns lookup of {host} ({family}) in progress");
                return;
            }
            Err(err) => {
                error!("dns lookup of {host} failed: {err}");
                Err(ErrorCode::Unknown)
            }
        };
        let done = lookup.lock().take();
        if let Some(done) = done {
            done.resolve(outcome);
        }
    }
}

/// A resolver may answer with either family; only the requested one counts.
fn answer(host: &str, family: IpFamily, addr: Option<IpAddrT>) -> NetResult<Vec<IpAddress>> {
    match addr.as_ref().and_then(ip::from_stack) {
        Some(ip) if ip.family() == family => Ok(vec![ip]),
        Some(ip) => {
            debug!("dns answer {ip:?} for {host} is not {family}");
            Err(ErrorCode::Unknown)
        }
        None => {
            debug!("{host} did not resolve");
            Err(ErrorCode::Unknown)
        }
    }
}

impl Dns for StackDns {
    fn async_resolve_v4(&self, host: &str, done: Completion<Vec<IpAddress>>) {
        self.resolve(host, IpFamily::V4, done);
    }

    fn async_resolve_v6(&self, host: &str, done: Completion<Vec<IpAddress>>) {
        self.resolve(host, IpFamily::V6, done);
    }
}
