
use std::sync::Arc;

use log::{debug, error, warn};

use mdns::ResponderConfig;
use shared::interfaces::{Dns, LocalIp, Tcp, Timestamp, Udp};
use shared::{ErrorCode, NetResult};
use stack::{NetifId, Stack};
use threads::ThreadConfig;

use crate::dns::StackDns;
use crate::local_ip::StackLocalIp;
use crate::responder::MdnsResponder;
use crate::tcp::StackTcp;
use crate::timestamp::StackTimestamp;
use crate::udp::StackUdp;

/// PlatformConfig decides how the adapters are wired to a stack.
#[derive(Clone, Debug)]
pub struct PlatformConfig {
    /// Netif made the stack's default before anything else is set up.
    pub default_netif: Option<NetifId>,

    /// Join the default netif to the discovery groups at init.
    pub attach_default_netif: bool,

    pub responder: ResponderConfig,

    /// Run the stack's worker task with this config. Without it the owner
    /// drives the stack with [`Stack::process`].
    pub worker: Option<ThreadConfig>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            default_netif: None,
            attach_default_netif: true,
            responder: ResponderConfig::default(),
            worker: None,
        }
    }
}

impl PlatformConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_netif(mut self, netif: NetifId) -> Self {
        self.default_netif = Some(netif);
        self
    }

    pub fn with_attach_default_netif(mut self, attach: bool) -> Self {
        self.attach_default_netif = attach;
        self
    }

    pub fn with_responder(mut self, responder: ResponderConfig) -> Self {
        self.responder = responder;
        self
    }

    pub fn with_worker(mut self, worker: ThreadConfig) -> Self {
        self.worker = Some(worker);
        self
    }
}

/// Every adapter, built over one stack.
pub struct Platform {
    stack: Arc<Stack>,
    udp: StackUdp,
    tcp: StackTcp,
    dns: StackDns,
    local_ip: StackLocalIp,
    timestamp: StackTimestamp,
    mdns: MdnsResponder,
}

impl Platform {
    pub fn new(stack: Arc<Stack>, config: PlatformConfig) -> NetResult<Self> {
        if let Some(netif) = config.default_netif
            && let Err(err) = stack.lock().netif_set_default(netif)
        {
            error!("netif {netif:?} cannot become the default: {err}");
            return Err(ErrorCode::Unknown);
        }

        let mdns = MdnsResponder::init(Arc::clone(&stack), config.responder)?;
        if config.attach_default_netif {
            let default_netif = stack.lock().netif_default();
            match default_netif {
                Some(netif) => {
                    // A netif that cannot join is reported, not fatal.
                    let _ = mdns.add_interface(netif);
                }
                None => warn!("no default netif to attach the mdns responder to"),
            }
        }

        if let Some(worker) = config.worker
            && let Err(err) = stack.start(worker)
        {
            error!("failed to start the stack worker: {err}");
            mdns.deinit();
            return Err(ErrorCode::from(err));
        }
        debug!("platform ready");

        Ok(Self {
            udp: StackUdp::new(Arc::clone(&stack)),
            tcp: StackTcp::new(Arc::clone(&stack)),
            dns: StackDns::new(Arc::clone(&stack)),
            local_ip: StackLocalIp::new(Arc::clone(&stack)),
            timestamp: StackTimestamp::new(Arc::clone(&stack)),
            mdns,
            stack,
        })
    }

    pub fn stack(&self) -> &Arc<Stack> {
        &self.stack
    }

    pub fn udp(&self) -> &dyn Udp {
        &self.udp
    }

    pub fn tcp(&self) -> &dyn Tcp {
        &self.tcp
    }

    pub fn dns(&self) -> &dyn Dns {
        &self.dns
    }

    pub fn local_ip(&self) -> &dyn LocalIp {
        &self.local_ip
    }

    pub fn timestamp(&self) -> &dyn Timestamp {
        &self.timestamp
    }

    pub fn mdns(&self) -> &MdnsResponder {
        &self.mdns
    }

    /// Tears the responder down and stops the worker, if one runs.
    pub fn deinit(&self) {
        self.mdns.deinit();
        self.stack.stop();
        debug!("platform stopped");
    }
}
