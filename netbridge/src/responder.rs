
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;

use mdns::{MDNS_GROUP_V4, MDNS_GROUP_V6, MdnsServer, ResponderConfig};
use shared::interfaces::Mdns;
use shared::{ErrorCode, NetResult};
use stack::{Core, IP_ANY_TYPE, IpAddrT, IpAddrType, NetifId, Stack, UdpPcbId, UdpRecvFn};

use crate::local_ip::default_netif_ips;

struct ResponderState {
    pcb: Option<UdpPcbId>,
    /// Interfaces joined to both discovery groups.
    netifs: Vec<NetifId>,
    server: MdnsServer,
    /// Published service port; 0 until something is published.
    port: u16,
}

/// Multicast service responder on a single socket bound to the discovery
/// port. Interfaces are joined to the discovery groups one by one with
/// [`add_interface`](MdnsResponder::add_interface).
///
/// Lock order is core, then responder state. The receive callback runs
/// with the core lock held and only takes the state lock.
pub struct MdnsResponder {
    stack: Arc<Stack>,
    state: Arc<Mutex<ResponderState>>,
}

impl MdnsResponder {
    /// Creates the responder socket, binds it and arms reception.
    pub fn init(stack: Arc<Stack>, config: ResponderConfig) -> NetResult<Self> {
        let port = config.port;
        let state = Arc::new(Mutex::new(ResponderState {
            pcb: None,
            netifs: Vec::new(),
            server: MdnsServer::new(config),
            port: 0,
        }));
        {
            let mut core = stack.lock();
            let pcb = core.udp_new_ip_type(IpAddrType::Any).ok_or_else(|| {
                error!("no udp pcb available for the mdns responder");
                ErrorCode::OutOfMemory
            })?;
            if let Err(err) = core.udp_bind(pcb, &IP_ANY_TYPE, port) {
                error!("mdns responder could not bind port {port}: {err}");
                core.udp_remove(pcb);
                return Err(ErrorCode::SocketError);
            }
            core.udp_recv(pcb, Some(Self::recv_fn(&state)));
            state.lock().pcb = Some(pcb);
        }
        info!("mdns responder listening on port {port}");
        Ok(Self { stack, state })
    }

    fn recv_fn(state: &Arc<Mutex<ResponderState>>) -> UdpRecvFn {
        let state = Arc::clone(state);
        Arc::new(move |core: &mut Core, _pcb: UdpPcbId, payload: Bytes, src: IpAddrT, sport: u16| {
            let s = state.lock();
            let config = s.server.config();
            let len = payload.len().min(config.buffer_size);
            let Some(id) = s.server.handle_packet(&payload[..len]) else {
                return;
            };

            // Queries not sent from the discovery port expect a direct reply.
            let unicast = sport != config.port;
            let (dst, dport) = if unicast {
                (src, sport)
            } else {
                (group_for(&src), config.port)
            };
            trace!("query {id} from {src}:{sport}, answering {dst}:{dport}");
            let netif = core.ip_current_input_netif();
            send_packet(core, &s, id, unicast, &dst, dport, netif);
        })
    }

    /// Joins `netif` to both discovery groups. A netif that fails to join
    /// is left out; the others are unaffected. Nothing is announced.
    pub fn add_interface(&self, netif: NetifId) -> NetResult<()> {
        let mut core = self.stack.lock();
        let mut s = self.state.lock();
        if s.netifs.contains(&netif) {
            debug!("netif {netif:?} already joined");
            return Ok(());
        }
        if let Err(err) = core.igmp_joingroup_netif(netif, &IpAddrT::from(MDNS_GROUP_V4)) {
            error!("netif {netif:?} failed to join {MDNS_GROUP_V4}: {err}");
            return Err(ErrorCode::Unknown);
        }
        if let Err(err) = core.mld6_joingroup_netif(netif, &IpAddrT::from(MDNS_GROUP_V6)) {
            error!("netif {netif:?} failed to join {MDNS_GROUP_V6}: {err}");
            let _ = core.igmp_leavegroup_netif(netif, &IpAddrT::from(MDNS_GROUP_V4));
            return Err(ErrorCode::Unknown);
        }
        debug!("netif {netif:?} joined the mdns groups");
        s.netifs.push(netif);
        Ok(())
    }

    /// Leaves both discovery groups on `netif`.
    pub fn remove_interface(&self, netif: NetifId) {
        let mut core = self.stack.lock();
        let mut s = self.state.lock();
        let Some(pos) = s.netifs.iter().position(|n| *n == netif) else {
            warn!("netif {netif:?} was not added to the mdns responder");
            return;
        };
        s.netifs.remove(pos);
        leave_groups(&mut core, netif);
    }

    /// Interfaces currently joined.
    pub fn interfaces(&self) -> Vec<NetifId> {
        self.state.lock().netifs.clone()
    }

    /// Leaves every group and releases the socket. Safe to call twice.
    pub fn deinit(&self) {
        let mut core = self.stack.lock();
        let mut s = self.state.lock();
        for netif in std::mem::take(&mut s.netifs) {
            leave_groups(&mut core, netif);
        }
        if let Some(pcb) = s.pcb.take() {
            core.udp_recv(pcb, None);
            core.udp_remove(pcb);
            info!("mdns responder stopped");
        }
    }
}

impl Mdns for MdnsResponder {
    fn publish_service(
        &self,
        port: u16,
        instance_name: &str,
        subtypes: &BTreeSet<String>,
        txt_items: &BTreeMap<String, String>,
    ) {
        let mut core = self.stack.lock();
        let mut s = self.state.lock();
        s.port = port;
        s.server.update_info(instance_name, subtypes, txt_items);

        let announce_port = s.server.config().port;
        let v4 = IpAddrT::from(MDNS_GROUP_V4);
        let v6 = IpAddrT::from(MDNS_GROUP_V6);
        for netif in s.netifs.clone() {
            send_packet(&mut core, &s, 0, false, &v4, announce_port, Some(netif));
            send_packet(&mut core, &s, 0, false, &v6, announce_port, Some(netif));
        }
    }

    /// Peers learn that the service is gone when its records expire.
    fn unpublish_service(&self) {
        debug!("unpublish_service: records left to expire");
    }
}

fn group_for(src: &IpAddrT) -> IpAddrT {
    match src {
        IpAddrT::V6(_) => IpAddrT::from(MDNS_GROUP_V6),
        _ => IpAddrT::from(MDNS_GROUP_V4),
    }
}

fn leave_groups(core: &mut Core, netif: NetifId) {
    if let Err(err) = core.igmp_leavegroup_netif(netif, &IpAddrT::from(MDNS_GROUP_V4)) {
        warn!("netif {netif:?} failed to leave {MDNS_GROUP_V4}: {err}");
    }
    if let Err(err) = core.mld6_leavegroup_netif(netif, &IpAddrT::from(MDNS_GROUP_V6)) {
        warn!("netif {netif:?} failed to leave {MDNS_GROUP_V6}: {err}");
    }
}

/// Builds the response for query `id` with a fresh local-address snapshot
/// and sends it, out of `netif` when known.
fn send_packet(
    core: &mut Core,
    s: &ResponderState,
    id: u16,
    unicast: bool,
    dst: &IpAddrT,
    dport: u16,
    netif: Option<NetifId>,
) {
    if s.port == 0 {
        trace!("nothing published, not responding");
        return;
    }
    let Some(pcb) = s.pcb else {
        return;
    };
    let local_ips = default_netif_ips(core, s.server.config().max_local_ips);
    let packet = match s.server.build_packet(id, unicast, false, &local_ips, s.port) {
        Ok(packet) => packet,
        Err(err) => {
            error!("failed to build mdns response: {err}");
            return;
        }
    };
    let result = match netif {
        Some(netif) => core.udp_sendto_if(pcb, &packet, dst, dport, netif),
        None => core.udp_sendto(pcb, &packet, dst, dport),
    };
    match result {
        Ok(()) => trace!("sent {} byte mdns response to {dst}:{dport}", packet.len()),
        Err(err) => warn!("mdns response to {dst}:{dport} failed: {err}"),
    }
}
