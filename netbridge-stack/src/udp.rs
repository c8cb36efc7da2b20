
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::addr::{IpAddrT, IpAddrType};
use crate::error::{Err, Result};
use crate::netcore::{Core, Event, Outbound};
use crate::netif::NetifId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UdpPcbId(pub(crate) usize);

/// Inbound datagram callback: pcb, payload, source address and port.
pub type UdpRecvFn = Arc<dyn Fn(&mut Core, UdpPcbId, Bytes, IpAddrT, u16) + Send + Sync>;

pub(crate) struct UdpPcb {
    pub(crate) ip_type: IpAddrType,
    pub(crate) local_ip: IpAddrT,
    pub(crate) local_port: u16,
    pub(crate) recv: Option<UdpRecvFn>,
}

impl fmt::Debug for UdpPcb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdpPcb")
            .field("ip_type", &self.ip_type)
            .field("local_ip", &self.local_ip)
            .field("local_port", &self.local_port)
            .finish_non_exhaustive()
    }
}

impl Core {
    /// Allocates a UDP pcb. `None` when the pool is exhausted.
    pub fn udp_new_ip_type(&mut self, ip_type: IpAddrType) -> Option<UdpPcbId> {
        if self.udp_pcbs.len() >= self.config.max_udp_pcbs {
            log::warn!("udp pcb pool exhausted");
            return None;
        }
        let id = UdpPcbId(self.alloc_pcb_id());
        let local_ip = match ip_type {
            IpAddrType::V4 => crate::addr::IP4_ADDR_ANY,
            IpAddrType::V6 => crate::addr::IP6_ADDR_ANY,
            IpAddrType::Any => crate::addr::IP_ANY_TYPE,
        };
        self.udp_pcbs.insert(
            id,
            UdpPcb {
                ip_type,
                local_ip,
                local_port: 0,
                recv: None,
            },
        );
        Some(id)
    }

    /// Binds to `ip`:`port`. Port 0 picks an ephemeral port.
    pub fn udp_bind(&mut self, id: UdpPcbId, ip: &IpAddrT, port: u16) -> Result<()> {
        let ip_type = self.udp_pcbs.get(&id).ok_or(Err::Arg)?.ip_type;
        if !ip.is_any() && !ip.compatible_with(ip_type) {
            return Err(Err::Val);
        }

        let port = if port == 0 {
            self.alloc_ephemeral_port()
        } else {
            let conflict = self
                .udp_pcbs
                .iter()
                .any(|(other, p)| *other != id && p.local_port == port && overlaps(&p.local_ip, ip));
            if conflict {
                return Err(Err::Use);
            }
            port
        };

        let pcb = self.udp_pcbs.get_mut(&id).ok_or(Err::Arg)?;
        pcb.local_ip = *ip;
        pcb.local_port = port;
        log::trace!("udp pcb {id:?} bound to {ip}:{port}");
        Ok(())
    }

    /// Installs or removes the inbound datagram callback.
    pub fn udp_recv(&mut self, id: UdpPcbId, recv: Option<UdpRecvFn>) {
        if let Some(pcb) = self.udp_pcbs.get_mut(&id) {
            pcb.recv = recv;
        }
    }

    pub fn udp_remove(&mut self, id: UdpPcbId) {
        if self.udp_pcbs.remove(&id).is_none() {
            log::warn!("udp_remove of unknown pcb {id:?}");
        }
    }

    pub fn udp_local_port(&self, id: UdpPcbId) -> Option<u16> {
        self.udp_pcbs.get(&id).map(|p| p.local_port)
    }

    /// Sends through the netif that owns `dst`, else the default netif.
    pub fn udp_sendto(&mut self, id: UdpPcbId, data: &[u8], dst: &IpAddrT, dport: u16) -> Result<()> {
        let netif = self
            .netif_for_addr(dst)
            .or(self.default_netif)
            .ok_or(Err::Rte)?;
        self.udp_sendto_if(id, data, dst, dport, netif)
    }

    /// Sends out of a specific netif.
    ///
    /// A destination of a family the pcb cannot carry is `Err::Val`; a netif
    /// without a source address of that family is `Err::Rte`. The payload is
    /// copied.
    pub fn udp_sendto_if(
        &mut self,
        id: UdpPcbId,
        data: &[u8],
        dst: &IpAddrT,
        dport: u16,
        netif: NetifId,
    ) -> Result<()> {
        let (ip_type, local_ip, local_port) = {
            let pcb = self.udp_pcbs.get(&id).ok_or(Err::Arg)?;
            (pcb.ip_type, pcb.local_ip, pcb.local_port)
        };
        if matches!(dst, IpAddrT::Any) || !dst.compatible_with(ip_type) {
            return Err(Err::Val);
        }

        let sport = if local_port == 0 {
            let port = self.alloc_ephemeral_port();
            if let Some(pcb) = self.udp_pcbs.get_mut(&id) {
                pcb.local_port = port;
            }
            port
        } else {
            local_port
        };

        let src = if !local_ip.is_any() && local_ip.addr_type() == dst.addr_type() {
            local_ip
        } else {
            self.netifs
                .get(&netif)
                .ok_or(Err::Rte)?
                .addr_of(dst.addr_type())
                .ok_or(Err::Rte)?
        };

        let payload = Bytes::copy_from_slice(data);
        let local_target = self.netif_for_addr(dst);
        match local_target {
            Some(owner) if self.config.loopback => {
                self.post(Event::UdpInput {
                    netif: owner,
                    src,
                    sport,
                    dst: *dst,
                    dport,
                    payload,
                });
            }
            _ => {
                log::trace!("udp {src}:{sport} -> {dst}:{dport} on {netif:?}, {} bytes", data.len());
                self.outbound.push(Outbound {
                    netif,
                    src,
                    sport,
                    dst: *dst,
                    dport,
                    payload,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn udp_input(
        &mut self,
        netif: NetifId,
        src: IpAddrT,
        sport: u16,
        dst: IpAddrT,
        dport: u16,
        payload: Bytes,
    ) {
        if dst.is_multicast() {
            let joined = self.netifs.get(&netif).is_some_and(|n| n.has_joined(&dst));
            if !joined {
                log::trace!("drop datagram for unjoined group {dst} on {netif:?}");
                return;
            }
        }

        let accepts = |p: &UdpPcb| p.local_port == dport && dst.compatible_with(p.ip_type);
        // A pcb bound to the exact address wins over a wildcard one.
        let target = self
            .udp_pcbs
            .iter()
            .find(|(_, p)| accepts(p) && p.local_ip == dst)
            .or_else(|| {
                self.udp_pcbs
                    .iter()
                    .find(|(_, p)| accepts(p) && p.local_ip.matches(&dst))
            })
            .map(|(id, p)| (*id, p.recv.clone()));

        match target {
            Some((id, Some(recv))) => recv(self, id, payload, src, sport),
            Some((id, None)) => log::trace!("udp pcb {id:?} has no receiver, dropped"),
            None => log::trace!("no udp pcb for {dst}:{dport}, dropped"),
        }
    }
}

fn overlaps(a: &IpAddrT, b: &IpAddrT) -> bool {
    a.is_any() || b.is_any() || a == b
}
