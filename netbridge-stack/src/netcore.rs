use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use crate::addr::IpAddrT;
use crate::config::StackConfig;
use crate::dns::{DnsFoundFn, DnsState};
use crate::error::Err;
use crate::netif::{Netif, NetifId};
use crate::tcp::{TcpPcb, TcpPcbId};
use crate::udp::{UdpPcb, UdpPcbId};
use crate::worker::Doorbell;

/// A datagram that left the host through a netif.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub netif: NetifId,
    pub src: IpAddrT,
    pub sport: u16,
    pub dst: IpAddrT,
    pub dport: u16,
    pub payload: Bytes,
}

/// Work queued for the worker context.
pub(crate) enum Event {
    UdpInput {
        netif: NetifId,
        src: IpAddrT,
        sport: u16,
        dst: IpAddrT,
        dport: u16,
        payload: Bytes,
    },
    TcpAccepted {
        listener: TcpPcbId,
        pcb: TcpPcbId,
    },
    TcpConnected {
        pcb: TcpPcbId,
    },
    /// `None` is the peer's FIN.
    TcpRecv {
        pcb: TcpPcbId,
        data: Option<Bytes>,
    },
    TcpSent {
        pcb: TcpPcbId,
        len: usize,
    },
    /// The pcb is released before its error callback runs.
    TcpErr {
        pcb: TcpPcbId,
        err: Err,
    },
    DnsFound {
        host: String,
        addr: Option<IpAddrT>,
        found: DnsFoundFn,
    },
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::UdpInput {
                netif, dst, dport, payload, ..
            } => write!(f, "UdpInput({netif:?} -> {dst}:{dport}, {} bytes)", payload.len()),
            Event::TcpAccepted { listener, pcb } => write!(f, "TcpAccepted({listener:?}, {pcb:?})"),
            Event::TcpConnected { pcb } => write!(f, "TcpConnected({pcb:?})"),
            Event::TcpRecv { pcb, data } => {
                write!(f, "TcpRecv({pcb:?}, {:?})", data.as_ref().map(|d| d.len()))
            }
            Event::TcpSent { pcb, len } => write!(f, "TcpSent({pcb:?}, {len})"),
            Event::TcpErr { pcb, err } => write!(f, "TcpErr({pcb:?}, {err})"),
            Event::DnsFound { host, addr, .. } => write!(f, "DnsFound({host}, {addr:?})"),
        }
    }
}

/// The state every stack call operates on.
///
/// `Core` is only reachable through the core lock, so holding a `&mut Core`
/// is proof the caller is serialized with the worker context. Callbacks
/// receive the same `&mut Core` and may issue further stack calls directly.
pub struct Core {
    pub(crate) config: StackConfig,
    pub(crate) started: Instant,

    pub(crate) netifs: BTreeMap<NetifId, Netif>,
    pub(crate) next_netif: u8,
    pub(crate) default_netif: Option<NetifId>,
    pub(crate) current_input: Option<NetifId>,

    pub(crate) udp_pcbs: BTreeMap<UdpPcbId, UdpPcb>,
    pub(crate) tcp_pcbs: BTreeMap<TcpPcbId, TcpPcb>,
    pub(crate) next_pcb_id: usize,
    pub(crate) next_ephemeral: u16,
    pub(crate) fail_tcp_close: bool,

    pub(crate) dns: DnsState,

    pub(crate) events: VecDeque<Event>,
    pub(crate) outbound: Vec<Outbound>,
    pub(crate) doorbell: Arc<Doorbell>,
}

pub(crate) const EPHEMERAL_PORT_START: u16 = 0xC000;

impl Core {
    pub(crate) fn new(config: StackConfig, doorbell: Arc<Doorbell>) -> Self {
        let dns = DnsState::new(&config.dns_entries);
        Self {
            config,
            started: Instant::now(),
            netifs: BTreeMap::new(),
            next_netif: 0,
            default_netif: None,
            current_input: None,
            udp_pcbs: BTreeMap::new(),
            tcp_pcbs: BTreeMap::new(),
            next_pcb_id: 1,
            next_ephemeral: EPHEMERAL_PORT_START,
            fail_tcp_close: false,
            dns,
            events: VecDeque::new(),
            outbound: Vec::new(),
            doorbell,
        }
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Milliseconds since the stack was created.
    pub fn sys_now(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }

    /// Delivers a datagram as if it had been received on `netif`.
    pub fn inject_udp(
        &mut self,
        netif: NetifId,
        src: IpAddrT,
        sport: u16,
        dst: IpAddrT,
        dport: u16,
        payload: &[u8],
    ) {
        self.post(Event::UdpInput {
            netif,
            src,
            sport,
            dst,
            dport,
            payload: Bytes::copy_from_slice(payload),
        });
    }

    /// Drains the datagrams that left the host since the last call.
    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbound)
    }

    /// Number of events waiting for the worker context.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn post(&mut self, event: Event) {
        log::trace!("post {event:?}");
        self.events.push_back(event);
        self.doorbell.ring();
    }

    pub(crate) fn alloc_pcb_id(&mut self) -> usize {
        let id = self.next_pcb_id;
        self.next_pcb_id += 1;
        id
    }

    pub(crate) fn alloc_ephemeral_port(&mut self) -> u16 {
        loop {
            let port = self.next_ephemeral;
            self.next_ephemeral = if port == u16::MAX {
                EPHEMERAL_PORT_START
            } else {
                port + 1
            };
            let in_use = self.udp_pcbs.values().any(|p| p.local_port == port)
                || self.tcp_pcbs.values().any(|p| p.local_port == port);
            if !in_use {
                return port;
            }
        }
    }

    /// Runs queued events until none remain, including events queued by
    /// the callbacks themselves. Returns how many were run.
    pub(crate) fn process(&mut self) -> usize {
        let mut n = 0;
        while let Some(event) = self.events.pop_front() {
            n += 1;
            self.dispatch(event);
        }
        n
    }

    fn dispatch(&mut self, event: Event) {
        match event {
            Event::UdpInput {
                netif,
                src,
                sport,
                dst,
                dport,
                payload,
            } => {
                self.current_input = Some(netif);
                self.udp_input(netif, src, sport, dst, dport, payload);
                self.current_input = None;
            }
            Event::TcpAccepted { listener, pcb } => self.tcp_accepted(listener, pcb),
            Event::TcpConnected { pcb } => self.tcp_connected(pcb),
            Event::TcpRecv { pcb, data } => self.tcp_input(pcb, data),
            Event::TcpSent { pcb, len } => self.tcp_acked(pcb, len),
            Event::TcpErr { pcb, err } => self.tcp_reset(pcb, err),
            Event::DnsFound { host, addr, found } => {
                log::debug!("dns answer for {host}: {addr:?}");
                found(self, &host, addr);
            }
        }
    }
}
