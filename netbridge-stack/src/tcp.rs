
use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::addr::{IpAddrT, IpAddrType};
use crate::error::{Err, Result};
use crate::netcore::{Core, Event};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TcpPcbId(pub(crate) usize);

/// Data callback. `None` is the peer's end-of-stream.
pub type TcpRecvFn = Arc<dyn Fn(&mut Core, TcpPcbId, Option<Bytes>) + Send + Sync>;
/// Acknowledged byte count for data previously written.
pub type TcpSentFn = Arc<dyn Fn(&mut Core, TcpPcbId, usize) + Send + Sync>;
/// Fatal error. The pcb is already gone when this runs.
pub type TcpErrFn = Arc<dyn Fn(&mut Core, Err) + Send + Sync>;
pub type TcpConnectedFn = Arc<dyn Fn(&mut Core, TcpPcbId) + Send + Sync>;
/// A listener accepted the given new connection.
pub type TcpAcceptFn = Arc<dyn Fn(&mut Core, TcpPcbId) + Send + Sync>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TcpState {
    Closed,
    Listen,
    SynSent,
    Established,
    /// Reset or refused; the error callback is queued.
    Reset,
}

pub(crate) struct TcpPcb {
    pub(crate) ip_type: IpAddrType,
    pub(crate) state: TcpState,
    pub(crate) local_ip: IpAddrT,
    pub(crate) local_port: u16,
    pub(crate) remote_ip: IpAddrT,
    pub(crate) remote_port: u16,
    pub(crate) peer: Option<TcpPcbId>,

    pub(crate) recv: Option<TcpRecvFn>,
    pub(crate) sent: Option<TcpSentFn>,
    pub(crate) err: Option<TcpErrFn>,
    pub(crate) connected: Option<TcpConnectedFn>,
    pub(crate) accept: Option<TcpAcceptFn>,

    pub(crate) unsent: BytesMut,
    pub(crate) snd_buf: usize,
    pub(crate) rcv_wnd: usize,
    pub(crate) fin_pending: bool,
    pub(crate) fin_sent: bool,
    pub(crate) rx_shut: bool,
}

impl fmt::Debug for TcpPcb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpPcb")
            .field("state", &self.state)
            .field("local", &(self.local_ip, self.local_port))
            .field("remote", &(self.remote_ip, self.remote_port))
            .field("unsent", &self.unsent.len())
            .field("snd_buf", &self.snd_buf)
            .field("rcv_wnd", &self.rcv_wnd)
            .finish_non_exhaustive()
    }
}

impl Core {
    pub fn tcp_new_ip_type(&mut self, ip_type: IpAddrType) -> Option<TcpPcbId> {
        if self.tcp_pcbs.len() >= self.config.max_tcp_pcbs {
            log::warn!("tcp pcb pool exhausted");
            return None;
        }
        let id = TcpPcbId(self.alloc_pcb_id());
        let pcb = self.new_tcp_pcb(ip_type);
        self.tcp_pcbs.insert(id, pcb);
        Some(id)
    }

    fn new_tcp_pcb(&self, ip_type: IpAddrType) -> TcpPcb {
        TcpPcb {
            ip_type,
            state: TcpState::Closed,
            local_ip: crate::addr::IP_ANY_TYPE,
            local_port: 0,
            remote_ip: crate::addr::IP_ANY_TYPE,
            remote_port: 0,
            peer: None,
            recv: None,
            sent: None,
            err: None,
            connected: None,
            accept: None,
            unsent: BytesMut::new(),
            snd_buf: self.config.tcp_snd_buf,
            rcv_wnd: self.config.tcp_wnd,
            fin_pending: false,
            fin_sent: false,
            rx_shut: false,
        }
    }

    pub fn tcp_bind(&mut self, id: TcpPcbId, ip: &IpAddrT, port: u16) -> Result<()> {
        let in_use = port != 0
            && self
                .tcp_pcbs
                .iter()
                .any(|(other, p)| *other != id && p.local_port == port && p.state == TcpState::Listen);
        if in_use {
            return Err(Err::Use);
        }
        let port = if port == 0 {
            self.alloc_ephemeral_port()
        } else {
            port
        };
        let pcb = self.tcp_pcbs.get_mut(&id).ok_or(Err::Arg)?;
        if pcb.state != TcpState::Closed {
            return Err(Err::Val);
        }
        pcb.local_ip = *ip;
        pcb.local_port = port;
        Ok(())
    }

    pub fn tcp_listen(&mut self, id: TcpPcbId) -> Result<()> {
        let pcb = self.tcp_pcbs.get_mut(&id).ok_or(Err::Arg)?;
        if pcb.state != TcpState::Closed || pcb.local_port == 0 {
            return Err(Err::Val);
        }
        pcb.state = TcpState::Listen;
        Ok(())
    }

    pub fn tcp_accept(&mut self, id: TcpPcbId, accept: Option<TcpAcceptFn>) {
        if let Some(pcb) = self.tcp_pcbs.get_mut(&id) {
            pcb.accept = accept;
        }
    }

    pub fn tcp_recv(&mut self, id: TcpPcbId, recv: Option<TcpRecvFn>) {
        if let Some(pcb) = self.tcp_pcbs.get_mut(&id) {
            pcb.recv = recv;
        }
    }

    pub fn tcp_sent(&mut self, id: TcpPcbId, sent: Option<TcpSentFn>) {
        if let Some(pcb) = self.tcp_pcbs.get_mut(&id) {
            pcb.sent = sent;
        }
    }

    pub fn tcp_err(&mut self, id: TcpPcbId, err: Option<TcpErrFn>) {
        if let Some(pcb) = self.tcp_pcbs.get_mut(&id) {
            pcb.err = err;
        }
    }

    /// Starts a connection. Completion is reported through `connected` or
    /// through the error callback with `Err::Rst` when nothing listens.
    pub fn tcp_connect(
        &mut self,
        id: TcpPcbId,
        ip: &IpAddrT,
        port: u16,
        connected: Option<TcpConnectedFn>,
    ) -> Result<()> {
        let (state, ip_type, local_port) = {
            let pcb = self.tcp_pcbs.get(&id).ok_or(Err::Arg)?;
            (pcb.state, pcb.ip_type, pcb.local_port)
        };
        if state != TcpState::Closed {
            return Err(Err::IsConn);
        }
        if matches!(ip, IpAddrT::Any) || !ip.compatible_with(ip_type) {
            return Err(Err::Val);
        }

        let local_ip = self
            .netif_for_addr(ip)
            .or(self.default_netif)
            .and_then(|n| self.netifs.get(&n))
            .and_then(|n| n.addr_of(ip.addr_type()))
            .ok_or(Err::Rte)?;

        let listener = self
            .tcp_pcbs
            .iter()
            .find(|(_, p)| {
                p.state == TcpState::Listen
                    && p.local_port == port
                    && p.local_ip.matches(ip)
                    && ip.compatible_with(p.ip_type)
            })
            .map(|(id, p)| (*id, p.ip_type));
        let listener = listener.filter(|_| self.netif_for_addr(ip).is_some());

        if listener.is_some() && self.tcp_pcbs.len() >= self.config.max_tcp_pcbs {
            return Err(Err::Mem);
        }

        let local_port = if local_port == 0 {
            self.alloc_ephemeral_port()
        } else {
            local_port
        };

        let server = listener.map(|(listener, server_type)| {
            let server = TcpPcbId(self.alloc_pcb_id());
            let mut pcb = self.new_tcp_pcb(server_type);
            pcb.state = TcpState::Established;
            pcb.local_ip = *ip;
            pcb.local_port = port;
            pcb.remote_ip = local_ip;
            pcb.remote_port = local_port;
            pcb.peer = Some(id);
            self.tcp_pcbs.insert(server, pcb);
            (listener, server)
        });

        if let Some(pcb) = self.tcp_pcbs.get_mut(&id) {
            pcb.local_ip = local_ip;
            pcb.local_port = local_port;
            pcb.remote_ip = *ip;
            pcb.remote_port = port;
            pcb.connected = connected;
            pcb.peer = server.map(|(_, server)| server);
            pcb.state = if server.is_some() {
                TcpState::SynSent
            } else {
                TcpState::Reset
            };
        }

        match server {
            Some((listener, server)) => {
                self.post(Event::TcpAccepted {
                    listener,
                    pcb: server,
                });
                self.post(Event::TcpConnected { pcb: id });
            }
            None => {
                log::debug!("connection to {ip}:{port} refused");
                self.post(Event::TcpErr {
                    pcb: id,
                    err: Err::Rst,
                });
            }
        }
        Ok(())
    }

    /// Queues `data` for sending. Nothing leaves until `tcp_output`.
    pub fn tcp_write(&mut self, id: TcpPcbId, data: &[u8]) -> Result<()> {
        let pcb = self.tcp_pcbs.get_mut(&id).ok_or(Err::Arg)?;
        match pcb.state {
            TcpState::Established => {}
            TcpState::Reset => return Err(Err::Rst),
            _ => return Err(Err::Conn),
        }
        if pcb.fin_pending {
            return Err(Err::Conn);
        }
        if data.len() > pcb.snd_buf {
            return Err(Err::Mem);
        }
        pcb.unsent.extend_from_slice(data);
        pcb.snd_buf -= data.len();
        Ok(())
    }

    /// Sends queued data as far as the peer's window allows.
    pub fn tcp_output(&mut self, id: TcpPcbId) -> Result<()> {
        let pcb = self.tcp_pcbs.get(&id).ok_or(Err::Arg)?;
        if pcb.state == TcpState::Reset {
            return Err(Err::Rst);
        }
        self.tcp_push(id, false);
        Ok(())
    }

    /// Returns `len` bytes of receive window to the sender.
    pub fn tcp_recved(&mut self, id: TcpPcbId, len: usize) {
        let wnd = self.config.tcp_wnd;
        let Some(pcb) = self.tcp_pcbs.get_mut(&id) else {
            return;
        };
        pcb.rcv_wnd = (pcb.rcv_wnd + len).min(wnd);
        if let Some(peer) = pcb.peer
            && self.tcp_pcbs.get(&peer).is_some_and(|p| !p.unsent.is_empty())
        {
            self.tcp_push(peer, false);
        }
    }

    /// Closes one or both halves. Closing both is `tcp_close`.
    pub fn tcp_shutdown(&mut self, id: TcpPcbId, shut_rx: bool, shut_tx: bool) -> Result<()> {
        if shut_rx && shut_tx {
            return self.tcp_close(id);
        }
        let pcb = self.tcp_pcbs.get_mut(&id).ok_or(Err::Arg)?;
        if pcb.state != TcpState::Established {
            return Err(Err::Conn);
        }
        if shut_rx {
            pcb.rx_shut = true;
        }
        if shut_tx {
            pcb.fin_pending = true;
            self.tcp_push(id, false);
        }
        Ok(())
    }

    /// Sends what is queued plus a FIN and releases the pcb.
    pub fn tcp_close(&mut self, id: TcpPcbId) -> Result<()> {
        if self.fail_tcp_close {
            return Err(Err::Mem);
        }
        let pcb = self.tcp_pcbs.get_mut(&id).ok_or(Err::Arg)?;
        match (pcb.state, pcb.peer) {
            (TcpState::Established, _) => {
                pcb.fin_pending = true;
                self.tcp_push(id, true);
            }
            (TcpState::SynSent, Some(peer)) => self.tcp_reset_peer(peer),
            _ => {}
        }
        self.tcp_pcbs.remove(&id);
        log::trace!("tcp pcb {id:?} closed");
        Ok(())
    }

    /// Tears the connection down at once. The local error callback runs
    /// before this returns with `Err::Abrt`; the peer is reset.
    pub fn tcp_abort(&mut self, id: TcpPcbId) {
        let Some(pcb) = self.tcp_pcbs.remove(&id) else {
            log::warn!("tcp_abort of unknown pcb {id:?}");
            return;
        };
        if let Some(peer) = pcb.peer {
            self.tcp_reset_peer(peer);
        }
        if let Some(err) = pcb.err {
            err(self, Err::Abrt);
        }
    }

    /// Makes the next `tcp_close` calls fail with `Err::Mem`.
    pub fn tcp_set_close_failure(&mut self, fail: bool) {
        self.fail_tcp_close = fail;
    }

    pub fn tcp_state(&self, id: TcpPcbId) -> Option<TcpState> {
        self.tcp_pcbs.get(&id).map(|p| p.state)
    }

    pub fn tcp_sndbuf(&self, id: TcpPcbId) -> Option<usize> {
        self.tcp_pcbs.get(&id).map(|p| p.snd_buf)
    }

    pub fn tcp_local_port(&self, id: TcpPcbId) -> Option<u16> {
        self.tcp_pcbs.get(&id).map(|p| p.local_port)
    }

    pub fn tcp_remote(&self, id: TcpPcbId) -> Option<(IpAddrT, u16)> {
        self.tcp_pcbs.get(&id).map(|p| (p.remote_ip, p.remote_port))
    }

    pub fn tcp_pcb_count(&self) -> usize {
        self.tcp_pcbs.len()
    }

    fn tcp_reset_peer(&mut self, peer: TcpPcbId) {
        if let Some(p) = self.tcp_pcbs.get_mut(&peer)
            && p.state != TcpState::Reset
        {
            p.state = TcpState::Reset;
            p.peer = None;
            self.post(Event::TcpErr {
                pcb: peer,
                err: Err::Rst,
            });
        }
    }

    /// Moves unsent data to the peer in segments of at most one MSS.
    /// `force` ignores the peer's window, used when the pcb is going away.
    fn tcp_push(&mut self, id: TcpPcbId, force: bool) {
        let mss = self.config.tcp_mss;
        let Some(pcb) = self.tcp_pcbs.get(&id) else {
            return;
        };
        let Some(peer) = pcb.peer.filter(|p| self.tcp_pcbs.contains_key(p)) else {
            if !pcb.unsent.is_empty() {
                // Data for a peer that is gone: the peer answers with a reset.
                self.tcp_reset_peer(id);
            }
            return;
        };

        let window = self.tcp_pcbs.get(&peer).map_or(0, |p| p.rcv_wnd);
        let mut segments = Vec::new();
        let mut total = 0;
        let mut fin = false;
        if let Some(pcb) = self.tcp_pcbs.get_mut(&id) {
            let allowed = if force {
                pcb.unsent.len()
            } else {
                pcb.unsent.len().min(window)
            };
            while total < allowed {
                let len = (allowed - total).min(mss);
                segments.push(pcb.unsent.split_to(len).freeze());
                total += len;
            }
            if pcb.unsent.is_empty() && pcb.fin_pending && !pcb.fin_sent {
                pcb.fin_sent = true;
                fin = true;
            }
        }

        if let Some(p) = self.tcp_pcbs.get_mut(&peer) {
            p.rcv_wnd = p.rcv_wnd.saturating_sub(total);
        }
        for data in segments {
            self.post(Event::TcpRecv {
                pcb: peer,
                data: Some(data),
            });
        }
        if total > 0 {
            self.post(Event::TcpSent { pcb: id, len: total });
        }
        if fin {
            self.post(Event::TcpRecv {
                pcb: peer,
                data: None,
            });
        }
    }

    pub(crate) fn tcp_accepted(&mut self, listener: TcpPcbId, pcb: TcpPcbId) {
        if !self.tcp_pcbs.contains_key(&pcb) {
            return;
        }
        match self.tcp_pcbs.get(&listener).and_then(|l| l.accept.clone()) {
            Some(accept) => accept(self, pcb),
            None => {
                log::debug!("listener {listener:?} gone, aborting {pcb:?}");
                self.tcp_abort(pcb);
            }
        }
    }

    pub(crate) fn tcp_connected(&mut self, id: TcpPcbId) {
        let Some(pcb) = self.tcp_pcbs.get_mut(&id) else {
            return;
        };
        if pcb.state != TcpState::SynSent {
            return;
        }
        pcb.state = TcpState::Established;
        if let Some(connected) = pcb.connected.clone() {
            connected(self, id);
        }
    }

    pub(crate) fn tcp_input(&mut self, id: TcpPcbId, data: Option<Bytes>) {
        let Some(pcb) = self.tcp_pcbs.get(&id) else {
            return;
        };
        if pcb.state == TcpState::Reset {
            return;
        }
        let len = data.as_ref().map_or(0, |d| d.len());
        match (pcb.recv.clone(), pcb.rx_shut) {
            (Some(recv), false) => recv(self, id, data),
            _ => {
                if len > 0 {
                    self.tcp_recved(id, len);
                }
            }
        }
    }

    pub(crate) fn tcp_acked(&mut self, id: TcpPcbId, len: usize) {
        let Some(pcb) = self.tcp_pcbs.get_mut(&id) else {
            return;
        };
        pcb.snd_buf += len;
        if let Some(sent) = pcb.sent.clone() {
            sent(self, id, len);
        }
    }

    pub(crate) fn tcp_reset(&mut self, id: TcpPcbId, err: Err) {
        let Some(pcb) = self.tcp_pcbs.remove(&id) else {
            return;
        };
        log::debug!("tcp pcb {id:?} reset: {err}");
        if let Some(cb) = pcb.err {
            cb(self, err);
        }
    }
}
