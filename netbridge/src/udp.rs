#[cfg(test)]
mod udp_test;

use std::sync::Arc;

use bytes::Bytes;
use log::{debug, error, trace};
use parking_lot::Mutex;

use shared::interfaces::{Udp, UdpSocket};
use shared::{Completion, Endpoint, ErrorCode, NetResult};
use stack::{Core, Err, IP_ANY_TYPE, IpAddrT, IpAddrType, Stack, UdpPcbId, UdpRecvFn};

use crate::ip;

/// UDP sockets backed by the stack's UDP pcbs.
pub struct StackUdp {
    stack: Arc<Stack>,
}

impl StackUdp {
    pub fn new(stack: Arc<Stack>) -> Self {
        Self { stack }
    }
}

impl Udp for StackUdp {
    fn create(&self) -> NetResult<Box<dyn UdpSocket>> {
        Ok(Box::new(StackUdpSocket::new(Arc::clone(&self.stack))?))
    }
}

struct Datagram {
    payload: Bytes,
    from: Endpoint,
}

/// Guarded by the core lock: it is only touched with the core held, either
/// by an entry point or by the receive callback.
#[derive(Default)]
struct UdpState {
    pcb: Option<UdpPcbId>,
    packet: Option<Datagram>,
    recv_wait: Option<Completion>,
    aborted: bool,
}

pub struct StackUdpSocket {
    stack: Arc<Stack>,
    state: Arc<Mutex<UdpState>>,
}

impl StackUdpSocket {
    pub fn new(stack: Arc<Stack>) -> NetResult<Self> {
        let pcb = stack.lock().udp_new_ip_type(IpAddrType::Any).ok_or_else(|| {
            error!("no udp pcb available");
            ErrorCode::OutOfMemory
        })?;
        Ok(Self {
            stack,
            state: Arc::new(Mutex::new(UdpState {
                pcb: Some(pcb),
                ..Default::default()
            })),
        })
    }

    fn recv_fn(state: &Arc<Mutex<UdpState>>) -> UdpRecvFn {
        let state = Arc::clone(state);
        Arc::new(move |_core: &mut Core, _pcb: UdpPcbId, payload: Bytes, addr: IpAddrT, port: u16| {
            trace!("received udp packet from {addr}:{port}, {} bytes", payload.len());
            let waiter = {
                let mut s = state.lock();
                match ip::from_stack(&addr) {
                    Some(ip) if s.packet.is_none() => {
                        s.packet = Some(Datagram {
                            payload,
                            from: Endpoint::new(ip, port),
                        });
                    }
                    _ => trace!("udp buffer occupied, dropping packet from {addr}:{port}"),
                }
                s.recv_wait.take()
            };
            if let Some(waiter) = waiter {
                waiter.resolve(Ok(()));
            }
        })
    }
}

impl UdpSocket for StackUdpSocket {
    fn destroy(&self) {
        let mut core = self.stack.lock();
        let (pcb, waiter) = {
            let mut s = self.state.lock();
            let Some(pcb) = s.pcb.take() else {
                error!("udp socket destroyed twice");
                return;
            };
            s.aborted = true;
            s.packet = None;
            (pcb, s.recv_wait.take())
        };
        core.udp_recv(pcb, None);
        core.udp_remove(pcb);
        drop(core);

        if let Some(waiter) = waiter {
            waiter.resolve(Err(ErrorCode::Aborted));
        }
    }

    fn abort(&self) {
        let _core = self.stack.lock();
        let waiter = {
            let mut s = self.state.lock();
            s.aborted = true;
            s.recv_wait.take()
        };
        if let Some(waiter) = waiter {
            waiter.resolve(Err(ErrorCode::Aborted));
        }
    }

    fn async_bind_port(&self, port: u16, done: Completion) {
        let result = {
            let mut core = self.stack.lock();
            let s = self.state.lock();
            match s.pcb {
                Some(pcb) if !s.aborted => match core.udp_bind(pcb, &IP_ANY_TYPE, port) {
                    Ok(()) => {
                        core.udp_recv(pcb, Some(Self::recv_fn(&self.state)));
                        Ok(())
                    }
                    Err(err) => {
                        error!("udp_bind to port {port} failed: {err}");
                        Err(ErrorCode::Unknown)
                    }
                },
                _ => {
                    error!("bind called on an aborted socket");
                    Err(ErrorCode::Aborted)
                }
            }
        };
        done.resolve(result);
    }

    fn async_send_to(&self, ep: &Endpoint, buf: &[u8], done: Completion) {
        let result = {
            let mut core = self.stack.lock();
            let s = self.state.lock();
            match s.pcb {
                Some(pcb) if !s.aborted => {
                    send_result(ep, core.udp_sendto(pcb, buf, &ip::to_stack(&ep.ip), ep.port))
                }
                _ => {
                    error!("sendto called on an aborted socket");
                    Err(ErrorCode::Aborted)
                }
            }
        };
        done.resolve(result);
    }

    fn async_recv_wait(&self, done: Completion) {
        let rejected = {
            let _core = self.stack.lock();
            let mut s = self.state.lock();
            if s.aborted {
                error!("async_recv_wait called on an aborted socket");
                Some((done, Err(ErrorCode::Aborted)))
            } else if s.recv_wait.is_some() {
                error!("async_recv_wait called but there's already a waiting recv");
                Some((done, Err(ErrorCode::SocketError)))
            } else {
                s.recv_wait = Some(done);
                None
            }
        };
        if let Some((done, result)) = rejected {
            done.resolve(result);
        }
    }

    fn recv_from(&self, buf: &mut [u8]) -> NetResult<(usize, Endpoint)> {
        let _core = self.stack.lock();
        let mut s = self.state.lock();
        if s.aborted {
            error!("recv_from called on an aborted socket");
            return Err(ErrorCode::Eof);
        }
        let Some(packet) = s.packet.take() else {
            return Err(ErrorCode::Again);
        };
        let n = packet.payload.len().min(buf.len());
        buf[..n].copy_from_slice(&packet.payload[..n]);
        Ok((n, packet.from))
    }

    fn local_port(&self) -> u16 {
        let core = self.stack.lock();
        let pcb = self.state.lock().pcb;
        pcb.and_then(|pcb| core.udp_local_port(pcb)).unwrap_or(0)
    }
}

/// Maps the outcome of `udp_sendto`. A destination family the pcb cannot
/// send to is not an error: the datagram is dropped.
fn send_result(ep: &Endpoint, result: stack::error::Result<()>) -> NetResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(Err::Val) => {
            debug!("udp_sendto {ep} rejected the address family");
            Ok(())
        }
        Err(Err::Mem) => Err(ErrorCode::OutOfMemory),
        Err(err) => {
            error!("udp_sendto {ep} failed: {err}");
            Err(ErrorCode::Unknown)
        }
    }
}
