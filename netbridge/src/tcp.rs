
use std::collections::VecDeque;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use log::{debug, error, trace, warn};
use parking_lot::Mutex;

use shared::interfaces::{Tcp, TcpSocket};
use shared::{Completion, ErrorCode, IpAddress, NetResult};
use stack::{Core, Err, IpAddrType, Stack, TcpConnectedFn, TcpErrFn, TcpPcbId, TcpRecvFn};

use crate::ip;

/// TCP sockets backed by the stack's TCP pcbs.
pub struct StackTcp {
    stack: Arc<Stack>,
}

impl StackTcp {
    pub fn new(stack: Arc<Stack>) -> Self {
        Self { stack }
    }
}

impl Tcp for StackTcp {
    fn create(&self) -> NetResult<Box<dyn TcpSocket>> {
        Ok(Box::new(StackTcpSocket::new(Arc::clone(&self.stack))?))
    }
}

struct PendingRead {
    max_len: usize,
    done: Completion<Bytes>,
}

/// Socket state shared with the pcb callbacks. Only touched with the core
/// lock held; the lock order is core, then this.
#[derive(Default)]
struct TcpState {
    /// `None` once the stack released the pcb or the socket was destroyed.
    pcb: Option<TcpPcbId>,
    chunks: VecDeque<Bytes>,
    /// Bytes of the head chunk already handed out.
    cursor: usize,
    connect: Option<Completion>,
    read: Option<PendingRead>,
    connected: bool,
    remote_closed: bool,
    aborted: bool,
    destroyed: bool,
}

type Resolution = (Completion<Bytes>, NetResult<Bytes>);

impl TcpState {
    fn queued(&self) -> usize {
        self.chunks.iter().map(|c| c.len()).sum::<usize>() - self.cursor
    }

    /// Copies up to `max_len` queued bytes, dequeuing the chunks it drains.
    fn take_bytes(&mut self, max_len: usize) -> Bytes {
        let mut out = BytesMut::with_capacity(max_len.min(self.queued()));
        while out.len() < max_len {
            let Some(head) = self.chunks.front() else {
                break;
            };
            let n = (head.len() - self.cursor).min(max_len - out.len());
            out.extend_from_slice(&head[self.cursor..self.cursor + n]);
            self.cursor += n;
            if self.cursor == head.len() {
                self.chunks.pop_front();
                self.cursor = 0;
            }
        }
        out.freeze()
    }

    /// Satisfies the pending read if anything can satisfy it: queued data
    /// first, then the abort and end-of-stream flags. Returns the
    /// completion to resolve, leaving the read pending otherwise.
    fn satisfy_read(&mut self, core: &mut Core) -> Option<Resolution> {
        if self.read.is_none() {
            return None;
        }
        let result = if !self.chunks.is_empty() {
            let max_len = self.read.as_ref().map_or(0, |r| r.max_len);
            let data = self.take_bytes(max_len);
            if let Some(pcb) = self.pcb
                && !data.is_empty()
            {
                core.tcp_recved(pcb, data.len());
            }
            Ok(data)
        } else if self.aborted {
            Err(ErrorCode::Aborted)
        } else if self.remote_closed {
            Err(ErrorCode::Eof)
        } else {
            return None;
        };
        self.read.take().map(|read| (read.done, result))
    }
}

pub struct StackTcpSocket {
    stack: Arc<Stack>,
    state: Arc<Mutex<TcpState>>,
}

impl StackTcpSocket {
    pub fn new(stack: Arc<Stack>) -> NetResult<Self> {
        let state = Arc::new(Mutex::new(TcpState::default()));
        {
            let mut core = stack.lock();
            let pcb = core.tcp_new_ip_type(IpAddrType::Any).ok_or_else(|| {
                error!("no tcp pcb available");
                ErrorCode::OutOfMemory
            })?;
            core.tcp_recv(pcb, Some(Self::recv_fn(&state)));
            core.tcp_err(pcb, Some(Self::err_fn(&state)));
            state.lock().pcb = Some(pcb);
        }
        Ok(Self { stack, state })
    }

    fn recv_fn(state: &Arc<Mutex<TcpState>>) -> TcpRecvFn {
        let state = Arc::clone(state);
        Arc::new(move |core: &mut Core, pcb: TcpPcbId, data: Option<Bytes>| {
            let resolution = {
                let mut s = state.lock();
                match data {
                    Some(chunk) => {
                        trace!("tcp {pcb:?} received {} bytes", chunk.len());
                        if !chunk.is_empty() {
                            s.chunks.push_back(chunk);
                        }
                    }
                    None => {
                        debug!("tcp {pcb:?} closed by remote");
                        s.remote_closed = true;
                    }
                }
                s.satisfy_read(core)
            };
            if let Some((done, result)) = resolution {
                done.resolve(result);
            }
        })
    }

    fn err_fn(state: &Arc<Mutex<TcpState>>) -> TcpErrFn {
        let state = Arc::clone(state);
        Arc::new(move |core: &mut Core, err: Err| {
            let (connect, read) = {
                let mut s = state.lock();
                debug!("tcp {:?} error: {err}", s.pcb);
                // The stack has already released the pcb.
                s.pcb = None;
                match err {
                    Err::Clsd => s.remote_closed = true,
                    _ => s.aborted = true,
                }
                (s.connect.take(), s.satisfy_read(core))
            };
            if let Some(connect) = connect {
                connect.resolve(Err(ErrorCode::Aborted));
            }
            if let Some((done, result)) = read {
                done.resolve(result);
            }
        })
    }

    fn connected_fn(state: &Arc<Mutex<TcpState>>) -> TcpConnectedFn {
        let state = Arc::clone(state);
        Arc::new(move |_core: &mut Core, pcb: TcpPcbId| {
            trace!("tcp {pcb:?} connected");
            let connect = {
                let mut s = state.lock();
                s.connected = true;
                s.connect.take()
            };
            if let Some(connect) = connect {
                connect.resolve(Ok(()));
            }
        })
    }

    /// The pcb if the socket is still operational.
    fn live_pcb(s: &TcpState) -> Option<TcpPcbId> {
        if s.aborted || s.destroyed { None } else { s.pcb }
    }
}

impl TcpSocket for StackTcpSocket {
    fn destroy(&self) {
        let mut core = self.stack.lock();
        let (pcb, connect, read) = {
            let mut s = self.state.lock();
            if s.destroyed {
                error!("tcp socket destroyed twice");
                return;
            }
            s.destroyed = true;
            s.chunks.clear();
            s.cursor = 0;
            (s.pcb.take(), s.connect.take(), s.read.take())
        };

        if let Some(pcb) = pcb {
            core.tcp_recv(pcb, None);
            core.tcp_sent(pcb, None);
            core.tcp_err(pcb, None);
            match core.tcp_close(pcb) {
                Ok(()) => {}
                Err(Err::Mem) => {
                    error!("failed to close tcp socket due to lack of memory, aborting it");
                    core.tcp_abort(pcb);
                }
                Err(err) => warn!("tcp_close failed: {err}"),
            }
        }
        drop(core);

        if let Some(connect) = connect {
            connect.resolve(Err(ErrorCode::Aborted));
        }
        if let Some(read) = read {
            read.done.resolve(Err(ErrorCode::Aborted));
        }
    }

    fn abort(&self) {
        let mut core = self.stack.lock();
        let pcb = {
            let mut s = self.state.lock();
            if s.destroyed {
                error!("abort called on a destroyed tcp socket");
                return;
            }
            s.pcb
        };
        match pcb {
            // The error callback runs before tcp_abort returns and resolves
            // whatever is pending.
            Some(pcb) => core.tcp_abort(pcb),
            None => {
                let (connect, read) = {
                    let mut s = self.state.lock();
                    s.aborted = true;
                    (s.connect.take(), s.satisfy_read(&mut core))
                };
                drop(core);
                if let Some(connect) = connect {
                    connect.resolve(Err(ErrorCode::Aborted));
                }
                if let Some((done, result)) = read {
                    done.resolve(result);
                }
            }
        }
    }

    fn async_connect(&self, addr: &IpAddress, port: u16, done: Completion) {
        let mut core = self.stack.lock();
        let mut s = self.state.lock();
        let Some(pcb) = Self::live_pcb(&s) else {
            drop(s);
            drop(core);
            error!("connect called on an aborted tcp socket");
            done.resolve(Err(ErrorCode::Aborted));
            return;
        };
        if s.connect.is_some() {
            drop(s);
            drop(core);
            done.resolve(Err(ErrorCode::OperationInProgress));
            return;
        }
        s.connect = Some(done);
        drop(s);

        let dst = ip::to_stack(addr);
        debug!("tcp {pcb:?} connecting to {dst}:{port}");
        let Err(err) = core.tcp_connect(pcb, &dst, port, Some(Self::connected_fn(&self.state))) else {
            return;
        };
        let failed = self.state.lock().connect.take();
        drop(core);

        let code = match err {
            Err::Mem => {
                error!("tcp socket could not connect due to lack of memory");
                ErrorCode::OutOfMemory
            }
            err => {
                error!("tcp_connect to {dst}:{port} failed: {err}");
                ErrorCode::Unknown
            }
        };
        if let Some(done) = failed {
            done.resolve(Err(code));
        }
    }

    fn async_write(&self, data: &[u8], done: Completion) {
        let result = {
            let mut core = self.stack.lock();
            let pcb = Self::live_pcb(&self.state.lock());
            match pcb {
                Some(pcb) => {
                    // Write and flush form one outcome.
                    match core.tcp_write(pcb, data).and_then(|()| core.tcp_output(pcb)) {
                        Ok(()) => Ok(()),
                        Err(Err::Mem) => {
                            error!("tcp_write of {} bytes failed: out of memory", data.len());
                            Err(ErrorCode::OutOfMemory)
                        }
                        Err(err) => {
                            error!("tcp write failed: {err}");
                            Err(ErrorCode::Unknown)
                        }
                    }
                }
                None => {
                    error!("write called on an aborted tcp socket");
                    Err(ErrorCode::Aborted)
                }
            }
        };
        done.resolve(result);
    }

    fn async_read(&self, max_len: usize, done: Completion<Bytes>) {
        let resolution = {
            let mut core = self.stack.lock();
            let mut s = self.state.lock();
            if s.destroyed {
                Some((done, Err(ErrorCode::Aborted)))
            } else if s.read.is_some() {
                Some((done, Err(ErrorCode::OperationInProgress)))
            } else {
                s.read = Some(PendingRead { max_len, done });
                s.satisfy_read(&mut core)
            }
        };
        if let Some((done, result)) = resolution {
            done.resolve(result);
        }
    }

    fn shutdown(&self) {
        let mut core = self.stack.lock();
        let Some(pcb) = Self::live_pcb(&self.state.lock()) else {
            error!("shutdown called on an aborted tcp socket");
            return;
        };
        if let Err(err) = core.tcp_shutdown(pcb, false, true) {
            error!("tcp socket shutdown failed: {err}");
        }
    }
}
