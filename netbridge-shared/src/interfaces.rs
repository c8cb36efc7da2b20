//! Capability interfaces consumed by the device SDK.
//!
//! Each capability is a trait implemented once per network backend. The
//! SDK holds boxed trait objects and never sees backend fields.

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;

use crate::address::{Endpoint, IpAddress};
use crate::completion::Completion;
use crate::error::NetResult;

/// Factory for UDP sockets.
pub trait Udp: Send + Sync {
    fn create(&self) -> NetResult<Box<dyn UdpSocket>>;
}

/// A datagram socket holding at most one buffered inbound datagram.
pub trait UdpSocket: Send + Sync {
    /// Releases the socket. A second call is logged and ignored.
    fn destroy(&self);

    /// Marks the socket non-operational. `destroy` must still follow.
    fn abort(&self);

    fn async_bind_port(&self, port: u16, done: Completion);

    fn async_send_to(&self, ep: &Endpoint, buf: &[u8], done: Completion);

    /// Resolves `done` when a datagram is available for `recv_from`.
    fn async_recv_wait(&self, done: Completion);

    /// Non-blocking receive. Returns [`ErrorCode::Again`](crate::ErrorCode::Again)
    /// when nothing is buffered.
    fn recv_from(&self, buf: &mut [u8]) -> NetResult<(usize, Endpoint)>;

    fn local_port(&self) -> u16;
}

/// Factory for TCP sockets.
pub trait Tcp: Send + Sync {
    fn create(&self) -> NetResult<Box<dyn TcpSocket>>;
}

/// A byte-stream socket with partial-read semantics.
pub trait TcpSocket: Send + Sync {
    fn destroy(&self);

    fn abort(&self);

    fn async_connect(&self, addr: &IpAddress, port: u16, done: Completion);

    fn async_write(&self, data: &[u8], done: Completion);

    /// Reads at most `max_len` bytes. The completion carries exactly the
    /// bytes read, which may be fewer than `max_len`.
    fn async_read(&self, max_len: usize, done: Completion<Bytes>);

    /// Closes the outbound half; reads stay possible until the peer closes.
    fn shutdown(&self);
}

/// Hostname resolution for one address family at a time.
pub trait Dns: Send + Sync {
    fn async_resolve_v4(&self, host: &str, done: Completion<Vec<IpAddress>>);

    fn async_resolve_v6(&self, host: &str, done: Completion<Vec<IpAddress>>);
}

/// Addresses of the local host.
pub trait LocalIp: Send + Sync {
    /// Returns at most `max` local addresses.
    fn local_ips(&self, max: usize) -> Vec<IpAddress>;
}

/// Multicast service discovery.
pub trait Mdns: Send + Sync {
    fn publish_service(
        &self,
        port: u16,
        instance_name: &str,
        subtypes: &BTreeSet<String>,
        txt_items: &BTreeMap<String, String>,
    );

    fn unpublish_service(&self);
}

/// Millisecond clock of the platform.
pub trait Timestamp: Send + Sync {
    fn now_ms(&self) -> u32;
}
