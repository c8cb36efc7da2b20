use shared::Recorder;
use stack::StackConfig;

use super::*;
use crate::fixture::{self, PEER_V4};

fn bound_socket(stack: &Arc<Stack>, port: u16) -> StackUdpSocket {
    let socket = StackUdpSocket::new(Arc::clone(stack)).unwrap();
    let bound = Recorder::new();
    socket.async_bind_port(port, bound.completion());
    assert_eq!(bound.result(), Some(Ok(())));
    socket
}

fn inject(stack: &Stack, netif: stack::NetifId, payload: &[u8], port: u16) {
    stack.lock().inject_udp(
        netif,
        IpAddrT::from(PEER_V4),
        5000,
        IpAddrT::from(fixture::LOCAL_V4),
        port,
        payload,
    );
}

#[test]
fn test_send_to_self() {
    let (stack, _) = fixture::stack();
    let socket = bound_socket(&stack, 9000);
    assert_eq!(socket.local_port(), 9000);

    let wait = Recorder::new();
    socket.async_recv_wait(wait.completion());
    assert!(!wait.is_resolved());

    let sent = Recorder::new();
    let me = Endpoint::new(fixture::local_v4(), 9000);
    socket.async_send_to(&me, b"ping", sent.completion());
    assert_eq!(sent.result(), Some(Ok(())));

    stack.process();
    assert_eq!(wait.resolved(), 1);
    assert_eq!(wait.result(), Some(Ok(())));

    let mut buf = [0u8; 64];
    let (n, from) = socket.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"ping");
    assert_eq!(from, me);
    assert_eq!(socket.recv_from(&mut buf), Err(ErrorCode::Again));

    socket.destroy();
}

#[test]
fn test_single_datagram_buffer() {
    let (stack, netif) = fixture::stack();
    let socket = bound_socket(&stack, 9000);

    inject(&stack, netif, b"first", 9000);
    inject(&stack, netif, b"second", 9000);
    inject(&stack, netif, b"third", 9000);
    stack.process();

    let mut buf = [0u8; 64];
    let (n, from) = socket.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"first");
    assert_eq!(from, Endpoint::new(PEER_V4.into(), 5000));
    assert_eq!(socket.recv_from(&mut buf), Err(ErrorCode::Again));

    // Buffer drained: the next arrival is kept again.
    inject(&stack, netif, b"fourth", 9000);
    stack.process();
    let (n, _) = socket.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"fourth");
}

#[test]
fn test_recv_wait_after_buffered_datagram_waits_for_next() {
    let (stack, netif) = fixture::stack();
    let socket = bound_socket(&stack, 9000);

    inject(&stack, netif, b"early", 9000);
    stack.process();

    let wait = Recorder::new();
    socket.async_recv_wait(wait.completion());
    assert!(!wait.is_resolved());

    inject(&stack, netif, b"late", 9000);
    stack.process();
    assert_eq!(wait.resolved(), 1);
    assert_eq!(wait.result(), Some(Ok(())));

    // The buffer was occupied, so the earlier datagram is the one kept.
    let mut buf = [0u8; 16];
    let (n, _) = socket.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"early");
}

#[test]
fn test_second_recv_wait_rejected() {
    let (stack, netif) = fixture::stack();
    let socket = bound_socket(&stack, 9000);

    let first = Recorder::new();
    let second = Recorder::new();
    socket.async_recv_wait(first.completion());
    socket.async_recv_wait(second.completion());
    assert!(!first.is_resolved());
    assert_eq!(second.result(), Some(Err(ErrorCode::SocketError)));

    inject(&stack, netif, b"x", 9000);
    stack.process();
    assert_eq!(first.resolved(), 1);
    assert_eq!(first.result(), Some(Ok(())));
    assert_eq!(second.resolved(), 1);
}

#[test]
fn test_recv_from_truncates() {
    let (stack, netif) = fixture::stack();
    let socket = bound_socket(&stack, 9000);

    inject(&stack, netif, b"abcdef", 9000);
    stack.process();

    let mut small = [0u8; 4];
    let (n, _) = socket.recv_from(&mut small).unwrap();
    assert_eq!(n, 4);
    assert_eq!(&small, b"abcd");
    // The excess is discarded, not kept for the next call.
    assert_eq!(socket.recv_from(&mut small), Err(ErrorCode::Again));
}

#[test]
fn test_abort() {
    let (stack, _) = fixture::stack();
    let socket = bound_socket(&stack, 9000);

    let wait = Recorder::new();
    socket.async_recv_wait(wait.completion());
    socket.abort();
    assert_eq!(wait.result(), Some(Err(ErrorCode::Aborted)));

    let bound = Recorder::new();
    socket.async_bind_port(9001, bound.completion());
    assert_eq!(bound.result(), Some(Err(ErrorCode::Aborted)));

    let sent = Recorder::new();
    socket.async_send_to(&Endpoint::new(fixture::local_v4(), 9000), b"x", sent.completion());
    assert_eq!(sent.result(), Some(Err(ErrorCode::Aborted)));

    let again = Recorder::new();
    socket.async_recv_wait(again.completion());
    assert_eq!(again.result(), Some(Err(ErrorCode::Aborted)));

    let mut buf = [0u8; 8];
    assert_eq!(socket.recv_from(&mut buf), Err(ErrorCode::Eof));

    socket.destroy();
    assert_eq!(wait.resolved(), 1);
    assert!(stack.lock().take_outbound().is_empty());
}

#[test]
fn test_destroy_twice_and_pending_wait() {
    let (stack, netif) = fixture::stack();
    let socket = bound_socket(&stack, 9000);

    let wait = Recorder::new();
    socket.async_recv_wait(wait.completion());
    socket.destroy();
    assert_eq!(wait.result(), Some(Err(ErrorCode::Aborted)));
    socket.destroy();
    assert_eq!(wait.resolved(), 1);
    assert_eq!(socket.local_port(), 0);

    // The port is free again and nothing reaches the destroyed socket.
    inject(&stack, netif, b"late", 9000);
    stack.process();
    let other = bound_socket(&stack, 9000);
    other.destroy();
}

#[test]
fn test_bind_conflict_is_unknown() {
    let (stack, _) = fixture::stack();
    let a = bound_socket(&stack, 9000);
    let b = StackUdpSocket::new(Arc::clone(&stack)).unwrap();

    let bound = Recorder::new();
    b.async_bind_port(9000, bound.completion());
    assert_eq!(bound.result(), Some(Err(ErrorCode::Unknown)));

    a.destroy();
    b.destroy();
}

#[test]
fn test_create_out_of_memory() {
    let (stack, _) = fixture::stack_with(StackConfig::default().with_max_udp_pcbs(1));
    let udp = StackUdp::new(Arc::clone(&stack));
    let first = udp.create().unwrap();
    assert_eq!(udp.create().err(), Some(ErrorCode::OutOfMemory));
    first.destroy();
    assert!(udp.create().is_ok());
}

#[test]
fn test_send_leaves_on_the_wire() {
    let (stack, netif) = fixture::stack();
    let socket = bound_socket(&stack, 0);
    let port = socket.local_port();
    assert_ne!(port, 0);

    let sent = Recorder::new();
    socket.async_send_to(&Endpoint::new(PEER_V4.into(), 7000), b"hello", sent.completion());
    assert_eq!(sent.result(), Some(Ok(())));

    let out = stack.lock().take_outbound();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].netif, netif);
    assert_eq!(out[0].sport, port);
    assert_eq!(out[0].dst, IpAddrT::from(PEER_V4));
    assert_eq!(&out[0].payload[..], b"hello");
}

#[test]
fn test_send_result_mapping() {
    let ep = Endpoint::new(fixture::local_v6(), 1);
    assert_eq!(send_result(&ep, Ok(())), Ok(()));
    assert_eq!(send_result(&ep, Err(Err::Val)), Ok(()));
    assert_eq!(send_result(&ep, Err(Err::Mem)), Err(ErrorCode::OutOfMemory));
    assert_eq!(send_result(&ep, Err(Err::Rte)), Err(ErrorCode::Unknown));
}
