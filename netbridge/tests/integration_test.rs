use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::{Receiver, unbounded};

use netbridge::{Platform, PlatformConfig};
use shared::{Completion, Endpoint, ErrorCode, IpAddress, NetResult};
use stack::{Core, IP_ANY_TYPE, IpAddrT, IpAddrType, Stack, StackConfig, TcpPcbId};
use threads::ThreadConfig;

const LOCAL: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
const TIMEOUT: Duration = Duration::from_secs(2);

fn platform() -> (Arc<Stack>, Platform) {
    let _ = env_logger::builder().is_test(true).try_init();
    let stack = Arc::new(Stack::new(StackConfig::default()));
    stack.lock().netif_add("en0", Some(IpAddrT::from(LOCAL)), None);
    let platform = Platform::new(
        Arc::clone(&stack),
        PlatformConfig::default().with_worker(ThreadConfig::new().with_name("tcpip")),
    )
    .unwrap();
    assert!(stack.is_running());
    (stack, platform)
}

/// A completion that forwards its result to a channel, as a device SDK
/// scheduler would.
fn channel<T: Send + 'static>() -> (impl Fn() -> Completion<T>, Receiver<NetResult<T>>) {
    let (tx, rx) = unbounded();
    let make = move || {
        let tx = tx.clone();
        Completion::new(move |r: NetResult<T>| {
            let _ = tx.send(r);
        })
    };
    (make, rx)
}

#[test]
fn test_udp_echo_through_worker() {
    let (stack, platform) = platform();
    stack::echo::udp_echo_server(&mut stack.lock(), 7).unwrap();

    let socket = platform.udp().create().unwrap();
    let (done, results) = channel::<()>();
    socket.async_bind_port(9000, done());
    assert_eq!(results.recv_timeout(TIMEOUT).unwrap(), Ok(()));
    assert_eq!(socket.local_port(), 9000);

    let server = Endpoint::new(IpAddress::from(LOCAL), 7);
    let mut buf = [0u8; 64];
    for message in [&b"ping"[..], b"pong", b"a longer datagram"] {
        socket.async_recv_wait(done());
        socket.async_send_to(&server, message, done());
        assert_eq!(results.recv_timeout(TIMEOUT).unwrap(), Ok(()));
        assert_eq!(results.recv_timeout(TIMEOUT).unwrap(), Ok(()));

        let (n, from) = socket.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], message);
        assert_eq!(from, server);
    }
    assert_eq!(socket.recv_from(&mut buf).err(), Some(ErrorCode::Again));

    socket.destroy();
    platform.deinit();
    assert!(!stack.is_running());
}

#[test]
fn test_tcp_stream_through_worker() {
    let (stack, platform) = platform();
    {
        let mut core = stack.lock();
        let listener = core.tcp_new_ip_type(IpAddrType::Any).unwrap();
        core.tcp_bind(listener, &IP_ANY_TYPE, 8080).unwrap();
        core.tcp_listen(listener).unwrap();
        core.tcp_accept(
            listener,
            Some(Arc::new(|core: &mut Core, pcb: TcpPcbId| {
                core.tcp_recv(
                    pcb,
                    Some(Arc::new(|core: &mut Core, pcb: TcpPcbId, data: Option<Bytes>| {
                        match data {
                            Some(data) => {
                                core.tcp_recved(pcb, data.len());
                                let _ = core.tcp_write(pcb, &data).and_then(|()| core.tcp_output(pcb));
                            }
                            None => {
                                let _ = core.tcp_close(pcb);
                            }
                        }
                    })),
                );
            })),
        );
    }

    let socket = platform.tcp().create().unwrap();
    let (done, results) = channel::<()>();
    socket.async_connect(&IpAddress::from(LOCAL), 8080, done());
    assert_eq!(results.recv_timeout(TIMEOUT).unwrap(), Ok(()));

    let payload: Vec<u8> = (0..1500u32).map(|i| (i * 7) as u8).collect();
    socket.async_write(&payload, done());
    assert_eq!(results.recv_timeout(TIMEOUT).unwrap(), Ok(()));

    let (read, chunks) = channel::<Bytes>();
    let mut echoed = Vec::new();
    while echoed.len() < payload.len() {
        socket.async_read(100, read());
        let chunk = chunks.recv_timeout(TIMEOUT).unwrap().unwrap();
        assert!(chunk.len() <= 100);
        echoed.extend_from_slice(&chunk);
    }
    assert_eq!(echoed, payload);

    // Closing our half makes the echo side close too.
    socket.shutdown();
    socket.async_read(100, read());
    assert_eq!(chunks.recv_timeout(TIMEOUT).unwrap(), Err(ErrorCode::Eof));

    socket.destroy();
    platform.deinit();
}

#[test]
fn test_dns_answer_through_worker() {
    let (stack, platform) = platform();
    let (done, results) = channel::<Vec<IpAddress>>();

    platform.dns().async_resolve_v4("hub.example", done());
    assert!(results.try_recv().is_err());

    let answer = Ipv4Addr::new(10, 9, 8, 7);
    stack.lock().dns_answer("hub.example", Some(IpAddrT::from(answer)));
    assert_eq!(
        results.recv_timeout(TIMEOUT).unwrap(),
        Ok(vec![IpAddress::from(answer)])
    );

    platform.deinit();
}
