use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{Sender, unbounded};

use netbridge::{Platform, PlatformConfig};
use shared::{Completion, Endpoint, ErrorCode, IpAddress, NetResult};
use stack::{IpAddrT, Stack, StackConfig};
use threads::ThreadConfig;

#[derive(Parser)]
#[command(name = "UDP Echo", version)]
#[command(about = "Pings an in-stack UDP echo server through the UDP adapter")]
struct Cli {
    #[arg(long, default_value_t = 7)]
    port: u16,
    #[arg(long, default_value_t = 3)]
    count: usize,
    #[arg(long, default_value = "ping")]
    payload: String,
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<(), ErrorCode> {
    let cli = Cli::parse();
    if cli.debug {
        env_logger::Builder::new()
            .filter(None, log::LevelFilter::Trace)
            .init();
    } else {
        env_logger::init();
    }

    let local = Ipv4Addr::new(192, 168, 1, 10);
    let stack = Arc::new(Stack::new(StackConfig::default()));
    stack.lock().netif_add("en0", Some(IpAddrT::from(local)), None);
    stack::echo::udp_echo_server(&mut stack.lock(), cli.port).map_err(|err| {
        eprintln!("echo server: {err}");
        ErrorCode::SocketError
    })?;

    let platform = Platform::new(
        Arc::clone(&stack),
        PlatformConfig::default().with_worker(ThreadConfig::new().with_name("tcpip")),
    )?;

    let socket = platform.udp().create()?;
    let (tx, rx) = unbounded::<NetResult<()>>();
    let done = |tx: &Sender<NetResult<()>>| {
        let tx = tx.clone();
        Completion::new(move |r: NetResult<()>| {
            let _ = tx.send(r);
        })
    };
    let wait = || -> NetResult<()> {
        rx.recv_timeout(Duration::from_secs(1))
            .map_err(|_| ErrorCode::Unknown)?
    };

    socket.async_bind_port(0, done(&tx));
    wait()?;
    println!("bound to port {}", socket.local_port());

    let server = Endpoint::new(IpAddress::from(local), cli.port);
    let mut buf = vec![0u8; 1500];
    for seq in 0..cli.count {
        let message = format!("{} {seq}", cli.payload);
        socket.async_recv_wait(done(&tx));
        socket.async_send_to(&server, message.as_bytes(), done(&tx));
        // One for the send, one for the echo.
        wait()?;
        wait()?;
        let (n, from) = socket.recv_from(&mut buf)?;
        println!("{from} echoed {:?}", String::from_utf8_lossy(&buf[..n]));
    }

    socket.destroy();
    platform.deinit();
    Ok(())
}
