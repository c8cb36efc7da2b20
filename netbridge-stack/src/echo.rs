use std::sync::Arc;

use bytes::Bytes;

use crate::addr::{IP_ANY_TYPE, IpAddrT, IpAddrType};
use crate::error::{Err, Result};
use crate::netcore::Core;
use crate::udp::UdpPcbId;

/// Binds a pcb on `port` that sends every datagram back to its sender.
pub fn udp_echo_server(core: &mut Core, port: u16) -> Result<UdpPcbId> {
    let pcb = core.udp_new_ip_type(IpAddrType::Any).ok_or(Err::Mem)?;
    if let Err(err) = core.udp_bind(pcb, &IP_ANY_TYPE, port) {
        core.udp_remove(pcb);
        return Err(err);
    }
    core.udp_recv(
        pcb,
        Some(Arc::new(|core: &mut Core, pcb: UdpPcbId, payload: Bytes, src: IpAddrT, sport: u16| {
            log::trace!("echo {} bytes to {src}:{sport}", payload.len());
            if let Err(err) = core.udp_sendto(pcb, &payload, &src, sport) {
                log::warn!("echo to {src}:{sport} failed: {err}");
            }
        })),
    );
    Ok(pcb)
}
