//! UDP endpoint: receives host messages on one socket and sends events back
//! to the host address from the same socket.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Receiver;
use log::{debug, info, warn};

use regroove_types::{ControlAction, OutboundEvent};

use crate::protocol::{decode_packet, encode_packet};

const READ_TIMEOUT: Duration = Duration::from_millis(50);
const MAX_PACKET: usize = 65_536;

pub struct OscBridge {
    socket: UdpSocket,
    host_addr: SocketAddr,
}

impl OscBridge {
    /// Bind the listening socket. Fails if the port is taken or the host
    /// address does not resolve.
    pub fn bind(listen: &str, host: &str) -> io::Result<Self> {
        let socket = UdpSocket::bind(listen)?;
        let host_addr = host.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("cannot resolve host {}", host))
        })?;
        info!(target: "osc", "listening on {}, sending to {}", socket.local_addr()?, host_addr);
        Ok(Self { socket, host_addr })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn host_addr(&self) -> SocketAddr {
        self.host_addr
    }

    /// Start the receive thread. Each decoded action is passed to `on_action`;
    /// the thread stops when it returns `false` or the socket fails.
    pub fn spawn_receiver<F>(&self, mut on_action: F) -> io::Result<JoinHandle<()>>
    where
        F: FnMut(ControlAction) -> bool + Send + 'static,
    {
        let socket = self.socket.try_clone()?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;

        thread::Builder::new()
            .name("osc-recv".into())
            .spawn(move || {
                let mut buf = vec![0u8; MAX_PACKET];
                loop {
                    match socket.recv_from(&mut buf) {
                        Ok((n, from)) => {
                            let packet = match rosc::decoder::decode_udp(&buf[..n]) {
                                Ok((_, packet)) => packet,
                                Err(e) => {
                                    debug!(target: "osc", "undecodable packet from {}: {:?}", from, e);
                                    continue;
                                }
                            };
                            for decoded in decode_packet(&packet) {
                                match decoded {
                                    Ok(action) => {
                                        if !on_action(action) {
                                            return;
                                        }
                                    }
                                    Err(e) => warn!(target: "osc", "{}", e),
                                }
                            }
                        }
                        Err(ref e)
                            if e.kind() == io::ErrorKind::WouldBlock
                                || e.kind() == io::ErrorKind::TimedOut =>
                        {
                            continue
                        }
                        Err(e) => {
                            warn!(target: "osc", "receive failed: {}", e);
                            break;
                        }
                    }
                }
            })
    }

    pub fn send_event(&self, event: &OutboundEvent) -> io::Result<()> {
        send_to(&self.socket, self.host_addr, event)
    }

    /// Start a thread forwarding every event from `events` to the host until
    /// the channel closes.
    pub fn spawn_emitter(&self, events: Receiver<OutboundEvent>) -> io::Result<JoinHandle<()>> {
        let socket = self.socket.try_clone()?;
        let host = self.host_addr;
        thread::Builder::new().name("osc-send".into()).spawn(move || {
            while let Ok(event) = events.recv() {
                if let Err(e) = send_to(&socket, host, &event) {
                    warn!(target: "osc", "send failed: {}", e);
                }
            }
        })
    }
}

fn send_to(socket: &UdpSocket, host: SocketAddr, event: &OutboundEvent) -> io::Result<()> {
    let buf = encode_packet(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    socket.send_to(&buf, host)?;
    Ok(())
}
