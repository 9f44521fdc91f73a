#![allow(dead_code)]
//! Test harness utilities for regroove-osc integration tests.

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use rosc::{OscMessage, OscPacket, OscType};

pub fn msg(addr: &str, args: Vec<OscType>) -> OscMessage {
    OscMessage {
        addr: addr.to_string(),
        args,
    }
}

/// A fake host: sends control messages and receives events.
pub struct FakeHost {
    socket: UdpSocket,
}

impl FakeHost {
    pub fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        Self { socket }
    }

    pub fn addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap()
    }

    pub fn send(&self, to: SocketAddr, message: OscMessage) {
        let buf = rosc::encoder::encode(&OscPacket::Message(message)).unwrap();
        self.socket.send_to(&buf, to).unwrap();
    }

    pub fn send_packet(&self, to: SocketAddr, packet: &OscPacket) {
        let buf = rosc::encoder::encode(packet).unwrap();
        self.socket.send_to(&buf, to).unwrap();
    }

    pub fn send_raw(&self, to: SocketAddr, bytes: &[u8]) {
        self.socket.send_to(bytes, to).unwrap();
    }

    /// Next message received, panicking on timeout.
    pub fn recv(&self) -> OscMessage {
        let mut buf = vec![0u8; 65_536];
        let (n, _) = self.socket.recv_from(&mut buf).expect("timed out waiting for host message");
        match rosc::decoder::decode_udp(&buf[..n]).unwrap().1 {
            OscPacket::Message(m) => m,
            other => panic!("Expected message, got {:?}", other),
        }
    }
}
