//! Mock rcon server for the integration tests.
//!
//! Listens on an OS-assigned port and answers every connection the way a
//! Project Zomboid server does: an empty response value ahead of the auth
//! response, then one response packet per command.

use std::net::SocketAddr;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// How the server misbehaves, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Normal,
    /// Hangs up as soon as a command arrives.
    DropOnCommand,
    /// Accepts connections and never says a word.
    Silent,
    /// Authenticates, then never answers a command.
    SilentOnCommand,
}

pub struct MockServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(password: &'static str, behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_client(stream, password, behavior));
            }
        });

        MockServer { addr, handle }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A server packet as it appears on the wire.
pub fn packet(id: i32, packet_type: i32, body: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(body.len() as i32 + 10).to_le_bytes());
    bytes.extend_from_slice(&id.to_le_bytes());
    bytes.extend_from_slice(&packet_type.to_le_bytes());
    bytes.extend_from_slice(body);
    bytes.extend_from_slice(&[0, 0]);
    bytes
}

fn le_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Holds the socket open until the client gives up.
async fn stay_silent(stream: &mut TcpStream) {
    let mut sink = [0u8; 64];
    while let Ok(n) = stream.read(&mut sink).await {
        if n == 0 {
            break;
        }
    }
}

async fn handle_client(mut stream: TcpStream, password: &'static str, behavior: Behavior) {
    if behavior == Behavior::Silent {
        stay_silent(&mut stream).await;
        return;
    }

    let mut authenticated = false;

    loop {
        let mut size = [0u8; 4];
        if stream.read_exact(&mut size).await.is_err() {
            return;
        }
        let mut data = vec![0u8; le_i32(&size) as usize];
        if stream.read_exact(&mut data).await.is_err() {
            return;
        }
        if data.len() < 8 {
            continue;
        }

        let id = le_i32(&data[0..4]);
        let packet_type = le_i32(&data[4..8]);
        // exactly two terminators are expected, anything else is a framing bug
        assert_eq!(&data[data.len() - 2..], &[0, 0]);
        let body = &data[8..data.len() - 2];

        match packet_type {
            3 => {
                let ack = packet(0, 0, b"");
                if stream.write_all(&ack).await.is_err() {
                    return;
                }
                if body == password.as_bytes() {
                    authenticated = true;
                    let _ = stream.write_all(&packet(id, 2, b"")).await;
                } else {
                    let _ = stream.write_all(&packet(-1, 2, b"")).await;
                    return;
                }
            }
            2 if authenticated => {
                match behavior {
                    Behavior::DropOnCommand => return,
                    Behavior::SilentOnCommand => {
                        stay_silent(&mut stream).await;
                        return;
                    }
                    _ => {}
                }
                let response = match body {
                    b"short" => {
                        // size prefix of 4, only an id follows
                        let mut short = 4i32.to_le_bytes().to_vec();
                        short.extend_from_slice(&id.to_le_bytes());
                        short
                    }
                    _ => packet(id, 0, &command_output(body)),
                };
                if stream.write_all(&response).await.is_err() {
                    return;
                }
            }
            _ => return,
        }
    }
}

fn command_output(command: &[u8]) -> Vec<u8> {
    match command {
        b"test" => b"test response".to_vec(),
        b"players" => b"Players connected (1):\nTestPlayer".to_vec(),
        b"save" => b"World saved".to_vec(),
        b"empty" => Vec::new(),
        b"binary" => vec![0xff, b'o', b'k'],
        _ => {
            let mut echo = b"Unknown command: ".to_vec();
            echo.extend_from_slice(command);
            echo
        }
    }
}
