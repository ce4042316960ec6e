use crate::{
    config::ClientConfig,
    error::RconError,
    packet::{read_i32, Packet, PacketType, SERVERDATA_RESPONSE_VALUE},
};
use log::{debug, error, info, trace, warn};
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time::{error::Elapsed, timeout},
};

const READ_CHUNK: usize = 4096;

/// Simple asynchronous rcon client owning a single connection. Create it with
/// a [ClientConfig], call `connect()` to open the stream and authenticate, then
/// run commands one at a time. The client should be `mut` as it keeps a
/// counter used for [Packet] IDs.
///
/// Every failure while a command is in flight leaves the client
/// unauthenticated; call `connect()` again before retrying.
///
/// ## Example
/// ```no_run
/// use pzrcon::{client::Client, config::ClientConfig};
/// use std::error::Error;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn Error>> {
///     let config = ClientConfig::new("127.0.0.1", 16261, "<put rcon password here>");
///     let mut client = Client::new(config);
///     client.connect().await?;
///
///     let players = client.execute_command("players").await?;
///     println!("{}", players);
///
///     client.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct Client {
    config: ClientConfig,
    stream: Option<TcpStream>,
    request_id: i32,
    authenticated: bool,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Client {
            config,
            stream: None,
            request_id: 0,
            authenticated: false,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// ID of the last packet sent, 0 before anything was sent.
    pub fn request_id(&self) -> i32 {
        self.request_id
    }

    /// Bumps the counter. After `i32::MAX` it starts over at 1, ids never go
    /// negative since -1 is how the server rejects a password.
    fn next_request_id(&mut self) -> i32 {
        self.request_id = match self.request_id.checked_add(1) {
            Some(id) => id,
            None => 1,
        };
        self.request_id
    }

    /// Opens the stream and authenticates. On any failure the stream is
    /// closed again and the client stays unauthenticated.
    pub async fn connect(&mut self) -> Result<(), RconError> {
        if self.authenticated {
            return Ok(());
        }

        let addr = self.config.addr();
        if let Some(stale) = self.stream.take() {
            debug!("discarding stale stream to {} before reconnecting", addr);
            close_stream(stale, &addr).await;
        }

        let io_timeout = self.config.io_timeout();
        let connected = timeout(io_timeout, TcpStream::connect(&addr)).await;
        let mut stream = match connected {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                let err = RconError::from_connect(&addr, e);
                error!("rcon connection to {} failed: {}", addr, err);
                return Err(err);
            }
            Err(_) => {
                error!("rcon connection timed out to {}", addr);
                return Err(RconError::ConnectionTimeout { addr });
            }
        };

        trace!("opened tcp stream to {}, attempting auth", addr);

        let id = self.next_request_id();
        let auth_packet = Packet::new(id, PacketType::Auth, self.config.password());

        match authenticate(&mut stream, &auth_packet, io_timeout, &addr).await {
            Ok(()) => {
                info!("rcon connected to {}", addr);
                self.stream = Some(stream);
                self.authenticated = true;
                Ok(())
            }
            Err(err) => {
                error!("rcon auth with {} failed: {}", addr, err);
                close_stream(stream, &addr).await;
                Err(err)
            }
        }
    }

    /// Run a command and return its output, which may be empty. Only the
    /// first response packet is read.
    pub async fn execute_command(&mut self, command: &str) -> Result<String, RconError> {
        if !self.authenticated {
            return Err(RconError::NotConnected);
        }
        if self.stream.is_none() {
            return Err(RconError::NotConnected);
        }

        let packet = Packet::new(self.next_request_id(), PacketType::Exec, command);
        let stream = self.stream.as_mut().ok_or(RconError::NotConnected)?;
        let addr = self.config.addr();

        let result = exchange(stream, &packet, self.config.io_timeout(), &addr).await;
        if let Err(ref err) = result {
            warn!("rcon connection to {} presumed dead: {}", addr, err);
            self.authenticated = false;
        }
        result
    }

    /// Broadcasts a message to every player, e.g. a restart warning. The
    /// message is sent as one quoted argument, so any `"` in it is replaced by
    /// `'` (the server has no escape for quotes inside a quoted argument).
    pub async fn server_message(&mut self, message: &str) -> Result<String, RconError> {
        let command = format!("servermsg \"{}\"", message.replace('"', "'"));
        self.execute_command(&command).await
    }

    /// Asks the server to save the world.
    pub async fn save(&mut self) -> Result<String, RconError> {
        self.execute_command("save").await
    }

    /// Closes the stream if there is one. Never fails, errors while closing are
    /// only logged.
    pub async fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            close_stream(stream, &self.config.addr()).await;
        }
        self.authenticated = false;
    }
}

async fn close_stream(mut stream: TcpStream, addr: &str) {
    match stream.shutdown().await {
        Ok(()) => info!("rcon disconnected from {}", addr),
        Err(e) => debug!("error closing rcon stream to {}: {}", addr, e),
    }
}

/// Sends the auth packet and checks the answer. Servers may send an empty
/// `SERVERDATA_RESPONSE_VALUE` ahead of the actual auth response, in which case
/// the first packet is skipped.
async fn authenticate<S>(
    stream: &mut S,
    auth_packet: &Packet,
    io_timeout: Duration,
    addr: &str,
) -> Result<(), RconError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    trace!("sending auth packet to server");
    send(stream, auth_packet, addr).await?;

    let mut response = read_payload(stream, io_timeout, addr)
        .await?
        .ok_or(RconError::MalformedResponse("no response to auth"))?;
    if response.len() < Packet::HEADER_SIZE {
        return Err(RconError::MalformedResponse("incomplete auth response"));
    }

    if read_i32(&response[4..8]) == SERVERDATA_RESPONSE_VALUE {
        trace!("skipping empty response value sent ahead of the auth response");
        response = read_payload(stream, io_timeout, addr)
            .await?
            .ok_or(RconError::MalformedResponse("no auth response"))?;
        if response.len() < 4 {
            return Err(RconError::MalformedResponse("incomplete auth response"));
        }
    }

    let id = read_i32(&response[0..4]);
    trace!("receive auth response for packet id {}", id);
    if id == -1 {
        return Err(RconError::AuthenticationFailed);
    }
    Ok(())
}

/// One command round trip: send the packet, read a single response.
async fn exchange<S>(
    stream: &mut S,
    packet: &Packet,
    io_timeout: Duration,
    addr: &str,
) -> Result<String, RconError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    trace!("sending packet {} to server", packet.id());
    send(stream, packet, addr).await?;

    let payload = read_payload(stream, io_timeout, addr)
        .await?
        .ok_or_else(|| RconError::no_data(addr))?;
    if payload.len() < Packet::HEADER_SIZE {
        trace!("response has no header, treating it as empty");
        return Ok(String::new());
    }

    let response = Packet::unpack(&payload)?;
    trace!("receive response for packet id {}", response.id());
    Ok(response.body_text())
}

async fn send<W>(stream: &mut W, packet: &Packet, addr: &str) -> Result<(), RconError>
where
    W: AsyncWrite + Unpin,
{
    stream
        .write_all(&packet.pack())
        .await
        .map_err(|source| RconError::ConnectionLost {
            addr: addr.to_owned(),
            source,
        })
}

/// Reads the size prefix and then the rest of one packet. `None` if the server
/// hung up or the socket failed on the way.
async fn read_payload<R>(
    reader: &mut R,
    io_timeout: Duration,
    addr: &str,
) -> Result<Option<Vec<u8>>, RconError>
where
    R: AsyncRead + Unpin,
{
    let timed_out = |_: Elapsed| RconError::ConnectionTimeout {
        addr: addr.to_owned(),
    };

    let size = match recv_exact(reader, 4, io_timeout).await.map_err(timed_out)? {
        Some(prefix) => read_i32(&prefix),
        None => return Ok(None),
    };
    if size < 0 {
        return Err(RconError::MalformedResponse("negative packet size"));
    }

    trace!("reading packet of {} bytes", size);
    recv_exact(reader, size as usize, io_timeout)
        .await
        .map_err(timed_out)
}

/// Reads exactly `n` bytes, however fragmented they arrive. All or nothing:
/// if the peer closes or the socket errors before `n` bytes are in, the bytes
/// read so far are dropped and `None` is returned. The timeout applies to each
/// single read, not to the whole call.
async fn recv_exact<R>(
    reader: &mut R,
    n: usize,
    io_timeout: Duration,
) -> Result<Option<Vec<u8>>, Elapsed>
where
    R: AsyncRead + Unpin,
{
    let mut data = Vec::with_capacity(n.min(READ_CHUNK));
    let mut chunk = [0u8; READ_CHUNK];

    while data.len() < n {
        let wanted = (n - data.len()).min(READ_CHUNK);
        match timeout(io_timeout, reader.read(&mut chunk[..wanted])).await? {
            Ok(0) => {
                debug!("peer closed after {} of {} bytes", data.len(), n);
                return Ok(None);
            }
            Ok(read) => data.extend_from_slice(&chunk[..read]),
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("abandoning read after {} of {} bytes: {}", data.len(), n, e);
                return Ok(None);
            }
        }
    }

    Ok(Some(data))
}
