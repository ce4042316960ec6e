use thiserror::Error;

/// Possible errors for the package.
#[derive(Error, Debug)]
pub enum RconError {
    /// Returned if the TCP connect or a blocking receive took longer than the
    /// configured timeout.
    #[error("connection to {addr} timed out, check host and port")]
    ConnectionTimeout { addr: String },
    /// Returned if nothing is listening on the rcon port.
    #[error("connection to {addr} refused, is rcon enabled and the server running?")]
    ConnectionRefused {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// Returned if the host is down, cannot be resolved or is behind a
    /// firewall.
    #[error("host {addr} cannot be reached")]
    UnreachableHost {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// Returned if you can't remember the password.
    #[error("authentication failed, wrong password")]
    AuthenticationFailed,
    /// Returned if a response was missing, too short for its header or had a
    /// nonsensical size prefix.
    #[error("malformed response from server: {0}")]
    MalformedResponse(&'static str),
    /// Returned if a command is issued before `connect()` succeeded, or after
    /// the connection was dropped.
    #[error("not connected to server")]
    NotConnected,
    /// The stream was established, but sending or receiving failed midway.
    /// The client is no longer authenticated and has to reconnect.
    #[error("connection to {addr} lost, please reconnect")]
    ConnectionLost {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

impl RconError {
    /// Sorts an error returned by `TcpStream::connect` into the right kind.
    pub(crate) fn from_connect(addr: &str, source: std::io::Error) -> Self {
        let addr = addr.to_owned();
        match source.kind() {
            std::io::ErrorKind::ConnectionRefused => RconError::ConnectionRefused { addr, source },
            std::io::ErrorKind::TimedOut => RconError::ConnectionTimeout { addr },
            _ => RconError::UnreachableHost { addr, source },
        }
    }

    /// Used when the server hung up or the socket failed while a packet was
    /// being read.
    pub(crate) fn no_data(addr: &str) -> Self {
        RconError::ConnectionLost {
            addr: addr.to_owned(),
            source: std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no data received from server",
            ),
        }
    }
}
