use std::{fmt, time::Duration};

/// Default rcon port of a Project Zomboid server.
pub const DEFAULT_PORT: u16 = 16261;
/// Default limit for connecting and for every single blocking receive.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how to connect. The password is kept exactly as given, leading
/// and trailing whitespace included.
#[derive(Clone)]
pub struct ClientConfig {
    host: String,
    port: u16,
    password: String,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        ClientConfig {
            host: host.into(),
            port,
            password: password.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Same as `new`, on the default port.
    pub fn with_default_port(host: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_PORT, password)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        self.host.as_ref()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn password(&self) -> &str {
        self.password.as_ref()
    }

    pub fn io_timeout(&self) -> Duration {
        self.timeout
    }

    /// `host:port`, used both for connecting and for error messages.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_not_trimmed() {
        let config = ClientConfig::new("localhost", 27015, "  secret \t");
        assert_eq!(config.password(), "  secret \t");
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::with_default_port("pz.example.org", "pw");
        assert_eq!(config.port(), 16261);
        assert_eq!(config.io_timeout(), Duration::from_secs(10));
        assert_eq!(config.addr(), "pz.example.org:16261");
    }

    #[test]
    fn debug_hides_password() {
        let config = ClientConfig::new("localhost", 16261, "hunter2").timeout(Duration::from_secs(3));
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("localhost"));
    }
}
