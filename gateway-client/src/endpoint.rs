//! Network endpoints and the loopback address-translation rule

/// A validator or ordering endpoint. Identity key is `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Externally-routable host name
    pub host: String,

    /// Service port
    pub port: u16,

    /// Host name presented for TLS server-name verification. Defaults to
    /// `host`; kept separate because the dial address may be rewritten to
    /// loopback while verification still needs the original name.
    pub hostname_override: String,
}

impl Endpoint {
    /// Create an endpoint; the TLS server name defaults to the host
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let hostname_override = host.clone();
        Self {
            host,
            port,
            hostname_override,
        }
    }

    /// Identity key (`host:port`) as registered
    pub fn url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Address to dial. With `as_localhost` set, the host segment is
    /// rewritten to loopback and the port is left untouched.
    pub fn dial_address(&self, as_localhost: bool) -> String {
        if as_localhost {
            format!("localhost:{}", self.port)
        } else {
            self.url()
        }
    }

    /// Host name to verify the server certificate against
    pub fn tls_server_name(&self) -> &str {
        &self.hostname_override
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Structural check that trust-root bytes hold a PEM certificate block.
/// Deliberately shallow: chain validation happens in the TLS handshake.
pub(crate) fn validate_pem(bytes: &[u8]) -> std::result::Result<(), String> {
    let text = std::str::from_utf8(bytes).map_err(|_| "not valid UTF-8".to_string())?;
    let begin = text
        .find("-----BEGIN CERTIFICATE-----")
        .ok_or_else(|| "missing BEGIN CERTIFICATE marker".to_string())?;
    let end = text
        .find("-----END CERTIFICATE-----")
        .ok_or_else(|| "missing END CERTIFICATE marker".to_string())?;
    if end <= begin {
        return Err("END marker precedes BEGIN marker".to_string());
    }
    Ok(())
}
