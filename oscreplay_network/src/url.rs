//! Endpoint URLs, in the `osc.udp://host:port/` form.

use core::{fmt, str::FromStr};

/// Reasons a URL is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("{0:?} is not a URL, expected osc.udp://host:port")]
    MissingScheme(String),
    #[error("unsupported protocol {0:?}, only UDP is supported")]
    UnsupportedProtocol(String),
    #[error("{0:?} has no port")]
    MissingPort(String),
    #[error("invalid port {0:?}")]
    InvalidPort(String),
}

/// A UDP endpoint.
///
/// The host is optional. When it is missing, listening binds every interface and
/// sending targets `localhost`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OscUrl {
    host: Option<String>,
    port: u16,
}

const UDP_SCHEMES: [&str; 2] = ["osc.udp", "udp"];

impl OscUrl {
    #[inline(always)]
    pub fn new(host: Option<String>, port: u16) -> Self {
        Self { host, port }
    }

    #[inline(always)]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[inline(always)]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Address to bind when receiving.
    #[inline]
    pub fn listen_addr(&self) -> (&str, u16) {
        (self.host().unwrap_or("0.0.0.0"), self.port)
    }

    /// Address to resolve when sending.
    #[inline]
    pub fn send_addr(&self) -> (&str, u16) {
        (self.host().unwrap_or("localhost"), self.port)
    }
}

impl FromStr for OscUrl {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rem) = s
            .split_once("://")
            .ok_or_else(|| UrlError::MissingScheme(s.to_owned()))?;

        if !UDP_SCHEMES.contains(&scheme) {
            return Err(UrlError::UnsupportedProtocol(scheme.to_owned()));
        }

        // anything after the authority is a path, which UDP endpoints ignore
        let authority = rem.split_once('/').map_or(rem, |(authority, _)| authority);

        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| UrlError::MissingPort(s.to_owned()))?;

        let port = port
            .parse()
            .map_err(|_| UrlError::InvalidPort(port.to_owned()))?;

        let host = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(host);

        Ok(Self {
            host: (!host.is_empty()).then(|| host.to_owned()),
            port,
        })
    }
}

impl fmt::Display for OscUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host() {
            Some(host) if host.contains(':') => write!(f, "osc.udp://[{host}]:{}/", self.port),
            Some(host) => write!(f, "osc.udp://{host}:{}/", self.port),
            None => write!(f, "osc.udp://:{}/", self.port),
        }
    }
}
