use serde::Serialize;
use std::{net::IpAddr, num::NonZeroU16};

/// The protocol a gateway uses to reach a backend, and to probe it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

/// A set of addresses that receives traffic for a backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendPool {
    pub name: String,
    pub addresses: Vec<IpAddr>,
}

/// Describes how the gateway connects to the addresses of a backend pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpSetting {
    pub name: String,
    pub protocol: Protocol,
    pub port: NonZeroU16,

    /// The name of the probe that checks this setting's backends.
    pub probe: String,

    /// Only ever populated when `protocol` is HTTPS.
    pub trusted_root_certificates: Vec<TrustedRootCertificateRef>,

    /// Overrides the request path prefix sent to the backend.
    pub path: Option<String>,

    /// Overrides the host header sent to the backend.
    pub host_name: Option<String>,

    /// Set for HTTPS backends that do not carry an explicit host name so that TLS validation
    /// uses the backend address.
    pub pick_host_name_from_backend_address: bool,

    /// Request timeout, in seconds.
    pub request_timeout: u32,

    pub connection_draining: Option<ConnectionDraining>,

    pub cookie_based_affinity: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TrustedRootCertificateRef {
    pub name: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDraining {
    /// Drain timeout, in seconds.
    pub timeout: u32,
}

/// An active health check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    pub name: String,
    pub protocol: Protocol,

    /// The host header to probe with. When unset, the host is taken from the HTTP setting.
    pub host: Option<String>,
    pub path: String,

    /// Probe interval, in seconds.
    pub interval: u32,

    /// Probe timeout, in seconds.
    pub timeout: u32,
    pub unhealthy_threshold: u32,

    /// Status codes (or ranges, e.g. `200-399`) that are considered healthy.
    pub match_status_codes: Vec<String>,
}

// === impl Protocol ===

impl Protocol {
    pub fn is_https(self) -> bool {
        matches!(self, Self::Https)
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => "Http".fmt(f),
            Self::Https => "Https".fmt(f),
        }
    }
}

// === impl HttpSetting ===

impl HttpSetting {
    pub const DEFAULT_REQUEST_TIMEOUT: u32 = 30;

    /// An HTTP setting with no annotation-driven configuration.
    pub fn new(name: String, protocol: Protocol, port: NonZeroU16, probe: String) -> Self {
        Self {
            name,
            protocol,
            port,
            probe,
            trusted_root_certificates: Vec::new(),
            path: None,
            host_name: None,
            pick_host_name_from_backend_address: false,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            connection_draining: None,
            cookie_based_affinity: false,
        }
    }
}

// === impl Probe ===

impl Probe {
    pub const DEFAULT_PATH: &'static str = "/";
    pub const DEFAULT_INTERVAL: u32 = 30;
    pub const DEFAULT_TIMEOUT: u32 = 30;
    pub const DEFAULT_UNHEALTHY_THRESHOLD: u32 = 3;
    pub const DEFAULT_STATUS_CODES: &'static str = "200-399";

    pub fn new(name: String, protocol: Protocol) -> Self {
        Self {
            name,
            protocol,
            host: None,
            path: Self::DEFAULT_PATH.to_string(),
            interval: Self::DEFAULT_INTERVAL,
            timeout: Self::DEFAULT_TIMEOUT,
            unhealthy_threshold: Self::DEFAULT_UNHEALTHY_THRESHOLD,
            match_status_codes: vec![Self::DEFAULT_STATUS_CODES.to_string()],
        }
    }
}
