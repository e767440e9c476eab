//! Typed access to the `appgw.ingress.kubernetes.io/` Ingress annotations.
//!
//! Every annotation has a documented default that applies when it is absent or malformed; a
//! malformed value is reported alongside the parsed annotations rather than failing the read.

use appgw_controller_core::Protocol;
use appgw_controller_k8s_api::{self as k8s, ResourceExt};
use std::collections::BTreeMap;

pub const BACKEND_PROTOCOL: &str = "appgw.ingress.kubernetes.io/backend-protocol";
pub const TRUSTED_ROOT_CERTIFICATE: &str =
    "appgw.ingress.kubernetes.io/appgw-trusted-root-certificate";
pub const BACKEND_PATH_PREFIX: &str = "appgw.ingress.kubernetes.io/backend-path-prefix";
pub const BACKEND_HOSTNAME: &str = "appgw.ingress.kubernetes.io/backend-hostname";
pub const REQUEST_TIMEOUT: &str = "appgw.ingress.kubernetes.io/request-timeout";
pub const CONNECTION_DRAINING: &str = "appgw.ingress.kubernetes.io/connection-draining";
pub const CONNECTION_DRAINING_TIMEOUT: &str =
    "appgw.ingress.kubernetes.io/connection-draining-timeout";
pub const COOKIE_BASED_AFFINITY: &str = "appgw.ingress.kubernetes.io/cookie-based-affinity";
pub const HEALTH_PROBE_PATH: &str = "appgw.ingress.kubernetes.io/health-probe-path";
pub const HEALTH_PROBE_HOSTNAME: &str = "appgw.ingress.kubernetes.io/health-probe-hostname";
pub const HEALTH_PROBE_INTERVAL: &str = "appgw.ingress.kubernetes.io/health-probe-interval";
pub const HEALTH_PROBE_TIMEOUT: &str = "appgw.ingress.kubernetes.io/health-probe-timeout";
pub const HEALTH_PROBE_UNHEALTHY_THRESHOLD: &str =
    "appgw.ingress.kubernetes.io/health-probe-unhealthy-threshold";
pub const HEALTH_PROBE_STATUS_CODES: &str =
    "appgw.ingress.kubernetes.io/health-probe-status-codes";

/// Reads the typed annotations of an Ingress.
pub trait AnnotationReader {
    fn read(&self, ingress: &k8s::Ingress) -> (IngressAnnotations, Vec<AnnotationError>);
}

/// Reads the standard `appgw.ingress.kubernetes.io/` annotations.
#[derive(Copy, Clone, Debug, Default)]
pub struct AppGwAnnotations;

/// The annotations of a single Ingress that configure its backends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngressAnnotations {
    /// Defaults to HTTP.
    pub backend_protocol: Protocol,

    /// Names of trusted root certificates, in annotation order. Defaults to none.
    pub trusted_root_certificates: Vec<String>,

    pub backend_path_prefix: Option<String>,
    pub backend_hostname: Option<String>,

    /// Request timeout in seconds. Defaults to the gateway default (30s) when unset.
    pub request_timeout: Option<u32>,

    /// Set with the drain timeout, in seconds, when connection draining is enabled.
    pub connection_draining: Option<u32>,

    pub cookie_based_affinity: bool,

    pub health_probe: HealthProbeAnnotations,
}

/// Overrides for a backend's health probe. Unset fields keep the probe's own value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HealthProbeAnnotations {
    pub path: Option<String>,
    pub hostname: Option<String>,
    pub interval: Option<u32>,
    pub timeout: Option<u32>,
    pub unhealthy_threshold: Option<u32>,
    pub status_codes: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationError {
    /// The backend protocol is neither `http` nor `https`.
    UnrecognizedProtocol(String),

    Malformed {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

const DEFAULT_DRAIN_TIMEOUT: u32 = 30;

// === impl AppGwAnnotations ===

impl AnnotationReader for AppGwAnnotations {
    fn read(&self, ingress: &k8s::Ingress) -> (IngressAnnotations, Vec<AnnotationError>) {
        IngressAnnotations::from_annotations(ingress.annotations())
    }
}

// === impl IngressAnnotations ===

impl IngressAnnotations {
    pub fn from_annotations(
        anns: &BTreeMap<String, String>,
    ) -> (Self, Vec<AnnotationError>) {
        let mut errors = Vec::new();
        let mut parse = Parser {
            anns,
            errors: &mut errors,
        };

        let backend_protocol = match anns.get(BACKEND_PROTOCOL) {
            None => Protocol::Http,
            Some(v) => parse_protocol(v).unwrap_or_else(|| {
                parse
                    .errors
                    .push(AnnotationError::UnrecognizedProtocol(v.clone()));
                Protocol::Http
            }),
        };

        let trusted_root_certificates = anns
            .get(TRUSTED_ROOT_CERTIFICATE)
            .map(|v| parse_list(v))
            .unwrap_or_default();

        let connection_draining = parse
            .bool(CONNECTION_DRAINING)
            .unwrap_or(false)
            .then(|| {
                parse
                    .seconds(CONNECTION_DRAINING_TIMEOUT)
                    .unwrap_or(DEFAULT_DRAIN_TIMEOUT)
            });

        let anns = Self {
            backend_protocol,
            trusted_root_certificates,
            backend_path_prefix: parse.string(BACKEND_PATH_PREFIX),
            backend_hostname: parse.string(BACKEND_HOSTNAME),
            request_timeout: parse.seconds(REQUEST_TIMEOUT),
            connection_draining,
            cookie_based_affinity: parse.bool(COOKIE_BASED_AFFINITY).unwrap_or(false),
            health_probe: HealthProbeAnnotations {
                path: parse.path(HEALTH_PROBE_PATH),
                hostname: parse.string(HEALTH_PROBE_HOSTNAME),
                interval: parse.seconds(HEALTH_PROBE_INTERVAL),
                timeout: parse.seconds(HEALTH_PROBE_TIMEOUT),
                unhealthy_threshold: parse.seconds(HEALTH_PROBE_UNHEALTHY_THRESHOLD),
                status_codes: parse.status_codes(HEALTH_PROBE_STATUS_CODES),
            },
        };
        (anns, errors)
    }
}

fn parse_protocol(v: &str) -> Option<Protocol> {
    let v = v.trim();
    if v.eq_ignore_ascii_case("http") {
        Some(Protocol::Http)
    } else if v.eq_ignore_ascii_case("https") {
        Some(Protocol::Https)
    } else {
        None
    }
}

/// Splits a comma-separated list, dropping empty and repeated entries.
fn parse_list(v: &str) -> Vec<String> {
    let mut items = Vec::new();
    for item in v.split(',').map(str::trim).filter(|i| !i.is_empty()) {
        if !items.iter().any(|i| i == item) {
            items.push(item.to_string());
        }
    }
    items
}

fn is_status_code_range(spec: &str) -> bool {
    fn code(s: &str) -> Option<u16> {
        s.trim().parse().ok().filter(|c| (100..=599).contains(c))
    }
    match spec.split_once('-') {
        None => code(spec).is_some(),
        Some((floor, ceil)) => matches!((code(floor), code(ceil)), (Some(f), Some(c)) if f <= c),
    }
}

struct Parser<'a> {
    anns: &'a BTreeMap<String, String>,
    errors: &'a mut Vec<AnnotationError>,
}

impl Parser<'_> {
    fn malformed<T>(&mut self, key: &'static str, value: &str, reason: &'static str) -> Option<T> {
        self.errors.push(AnnotationError::Malformed {
            key,
            value: value.to_string(),
            reason,
        });
        None
    }

    fn string(&mut self, key: &'static str) -> Option<String> {
        let v = self.anns.get(key)?.trim();
        if v.is_empty() {
            return self.malformed(key, v, "must not be empty");
        }
        Some(v.to_string())
    }

    fn path(&mut self, key: &'static str) -> Option<String> {
        let v = self.string(key)?;
        if !v.starts_with('/') {
            return self.malformed(key, &v, "must begin with '/'");
        }
        Some(v)
    }

    fn bool(&mut self, key: &'static str) -> Option<bool> {
        let v = self.anns.get(key)?;
        match v.trim().to_ascii_lowercase().parse() {
            Ok(b) => Some(b),
            Err(_) => self.malformed(key, v, "must be true or false"),
        }
    }

    /// Parses a positive number of seconds.
    fn seconds(&mut self, key: &'static str) -> Option<u32> {
        let v = self.anns.get(key)?;
        match v.trim().parse::<u32>() {
            Ok(secs) if secs > 0 => Some(secs),
            _ => self.malformed(key, v, "must be a positive integer"),
        }
    }

    fn status_codes(&mut self, key: &'static str) -> Option<Vec<String>> {
        let v = self.anns.get(key)?;
        let codes = parse_list(v);
        if codes.is_empty() || !codes.iter().all(|c| is_status_code_range(c)) {
            return self.malformed(key, v, "must list status codes or ranges, e.g. 200-399");
        }
        Some(codes)
    }
}
