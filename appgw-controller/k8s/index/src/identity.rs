use crate::ports::ServicePortRef;
use sha2::{Digest, Sha256};
use std::num::NonZeroU16;

/// Identifies a single backend: the pool, HTTP setting and probe computed for one Ingress'
/// reference to a Service port.
///
/// Two paths share a backend only when every field matches, so the same service port referenced
/// from two Ingresses yields two backends.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendIdentity {
    pub namespace: String,
    pub ingress: String,
    pub service: String,
    /// The port reference exactly as written in the Ingress.
    pub service_port: ServicePortRef,
    /// The container port traffic is sent to.
    pub backend_port: NonZeroU16,
}

/// The kind of gateway object a name is generated for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NameKind {
    Pool,
    HttpSetting,
    Probe,
}

pub const MAX_NAME_LEN: usize = 80;

const DIGEST_LEN: usize = 8;

// === impl NameKind ===

impl NameKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Pool => "pool-",
            Self::HttpSetting => "bp-",
            Self::Probe => "pb-",
        }
    }
}

// === impl BackendIdentity ===

impl BackendIdentity {
    pub fn name(&self, kind: NameKind) -> String {
        backend_name(kind.prefix(), self)
    }
}

/// Formats `{prefix}{namespace}-{service}-{service_port}-{backend_port}-{ingress}-{digest}`.
///
/// The readable part may be truncated to keep the name within [`MAX_NAME_LEN`]; the digest
/// covers every field, so truncated names remain distinct.
pub fn backend_name(prefix: &str, id: &BackendIdentity) -> String {
    let readable = format!(
        "{prefix}{}-{}-{}-{}-{}",
        id.namespace, id.service, id.service_port, id.backend_port, id.ingress
    );
    let readable = truncate(&readable, MAX_NAME_LEN - DIGEST_LEN - 1);
    format!("{readable}-{}", digest(id))
}

fn digest(id: &BackendIdentity) -> String {
    let service_port = match &id.service_port {
        ServicePortRef::Number(n) => format!("n:{n}"),
        ServicePortRef::Name(name) => format!("s:{name}"),
    };
    let backend_port = id.backend_port.to_string();

    let mut hasher = Sha256::new();
    for field in [
        id.namespace.as_str(),
        id.service.as_str(),
        service_port.as_str(),
        backend_port.as_str(),
        id.ingress.as_str(),
    ] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(DIGEST_LEN);
    hex
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].trim_end_matches('-')
}
