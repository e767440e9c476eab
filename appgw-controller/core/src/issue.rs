use serde::Serialize;

/// Identifies the Ingress that a binding or an issue originates from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IngressRef {
    pub namespace: String,
    pub name: String,
}

/// A non-fatal problem found while synthesizing backends.
///
/// Issues never abort a pass: the affected path is routed through the default backend pool (or
/// the annotation is replaced by its default) and the pass continues.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Issue {
    #[error("ingress {ingress} references service {service}, which does not exist")]
    MissingService { ingress: IngressRef, service: String },

    #[error("ingress {ingress} references {service}:{port}, which cannot be resolved: {failure}")]
    PortResolution {
        ingress: IngressRef,
        service: String,
        port: String,
        failure: PortResolutionFailure,
    },

    #[error("ingress {ingress} has an unrecognized backend protocol {value:?}; using Http")]
    UnrecognizedProtocol { ingress: IngressRef, value: String },

    #[error("ingress {ingress} sets trusted root certificates {certificates:?} on an Http backend; they are ignored")]
    CertificateWithoutHttps {
        ingress: IngressRef,
        certificates: Vec<String>,
    },

    #[error("ingress {ingress} references {service}:{port}, which resolves to ports {candidates:?}; using {chosen}")]
    AmbiguousBackendPort {
        ingress: IngressRef,
        service: String,
        port: String,
        candidates: Vec<u16>,
        chosen: u16,
    },

    #[error("ingress {ingress} has an invalid {key} annotation {value:?}: {reason}")]
    MalformedAnnotation {
        ingress: IngressRef,
        key: String,
        value: String,
        reason: String,
    },

    #[error("ingress {ingress} has a path whose backend is not a service")]
    UnsupportedBackend { ingress: IngressRef },
}

/// Explains why a Service port reference did not produce a live backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum PortResolutionFailure {
    #[error("the service does not expose TCP port {port}")]
    ServicePortNotFound { port: String },

    #[error("target port {port} is not a valid port number")]
    InvalidTargetPort { port: i32 },

    #[error("no pod declares a container port named {name}")]
    UnresolvedNamedPort { name: String },

    #[error("no endpoints are ready on port {port}")]
    NoLiveEndpoints { port: u16 },
}

/// Explains why a path was routed through the default backend pool.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FallbackReason {
    MissingService,
    PortResolution { failure: PortResolutionFailure },
    UnsupportedBackend,
}

// === impl IngressRef ===

impl IngressRef {
    pub fn new(namespace: impl ToString, name: impl ToString) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for IngressRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// === impl Issue ===

impl Issue {
    pub fn ingress(&self) -> &IngressRef {
        match self {
            Self::MissingService { ingress, .. }
            | Self::PortResolution { ingress, .. }
            | Self::UnrecognizedProtocol { ingress, .. }
            | Self::CertificateWithoutHttps { ingress, .. }
            | Self::AmbiguousBackendPort { ingress, .. }
            | Self::MalformedAnnotation { ingress, .. }
            | Self::UnsupportedBackend { ingress } => ingress,
        }
    }
}
