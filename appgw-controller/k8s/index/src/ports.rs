use appgw_controller_core::PortResolutionFailure;
use appgw_controller_k8s_api::{self as k8s, IntOrString};
use std::{collections::BTreeSet, num::NonZeroU16};

/// How an Ingress backend refers to a Service port.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServicePortRef {
    /// The port number as written in the Ingress, which need not be a valid port.
    Number(i32),
    Name(String),
}

/// A Service port resolved to the container port that serves it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPort {
    /// The service port that matched the reference.
    pub service_port: NonZeroU16,

    /// The container port traffic is sent to.
    pub port: NonZeroU16,

    /// The named target port this was resolved from, if any.
    pub target_name: Option<String>,

    /// Every container port that satisfied the target. Only a named target port can
    /// yield more than one; the smallest is chosen.
    pub candidates: BTreeSet<NonZeroU16>,
}

// === impl ServicePortRef ===

impl ServicePortRef {
    /// Reads an Ingress service backend port. A number takes precedence over a name.
    pub fn from_backend(port: &k8s::ServiceBackendPort) -> Option<Self> {
        if let Some(number) = port.number {
            return Some(Self::Number(number));
        }
        port.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .map(|n| Self::Name(n.to_string()))
    }

    /// The port number a missing service is assumed to serve.
    pub(crate) fn number(&self) -> Option<NonZeroU16> {
        match self {
            Self::Number(n) => to_port(*n),
            Self::Name(_) => None,
        }
    }

    fn matches(&self, port: &k8s::ServicePort) -> bool {
        match self {
            Self::Number(n) => port.port == *n,
            Self::Name(name) => port.name.as_deref() == Some(name.as_str()),
        }
    }
}

impl std::fmt::Display for ServicePortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => n.fmt(f),
            Self::Name(name) => name.fmt(f),
        }
    }
}

// === impl ResolvedPort ===

impl ResolvedPort {
    fn single(service_port: NonZeroU16, port: NonZeroU16) -> Self {
        Self {
            service_port,
            port,
            target_name: None,
            candidates: Some(port).into_iter().collect(),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }
}

/// Resolves an Ingress port reference against a Service and the pods it selects.
///
/// Numeric target ports are returned as-is, even when no pod declares them. Named target ports
/// are looked up in the container ports of every selected pod; pods may disagree on the number
/// behind a name, in which case the smallest number wins.
pub fn resolve<'p>(
    service: &k8s::Service,
    port_ref: &ServicePortRef,
    pods: impl IntoIterator<Item = &'p k8s::Pod>,
) -> Result<ResolvedPort, PortResolutionFailure> {
    let not_found = || PortResolutionFailure::ServicePortNotFound {
        port: port_ref.to_string(),
    };
    let sp = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .into_iter()
        .flatten()
        .filter(|sp| is_tcp(sp.protocol.as_deref()))
        .find(|sp| port_ref.matches(sp))
        .ok_or_else(not_found)?;
    let service_port = to_port(sp.port).ok_or_else(not_found)?;

    match sp.target_port {
        None => Ok(ResolvedPort::single(service_port, service_port)),
        Some(IntOrString::Int(p)) => {
            let port = to_port(p).ok_or(PortResolutionFailure::InvalidTargetPort { port: p })?;
            Ok(ResolvedPort::single(service_port, port))
        }
        Some(IntOrString::String(ref name)) => {
            let candidates = pods
                .into_iter()
                .filter_map(|pod| pod.spec.as_ref())
                .flat_map(|spec| spec.containers.iter())
                .flat_map(|c| c.ports.iter().flatten())
                .filter_map(named_tcp_port)
                .filter(|(_, n)| *n == name.as_str())
                .map(|(p, _)| p)
                .collect::<BTreeSet<_>>();
            let port = *candidates.first().ok_or_else(|| {
                PortResolutionFailure::UnresolvedNamedPort { name: name.clone() }
            })?;
            tracing::trace!(%name, %port, candidates = candidates.len(), "Resolved named target port");
            Ok(ResolvedPort {
                service_port,
                port,
                target_name: Some(name.clone()),
                candidates,
            })
        }
    }
}

pub(crate) fn to_port(port: i32) -> Option<NonZeroU16> {
    u16::try_from(port).ok().and_then(NonZeroU16::new)
}

/// Kubernetes defaults an unset protocol to TCP.
pub(crate) fn is_tcp(protocol: Option<&str>) -> bool {
    protocol.map(|p| p.eq_ignore_ascii_case("TCP")).unwrap_or(true)
}

pub(crate) fn named_tcp_port(port: &k8s::ContainerPort) -> Option<(NonZeroU16, &str)> {
    if !is_tcp(port.protocol.as_deref()) {
        return None;
    }
    let p = to_port(port.container_port)?;
    let n = port.name.as_deref()?;
    Some((p, n))
}
