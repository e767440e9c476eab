use crate::{annotations::IngressAnnotations, ports::named_tcp_port};
use appgw_controller_core::{Probe, Protocol};
use appgw_controller_k8s_api as k8s;
use std::num::NonZeroU16;

/// Builds the health probe for a backend.
///
/// The first pod container with an HTTP readiness (or else liveness) probe on `port`, using a
/// scheme that matches `protocol`, supplies the probe's parameters. Health probe annotations are
/// applied last.
pub(crate) fn backend_probe<'p>(
    name: String,
    protocol: Protocol,
    port: NonZeroU16,
    pods: impl IntoIterator<Item = &'p k8s::Pod>,
    anns: &IngressAnnotations,
) -> Probe {
    let mut probe = Probe::new(name, protocol);

    let matched = pods
        .into_iter()
        .filter_map(|pod| pod.spec.as_ref())
        .flat_map(|spec| spec.containers.iter())
        .find_map(|container| container_http_probe(container, protocol, port));
    if let Some(http) = matched {
        tracing::trace!(probe = %probe.name, path = %http.path, "Using container probe");
        probe.path = http.path;
        probe.host = http.host;
        probe.interval = http.interval.unwrap_or(probe.interval);
        probe.timeout = http.timeout.unwrap_or(probe.timeout);
        probe.unhealthy_threshold = http.unhealthy_threshold.unwrap_or(probe.unhealthy_threshold);
    }

    let overrides = &anns.health_probe;
    if let Some(path) = &overrides.path {
        probe.path = path.clone();
    }
    if let Some(host) = overrides.hostname.as_ref().or(anns.backend_hostname.as_ref()) {
        probe.host = Some(host.clone());
    }
    probe.interval = overrides.interval.unwrap_or(probe.interval);
    probe.timeout = overrides.timeout.unwrap_or(probe.timeout);
    probe.unhealthy_threshold = overrides
        .unhealthy_threshold
        .unwrap_or(probe.unhealthy_threshold);
    if let Some(codes) = &overrides.status_codes {
        probe.match_status_codes = codes.clone();
    }

    probe
}

struct ContainerHttpProbe {
    path: String,
    host: Option<String>,
    interval: Option<u32>,
    timeout: Option<u32>,
    unhealthy_threshold: Option<u32>,
}

fn container_http_probe(
    container: &k8s::Container,
    protocol: Protocol,
    port: NonZeroU16,
) -> Option<ContainerHttpProbe> {
    fn find_by_name(name: &str, ports: &[k8s::ContainerPort]) -> Option<NonZeroU16> {
        ports
            .iter()
            .filter_map(named_tcp_port)
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(p, _)| p)
    }

    fn get_port(port: &k8s::IntOrString, container: &k8s::Container) -> Option<NonZeroU16> {
        match port {
            k8s::IntOrString::Int(p) => u16::try_from(*p).ok()?.try_into().ok(),
            k8s::IntOrString::String(n) => find_by_name(n, container.ports.as_ref()?),
        }
    }

    fn positive(v: Option<i32>) -> Option<u32> {
        v.and_then(|v| u32::try_from(v).ok()).filter(|v| *v > 0)
    }

    (container.readiness_probe.iter())
        .chain(container.liveness_probe.iter())
        .find_map(|p| {
            let http = p.http_get.as_ref()?;
            if get_port(&http.port, container)? != port {
                return None;
            }
            let scheme = http.scheme.as_deref().unwrap_or("HTTP");
            if !scheme.eq_ignore_ascii_case(&protocol.to_string()) {
                return None;
            }
            let path = http.path.as_deref().unwrap_or(Probe::DEFAULT_PATH);
            let path = match http::Uri::try_from(path) {
                Ok(uri) => uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| uri.path().to_string()),
                Err(error) => {
                    tracing::debug!(%error, path, "Ignoring invalid probe path");
                    return None;
                }
            };
            Some(ContainerHttpProbe {
                path,
                host: http.host.clone().filter(|h| !h.is_empty()),
                interval: positive(p.period_seconds),
                timeout: positive(p.timeout_seconds),
                unhealthy_threshold: positive(p.failure_threshold),
            })
        })
}
