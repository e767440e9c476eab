use crate::{
    annotations::{AnnotationError, AnnotationReader, IngressAnnotations},
    defaults, endpoints,
    identity::{BackendIdentity, NameKind},
    memo::Memo,
    ports::{self, ResolvedPort, ServicePortRef},
    probe, Snapshot,
};
use appgw_controller_core::{
    BackendConfig, BackendPool, ConnectionDraining, FallbackReason, HttpSetting, IngressRef, Issue,
    PathBinding, Probe, Protocol, TrustedRootCertificateRef,
};
use appgw_controller_k8s_api::{self as k8s, ResourceExt, Selector};
use std::{collections::BTreeMap, net::IpAddr};
use tracing::instrument;

/// Names the default backend objects, which must already exist on the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesisConfig {
    pub default_address_pool: String,
    pub default_http_settings: String,
}

/// The result of resolving a single Ingress backend against a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathOutcome {
    /// The backend resolved to a port with live addresses.
    Resolved(ResolvedBackend),

    /// The path must be served by the default pool.
    ///
    /// `identity` is unset only when the backend does not reference a Service at all.
    Fallback {
        identity: Option<BackendIdentity>,
        reason: FallbackReason,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedBackend {
    pub identity: BackendIdentity,
    pub port: ResolvedPort,
    pub addresses: Vec<IpAddr>,
}

/// Computes the backend configuration for every Ingress in `snapshot`.
///
/// Each call starts from an empty memo, so the result depends only on its inputs.
#[instrument(skip_all, fields(ingresses = snapshot.ingresses.len()))]
pub fn synthesize(
    snapshot: &Snapshot,
    reader: &impl AnnotationReader,
    config: &SynthesisConfig,
) -> BackendConfig {
    let mut pass = Pass {
        snapshot,
        config,
        memo: Memo::default(),
        bindings: Vec::new(),
        issues: Vec::new(),
    };
    for ingress in snapshot.ingresses.iter() {
        pass.ingress(ingress, reader);
    }
    let backend = pass.finish();
    tracing::debug!(
        pools = backend.pools.len(),
        http_settings = backend.http_settings.len(),
        probes = backend.probes.len(),
        issues = backend.issues.len(),
        "Synthesized backends"
    );
    debug_assert_eq!(backend.validate(), Ok(()));
    backend
}

/// Resolves an Ingress backend to the identity and addresses that serve it.
pub fn resolve_path(
    snapshot: &Snapshot,
    namespace: &str,
    ingress: &str,
    backend: &k8s::IngressBackend,
) -> PathOutcome {
    let Some(svc) = backend.service.as_ref() else {
        return PathOutcome::Fallback {
            identity: None,
            reason: FallbackReason::UnsupportedBackend,
        };
    };
    // An Ingress backend must set a port; one that does not matches no service port.
    let service_port = svc
        .port
        .as_ref()
        .and_then(ServicePortRef::from_backend)
        .unwrap_or(ServicePortRef::Number(0));
    let identity = |backend_port| BackendIdentity {
        namespace: namespace.to_string(),
        ingress: ingress.to_string(),
        service: svc.name.clone(),
        service_port: service_port.clone(),
        backend_port,
    };

    let Some(service) = snapshot.services.get(namespace, &svc.name) else {
        let port = service_port.number().unwrap_or_else(defaults::backend_port);
        return PathOutcome::Fallback {
            identity: Some(identity(port)),
            reason: FallbackReason::MissingService,
        };
    };

    let pods = service_pods(snapshot, service);
    let port = match ports::resolve(service, &service_port, pods) {
        Ok(port) => port,
        Err(failure) => {
            return PathOutcome::Fallback {
                identity: Some(identity(defaults::backend_port())),
                reason: FallbackReason::PortResolution { failure },
            }
        }
    };

    let endpoints = snapshot.endpoints.get(namespace, &svc.name);
    match endpoints::live_addresses(service, endpoints, port.port) {
        Ok(addresses) => PathOutcome::Resolved(ResolvedBackend {
            identity: identity(port.port),
            port,
            addresses,
        }),
        Err(failure) => PathOutcome::Fallback {
            identity: Some(identity(port.port)),
            reason: FallbackReason::PortResolution { failure },
        },
    }
}

/// The pods selected by `service`, in name order.
fn service_pods<'s>(snapshot: &'s Snapshot, service: &k8s::Service) -> Vec<&'s k8s::Pod> {
    let Some(selector) = Selector::for_service(service) else {
        return Vec::new();
    };
    let namespace = service.namespace().unwrap_or_default();
    snapshot.pods.select(&namespace, &selector).collect()
}

/// The state of a single synthesis pass.
struct Pass<'a> {
    snapshot: &'a Snapshot,
    config: &'a SynthesisConfig,
    memo: Memo<BackendIdentity, Backend>,
    bindings: Vec<PathBinding>,
    issues: Vec<Issue>,
}

#[derive(Debug)]
struct Backend {
    /// Unset when the backend is served by the default pool.
    pool: Option<BackendPool>,
    setting: HttpSetting,
    probe: Probe,
}

/// Where a path is bound in the gateway.
struct Route {
    host: Option<String>,
    path: Option<String>,
}

// === impl SynthesisConfig ===

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            default_address_pool: "defaultaddresspool".to_string(),
            default_http_settings: "defaulthttpsetting".to_string(),
        }
    }
}

// === impl Pass ===

impl Pass<'_> {
    fn ingress(&mut self, ingress: &k8s::Ingress, reader: &impl AnnotationReader) {
        let (Some(namespace), Some(name)) = (ingress.namespace(), ingress.metadata.name.clone())
        else {
            return;
        };
        let ingress_ref = IngressRef::new(namespace, name);
        let _span = tracing::debug_span!(
            "ingress",
            ns = %ingress_ref.namespace,
            name = %ingress_ref.name,
        )
        .entered();

        let (anns, errors) = reader.read(ingress);
        for error in errors {
            self.issues.push(annotation_issue(&ingress_ref, error));
        }
        if !anns.trusted_root_certificates.is_empty() && !anns.backend_protocol.is_https() {
            self.issues.push(Issue::CertificateWithoutHttps {
                ingress: ingress_ref.clone(),
                certificates: anns.trusted_root_certificates.clone(),
            });
        }

        let Some(spec) = ingress.spec.as_ref() else {
            tracing::debug!("Ingress has no spec");
            return;
        };
        for rule in spec.rules.iter().flatten() {
            for path in rule.http.iter().flat_map(|http| http.paths.iter()) {
                let route = Route {
                    host: rule.host.clone().filter(|h| !h.is_empty()),
                    path: Some(path.path.clone().unwrap_or_else(|| "/".to_string())),
                };
                self.path(&ingress_ref, &anns, route, &path.backend);
            }
        }
        if let Some(backend) = spec.default_backend.as_ref() {
            let route = Route {
                host: None,
                path: None,
            };
            self.path(&ingress_ref, &anns, route, backend);
        }
    }

    fn path(
        &mut self,
        ingress: &IngressRef,
        anns: &IngressAnnotations,
        route: Route,
        backend: &k8s::IngressBackend,
    ) {
        let outcome = resolve_path(self.snapshot, &ingress.namespace, &ingress.name, backend);
        let (identity, addresses, fallback, issue) = match outcome {
            PathOutcome::Resolved(ResolvedBackend {
                identity,
                port,
                addresses,
            }) => {
                let issue = port.is_ambiguous().then(|| Issue::AmbiguousBackendPort {
                    ingress: ingress.clone(),
                    service: identity.service.clone(),
                    port: identity.service_port.to_string(),
                    candidates: port.candidates.iter().map(|p| p.get()).collect(),
                    chosen: port.port.get(),
                });
                (identity, Some(addresses), None, issue)
            }
            PathOutcome::Fallback {
                identity: Some(identity),
                reason,
            } => {
                let issue = fallback_issue(ingress, &identity, &reason);
                (identity, None, Some(reason), Some(issue))
            }
            PathOutcome::Fallback {
                identity: None,
                reason,
            } => {
                tracing::debug!(path = ?route.path, "Backend is not a service");
                self.issues.push(Issue::UnsupportedBackend {
                    ingress: ingress.clone(),
                });
                self.bind(
                    ingress,
                    route,
                    self.config.default_address_pool.clone(),
                    self.config.default_http_settings.clone(),
                    Some(reason),
                );
                return;
            }
        };

        tracing::trace!(
            service = %identity.service,
            port = %identity.service_port,
            backend_port = %identity.backend_port,
            fallback = fallback.is_some(),
            "Resolved path"
        );
        // Issues describe the backend, so paths sharing it report them once.
        if !self.memo.contains_key(&identity) {
            self.issues.extend(issue);
        }
        let snapshot = self.snapshot;
        let backend = self
            .memo
            .get_or_compute(&identity, |id| compute_backend(snapshot, anns, id, addresses));
        let pool = backend
            .pool
            .as_ref()
            .map(|pool| pool.name.clone())
            .unwrap_or_else(|| self.config.default_address_pool.clone());
        let setting = backend.setting.name.clone();
        self.bind(ingress, route, pool, setting, fallback);
    }

    fn bind(
        &mut self,
        ingress: &IngressRef,
        route: Route,
        pool: String,
        http_setting: String,
        fallback: Option<FallbackReason>,
    ) {
        self.bindings.push(PathBinding {
            ingress: ingress.clone(),
            host: route.host,
            path: route.path,
            pool,
            http_setting,
            fallback,
        });
    }

    fn finish(self) -> BackendConfig {
        let mut pools = BTreeMap::new();
        let mut http_settings = BTreeMap::new();
        let mut probes = BTreeMap::new();
        tracing::trace!(backends = self.memo.len(), "Collecting backends");
        for Backend {
            pool,
            setting,
            probe,
        } in self.memo.into_values()
        {
            if let Some(pool) = pool {
                pools.insert(pool.name.clone(), pool);
            }
            http_settings.insert(setting.name.clone(), setting);
            probes.insert(probe.name.clone(), probe);
        }

        let pool = defaults::pool(self.config);
        let setting = defaults::http_setting(self.config);
        let probe = defaults::probe();
        let default_pool = pool.name.clone();
        let default_http_setting = setting.name.clone();
        pools.insert(pool.name.clone(), pool);
        http_settings.insert(setting.name.clone(), setting);
        probes.insert(probe.name.clone(), probe);

        BackendConfig {
            default_pool,
            default_http_setting,
            pools,
            http_settings,
            probes,
            bindings: self.bindings,
            issues: self.issues,
        }
    }
}

fn compute_backend(
    snapshot: &Snapshot,
    anns: &IngressAnnotations,
    id: &BackendIdentity,
    addresses: Option<Vec<IpAddr>>,
) -> Backend {
    let protocol = anns.backend_protocol;
    let pool = addresses.map(|addresses| BackendPool {
        name: id.name(NameKind::Pool),
        addresses,
    });
    let setting = http_setting(id, protocol, anns);

    let pods = snapshot
        .services
        .get(&id.namespace, &id.service)
        .map(|service| service_pods(snapshot, service))
        .unwrap_or_default();
    let probe = probe::backend_probe(
        id.name(NameKind::Probe),
        protocol,
        id.backend_port,
        pods,
        anns,
    );

    tracing::debug!(setting = %setting.name, %protocol, port = %id.backend_port, "Computed backend");
    Backend {
        pool,
        setting,
        probe,
    }
}

fn http_setting(id: &BackendIdentity, protocol: Protocol, anns: &IngressAnnotations) -> HttpSetting {
    let mut setting = HttpSetting::new(
        id.name(NameKind::HttpSetting),
        protocol,
        id.backend_port,
        id.name(NameKind::Probe),
    );
    if protocol.is_https() {
        setting.trusted_root_certificates = anns
            .trusted_root_certificates
            .iter()
            .map(|name| TrustedRootCertificateRef { name: name.clone() })
            .collect();
    }
    setting.path = anns.backend_path_prefix.clone();
    setting.host_name = anns.backend_hostname.clone();
    setting.pick_host_name_from_backend_address =
        protocol.is_https() && setting.host_name.is_none();
    setting.request_timeout = anns
        .request_timeout
        .unwrap_or(HttpSetting::DEFAULT_REQUEST_TIMEOUT);
    setting.connection_draining = anns
        .connection_draining
        .map(|timeout| ConnectionDraining { timeout });
    setting.cookie_based_affinity = anns.cookie_based_affinity;
    setting
}

fn annotation_issue(ingress: &IngressRef, error: AnnotationError) -> Issue {
    match error {
        AnnotationError::UnrecognizedProtocol(value) => Issue::UnrecognizedProtocol {
            ingress: ingress.clone(),
            value,
        },
        AnnotationError::Malformed { key, value, reason } => Issue::MalformedAnnotation {
            ingress: ingress.clone(),
            key: key.to_string(),
            value,
            reason: reason.to_string(),
        },
    }
}

fn fallback_issue(ingress: &IngressRef, id: &BackendIdentity, reason: &FallbackReason) -> Issue {
    match reason {
        FallbackReason::MissingService => Issue::MissingService {
            ingress: ingress.clone(),
            service: id.service.clone(),
        },
        FallbackReason::PortResolution { failure } => Issue::PortResolution {
            ingress: ingress.clone(),
            service: id.service.clone(),
            port: id.service_port.to_string(),
            failure: failure.clone(),
        },
        FallbackReason::UnsupportedBackend => Issue::UnsupportedBackend {
            ingress: ingress.clone(),
        },
    }
}
