use super::*;
use crate::annotations::{HEALTH_PROBE_INTERVAL, HEALTH_PROBE_STATUS_CODES};
use appgw_controller_core::Probe;

fn mk_readiness_probe(port: IntOrString, path: &str) -> k8s::Probe {
    k8s::Probe {
        http_get: Some(k8s::HTTPGetAction {
            port,
            path: Some(path.to_string()),
            host: Some("app.example.com".to_string()),
            ..Default::default()
        }),
        period_seconds: Some(10),
        timeout_seconds: Some(2),
        failure_threshold: Some(5),
        ..Default::default()
    }
}

fn probe_for(backend: &BackendConfig, port: i32, backend_port: u16) -> &Probe {
    let setting = &backend.http_settings[&setting_name(SERVICE, port, backend_port)];
    &backend.probes[&setting.probe]
}

/// Tests that a pod readiness probe on the backend port is copied into the backend probe.
#[test]
fn readiness_probe_is_copied() {
    let mut test = TestConfig::new().with_ingress(mk_default_ingress(NO_ANNOTATIONS));
    let mut container = mk_container([("https-port", 9876)]);
    container.readiness_probe = Some(mk_readiness_probe(IntOrString::Int(9876), "/healthz"));
    test.snapshot.apply(mk_pod(NS, "pod-0", Some(container)));
    let backend = test.synthesize();

    let probe = probe_for(&backend, 80, 9876);
    assert_eq!(probe.path, "/healthz");
    assert_eq!(probe.host.as_deref(), Some("app.example.com"));
    assert_eq!(probe.interval, 10);
    assert_eq!(probe.timeout, 2);
    assert_eq!(probe.unhealthy_threshold, 5);
    assert_eq!(probe.match_status_codes, vec![Probe::DEFAULT_STATUS_CODES]);

    // The probe only applies to its own port.
    let other = probe_for(&backend, 443, 75);
    assert_eq!(other.path, Probe::DEFAULT_PATH);
    assert_eq!(other.host, None);
    assert_eq!(other.interval, Probe::DEFAULT_INTERVAL);
}

/// Tests that an HTTP pod probe is not used for an HTTPS backend.
#[test]
fn probe_scheme_must_match_protocol() {
    let mut test = TestConfig::new().with_ingress(mk_default_ingress(Some((
        crate::annotations::BACKEND_PROTOCOL,
        "https",
    ))));
    let mut container = mk_container([("https-port", 9876)]);
    container.readiness_probe = Some(mk_readiness_probe(IntOrString::Int(9876), "/healthz"));
    test.snapshot.apply(mk_pod(NS, "pod-0", Some(container)));
    let backend = test.synthesize();

    let probe = probe_for(&backend, 80, 9876);
    assert_eq!(probe.path, Probe::DEFAULT_PATH);
    assert_eq!(probe.protocol, appgw_controller_core::Protocol::Https);
}

/// Tests that health probe annotations override the pod probe.
#[test]
fn annotations_override_pod_probe() {
    let mut test = TestConfig::new().with_ingress(mk_default_ingress(vec![
        (HEALTH_PROBE_INTERVAL, "60"),
        (HEALTH_PROBE_STATUS_CODES, "200-299,401"),
    ]));
    let mut container = mk_container([("https-port", 9876)]);
    container.liveness_probe = Some(mk_readiness_probe(
        IntOrString::String("https-port".to_string()),
        "/live",
    ));
    test.snapshot.apply(mk_pod(NS, "pod-0", Some(container)));
    let backend = test.synthesize();

    let probe = probe_for(&backend, 80, 9876);
    assert_eq!(probe.path, "/live");
    assert_eq!(probe.interval, 60);
    assert_eq!(probe.timeout, 2);
    assert_eq!(probe.match_status_codes, vec!["200-299", "401"]);
}
