use super::*;
use crate::annotations::*;
use appgw_controller_core::{ConnectionDraining, Issue, Protocol, TrustedRootCertificateRef};

fn non_default_settings(
    backend: &BackendConfig,
) -> impl Iterator<Item = &appgw_controller_core::HttpSetting> {
    backend
        .http_settings
        .values()
        .filter(move |s| s.name != backend.default_http_setting)
}

#[test]
fn backend_protocol_propagates() {
    for (value, expected) in [
        ("HttpS", Protocol::Https),
        ("https", Protocol::Https),
        ("HttP", Protocol::Http),
    ] {
        let test = TestConfig::new()
            .with_ingress(mk_default_ingress(Some((BACKEND_PROTOCOL, value))));
        let backend = test.synthesize();

        assert_eq!(non_default_settings(&backend).count(), 2);
        for setting in non_default_settings(&backend) {
            assert_eq!(setting.protocol, expected, "{value}");
            assert_eq!(backend.probes[&setting.probe].protocol, expected, "{value}");
            assert_eq!(
                setting.pick_host_name_from_backend_address,
                expected.is_https()
            );
        }

        // The default setting is never affected by annotations.
        let default = &backend.http_settings[&backend.default_http_setting];
        assert_eq!(default.protocol, Protocol::Http);
        assert!(backend.issues.iter().all(|i| !matches!(
            i,
            Issue::UnrecognizedProtocol { .. }
        )));
    }
}

#[test]
fn backend_protocol_defaults_to_http() {
    let test = TestConfig::new().with_ingress(mk_default_ingress(NO_ANNOTATIONS));
    let backend = test.synthesize();
    assert!(backend
        .http_settings
        .values()
        .all(|s| s.protocol == Protocol::Http));
    assert!(backend
        .probes
        .values()
        .all(|p| p.protocol == Protocol::Http));
}

#[test]
fn unrecognized_protocol_is_reported() {
    let test =
        TestConfig::new().with_ingress(mk_default_ingress(Some((BACKEND_PROTOCOL, "spdy"))));
    let backend = test.synthesize();
    assert!(non_default_settings(&backend).all(|s| s.protocol == Protocol::Http));
    assert_eq!(
        backend
            .issues
            .iter()
            .filter(|i| matches!(i, Issue::UnrecognizedProtocol { value, .. } if value == "spdy"))
            .count(),
        1
    );
}

#[test]
fn trusted_root_certificates_attach_to_https() {
    let test = TestConfig::new().with_ingress(mk_default_ingress(vec![
        (BACKEND_PROTOCOL, "https"),
        (TRUSTED_ROOT_CERTIFICATE, "rootcert1,rootcert2"),
    ]));
    let backend = test.synthesize();

    for setting in non_default_settings(&backend) {
        assert_eq!(
            setting.trusted_root_certificates,
            vec![
                TrustedRootCertificateRef {
                    name: "rootcert1".to_string()
                },
                TrustedRootCertificateRef {
                    name: "rootcert2".to_string()
                },
            ]
        );
    }
    assert!(backend.http_settings[&backend.default_http_setting]
        .trusted_root_certificates
        .is_empty());
    assert!(!backend
        .issues
        .iter()
        .any(|i| matches!(i, Issue::CertificateWithoutHttps { .. })));
}

#[test]
fn trusted_root_certificates_ignored_on_http() {
    let test = TestConfig::new().with_ingress(mk_default_ingress(Some((
        TRUSTED_ROOT_CERTIFICATE,
        "rootcert1,rootcert2",
    ))));
    let backend = test.synthesize();

    assert!(backend
        .http_settings
        .values()
        .all(|s| s.trusted_root_certificates.is_empty()));
    let warnings = backend
        .issues
        .iter()
        .filter_map(|i| match i {
            Issue::CertificateWithoutHttps {
                ingress,
                certificates,
            } => Some((ingress.to_string(), certificates.clone())),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(
        warnings,
        vec![(
            format!("{NS}/{INGRESS}"),
            vec!["rootcert1".to_string(), "rootcert2".to_string()]
        )]
    );
}

#[test]
fn setting_annotations() {
    let test = TestConfig::new().with_ingress(mk_default_ingress(vec![
        (BACKEND_PATH_PREFIX, "/api/"),
        (BACKEND_HOSTNAME, "backend.example.com"),
        (REQUEST_TIMEOUT, "45"),
        (CONNECTION_DRAINING, "true"),
        (CONNECTION_DRAINING_TIMEOUT, "12"),
        (COOKIE_BASED_AFFINITY, "true"),
        (BACKEND_PROTOCOL, "https"),
    ]));
    let backend = test.synthesize();

    for setting in non_default_settings(&backend) {
        assert_eq!(setting.path.as_deref(), Some("/api/"));
        assert_eq!(setting.host_name.as_deref(), Some("backend.example.com"));
        assert!(!setting.pick_host_name_from_backend_address);
        assert_eq!(setting.request_timeout, 45);
        assert_eq!(
            setting.connection_draining,
            Some(ConnectionDraining { timeout: 12 })
        );
        assert!(setting.cookie_based_affinity);
        assert_eq!(
            backend.probes[&setting.probe].host.as_deref(),
            Some("backend.example.com")
        );
    }
}

#[test]
fn malformed_annotations_are_reported() {
    let test = TestConfig::new().with_ingress(mk_default_ingress(vec![
        (REQUEST_TIMEOUT, "forever"),
        (HEALTH_PROBE_PATH, "healthz"),
    ]));
    let backend = test.synthesize();

    for setting in non_default_settings(&backend) {
        assert_eq!(setting.request_timeout, 30);
        assert_eq!(backend.probes[&setting.probe].path, "/");
    }
    let mut keys = backend
        .issues
        .iter()
        .filter_map(|i| match i {
            Issue::MalformedAnnotation { key, value, .. } => Some((key.as_str(), value.as_str())),
            _ => None,
        })
        .collect::<Vec<_>>();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![(HEALTH_PROBE_PATH, "healthz"), (REQUEST_TIMEOUT, "forever")]
    );
}

/// Tests that synthesis reads annotations through the provided reader.
#[test]
fn custom_annotation_reader() {
    struct AlwaysHttps;

    impl AnnotationReader for AlwaysHttps {
        fn read(&self, _: &k8s::Ingress) -> (IngressAnnotations, Vec<AnnotationError>) {
            let anns = IngressAnnotations {
                backend_protocol: Protocol::Https,
                ..Default::default()
            };
            (anns, Vec::new())
        }
    }

    let test = TestConfig::new().with_ingress(mk_default_ingress(NO_ANNOTATIONS));
    let backend = synthesize(&test.snapshot, &AlwaysHttps, &test.config);
    assert!(non_default_settings(&backend).all(|s| s.protocol == Protocol::Https));
}
