use crate::{BackendPool, FallbackReason, HttpSetting, IngressRef, Issue, Probe, Protocol};
use serde::Serialize;
use std::collections::BTreeMap;

/// The backend configuration computed by a single synthesis pass.
///
/// Pools, settings, and probes are keyed (and therefore ordered) by name so that identical
/// snapshots render identically.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    pub default_pool: String,
    pub default_http_setting: String,
    pub pools: BTreeMap<String, BackendPool>,
    pub http_settings: BTreeMap<String, HttpSetting>,
    pub probes: BTreeMap<String, Probe>,
    pub bindings: Vec<PathBinding>,
    pub issues: Vec<Issue>,
}

/// Associates an Ingress path with the pool and HTTP setting that serve it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathBinding {
    pub ingress: IngressRef,

    /// Unset for an Ingress' own default backend and for rules without a host.
    pub host: Option<String>,

    /// Unset for an Ingress' own default backend.
    pub path: Option<String>,
    pub pool: String,
    pub http_setting: String,

    /// Set when the path is served by the default pool because its backend could not be resolved.
    pub fallback: Option<FallbackReason>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("default {kind} {name} is missing")]
    MissingDefault { kind: &'static str, name: String },

    #[error("default http setting {0} must use Http")]
    DefaultNotHttp(String),

    #[error("{kind} is indexed as {key} but named {name}")]
    NameMismatch {
        kind: &'static str,
        key: String,
        name: String,
    },

    #[error("http setting {setting} references missing probe {probe}")]
    MissingProbe { setting: String, probe: String },

    #[error("http setting {setting} uses {setting_protocol} but probe {probe} uses {probe_protocol}")]
    ProtocolMismatch {
        setting: String,
        setting_protocol: Protocol,
        probe: String,
        probe_protocol: Protocol,
    },

    #[error("http setting {0} carries trusted root certificates without Https")]
    CertificatesWithoutHttps(String),

    #[error("binding for {ingress} references missing {kind} {name}")]
    DanglingBinding {
        ingress: IngressRef,
        kind: &'static str,
        name: String,
    },
}

// === impl BackendConfig ===

impl BackendConfig {
    /// Checks the structural invariants every pass must uphold.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if !self.pools.contains_key(&self.default_pool) {
            return Err(InvariantViolation::MissingDefault {
                kind: "pool",
                name: self.default_pool.clone(),
            });
        }
        match self.http_settings.get(&self.default_http_setting) {
            None => {
                return Err(InvariantViolation::MissingDefault {
                    kind: "http setting",
                    name: self.default_http_setting.clone(),
                })
            }
            Some(setting) if setting.protocol != Protocol::Http => {
                return Err(InvariantViolation::DefaultNotHttp(setting.name.clone()))
            }
            Some(_) => {}
        }

        check_names("pool", &self.pools, |p| &p.name)?;
        check_names("http setting", &self.http_settings, |s| &s.name)?;
        check_names("probe", &self.probes, |p| &p.name)?;

        for setting in self.http_settings.values() {
            let probe =
                self.probes
                    .get(&setting.probe)
                    .ok_or_else(|| InvariantViolation::MissingProbe {
                        setting: setting.name.clone(),
                        probe: setting.probe.clone(),
                    })?;
            if probe.protocol != setting.protocol {
                return Err(InvariantViolation::ProtocolMismatch {
                    setting: setting.name.clone(),
                    setting_protocol: setting.protocol,
                    probe: probe.name.clone(),
                    probe_protocol: probe.protocol,
                });
            }
            if !setting.trusted_root_certificates.is_empty() && !setting.protocol.is_https() {
                return Err(InvariantViolation::CertificatesWithoutHttps(
                    setting.name.clone(),
                ));
            }
        }

        for binding in &self.bindings {
            if !self.pools.contains_key(&binding.pool) {
                return Err(InvariantViolation::DanglingBinding {
                    ingress: binding.ingress.clone(),
                    kind: "pool",
                    name: binding.pool.clone(),
                });
            }
            if !self.http_settings.contains_key(&binding.http_setting) {
                return Err(InvariantViolation::DanglingBinding {
                    ingress: binding.ingress.clone(),
                    kind: "http setting",
                    name: binding.http_setting.clone(),
                });
            }
        }

        Ok(())
    }
}

fn check_names<T>(
    kind: &'static str,
    map: &BTreeMap<String, T>,
    name: impl Fn(&T) -> &String,
) -> Result<(), InvariantViolation> {
    for (key, value) in map {
        if key != name(value) {
            return Err(InvariantViolation::NameMismatch {
                kind,
                key: key.clone(),
                name: name(value).clone(),
            });
        }
    }
    Ok(())
}
