use crate::synthesize::SynthesisConfig;
use appgw_controller_core::{BackendPool, HttpSetting, Probe, Protocol, DEFAULT_BACKEND_PORT};
use std::num::NonZeroU16;

/// Serves paths whose backends cannot be resolved. It has no addresses.
pub(crate) fn pool(config: &SynthesisConfig) -> BackendPool {
    BackendPool {
        name: config.default_address_pool.clone(),
        addresses: Vec::new(),
    }
}

pub(crate) fn http_setting(config: &SynthesisConfig) -> HttpSetting {
    HttpSetting::new(
        config.default_http_settings.clone(),
        Protocol::Http,
        backend_port(),
        probe_name(Protocol::Http),
    )
}

pub(crate) fn probe() -> Probe {
    let mut probe = Probe::new(probe_name(Protocol::Http), Protocol::Http);
    probe.host = Some("localhost".to_string());
    probe
}

pub(crate) fn backend_port() -> NonZeroU16 {
    NonZeroU16::new(DEFAULT_BACKEND_PORT).unwrap_or(NonZeroU16::MIN)
}

fn probe_name(protocol: Protocol) -> String {
    format!("defaultprobe-{protocol}")
}
