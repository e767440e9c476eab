#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod backend;
mod config;
pub mod issue;

pub use self::{
    backend::{
        BackendPool, ConnectionDraining, HttpSetting, Probe, Protocol, TrustedRootCertificateRef,
    },
    config::{BackendConfig, InvariantViolation, PathBinding},
    issue::{FallbackReason, IngressRef, Issue, PortResolutionFailure},
};

/// The port used by the default backend and by backends whose port could not be resolved.
pub const DEFAULT_BACKEND_PORT: u16 = 80;
