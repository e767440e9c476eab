//! Application Gateway backend synthesis
//!
//! A synthesis pass reads a point-in-time [`Snapshot`] of cluster state and computes the backend
//! half of a gateway's configuration: address pools, HTTP settings, and health probes.
//!
//! - Each `Ingress` path references a `Service` by name and a port by number or name.
//! - Each `Service` port maps to a target port, which may name a container port on the `Pod`s the
//!   service selects.
//! - The `Endpoints` for a service provide the addresses that back the resolved port.
//!
//! ```text
//! [ Ingress ] -> [ Service ] -> [ Pod ports ] -> [ BackendIdentity ] -> ( pool, setting, probe )
//!                      \-> [ Endpoints ] -----------/
//! ```
//!
//! Each distinct backend identity is computed at most once per pass, regardless of how many paths
//! reference it. Paths that cannot be resolved are served by the default pool; the problem is
//! reported as an [`Issue`](appgw_controller_core::Issue) and the pass continues.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod annotations;
mod defaults;
mod endpoints;
pub mod identity;
mod memo;
pub mod ports;
mod probe;
mod snapshot;
mod synthesize;


pub use self::{
    annotations::{AnnotationReader, AppGwAnnotations, IngressAnnotations},
    identity::{BackendIdentity, NameKind},
    ports::{ResolvedPort, ServicePortRef},
    snapshot::{Snapshot, Store},
    synthesize::{resolve_path, synthesize, PathOutcome, ResolvedBackend, SynthesisConfig},
};
