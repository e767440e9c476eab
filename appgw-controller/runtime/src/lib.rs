#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use appgw_controller_core as core;
pub use appgw_controller_k8s_api as k8s;
pub use appgw_controller_k8s_index as index;

mod args;
pub mod manifest;

pub use self::args::Args;
