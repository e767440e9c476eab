use crate::{
    core::BackendConfig,
    index::{self, AppGwAnnotations, SynthesisConfig},
    manifest,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::{io::Write, path::PathBuf};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[clap(
    name = "appgw-controller",
    about = "Synthesizes Application Gateway backends from Ingress resources"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "appgw=info,warn",
        env = "APPGW_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    /// YAML or JSON manifests holding the Ingress, Service, Endpoints, and Pod resources to
    /// synthesize from. Use `-` to read from stdin.
    #[clap(long)]
    snapshot: PathBuf,

    /// Name of the gateway's default backend address pool.
    #[clap(long, default_value = "defaultaddresspool")]
    default_address_pool_id: String,

    /// Name of the gateway's default backend HTTP settings.
    #[clap(long, default_value = "defaulthttpsetting")]
    default_http_settings_id: String,

    /// Pretty-prints the JSON output.
    #[clap(long)]
    pretty: bool,
}

impl Args {
    #[inline]
    pub fn parse_and_run() -> Result<()> {
        Self::parse().run()
    }

    pub fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            snapshot,
            default_address_pool_id,
            default_http_settings_id,
            pretty,
        } = self;

        log_format
            .try_init(log_level)
            .context("failed to initialize logging")?;

        let snapshot = manifest::load(&snapshot)?;
        info!(
            ingresses = snapshot.ingresses.len(),
            services = snapshot.services.len(),
            endpoints = snapshot.endpoints.len(),
            pods = snapshot.pods.len(),
            "Loaded snapshot"
        );

        let config = SynthesisConfig {
            default_address_pool: default_address_pool_id,
            default_http_settings: default_http_settings_id,
        };
        let backend = index::synthesize(&snapshot, &AppGwAnnotations, &config);
        backend
            .validate()
            .context("synthesized an invalid backend configuration")?;

        for issue in &backend.issues {
            warn!(ingress = %issue.ingress(), "{issue}");
        }
        info!(
            pools = backend.pools.len(),
            http_settings = backend.http_settings.len(),
            probes = backend.probes.len(),
            bindings = backend.bindings.len(),
            issues = backend.issues.len(),
            "Synthesized backends"
        );

        write_config(&mut std::io::stdout().lock(), &backend, pretty)
    }
}

fn write_config(out: &mut impl Write, backend: &BackendConfig, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, backend)
    } else {
        serde_json::to_writer(&mut *out, backend)
    }
    .context("failed to encode backend configuration")?;
    writeln!(out).context("failed to write backend configuration")?;
    out.flush().context("failed to write backend configuration")
}
