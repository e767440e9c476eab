use crate::ports::is_tcp;
use appgw_controller_core::PortResolutionFailure;
use appgw_controller_k8s_api as k8s;
use std::{collections::BTreeSet, net::IpAddr, num::NonZeroU16};

/// Returns the addresses that serve `port` for `service`.
///
/// When the service has an `Endpoints` object, these are the ready addresses of every subset that
/// exposes the port. Without one, the service's cluster IP is used.
pub(crate) fn live_addresses(
    service: &k8s::Service,
    endpoints: Option<&k8s::Endpoints>,
    port: NonZeroU16,
) -> Result<Vec<IpAddr>, PortResolutionFailure> {
    let addrs = match endpoints {
        Some(endpoints) => subset_addresses(endpoints, port),
        None => cluster_ip(service).into_iter().collect(),
    };
    if addrs.is_empty() {
        return Err(PortResolutionFailure::NoLiveEndpoints { port: port.get() });
    }
    Ok(addrs.into_iter().collect())
}

fn subset_addresses(endpoints: &k8s::Endpoints, port: NonZeroU16) -> BTreeSet<IpAddr> {
    endpoints
        .subsets
        .iter()
        .flatten()
        .filter(|subset| {
            subset.ports.iter().flatten().any(|p| {
                p.port == i32::from(port.get()) && is_tcp(p.protocol.as_deref())
            })
        })
        .flat_map(|subset| subset.addresses.iter().flatten())
        .filter_map(|addr| match addr.ip.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(error) => {
                tracing::debug!(%error, ip = %addr.ip, "Ignoring invalid endpoint address");
                None
            }
        })
        .collect()
}

fn cluster_ip(service: &k8s::Service) -> Option<IpAddr> {
    let ip = service
        .spec
        .as_ref()?
        .cluster_ip
        .as_deref()
        .filter(|ip| !ip.is_empty() && *ip != "None")?;
    match ip.parse::<IpAddr>() {
        Ok(ip) => Some(ip),
        Err(error) => {
            tracing::debug!(%error, ip, "Ignoring invalid cluster IP");
            None
        }
    }
}
