//! Builds a [`Snapshot`] from Kubernetes manifests.
//!
//! Input is a stream of YAML (or JSON) documents as produced by `kubectl get -o yaml`: each
//! document is either a single resource or a `List` of resources. Ingress, Service, Endpoints and
//! Pod resources are indexed; every other kind is skipped.

use crate::{
    index::Snapshot,
    k8s::{self, Resource},
};
use anyhow::{Context, Result};
use kubert::index::IndexNamespacedResource;
use serde::{de::DeserializeOwned, Deserialize};
use serde_yaml::Value;
use std::{io::Read, path::Path};

/// Namespace assigned to resources whose manifests omit one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Reads manifests from `path`, or from stdin when `path` is `-`.
pub fn load(path: &Path) -> Result<Snapshot> {
    let input = if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("failed to read manifests from stdin")?;
        input
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };
    parse(&input).with_context(|| format!("failed to load manifests from {}", path.display()))
}

pub fn parse(input: &str) -> Result<Snapshot> {
    let mut snapshot = Snapshot::default();
    for (i, document) in serde_yaml::Deserializer::from_str(input).enumerate() {
        let value =
            Value::deserialize(document).with_context(|| format!("document {i} is malformed"))?;
        index_value(&mut snapshot, value).with_context(|| format!("document {i} is invalid"))?;
    }
    Ok(snapshot)
}

fn index_value(snapshot: &mut Snapshot, value: Value) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    let kind = value
        .get("kind")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    match kind.as_str() {
        "List" => {
            let items = match value.get("items") {
                Some(Value::Sequence(items)) => items.clone(),
                _ => Vec::new(),
            };
            for (i, item) in items.into_iter().enumerate() {
                index_value(snapshot, item).with_context(|| format!("list item {i} is invalid"))?;
            }
            Ok(())
        }
        "Ingress" => index::<k8s::Ingress>(snapshot, value),
        "Service" => index::<k8s::Service>(snapshot, value),
        "Endpoints" => index::<k8s::Endpoints>(snapshot, value),
        "Pod" => index::<k8s::Pod>(snapshot, value),
        _ => {
            tracing::debug!(%kind, "Skipping manifest");
            Ok(())
        }
    }
}

fn index<T>(snapshot: &mut Snapshot, value: Value) -> Result<()>
where
    T: Resource<DynamicType = ()> + DeserializeOwned,
    Snapshot: IndexNamespacedResource<T>,
{
    let api_version = T::api_version(&());
    if value.get("apiVersion").and_then(Value::as_str) != Some(&*api_version) {
        tracing::debug!(
            kind = %T::kind(&()),
            api_version = ?value.get("apiVersion"),
            "Skipping unsupported API version"
        );
        return Ok(());
    }

    let mut resource = serde_yaml::from_value::<T>(value)
        .with_context(|| format!("invalid {} manifest", T::kind(&())))?;
    resource
        .meta_mut()
        .namespace
        .get_or_insert_with(|| DEFAULT_NAMESPACE.to_string());
    tracing::trace!(
        kind = %T::kind(&()),
        ns = ?resource.meta().namespace,
        name = ?resource.meta().name,
        "Indexing"
    );
    snapshot.apply(resource);
    Ok(())
}
