use appgw_controller_k8s_api::{self as k8s, Resource, ResourceExt, Selector};
use std::{collections::BTreeMap, ops::Bound};

/// A point-in-time view of the cluster objects read by a synthesis pass.
///
/// The snapshot is maintained by applying watch events (see the
/// [`IndexNamespacedResource`](kubert::index::IndexNamespacedResource) impls) and is only ever
/// read during a pass, so a driver can clone it to hand a consistent view to each pass.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub ingresses: Store<k8s::Ingress>,
    pub services: Store<k8s::Service>,
    pub endpoints: Store<k8s::Endpoints>,
    pub pods: Store<k8s::Pod>,
}

/// Holds namespaced resources of a single kind, ordered by namespace and name.
#[derive(Clone, Debug)]
pub struct Store<T> {
    by_name: BTreeMap<(String, String), T>,
}

// === impl Store ===

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self {
            by_name: BTreeMap::new(),
        }
    }
}

impl<T: Resource> Store<T> {
    pub fn get(&self, namespace: &str, name: &str) -> Option<&T> {
        self.by_name.get(&(namespace.to_string(), name.to_string()))
    }

    /// Iterates over the resources in `namespace` whose labels match `selector`.
    pub fn select<'s: 'q, 'q>(
        &'s self,
        namespace: &'q str,
        selector: &'q Selector,
    ) -> impl Iterator<Item = &'s T> + 'q {
        self.in_namespace(namespace)
            .filter(move |resource| selector.matches(resource.labels()))
    }

    /// Iterates over all resources, ordered by namespace and name.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    fn in_namespace<'s: 'q, 'q>(
        &'s self,
        namespace: &'q str,
    ) -> impl Iterator<Item = &'s T> + 'q {
        let start = (namespace.to_string(), String::new());
        self.by_name
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(move |((ns, _), _)| ns == namespace)
            .map(|(_, resource)| resource)
    }

    fn insert(&mut self, resource: T) {
        match (resource.namespace(), resource.meta().name.clone()) {
            (Some(ns), Some(name)) => {
                self.by_name.insert((ns, name), resource);
            }
            _ => tracing::debug!("Ignoring resource without a namespace and name"),
        }
    }

    fn remove(&mut self, namespace: String, name: String) {
        if self.by_name.remove(&(namespace, name)).is_none() {
            tracing::trace!("Deleted resource was not indexed");
        }
    }
}

// === impl Snapshot ===

macro_rules! index_store {
    ($field:ident, $kind:ty) => {
        impl kubert::index::IndexNamespacedResource<$kind> for Snapshot {
            fn apply(&mut self, resource: $kind) {
                self.$field.insert(resource);
            }

            fn delete(&mut self, namespace: String, name: String) {
                self.$field.remove(namespace, name);
            }
        }
    };
}

index_store!(ingresses, k8s::Ingress);
index_store!(services, k8s::Service);
index_store!(endpoints, k8s::Endpoints);
index_store!(pods, k8s::Pod);

#[cfg(test)]
mod tests {
    use super::*;
    use kubert::index::IndexNamespacedResource;
    use maplit::{btreemap, convert_args};

    fn mk_pod(ns: &str, name: &str, app: &str) -> k8s::Pod {
        k8s::Pod {
            metadata: k8s::ObjectMeta {
                namespace: Some(ns.to_string()),
                name: Some(name.to_string()),
                labels: Some(convert_args!(btreemap!("app" => app))),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn select_is_scoped_to_namespace() {
        let mut snapshot = Snapshot::default();
        snapshot.apply(mk_pod("ns-0", "pod-b", "web"));
        snapshot.apply(mk_pod("ns-0", "pod-a", "web"));
        snapshot.apply(mk_pod("ns-0", "pod-c", "api"));
        snapshot.apply(mk_pod("ns-1", "pod-d", "web"));
        snapshot.apply(mk_pod("ns-00", "pod-e", "web"));

        let selector = Selector::from_map(convert_args!(btreemap!("app" => "web")));
        let names = snapshot
            .pods
            .select("ns-0", &selector)
            .map(|p| p.name_unchecked())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["pod-a", "pod-b"]);
    }

    #[test]
    fn apply_and_delete() {
        let mut snapshot = Snapshot::default();
        snapshot.apply(mk_pod("ns-0", "pod-0", "web"));
        snapshot.apply(mk_pod("ns-0", "pod-0", "api"));
        assert_eq!(snapshot.pods.len(), 1);
        assert_eq!(
            snapshot.pods.get("ns-0", "pod-0").unwrap().labels()["app"],
            "api"
        );

        IndexNamespacedResource::<k8s::Pod>::delete(
            &mut snapshot,
            "ns-0".to_string(),
            "pod-0".to_string(),
        );
        assert!(snapshot.pods.is_empty());
    }

    #[test]
    fn ignores_resources_without_namespace() {
        let mut snapshot = Snapshot::default();
        let mut pod = mk_pod("ns-0", "pod-0", "web");
        pod.metadata.namespace = None;
        snapshot.apply(pod);
        assert!(snapshot.pods.is_empty());
    }
}
