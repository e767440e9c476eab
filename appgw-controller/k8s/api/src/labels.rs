use crate::{Service, ServiceSpec};
use std::collections::BTreeMap;

pub type Map = BTreeMap<String, String>;

/// Selects the pods that back a Service.
///
/// Unlike a general label selector, a Service selector with no labels selects nothing: such
/// Services have their endpoints managed out-of-band.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Selector(Map);

// === Selector ===

impl Selector {
    /// Returns a selector for the service's pods, if the service selects pods.
    pub fn for_service(service: &Service) -> Option<Self> {
        service
            .spec
            .as_ref()
            .and_then(|ServiceSpec { selector, .. }| selector.as_ref())
            .filter(|labels| !labels.is_empty())
            .map(|labels| Self(labels.clone()))
    }

    pub fn from_map(map: Map) -> Self {
        Self(map)
    }

    pub fn matches(&self, labels: &Map) -> bool {
        !self.0.is_empty() && self.0.iter().all(|(k, v)| labels.get(k) == Some(v))
    }
}

impl std::iter::FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Selector {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        Self::from_map(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectMeta;
    use maplit::btreemap;
    use std::iter::FromIterator;

    #[test]
    fn test_matches() {
        fn labels(pairs: &[(&str, &str)]) -> Map {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }

        for (selector, labels, matches, msg) in &[
            (Selector::from_map(Map::default()), labels(&[]), false, "empty selector"),
            (
                Selector::from_iter(Some(("app", "web"))),
                labels(&[("app", "web")]),
                true,
                "exact label match",
            ),
            (
                Selector::from_iter(Some(("app", "web"))),
                labels(&[("app", "web"), ("tier", "frontend")]),
                true,
                "sufficient label match",
            ),
            (
                Selector::from_iter(vec![("app", "web"), ("tier", "frontend")]),
                labels(&[("app", "web")]),
                false,
                "missing label",
            ),
            (
                Selector::from_iter(Some(("app", "web"))),
                labels(&[("app", "api")]),
                false,
                "mismatched value",
            ),
        ] {
            assert_eq!(selector.matches(labels), *matches, "{}", msg);
        }
    }

    #[test]
    fn service_without_selector_selects_nothing() {
        let mut service = Service {
            metadata: ObjectMeta {
                namespace: Some("ns-0".to_string()),
                name: Some("svc-0".to_string()),
                ..Default::default()
            },
            spec: Some(ServiceSpec::default()),
            ..Default::default()
        };
        assert_eq!(Selector::for_service(&service), None);

        service.spec.as_mut().unwrap().selector = Some(btreemap! {
            "app".to_string() => "web".to_string(),
        });
        let selector = Selector::for_service(&service).expect("service must select pods");
        assert!(selector.matches(&btreemap! {
            "app".to_string() => "web".to_string(),
        }));
    }
}
