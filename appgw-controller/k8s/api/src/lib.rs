#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod labels;

pub use self::labels::Selector;
pub use k8s_openapi::{
    api::{
        self,
        core::v1::{
            Container, ContainerPort, EndpointAddress, EndpointPort, EndpointSubset, Endpoints,
            HTTPGetAction, Pod, PodSpec, Probe, Service, ServicePort, ServiceSpec,
        },
        networking::v1::{
            HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
            IngressServiceBackend, IngressSpec, ServiceBackendPort,
        },
    },
    apimachinery::pkg::{apis::meta::v1::ObjectMeta, util::intstr::IntOrString},
};
pub use kube::{Resource, ResourceExt};
