//! Service discovery and load balancing for `lb://` targets.
//!
//! # Data Flow
//! ```text
//! lb://users/path
//!     → LoadBalancerClientFilter
//!     → LoadBalancerClient::choose("users")
//!         → discovery.rs (instances of "users")
//!         → round_robin.rs (rotate through instances, per service)
//!     → http://<host>:<port>/path
//! ```
//!
//! # Design Decisions
//! - Discovery is a trait; the bundled client serves a static list from config
//! - One rotation counter per service
//! - No instance available is a request failure (503), not a panic

pub mod discovery;
pub mod round_robin;

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

pub use discovery::StaticDiscoveryClient;
pub use round_robin::RoundRobin;

/// One addressable instance of a logical service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub service_id: String,
    pub addr: SocketAddr,
}

#[async_trait]
pub trait DiscoveryClient: Send + Sync + fmt::Debug {
    async fn services(&self) -> Vec<String>;

    async fn instances(&self, service_id: &str) -> Vec<ServiceInstance>;
}

/// Strategy picking one instance out of a list.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    fn next_instance(&self, instances: &[ServiceInstance]) -> Option<ServiceInstance>;
}

/// Resolves a service name to one concrete instance.
#[derive(Debug)]
pub struct LoadBalancerClient {
    discovery: Arc<dyn DiscoveryClient>,
    balancers: DashMap<String, Arc<RoundRobin>>,
}

impl LoadBalancerClient {
    pub fn new(discovery: Arc<dyn DiscoveryClient>) -> Self {
        Self {
            discovery,
            balancers: DashMap::new(),
        }
    }

    pub async fn choose(&self, service_id: &str) -> Option<ServiceInstance> {
        let instances = self.discovery.instances(service_id).await;
        if instances.is_empty() {
            self.balancers.remove(service_id);
            return None;
        }
        let balancer = self
            .balancers
            .entry(service_id.to_string())
            .or_default()
            .clone();
        balancer.next_instance(&instances)
    }

    /// Drop rotation state of services discovery no longer reports.
    pub async fn prune(&self) -> usize {
        let services = self.discovery.services().await;
        let before = self.balancers.len();
        self.balancers.retain(|service, _| services.contains(service));
        before - self.balancers.len()
    }

    pub fn tracked_services(&self) -> usize {
        self.balancers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[tokio::test]
    async fn rotates_per_service() {
        let mut services = IndexMap::new();
        services.insert(
            "users".to_string(),
            vec!["127.0.0.1:9001".to_string(), "127.0.0.1:9002".to_string()],
        );
        let discovery = Arc::new(StaticDiscoveryClient::from_config(&services).unwrap());
        let client = LoadBalancerClient::new(discovery);

        let first = client.choose("users").await.unwrap();
        let second = client.choose("users").await.unwrap();
        let third = client.choose("users").await.unwrap();
        assert_ne!(first.addr, second.addr);
        assert_eq!(first.addr, third.addr);
        assert!(client.choose("orders").await.is_none());
        assert_eq!(client.tracked_services(), 1);
    }

    #[tokio::test]
    async fn forgets_services_that_disappear() {
        let mut services = IndexMap::new();
        services.insert("users".to_string(), vec!["127.0.0.1:9001".to_string()]);
        services.insert("orders".to_string(), vec!["127.0.0.1:9002".to_string()]);
        let discovery = Arc::new(StaticDiscoveryClient::from_config(&services).unwrap());
        let client = LoadBalancerClient::new(discovery.clone());

        client.choose("users").await.unwrap();
        client.choose("orders").await.unwrap();
        for i in 0..100 {
            assert!(client.choose(&format!("ghost-{}", i)).await.is_none());
        }
        assert_eq!(client.tracked_services(), 2);

        services.shift_remove("orders");
        discovery.replace(&services).unwrap();
        assert_eq!(client.prune().await, 1);
        assert_eq!(client.tracked_services(), 1);
        assert!(client.choose("orders").await.is_none());
    }
}
