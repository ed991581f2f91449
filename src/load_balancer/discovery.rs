//! Static, config-backed discovery client.

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use indexmap::IndexMap;

use super::{DiscoveryClient, ServiceInstance};

type Catalog = IndexMap<String, Vec<ServiceInstance>>;

/// Serves the `[discovery.services]` table. Replaced wholesale on reload.
#[derive(Debug, Default)]
pub struct StaticDiscoveryClient {
    catalog: ArcSwap<Catalog>,
}

impl StaticDiscoveryClient {
    /// Build from `service → ["host:port", ...]`.
    pub fn from_config(services: &IndexMap<String, Vec<String>>) -> Result<Self, String> {
        Ok(Self {
            catalog: ArcSwap::from_pointee(parse_catalog(services)?),
        })
    }

    pub fn replace(&self, services: &IndexMap<String, Vec<String>>) -> Result<(), String> {
        self.catalog.store(Arc::new(parse_catalog(services)?));
        Ok(())
    }
}

fn parse_catalog(services: &IndexMap<String, Vec<String>>) -> Result<Catalog, String> {
    services
        .iter()
        .map(|(service, addrs)| {
            let instances = addrs
                .iter()
                .map(|a| {
                    a.parse::<SocketAddr>()
                        .map(|addr| ServiceInstance {
                            service_id: service.clone(),
                            addr,
                        })
                        .map_err(|_| format!("invalid instance address '{}' for service '{}'", a, service))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((service.clone(), instances))
        })
        .collect()
}

#[async_trait]
impl DiscoveryClient for StaticDiscoveryClient {
    async fn services(&self) -> Vec<String> {
        self.catalog.load().keys().cloned().collect()
    }

    async fn instances(&self, service_id: &str) -> Vec<ServiceInstance> {
        self.catalog
            .load()
            .get(service_id)
            .cloned()
            .unwrap_or_default()
    }
}
