//! Mutable route definition store.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{RouteDefinition, RouteDefinitionLocator};
use crate::error::{GatewayError, GatewayResult};

/// CRUD over stored definitions. Listing goes through
/// [`RouteDefinitionLocator::route_definitions`].
#[async_trait]
pub trait RouteDefinitionRepository: RouteDefinitionLocator {
    /// Insert or replace by id.
    async fn save(&self, definition: RouteDefinition) -> GatewayResult<()>;

    /// Fails with `NotFound` when the id is absent.
    async fn delete(&self, id: &str) -> GatewayResult<()>;

    async fn get(&self, id: &str) -> GatewayResult<RouteDefinition>;
}

/// Process-local repository; contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryRouteDefinitionRepository {
    routes: DashMap<String, RouteDefinition>,
}

impl InMemoryRouteDefinitionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[async_trait]
impl RouteDefinitionLocator for InMemoryRouteDefinitionRepository {
    async fn route_definitions(&self) -> GatewayResult<Vec<RouteDefinition>> {
        let mut definitions: Vec<RouteDefinition> =
            self.routes.iter().map(|entry| entry.value().clone()).collect();
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(definitions)
    }
}

#[async_trait]
impl RouteDefinitionRepository for InMemoryRouteDefinitionRepository {
    async fn save(&self, definition: RouteDefinition) -> GatewayResult<()> {
        definition.validate()?;
        tracing::debug!(route_id = %definition.id, "Saving route definition");
        self.routes.insert(definition.id.clone(), definition);
        Ok(())
    }

    async fn delete(&self, id: &str) -> GatewayResult<()> {
        match self.routes.remove(id) {
            Some(_) => {
                tracing::debug!(route_id = %id, "Deleted route definition");
                Ok(())
            }
            None => Err(GatewayError::NotFound(id.to_string())),
        }
    }

    async fn get(&self, id: &str) -> GatewayResult<RouteDefinition> {
        self.routes
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn definition(id: &str, uri: &str) -> RouteDefinition {
        format!("{}={},Path=/{}", id, uri, id).parse().unwrap()
    }

    #[tokio::test]
    async fn save_is_an_upsert() {
        let repo = InMemoryRouteDefinitionRepository::new();
        repo.save(definition("a", "http://localhost:1")).await.unwrap();
        repo.save(definition("a", "http://localhost:2")).await.unwrap();

        assert_eq!(repo.len(), 1);
        assert_eq!(
            repo.get("a").await.unwrap().uri,
            Url::parse("http://localhost:2").unwrap()
        );
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let repo = InMemoryRouteDefinitionRepository::new();
        repo.save(definition("a", "http://localhost:1")).await.unwrap();

        repo.delete("a").await.unwrap();
        assert!(matches!(repo.delete("a").await, Err(GatewayError::NotFound(_))));
        assert!(matches!(repo.get("a").await, Err(GatewayError::NotFound(_))));
    }

    #[tokio::test]
    async fn save_rejects_invalid_definitions() {
        let repo = InMemoryRouteDefinitionRepository::new();
        let def = RouteDefinition::new("empty", Url::parse("http://localhost").unwrap());
        assert!(repo.save(def).await.is_err());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn lists_by_id() {
        let repo = InMemoryRouteDefinitionRepository::new();
        repo.save(definition("b", "http://localhost:1")).await.unwrap();
        repo.save(definition("a", "http://localhost:1")).await.unwrap();
        let ids: Vec<_> = repo
            .route_definitions()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
