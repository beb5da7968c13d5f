use std::collections::HashMap;
use std::sync::Arc;

use sqlx::postgres::PgPool;
use tokio::sync::RwLock;

use crate::catalog::ProductKey;
use crate::errors::DomainResult;

use super::operator::Operator;
use super::service::Service;
use super::user::TgUser;

/// Identity maps over the entity handles. Two handlers asking for the same
/// row get the same `Arc`, so a handle is created (and logged) once per
/// process lifetime. Handles hold no row data, only the id and the pool,
/// so the cache never serves stale values.
pub struct EntityCache {
    pool: PgPool,
    users: RwLock<HashMap<i64, Arc<TgUser>>>,
    operators: RwLock<HashMap<i64, Arc<Operator>>>,
    services: RwLock<HashMap<i64, Arc<Service>>>,
}

impl EntityCache {
    pub fn new(pool: PgPool) -> EntityCache {
        EntityCache {
            pool,
            users: RwLock::new(HashMap::new()),
            operators: RwLock::new(HashMap::new()),
            services: RwLock::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn user(&self, tg_id: i64) -> Arc<TgUser> {
        if let Some(user) = self.users.read().await.get(&tg_id) {
            return Arc::clone(user);
        }
        let mut users = self.users.write().await;
        Arc::clone(
            users
                .entry(tg_id)
                .or_insert_with(|| Arc::new(TgUser::attach(self.pool.clone(), tg_id))),
        )
    }

    pub async fn operator(&self, operator_id: i64) -> Arc<Operator> {
        if let Some(operator) = self.operators.read().await.get(&operator_id) {
            return Arc::clone(operator);
        }
        let mut operators = self.operators.write().await;
        Arc::clone(
            operators
                .entry(operator_id)
                .or_insert_with(|| Arc::new(Operator::attach(self.pool.clone(), operator_id))),
        )
    }

    /// Attaches a handle to a stored service, resolving its product by
    /// probing the subtype tables.
    pub async fn service(&self, service_id: i64) -> DomainResult<Arc<Service>> {
        if let Some(service) = self.services.read().await.get(&service_id) {
            return Ok(Arc::clone(service));
        }
        let kind = Service::resolve_kind(&self.pool, service_id).await?;
        let mut services = self.services.write().await;
        Ok(Arc::clone(services.entry(service_id).or_insert_with(|| {
            Arc::new(Service::attach(self.pool.clone(), service_id, kind))
        })))
    }

    /// Same as [`EntityCache::service`] but skips the subtype probe when the
    /// caller already knows the product.
    pub async fn service_of_kind(&self, service_id: i64, kind: ProductKey) -> Arc<Service> {
        if let Some(service) = self.services.read().await.get(&service_id) {
            return Arc::clone(service);
        }
        let mut services = self.services.write().await;
        Arc::clone(services.entry(service_id).or_insert_with(|| {
            Arc::new(Service::attach(self.pool.clone(), service_id, kind))
        }))
    }

    /// Drops a handle after its operator row is deleted.
    pub async fn forget_operator(&self, operator_id: i64) {
        self.operators.write().await.remove(&operator_id);
    }
}
