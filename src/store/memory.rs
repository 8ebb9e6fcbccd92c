use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::claim::Claim;
use crate::models::driver::Driver;
use crate::models::order::Order;
use crate::store::{Repository, StoreStats, WriteBatch};

#[derive(Default)]
struct Tables {
    orders: HashMap<Uuid, Order>,
    drivers: HashMap<Uuid, Driver>,
    claims: HashMap<Uuid, Claim>,
}

/// In-process repository.
///
/// All three tables sit behind one lock so a committed batch becomes visible
/// to readers in a single step.
#[derive(Default, Clone)]
pub struct MemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_creation(mut claims: Vec<Claim>) -> Vec<Claim> {
    claims.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    claims
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, AppError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables.orders.values().cloned().collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(orders)
    }

    async fn get_driver(&self, id: Uuid) -> Result<Option<Driver>, AppError> {
        Ok(self.tables.read().await.drivers.get(&id).cloned())
    }

    async fn list_drivers(&self) -> Result<Vec<Driver>, AppError> {
        let tables = self.tables.read().await;
        let mut drivers: Vec<Driver> = tables.drivers.values().cloned().collect();
        drivers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(drivers)
    }

    async fn get_claim(&self, id: Uuid) -> Result<Option<Claim>, AppError> {
        Ok(self.tables.read().await.claims.get(&id).cloned())
    }

    async fn claims_for_order(&self, order_id: Uuid) -> Result<Vec<Claim>, AppError> {
        let tables = self.tables.read().await;
        let claims = tables
            .claims
            .values()
            .filter(|claim| claim.order_id == order_id)
            .cloned()
            .collect();
        Ok(by_creation(claims))
    }

    async fn claims_for_driver(&self, driver_id: Uuid) -> Result<Vec<Claim>, AppError> {
        let tables = self.tables.read().await;
        let claims = tables
            .claims
            .values()
            .filter(|claim| claim.driver_id == driver_id)
            .cloned()
            .collect();
        Ok(by_creation(claims))
    }

    async fn list_claims(&self) -> Result<Vec<Claim>, AppError> {
        let tables = self.tables.read().await;
        Ok(by_creation(tables.claims.values().cloned().collect()))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        for order in batch.orders {
            tables.orders.insert(order.id, order);
        }
        for driver in batch.drivers {
            tables.drivers.insert(driver.id, driver);
        }
        for claim in batch.claims {
            tables.claims.insert(claim.id, claim);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, AppError> {
        let tables = self.tables.read().await;
        Ok(StoreStats {
            orders: tables.orders.len(),
            drivers: tables.drivers.len(),
            claims: tables.claims.len(),
        })
    }
}
