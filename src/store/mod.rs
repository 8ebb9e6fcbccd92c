pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::claim::Claim;
use crate::models::driver::Driver;
use crate::models::order::Order;

pub use memory::MemoryRepository;

/// Records written together by one [`Repository::commit`].
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    pub orders: Vec<Order>,
    pub drivers: Vec<Driver>,
    pub claims: Vec<Claim>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn driver(mut self, driver: Driver) -> Self {
        self.drivers.push(driver);
        self
    }

    pub fn claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    pub fn claims(mut self, claims: impl IntoIterator<Item = Claim>) -> Self {
        self.claims.extend(claims);
        self
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub orders: usize,
    pub drivers: usize,
    pub claims: usize,
}

/// Durable record storage for orders, drivers, and claims.
///
/// Reads must observe every write that has committed. `commit` applies the
/// whole batch or nothing and reports failure as
/// [`AppError::TransactionFailure`].
#[async_trait]
pub trait Repository: Send + Sync {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError>;
    async fn list_orders(&self) -> Result<Vec<Order>, AppError>;

    async fn get_driver(&self, id: Uuid) -> Result<Option<Driver>, AppError>;
    async fn list_drivers(&self) -> Result<Vec<Driver>, AppError>;

    async fn get_claim(&self, id: Uuid) -> Result<Option<Claim>, AppError>;
    async fn claims_for_order(&self, order_id: Uuid) -> Result<Vec<Claim>, AppError>;
    async fn claims_for_driver(&self, driver_id: Uuid) -> Result<Vec<Claim>, AppError>;
    async fn list_claims(&self) -> Result<Vec<Claim>, AppError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), AppError>;

    async fn stats(&self) -> Result<StoreStats, AppError>;
}
