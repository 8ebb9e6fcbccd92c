use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::locks::Locks;
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::driver::{Driver, DriverStatus};
use crate::models::order::{DeliveryStatus, Order, PaymentMethod, PaymentOutcome, PaymentStatus};
use crate::store::{Repository, WriteBatch};

/// Hands `order` to `driver`: order shipped with the driver set, driver busy.
///
/// Only mutates the staged copies; the caller commits them in one batch.
pub fn apply_assignment(order: &mut Order, driver: &mut Driver) -> Result<(), AppError> {
    if let Some(existing) = order.driver_id {
        return Err(AppError::AlreadyResolved(format!(
            "order {} is already assigned to driver {}",
            order.id, existing
        )));
    }

    order.transition_delivery(DeliveryStatus::Shipped)?;
    order.driver_id = Some(driver.id);
    driver.set_status(DriverStatus::Busy);
    Ok(())
}

/// Moves a shipped order to `delivered` or `completed`.
///
/// Cash orders are settled on the first completion step, which also frees the
/// driver. `driver` must be the order's assigned driver when given.
pub fn apply_delivery_completion(
    order: &mut Order,
    driver: Option<&mut Driver>,
    next: DeliveryStatus,
) -> Result<(), AppError> {
    if !matches!(next, DeliveryStatus::Delivered | DeliveryStatus::Completed) {
        return Err(AppError::BadRequest(format!(
            "{next:?} is not a completion status"
        )));
    }

    let leaving_shipped = order.delivery_status == DeliveryStatus::Shipped;
    order.transition_delivery(next)?;

    if leaving_shipped && order.payment_method == PaymentMethod::Cash {
        order.payment_status = PaymentStatus::Paid;
        if let Some(driver) = driver {
            driver.set_status(DriverStatus::Available);
        }
    }
    Ok(())
}

pub fn apply_payment(order: &mut Order, outcome: PaymentOutcome) -> Result<(), AppError> {
    let next = match outcome {
        PaymentOutcome::Succeeded => PaymentStatus::Paid,
        PaymentOutcome::Failed if order.payment_status == PaymentStatus::Paid => {
            return Err(AppError::InvalidTransition(format!(
                "order {} is already paid",
                order.id
            )));
        }
        PaymentOutcome::Failed => PaymentStatus::Failed,
    };

    order.payment_status = next;
    order.updated_at = Utc::now();
    Ok(())
}

/// Order and driver writes that happen outside claim resolution.
///
/// Shares its lock tables with the claim store so completion, payment, and
/// approval on one order never interleave.
#[derive(Clone)]
pub struct StateCoordinator {
    repo: Arc<dyn Repository>,
    locks: Locks,
}

impl StateCoordinator {
    pub fn new(repo: Arc<dyn Repository>, locks: Locks) -> Self {
        Self { repo, locks }
    }

    pub async fn complete_delivery(
        &self,
        order_id: Uuid,
        next: DeliveryStatus,
    ) -> Result<Order, AppError> {
        let _order_guard = self.locks.orders.acquire(order_id).await;
        let mut order = require_order(self.repo.as_ref(), order_id).await?;

        let releases_driver = order.delivery_status == DeliveryStatus::Shipped
            && order.payment_method == PaymentMethod::Cash;
        let driver_id = order.driver_id.filter(|_| releases_driver);

        let _driver_guard = match driver_id {
            Some(id) => Some(self.locks.drivers.acquire(id).await),
            None => None,
        };
        let mut driver = match driver_id {
            Some(id) => Some(require_driver(self.repo.as_ref(), id).await?),
            None => None,
        };

        apply_delivery_completion(&mut order, driver.as_mut(), next)?;

        let mut batch = WriteBatch::new().order(order.clone());
        if let Some(driver) = driver {
            batch = batch.driver(driver);
        }
        self.repo.commit(batch).await?;

        info!(
            order_id = %order.id,
            delivery_status = ?order.delivery_status,
            payment_status = ?order.payment_status,
            "delivery completed"
        );
        Ok(order)
    }

    pub async fn record_payment(
        &self,
        order_id: Uuid,
        outcome: PaymentOutcome,
    ) -> Result<Order, AppError> {
        let _order_guard = self.locks.orders.acquire(order_id).await;
        let mut order = require_order(self.repo.as_ref(), order_id).await?;

        apply_payment(&mut order, outcome)?;
        self.repo.commit(WriteBatch::new().order(order.clone())).await?;

        info!(order_id = %order.id, outcome = ?outcome, "payment recorded");
        Ok(order)
    }

    /// Replaces whichever of the coordinates and the address are given;
    /// omitted fields keep their stored values.
    pub async fn update_destination(
        &self,
        order_id: Uuid,
        destination: Option<GeoPoint>,
        address: Option<String>,
    ) -> Result<Order, AppError> {
        if destination.is_none() && address.is_none() {
            return Err(AppError::BadRequest(
                "destination or destination_address is required".to_string(),
            ));
        }
        if let Some(point) = destination.as_ref() {
            point.validate()?;
        }

        let _order_guard = self.locks.orders.acquire(order_id).await;
        let mut order = require_order(self.repo.as_ref(), order_id).await?;

        if destination.is_some() {
            order.destination = destination;
        }
        if address.is_some() {
            order.destination_address = address;
        }
        order.updated_at = Utc::now();
        self.repo.commit(WriteBatch::new().order(order.clone())).await?;
        Ok(order)
    }

    pub async fn register_driver(&self, driver: Driver) -> Result<Driver, AppError> {
        if let Some(location) = driver.location.as_ref() {
            location.validate()?;
        }
        self.repo.commit(WriteBatch::new().driver(driver.clone())).await?;
        info!(driver_id = %driver.id, "driver registered");
        Ok(driver)
    }

    pub async fn set_driver_status(
        &self,
        driver_id: Uuid,
        status: DriverStatus,
    ) -> Result<Driver, AppError> {
        self.update_driver(driver_id, |driver| {
            driver.set_status(status);
            Ok(())
        })
        .await
    }

    pub async fn set_driver_location(
        &self,
        driver_id: Uuid,
        location: GeoPoint,
    ) -> Result<Driver, AppError> {
        location.validate()?;
        self.update_driver(driver_id, |driver| {
            driver.location = Some(location);
            driver.updated_at = Utc::now();
            Ok(())
        })
        .await
    }

    async fn update_driver<F>(&self, driver_id: Uuid, update: F) -> Result<Driver, AppError>
    where
        F: FnOnce(&mut Driver) -> Result<(), AppError> + Send,
    {
        let _driver_guard = self.locks.drivers.acquire(driver_id).await;
        let mut driver = require_driver(self.repo.as_ref(), driver_id).await?;
        update(&mut driver)?;
        self.repo.commit(WriteBatch::new().driver(driver.clone())).await?;
        Ok(driver)
    }
}

pub(crate) async fn require_order(repo: &dyn Repository, order_id: Uuid) -> Result<Order, AppError> {
    repo.get_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))
}

pub(crate) async fn require_driver(
    repo: &dyn Repository,
    driver_id: Uuid,
) -> Result<Driver, AppError> {
    repo.get_driver(driver_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))
}
