use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::candidates::{find_candidates, Candidate};
use crate::engine::claims::{ClaimStore, Resolution};
use crate::engine::coordinator::{require_order, StateCoordinator};
use crate::engine::locks::Locks;
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::claim::{Claim, ClaimOutcome, ClaimStatus, ClaimType};
use crate::models::order::{Order, PaymentMethod};
use crate::notify::{DispatchEvent, Envelope, EventKind, Outbox};
use crate::observability::metrics::Metrics;
use crate::store::{Repository, WriteBatch};

const CLAIM_PUSH_TITLE: &str = "Order Claim";
const CLAIM_PUSH_BODY: &str = "A new order has been created";

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub destination: Option<GeoPoint>,
    pub destination_address: Option<String>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub order: Order,
    pub claims: Vec<Claim>,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    Unassigned,
    Dispatched,
    Assigned,
    CancelledDispatch,
}

/// Where an order stands in dispatch, derived from the order and its claims.
pub fn dispatch_state(order: &Order, claims: &[Claim]) -> DispatchState {
    if order.is_assigned() {
        DispatchState::Assigned
    } else if claims.iter().any(Claim::is_pending) {
        DispatchState::Dispatched
    } else if claims.is_empty() {
        DispatchState::Unassigned
    } else {
        DispatchState::CancelledDispatch
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchView {
    pub order_id: Uuid,
    pub state: DispatchState,
    pub driver_id: Option<Uuid>,
    pub pending_claims: usize,
}

/// Entry point for every dispatch action: order fan-out, driver claims, and
/// every approval path.
///
/// All approvals funnel into [`ClaimStore::resolve`] or
/// [`ClaimStore::force_assign`]; notifications go out only after those return.
pub struct Dispatcher {
    repo: Arc<dyn Repository>,
    claims: ClaimStore,
    coordinator: StateCoordinator,
    outbox: Outbox,
    metrics: Metrics,
    radius_km: f64,
}

impl Dispatcher {
    pub fn new(repo: Arc<dyn Repository>, outbox: Outbox, metrics: Metrics, radius_km: f64) -> Self {
        let locks = Locks::new();
        Self {
            claims: ClaimStore::new(repo.clone(), locks.clone()),
            coordinator: StateCoordinator::new(repo.clone(), locks),
            repo,
            outbox,
            metrics,
            radius_km,
        }
    }

    pub fn claims(&self) -> &ClaimStore {
        &self.claims
    }

    pub fn coordinator(&self) -> &StateCoordinator {
        &self.coordinator
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Stores a new order with one system claim per nearby available driver.
    ///
    /// The order and its claims commit together; candidate notifications are
    /// best-effort afterwards. An out-of-range destination is stored as given
    /// and yields no candidates.
    pub async fn create_order(&self, new_order: NewOrder) -> Result<DispatchOutcome, AppError> {
        if let Some(Err(err)) = new_order.destination.as_ref().map(GeoPoint::validate) {
            warn!(error = %err, "order destination unusable; skipping system claims");
        }

        let order = Order::new(
            new_order.customer_id,
            new_order.destination,
            new_order.destination_address,
            new_order.payment_method,
        );

        let drivers = self.repo.list_drivers().await?;
        let candidates = find_candidates(&order, &drivers, self.radius_km);
        let claims: Vec<Claim> = candidates
            .iter()
            .map(|candidate| Claim::new(order.id, candidate.driver.id, ClaimType::System))
            .collect();

        self.repo
            .commit(WriteBatch::new().order(order.clone()).claims(claims.clone()))
            .await?;

        self.metrics
            .claims_created_total
            .with_label_values(&["system"])
            .inc_by(claims.len() as u64);

        if candidates.is_empty() {
            warn!(order_id = %order.id, "no candidate drivers; order awaits manual claim");
        } else {
            info!(
                order_id = %order.id,
                candidates = candidates.len(),
                radius_km = self.radius_km,
                "order dispatched"
            );
        }

        let envelopes = candidates
            .iter()
            .zip(claims.iter())
            .map(|(candidate, claim)| {
                Envelope::to_driver(
                    DispatchEvent::for_claim(EventKind::ClaimCreated, claim),
                    &candidate.driver,
                )
                .with_push(&candidate.driver, CLAIM_PUSH_TITLE, CLAIM_PUSH_BODY)
            })
            .collect();
        self.outbox.publish(envelopes).await;

        Ok(DispatchOutcome {
            order,
            claims,
            candidates,
        })
    }

    /// Driver-initiated claim on an order.
    pub async fn claim_order(&self, order_id: Uuid, driver_id: Uuid) -> Result<Claim, AppError> {
        let claim = self
            .claims
            .create_claim(order_id, driver_id, ClaimType::Driver)
            .await?;

        self.metrics
            .claims_created_total
            .with_label_values(&["driver"])
            .inc();

        self.notify_claim(EventKind::ClaimCreated, &claim).await;
        Ok(claim)
    }

    pub async fn approve(&self, claim_id: Uuid) -> Result<Resolution, AppError> {
        self.resolve(claim_id, ClaimOutcome::Approve).await
    }

    pub async fn reject(&self, claim_id: Uuid) -> Result<Resolution, AppError> {
        self.resolve(claim_id, ClaimOutcome::Reject).await
    }

    /// Driver approving their own claim. Claims held by other drivers read as
    /// not found.
    pub async fn approve_as_driver(
        &self,
        driver_id: Uuid,
        claim_id: Uuid,
    ) -> Result<Resolution, AppError> {
        let claim = self.claims.get(claim_id).await?;
        if claim.driver_id != driver_id {
            return Err(AppError::NotFound(format!(
                "claim {claim_id} not found for driver {driver_id}"
            )));
        }
        self.resolve(claim_id, ClaimOutcome::Approve).await
    }

    /// Admin assignment that bypasses claim offers.
    pub async fn assign_driver(
        &self,
        order_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Resolution, AppError> {
        let start = Instant::now();
        let result = self.claims.force_assign(order_id, driver_id).await;
        self.record_outcome(&result, "forced", start);

        let resolution = result?;
        self.publish_resolution(&resolution).await;
        Ok(resolution)
    }

    pub async fn dispatch_view(&self, order_id: Uuid) -> Result<DispatchView, AppError> {
        let order = require_order(self.repo.as_ref(), order_id).await?;
        let claims = self.repo.claims_for_order(order_id).await?;

        Ok(DispatchView {
            order_id,
            state: dispatch_state(&order, &claims),
            driver_id: order.driver_id,
            pending_claims: claims
                .iter()
                .filter(|claim| claim.status == ClaimStatus::Pending)
                .count(),
        })
    }

    async fn resolve(&self, claim_id: Uuid, outcome: ClaimOutcome) -> Result<Resolution, AppError> {
        let start = Instant::now();
        let result = self.claims.resolve(claim_id, outcome).await;
        let label = match outcome {
            ClaimOutcome::Approve => "approved",
            ClaimOutcome::Reject => "rejected",
        };
        self.record_outcome(&result, label, start);

        let resolution = result?;
        self.publish_resolution(&resolution).await;
        Ok(resolution)
    }

    fn record_outcome(&self, result: &Result<Resolution, AppError>, success: &str, start: Instant) {
        let outcome = match result {
            Ok(_) => success,
            Err(AppError::AlreadyResolved(_)) => "already_resolved",
            Err(AppError::TransactionFailure(_)) => "transaction_failure",
            Err(_) => "error",
        };
        self.metrics
            .record_resolution(outcome, start.elapsed().as_secs_f64());

        if let Err(err) = result {
            warn!(outcome, error = %err, "resolution failed");
        }
    }

    async fn publish_resolution(&self, resolution: &Resolution) {
        let mut envelopes = Vec::new();

        if let Some(assignment) = resolution.assignment.as_ref() {
            if let Some(claim) = resolution.claim.as_ref() {
                envelopes.push(Envelope::to_driver(
                    DispatchEvent::for_claim(EventKind::ClaimApproved, claim),
                    &assignment.driver,
                ));
            }
            envelopes.push(Envelope::to_driver(
                DispatchEvent::order_assigned(
                    assignment.order.id,
                    assignment.driver.id,
                    assignment.claim_id,
                ),
                &assignment.driver,
            ));
            self.outbox.publish(envelopes).await;
            return;
        }

        if let Some(claim) = resolution.claim.as_ref() {
            self.notify_claim(EventKind::ClaimRejected, claim).await;
        }
    }

    /// Notifies the claim's driver; a driver that cannot be read is skipped.
    async fn notify_claim(&self, kind: EventKind, claim: &Claim) {
        match self.repo.get_driver(claim.driver_id).await {
            Ok(Some(driver)) => {
                let envelope =
                    Envelope::to_driver(DispatchEvent::for_claim(kind, claim), &driver);
                self.outbox.publish(vec![envelope]).await;
            }
            Ok(None) => warn!(driver_id = %claim.driver_id, "claim driver vanished; skipping notification"),
            Err(err) => warn!(driver_id = %claim.driver_id, error = %err, "driver lookup failed; skipping notification"),
        }
    }
}
