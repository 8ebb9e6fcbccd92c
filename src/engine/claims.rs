use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::coordinator::{apply_assignment, require_driver, require_order};
use crate::engine::locks::Locks;
use crate::error::AppError;
use crate::models::assignment::{Assignment, AssignmentSource};
use crate::models::claim::{Claim, ClaimOutcome, ClaimStatus, ClaimType};
use crate::store::{Repository, WriteBatch};

/// Everything one resolution committed.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    /// The claim that was approved or rejected. Forced assignment without a
    /// claim from the chosen driver leaves this empty.
    pub claim: Option<Claim>,
    /// Sibling claims moved from pending to cancelled by this resolution.
    pub cancelled: Vec<Claim>,
    pub assignment: Option<Assignment>,
}

/// Authoritative claim state.
///
/// Every mutation holds the claim's order lock for its whole
/// read-check-commit sequence, so at most one claim per order is ever
/// approved and no claim is created after its order was taken.
#[derive(Clone)]
pub struct ClaimStore {
    repo: Arc<dyn Repository>,
    locks: Locks,
}

impl ClaimStore {
    pub fn new(repo: Arc<dyn Repository>, locks: Locks) -> Self {
        Self { repo, locks }
    }

    pub async fn get(&self, claim_id: Uuid) -> Result<Claim, AppError> {
        self.repo
            .get_claim(claim_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("claim {claim_id} not found")))
    }

    pub async fn create_claim(
        &self,
        order_id: Uuid,
        driver_id: Uuid,
        claim_type: ClaimType,
    ) -> Result<Claim, AppError> {
        let _order_guard = self.locks.orders.acquire(order_id).await;

        let order = require_order(self.repo.as_ref(), order_id).await?;
        require_driver(self.repo.as_ref(), driver_id).await?;

        if let Some(assigned) = order.driver_id {
            return Err(AppError::AlreadyResolved(format!(
                "order {order_id} is already assigned to driver {assigned}"
            )));
        }

        let existing = self.repo.claims_for_order(order_id).await?;
        if let Some(held) = existing
            .iter()
            .find(|claim| claim.driver_id == driver_id && claim.status != ClaimStatus::Cancelled)
        {
            return Err(AppError::DuplicateClaim(format!(
                "driver {driver_id} already holds claim {} on order {order_id}",
                held.id
            )));
        }

        let claim = Claim::new(order_id, driver_id, claim_type);
        self.repo.commit(WriteBatch::new().claim(claim.clone())).await?;

        info!(
            claim_id = %claim.id,
            order_id = %order_id,
            driver_id = %driver_id,
            claim_type = ?claim_type,
            "claim created"
        );
        Ok(claim)
    }

    /// Approves or rejects a pending claim.
    ///
    /// Approval also cancels every other pending claim on the order and
    /// assigns the driver, all in one commit. A claim that is no longer
    /// pending once the order lock is held fails with
    /// [`AppError::AlreadyResolved`] and changes nothing.
    pub async fn resolve(
        &self,
        claim_id: Uuid,
        outcome: ClaimOutcome,
    ) -> Result<Resolution, AppError> {
        let order_id = self.get(claim_id).await?.order_id;
        let _order_guard = self.locks.orders.acquire(order_id).await;

        // Re-read under the lock; the first read may predate a competing approval.
        let claim = self.get(claim_id).await?;
        if claim.status.is_terminal() {
            return Err(AppError::AlreadyResolved(format!(
                "claim {claim_id} is already {:?}",
                claim.status
            )));
        }

        match outcome {
            ClaimOutcome::Approve => {
                self.assign_locked(
                    claim.order_id,
                    claim.driver_id,
                    Some(claim),
                    AssignmentSource::Claim,
                )
                .await
            }
            ClaimOutcome::Reject => self.reject_locked(claim).await,
        }
    }

    /// Assigns `driver_id` to the order without going through a claim offer.
    ///
    /// The driver's own pending claim on the order, if any, becomes the
    /// approved one; every other pending claim is cancelled.
    pub async fn force_assign(
        &self,
        order_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Resolution, AppError> {
        let _order_guard = self.locks.orders.acquire(order_id).await;

        let own_claim = self
            .pending_for(order_id)
            .await?
            .into_iter()
            .find(|claim| claim.driver_id == driver_id);

        self.assign_locked(order_id, driver_id, own_claim, AssignmentSource::Forced)
            .await
    }

    pub async fn list_pending(&self, order_id: Uuid) -> Result<Vec<Claim>, AppError> {
        self.pending_for(order_id).await
    }

    /// Claims held by a driver, newest first.
    pub async fn list_by_driver(
        &self,
        driver_id: Uuid,
        claim_type: Option<ClaimType>,
    ) -> Result<Vec<Claim>, AppError> {
        require_driver(self.repo.as_ref(), driver_id).await?;

        let mut claims: Vec<Claim> = self
            .repo
            .claims_for_driver(driver_id)
            .await?
            .into_iter()
            .filter(|claim| claim_type.is_none_or(|wanted| claim.claim_type == wanted))
            .collect();
        claims.reverse();
        Ok(claims)
    }

    /// Every claim, newest first.
    pub async fn list_all(&self) -> Result<Vec<Claim>, AppError> {
        let mut claims = self.repo.list_claims().await?;
        claims.reverse();
        Ok(claims)
    }

    async fn pending_for(&self, order_id: Uuid) -> Result<Vec<Claim>, AppError> {
        Ok(self
            .repo
            .claims_for_order(order_id)
            .await?
            .into_iter()
            .filter(Claim::is_pending)
            .collect())
    }

    /// The one assignment routine behind every approval path. Callers hold
    /// the order lock.
    ///
    /// `winner`, when given, must be a pending claim of `driver_id` on the
    /// order. It is approved and every other pending claim is cancelled; the
    /// claims, the order, and the driver commit as one batch.
    async fn assign_locked(
        &self,
        order_id: Uuid,
        driver_id: Uuid,
        winner: Option<Claim>,
        source: AssignmentSource,
    ) -> Result<Resolution, AppError> {
        let mut order = require_order(self.repo.as_ref(), order_id).await?;

        let _driver_guard = self.locks.drivers.acquire(driver_id).await;
        let mut driver = require_driver(self.repo.as_ref(), driver_id).await?;

        apply_assignment(&mut order, &mut driver)?;

        let mut approved = winner;
        if let Some(claim) = approved.as_mut() {
            claim.transition(ClaimStatus::Approved)?;
        }
        let winner_id = approved.as_ref().map(|claim| claim.id);

        let mut cancelled = Vec::new();
        for mut sibling in self.pending_for(order_id).await? {
            if Some(sibling.id) == winner_id {
                continue;
            }
            sibling.transition(ClaimStatus::Cancelled)?;
            cancelled.push(sibling);
        }

        let batch = WriteBatch::new()
            .order(order.clone())
            .driver(driver.clone())
            .claims(approved.clone())
            .claims(cancelled.clone());
        self.repo.commit(batch).await?;

        info!(
            order_id = %order_id,
            driver_id = %driver_id,
            claim_id = ?winner_id,
            source = ?source,
            cancelled = cancelled.len(),
            "driver assigned"
        );

        Ok(Resolution {
            claim: approved,
            cancelled,
            assignment: Some(Assignment {
                order,
                driver,
                claim_id: winner_id,
                source,
                assigned_at: Utc::now(),
            }),
        })
    }

    async fn reject_locked(&self, mut claim: Claim) -> Result<Resolution, AppError> {
        claim.transition(ClaimStatus::Rejected)?;
        self.repo.commit(WriteBatch::new().claim(claim.clone())).await?;

        info!(claim_id = %claim.id, order_id = %claim.order_id, "claim rejected");

        Ok(Resolution {
            claim: Some(claim),
            cancelled: Vec::new(),
            assignment: None,
        })
    }
}
