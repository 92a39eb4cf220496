//! `OrderService` - the entry point the bot talks to.
//!
//! Resolves external user ids, picks the current period from the clock and delegates to
//! the order, summary and template modules. Owns the removal registry so that proposals
//! outlive the command invocation that created them.

use crate::{
    core::{
        aggregate::{self, OrderAggregate},
        order::{self, OrderItemRequest, QuantityLimits, RemovalPreview},
        period::{self, Cutover, OrderPeriod},
        removal::{
            DEFAULT_REMOVAL_TTL, ExpiredProposal, ProposalHandle, ProposalPayload,
            ProposalState, RemovalRegistry,
        },
        summary::{self, SummaryRow},
        template::{self, Template},
        user,
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::instrument;

/// Tunables of the order workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Weekly rollover rule
    pub cutover: Cutover,
    /// Accepted quantity per item
    pub limits: QuantityLimits,
    /// Time a user has to confirm a removal
    pub removal_ttl: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            cutover: Cutover::default(),
            limits: QuantityLimits::default(),
            removal_ttl: DEFAULT_REMOVAL_TTL,
        }
    }
}

/// Facade over the order workflow. Clones share the connection and the registry.
#[derive(Debug, Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    settings: ServiceSettings,
    removals: RemovalRegistry,
}

impl OrderService {
    /// Creates the service together with the stream of expired removal proposals.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        settings: ServiceSettings,
    ) -> (Self, mpsc::UnboundedReceiver<ExpiredProposal>) {
        let (removals, expired) = RemovalRegistry::new();
        (
            Self {
                db: Arc::new(db),
                settings,
                removals,
            },
            expired,
        )
    }

    /// The underlying connection.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The settings the service was built with.
    #[must_use]
    pub const fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// The period containing `now` under the configured cutover.
    #[must_use]
    pub fn compute_period(&self, now: DateTime<Utc>) -> OrderPeriod {
        period::compute_period(now, &self.settings.cutover)
    }

    /// The period containing the current instant.
    #[must_use]
    pub fn current_period(&self) -> OrderPeriod {
        self.compute_period(Utc::now())
    }

    /// Adds items to the user's order for the current period.
    ///
    /// # Errors
    /// `UserNotFound`, `InvalidQuantity`, `ProductNotFound` or a store error.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn add_order(
        &self,
        external_user_id: &str,
        items: &[OrderItemRequest],
    ) -> Result<OrderAggregate> {
        let user = user::require_user(self.db(), external_user_id).await?;
        let now = Utc::now();
        order::add_items(
            self.db(),
            user.id,
            &self.compute_period(now),
            items,
            now,
            self.settings.limits,
        )
        .await
    }

    /// Previews removing items from the user's current order.
    ///
    /// # Errors
    /// `UserNotFound`, `Validation`, `InsufficientQuantity` or a store error.
    pub async fn preview_removal(
        &self,
        external_user_id: &str,
        items: &[OrderItemRequest],
    ) -> Result<RemovalPreview> {
        let user = user::require_user(self.db(), external_user_id).await?;
        order::preview_removal(self.db(), user.id, &self.current_period(), items).await
    }

    /// Registers a previewed removal for confirmation.
    ///
    /// # Errors
    /// `UserNotFound` or a store error.
    pub async fn propose_removal(
        &self,
        external_user_id: &str,
        preview: &RemovalPreview,
    ) -> Result<ProposalHandle> {
        let user = user::require_user(self.db(), external_user_id).await?;
        let payload = ProposalPayload {
            user_id: user.id,
            external_user_id: external_user_id.to_string(),
            period: preview.period,
            approved: preview.approved.clone(),
        };
        Ok(self.removals.propose(payload, self.settings.removal_ttl))
    }

    /// Confirms a pending removal and applies it.
    ///
    /// # Errors
    /// `ProposalNotFound`, `ProposalNotActive`, `InsufficientQuantity` or a store error.
    #[instrument(skip(self))]
    pub async fn confirm_proposal(&self, handle: ProposalHandle) -> Result<OrderAggregate> {
        self.removals.confirm(self.db(), handle).await
    }

    /// Cancels a pending removal.
    ///
    /// # Errors
    /// `ProposalNotFound` or `ProposalNotActive`.
    pub fn cancel_proposal(&self, handle: ProposalHandle) -> Result<()> {
        self.removals.cancel(handle)
    }

    /// External id of the user who created a proposal.
    ///
    /// # Errors
    /// `ProposalNotFound`.
    pub fn proposal_owner(&self, handle: ProposalHandle) -> Result<String> {
        self.removals.owner(handle)
    }

    /// Lifecycle state of a proposal.
    ///
    /// # Errors
    /// `ProposalNotFound`.
    pub fn proposal_state(&self, handle: ProposalHandle) -> Result<ProposalState> {
        self.removals.state(handle)
    }

    /// The user's order for the current period.
    ///
    /// # Errors
    /// `UserNotFound` or a store error.
    pub async fn get_aggregate(&self, external_user_id: &str) -> Result<OrderAggregate> {
        let user = user::require_user(self.db(), external_user_id).await?;
        aggregate::get_aggregate(self.db(), user.id, &self.current_period()).await
    }

    /// Everyone's orders for the current period.
    ///
    /// # Errors
    /// Returns a store error.
    pub async fn get_weekly_summary(&self) -> Result<Vec<SummaryRow>> {
        summary::summarize(self.db(), &self.current_period()).await
    }

    /// Saves a named item list for the user.
    ///
    /// # Errors
    /// See [`template::save_template`].
    pub async fn save_template(
        &self,
        external_user_id: &str,
        name: &str,
        items: &[OrderItemRequest],
    ) -> Result<Template> {
        let user = user::require_user(self.db(), external_user_id).await?;
        template::save_template(self.db(), user.id, name, items, self.settings.limits).await
    }

    /// Adds the items of a saved template to the user's current order.
    ///
    /// # Errors
    /// `TemplateNotFound` plus everything [`OrderService::add_order`] can return.
    pub async fn apply_template(
        &self,
        external_user_id: &str,
        name: &str,
    ) -> Result<OrderAggregate> {
        let user = user::require_user(self.db(), external_user_id).await?;
        let saved = template::get_template(self.db(), user.id, name).await?;
        self.add_order(external_user_id, &saved.items).await
    }

    /// The user's saved templates.
    ///
    /// # Errors
    /// `UserNotFound` or a store error.
    pub async fn list_templates(&self, external_user_id: &str) -> Result<Vec<Template>> {
        let user = user::require_user(self.db(), external_user_id).await?;
        template::list_templates(self.db(), user.id).await
    }

    /// Deletes one of the user's templates.
    ///
    /// # Errors
    /// `UserNotFound`, `TemplateNotFound` or a store error.
    pub async fn delete_template(&self, external_user_id: &str, name: &str) -> Result<()> {
        let user = user::require_user(self.db(), external_user_id).await?;
        template::delete_template(self.db(), user.id, name).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{errors::Error, test_utils::*};

    async fn service() -> Result<(OrderService, mpsc::UnboundedReceiver<ExpiredProposal>)> {
        let (db, _) = setup_with_catalog().await?;
        Ok(OrderService::new(db, ServiceSettings::default()))
    }

    fn items(pairs: &[(&str, i64)]) -> Vec<OrderItemRequest> {
        pairs
            .iter()
            .map(|(name, quantity)| OrderItemRequest::new(*name, *quantity))
            .collect()
    }

    #[tokio::test]
    async fn test_unknown_user_is_reported() -> Result<()> {
        let (service, _rx) = service().await?;
        let result = service.add_order("nobody", &items(&[("roll", 1)])).await;
        assert!(matches!(result.unwrap_err(), Error::UserNotFound { user_id: _ }));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_preview_confirm_flow() -> Result<()> {
        let (service, _rx) = service().await?;

        service.add_order("u1", &items(&[("roll", 3), ("bread", 1)])).await?;
        let preview = service.preview_removal("u1", &items(&[("ROLL", 2)])).await?;
        assert_eq!(preview.resulting.quantity("roll"), 1);
        assert_eq!(preview.period, service.current_period());

        let handle = service.propose_removal("u1", &preview).await?;
        assert_eq!(service.proposal_owner(handle)?, "u1");

        let after = service.confirm_proposal(handle).await?;
        assert_eq!(after, preview.resulting);
        assert_eq!(service.get_aggregate("u1").await?, after);
        assert_eq!(service.proposal_state(handle)?, ProposalState::Confirmed);
        Ok(())
    }

    #[tokio::test]
    async fn test_clones_share_connection_and_proposals() -> Result<()> {
        let (service, _rx) = service().await?;
        let other = service.clone();

        other.add_order("u1", &items(&[("roll", 2)])).await?;
        assert_eq!(service.get_aggregate("u1").await?.quantity("roll"), 2);

        let preview = service.preview_removal("u1", &items(&[("roll", 1)])).await?;
        let handle = service.propose_removal("u1", &preview).await?;
        let after = other.confirm_proposal(handle).await?;
        assert_eq!(after.quantity("roll"), 1);
        assert_eq!(service.proposal_state(handle)?, ProposalState::Confirmed);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_proposal_keeps_order() -> Result<()> {
        let (service, _rx) = service().await?;
        service.add_order("u1", &items(&[("roll", 3)])).await?;

        let preview = service.preview_removal("u1", &items(&[("roll", 3)])).await?;
        let handle = service.propose_removal("u1", &preview).await?;
        service.cancel_proposal(handle)?;

        let result = service.confirm_proposal(handle).await;
        assert!(matches!(result.unwrap_err(), Error::ProposalNotActive { .. }));
        assert_eq!(service.get_aggregate("u1").await?.quantity("roll"), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_weekly_summary_uses_current_period() -> Result<()> {
        let (service, _rx) = service().await?;
        create_test_user(service.db(), "u2", "Bob").await?;

        service.add_order("u1", &items(&[("roll", 2)])).await?;
        service.add_order("u2", &items(&[("roll", 1)])).await?;

        let rows = service.get_weekly_summary().await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_quantity, 3);
        assert_eq!(rows[0].contributors.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_template_adds_items() -> Result<()> {
        let (service, _rx) = service().await?;
        service
            .save_template("u1", "usual", &items(&[("roll", 4), ("bread", 1)]))
            .await?;

        service.apply_template("u1", "usual").await?;
        let aggregate = service.apply_template("u1", "Usual").await?;
        assert_eq!(aggregate.quantity("roll"), 8);
        assert_eq!(aggregate.quantity("bread"), 2);

        assert_eq!(service.list_templates("u1").await?.len(), 1);
        service.delete_template("u1", "usual").await?;
        let result = service.apply_template("u1", "usual").await;
        assert!(matches!(result.unwrap_err(), Error::TemplateNotFound { name: _ }));
        Ok(())
    }
}
