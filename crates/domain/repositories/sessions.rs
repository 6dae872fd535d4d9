use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::{
    sessions::SessionEntity,
    settlements::{InsertSettlementEntity, SettlementEntity},
};
use crate::domain::value_objects::{
    enums::session_statuses::SessionTransition,
    sessions::{BookingStats, SessionProfile, SessionSearchFilter},
    settlements::SettlementOutcome,
};

/// Storage for sessions and their settlements.
///
/// Every status write is a compare-and-set against the source states of the transition:
/// `Ok(None)` means the session is missing or no longer in an accepted state.
#[async_trait]
#[automock]
pub trait SessionRepository {
    async fn create_session(&self, session: SessionEntity) -> Result<SessionEntity>;

    async fn find_session(&self, session_id: Uuid) -> Result<Option<SessionEntity>>;

    async fn list_sessions_by_owner(&self, owner_id: Uuid) -> Result<Vec<SessionEntity>>;

    async fn search_sessions(&self, filter: SessionSearchFilter) -> Result<Vec<SessionEntity>>;

    /// Counts over every session regardless of status.
    async fn session_stats(&self) -> Result<BookingStats>;

    /// Only while the session is `PENDING_PAYMENT`.
    async fn assign_plan(&self, session_id: Uuid, plan_id: String)
    -> Result<Option<SessionEntity>>;

    /// Touches the profile columns only.
    async fn update_profile(
        &self,
        session_id: Uuid,
        profile: SessionProfile,
    ) -> Result<Option<SessionEntity>>;

    async fn move_to_waiting_list(
        &self,
        session_id: Uuid,
        committed_charge: i64,
    ) -> Result<Option<SessionEntity>>;

    /// Status-only transitions (`Cancel`, `Complete`). Settlement and waitlisting have their own writes.
    async fn transition_status(
        &self,
        session_id: Uuid,
        transition: SessionTransition,
    ) -> Result<Option<SessionEntity>>;

    /// Inserts the settlement unless its reference exists and, in the same transaction,
    /// schedules the session when it is still payable.
    async fn settle_if_reference_absent(
        &self,
        settlement: InsertSettlementEntity,
    ) -> Result<SettlementOutcome>;

    async fn find_settlement_by_reference(
        &self,
        gateway_reference: String,
    ) -> Result<Option<SettlementEntity>>;

    async fn list_settlements_for_session(&self, session_id: Uuid)
    -> Result<Vec<SettlementEntity>>;
}
