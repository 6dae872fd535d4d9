use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use diesel::{Connection, PgConnection, QueryResult, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain;
use crate::infra::db::postgres::{
    postgres_connection::PgPoolSquad,
    schema::{practice_sessions, settlements},
};
use domain::{
    entities::{
        sessions::{InsertSessionEntity, SessionEntity, SessionRow},
        settlements::{InsertSettlementEntity, SettlementEntity},
    },
    repositories::sessions::SessionRepository,
    value_objects::{
        enums::session_statuses::{SessionStatus, SessionTransition},
        sessions::{BookingStats, SessionProfile, SessionSearchFilter},
        settlements::SettlementOutcome,
    },
};

pub struct SessionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SessionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

/// What happened inside the settlement transaction, before rows are parsed into entities.
enum SettleStep {
    Settled(SessionRow, SettlementEntity),
    Duplicate(SettlementEntity),
    Unapplied(SettlementEntity, String),
}

fn source_statuses(transition: SessionTransition) -> Vec<String> {
    transition
        .sources()
        .iter()
        .map(|status| status.to_string())
        .collect()
}

fn into_entity(row: Option<SessionRow>) -> Result<Option<SessionEntity>> {
    row.map(SessionEntity::try_from).transpose()
}

/// Runs inside the settlement transaction: lock the session, insert unless the reference
/// exists, then schedule the session when it is still payable.
fn settle_locked(
    tx: &mut PgConnection,
    settlement: &InsertSettlementEntity,
    payable: &[String],
) -> QueryResult<SettleStep> {
    let session = practice_sessions::table
        .find(settlement.session_id)
        .select(SessionRow::as_select())
        .for_update()
        .first::<SessionRow>(tx)?;

    let inserted = insert_into(settlements::table)
        .values(settlement)
        .on_conflict(settlements::gateway_reference)
        .do_nothing()
        .returning(SettlementEntity::as_returning())
        .get_result::<SettlementEntity>(tx)
        .optional()?;

    let Some(inserted) = inserted else {
        let existing = settlements::table
            .filter(settlements::gateway_reference.eq(&settlement.gateway_reference))
            .select(SettlementEntity::as_select())
            .first::<SettlementEntity>(tx)?;
        return Ok(SettleStep::Duplicate(existing));
    };

    if !payable.contains(&session.status) {
        return Ok(SettleStep::Unapplied(inserted, session.status));
    }

    let scheduled = update(practice_sessions::table.find(settlement.session_id))
        .set((
            practice_sessions::status.eq(SessionStatus::Scheduled.to_string()),
            practice_sessions::paid.eq(true),
            practice_sessions::updated_at.eq(Utc::now()),
        ))
        .returning(SessionRow::as_returning())
        .get_result::<SessionRow>(tx)?;

    Ok(SettleStep::Settled(scheduled, inserted))
}

#[async_trait]
impl SessionRepository for SessionPostgres {
    async fn create_session(&self, session: SessionEntity) -> Result<SessionEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = insert_into(practice_sessions::table)
            .values(&InsertSessionEntity::from(&session))
            .returning(SessionRow::as_returning())
            .get_result::<SessionRow>(&mut conn)?;

        SessionEntity::try_from(row)
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = practice_sessions::table
            .find(session_id)
            .select(SessionRow::as_select())
            .first::<SessionRow>(&mut conn)
            .optional()?;

        into_entity(row)
    }

    async fn list_sessions_by_owner(&self, owner_id: Uuid) -> Result<Vec<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = practice_sessions::table
            .filter(practice_sessions::owner_id.eq(owner_id))
            .order(practice_sessions::created_at.desc())
            .select(SessionRow::as_select())
            .load::<SessionRow>(&mut conn)?;

        rows.into_iter().map(SessionEntity::try_from).collect()
    }

    async fn search_sessions(&self, filter: SessionSearchFilter) -> Result<Vec<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let mut query = practice_sessions::table
            .select(SessionRow::as_select())
            .into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(practice_sessions::status.eq(status.to_string()));
        }

        if let Some(term) = filter.term.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term);
            query = query.filter(
                practice_sessions::full_name
                    .ilike(pattern.clone())
                    .or(practice_sessions::contact_email.ilike(pattern.clone()))
                    .or(practice_sessions::field.ilike(pattern)),
            );
        }

        query = query.order(practice_sessions::created_at.desc());

        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let rows = query.load::<SessionRow>(&mut conn)?;

        rows.into_iter().map(SessionEntity::try_from).collect()
    }

    async fn session_stats(&self) -> Result<BookingStats> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = practice_sessions::table
            .count()
            .get_result::<i64>(&mut conn)?;
        let paid = practice_sessions::table
            .filter(practice_sessions::paid.eq(true))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(BookingStats::from_counts(total, paid))
    }

    async fn assign_plan(
        &self,
        session_id: Uuid,
        plan_id: String,
    ) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = update(practice_sessions::table)
            .filter(practice_sessions::id.eq(session_id))
            .filter(practice_sessions::status.eq(SessionStatus::PendingPayment.to_string()))
            .set((
                practice_sessions::selected_plan_id.eq(Some(plan_id)),
                practice_sessions::updated_at.eq(Utc::now()),
            ))
            .returning(SessionRow::as_returning())
            .get_result::<SessionRow>(&mut conn)
            .optional()?;

        into_entity(row)
    }

    async fn update_profile(
        &self,
        session_id: Uuid,
        profile: SessionProfile,
    ) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = update(practice_sessions::table.find(session_id))
            .set((
                practice_sessions::bio.eq(profile.bio),
                practice_sessions::strengths.eq(profile.strengths),
                practice_sessions::weaknesses.eq(profile.weaknesses),
                practice_sessions::goals.eq(profile.goals),
                practice_sessions::updated_at.eq(Utc::now()),
            ))
            .returning(SessionRow::as_returning())
            .get_result::<SessionRow>(&mut conn)
            .optional()?;

        into_entity(row)
    }

    async fn move_to_waiting_list(
        &self,
        session_id: Uuid,
        committed_charge: i64,
    ) -> Result<Option<SessionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = update(practice_sessions::table)
            .filter(practice_sessions::id.eq(session_id))
            .filter(practice_sessions::status.eq_any(source_statuses(SessionTransition::Waitlist)))
            .set((
                practice_sessions::status.eq(SessionStatus::WaitingList.to_string()),
                practice_sessions::paid.eq(false),
                practice_sessions::committed_charge.eq(Some(committed_charge)),
                practice_sessions::updated_at.eq(Utc::now()),
            ))
            .returning(SessionRow::as_returning())
            .get_result::<SessionRow>(&mut conn)
            .optional()?;

        into_entity(row)
    }

    async fn transition_status(
        &self,
        session_id: Uuid,
        transition: SessionTransition,
    ) -> Result<Option<SessionEntity>> {
        if matches!(
            transition,
            SessionTransition::Settle | SessionTransition::Waitlist
        ) {
            bail!("{} is not a status-only transition", transition);
        }

        let mut conn = Arc::clone(&self.db_pool).get()?;
        let target = transition.target();

        let row = update(practice_sessions::table)
            .filter(practice_sessions::id.eq(session_id))
            .filter(practice_sessions::status.eq_any(source_statuses(transition)))
            .set((
                practice_sessions::status.eq(target.to_string()),
                practice_sessions::paid.eq(target.implies_paid()),
                practice_sessions::updated_at.eq(Utc::now()),
            ))
            .returning(SessionRow::as_returning())
            .get_result::<SessionRow>(&mut conn)
            .optional()?;

        into_entity(row)
    }

    async fn settle_if_reference_absent(
        &self,
        settlement: InsertSettlementEntity,
    ) -> Result<SettlementOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let payable = source_statuses(SessionTransition::Settle);

        // Session row lock first. The settlement insert takes a key-share lock on the same row
        // through its foreign key, so taking FOR UPDATE afterwards deadlocks two references
        // racing for one session.
        let step = conn.transaction::<SettleStep, diesel::result::Error, _>(|tx| {
            settle_locked(tx, &settlement, &payable)
        })?;

        match step {
            SettleStep::Settled(row, settlement) => Ok(SettlementOutcome::Settled {
                session: SessionEntity::try_from(row)?,
                settlement,
            }),
            SettleStep::Duplicate(settlement) => Ok(SettlementOutcome::Duplicate { settlement }),
            SettleStep::Unapplied(settlement, status) => Ok(SettlementOutcome::Unapplied {
                status: SessionStatus::from_str(&status)
                    .ok_or_else(|| anyhow!("unknown status `{}` while settling", status))?,
                settlement,
            }),
        }
    }

    async fn find_settlement_by_reference(
        &self,
        gateway_reference: String,
    ) -> Result<Option<SettlementEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = settlements::table
            .filter(settlements::gateway_reference.eq(gateway_reference))
            .select(SettlementEntity::as_select())
            .first::<SettlementEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_settlements_for_session(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<SettlementEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = settlements::table
            .filter(settlements::session_id.eq(session_id))
            .order(settlements::created_at.asc())
            .select(SettlementEntity::as_select())
            .load::<SettlementEntity>(&mut conn)?;

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::enums::purposes::Purpose;
    use crate::infra::db::postgres::postgres_connection::establish_connection;
    use chrono::{NaiveDate, NaiveTime};

    /// Needs a migrated database in `TEST_DATABASE_URL`.
    fn store() -> SessionPostgres {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL is not set");
        SessionPostgres::new(Arc::new(establish_connection(&url).unwrap()))
    }

    fn pending_session() -> SessionEntity {
        let now = Utc::now();
        SessionEntity {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            contact_email: "kemi@example.com".to_string(),
            full_name: "Kemi Ade".to_string(),
            institution: None,
            field: "Healthcare & Nursing".to_string(),
            custom_field: None,
            purpose: Purpose::Exam,
            scheduled_date: NaiveDate::from_ymd_opt(2026, 5, 10).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            lead_time_days: 6,
            profile: SessionProfile::default(),
            selected_plan_id: Some("exam_one_off".to_string()),
            status: SessionStatus::PendingPayment,
            paid: false,
            committed_charge: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn settlement_for(session_id: Uuid) -> InsertSettlementEntity {
        InsertSettlementEntity {
            id: Uuid::new_v4(),
            session_id,
            plan_id: "exam_one_off".to_string(),
            amount_charged: 2550,
            gateway_reference: format!("MED-{}", Uuid::new_v4().simple()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn racing_references_settle_once_and_record_the_other() {
        let store = Arc::new(store());
        let session = store.create_session(pending_session()).await.unwrap();
        let mut settled = 0;

        for _ in 0..10 {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let store = Arc::clone(&store);
                    let settlement = settlement_for(session.id);
                    tokio::spawn(async move { store.settle_if_reference_absent(settlement).await })
                })
                .collect();

            for handle in handles {
                match handle.await.unwrap().unwrap() {
                    SettlementOutcome::Settled { .. } => settled += 1,
                    SettlementOutcome::Unapplied { status, .. } => {
                        assert_eq!(status, SessionStatus::Scheduled)
                    }
                    other => panic!("expected settled or unapplied, got {other:?}"),
                }
            }
        }

        assert_eq!(settled, 1);
        let records = store.list_settlements_for_session(session.id).await.unwrap();
        assert_eq!(records.len(), 20);

        let stored = store.find_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Scheduled);
        assert!(stored.paid);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn repeated_reference_is_a_duplicate() {
        let store = store();
        let session = store.create_session(pending_session()).await.unwrap();
        let settlement = settlement_for(session.id);

        let first = store
            .settle_if_reference_absent(settlement.clone())
            .await
            .unwrap();
        let second = store.settle_if_reference_absent(settlement).await.unwrap();

        assert!(matches!(first, SettlementOutcome::Settled { .. }));
        assert!(matches!(second, SettlementOutcome::Duplicate { .. }));
        assert_eq!(
            store
                .find_settlement_by_reference(first.settlement().gateway_reference.clone())
                .await
                .unwrap()
                .as_ref(),
            Some(first.settlement())
        );
    }
}
