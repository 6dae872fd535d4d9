use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use meditin_core::{
    domain::{
        clock::Clock,
        entities::{
            sessions::SessionEntity,
            settlements::{InsertSettlementEntity, SettlementEntity},
        },
        repositories::sessions::SessionRepository,
        value_objects::{
            enums::{
                practice_categories::PracticeCategory,
                purposes::Purpose,
                session_statuses::{IllegalTransition, SessionStatus, SessionTransition},
            },
            plans::Plan,
            sessions::{
                BookingStats, CreateSessionModel, OTHER_FIELD, SessionDetailDto, SessionDto,
                SessionProfile, SessionSearchFilter,
            },
            settlements::{SettlementOutcome, SettlementReceipt},
        },
    },
    notifications::{BookingEvent, BookingNotification, NotificationSink},
    payments::paystack_client::{
        PaystackClient, PaystackEvent, TransactionInitialization, TransactionRequest,
    },
    pricing::{
        capacity::CapacityPolicy,
        catalog::PricingCatalog,
        discount::{ChargeContext, DiscountPolicy},
    },
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::booking_export::{BookingExport, sessions_to_csv};

const DEFAULT_SEARCH_LIMIT: i64 = 50;
const MAX_SEARCH_LIMIT: i64 = 200;
const MAX_EXPORT_ROWS: i64 = 5000;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize_payment(
        &self,
        request: TransactionRequest,
    ) -> AnyResult<TransactionInitialization>;

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<PaystackEvent>;
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize_payment(
        &self,
        request: TransactionRequest,
    ) -> AnyResult<TransactionInitialization> {
        self.initialize_transaction(&request).await
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<PaystackEvent> {
        self.verify_webhook_signature(payload, signature)
    }
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),
    #[error("session not found")]
    SessionNotFound,
    #[error("plan {0} does not exist")]
    PlanNotFound(String),
    #[error("plan {plan_id} is for {plan_category} sessions, not {session_category}")]
    PlanCategoryMismatch {
        plan_id: String,
        plan_category: PracticeCategory,
        session_category: PracticeCategory,
    },
    #[error("no plan has been selected for this session")]
    PlanNotSelected,
    #[error("cannot {action} a session that is {from}")]
    InvalidTransition {
        from: SessionStatus,
        action: &'static str,
    },
    #[error("payment gateway is unavailable")]
    PaymentUnavailable(#[source] anyhow::Error),
    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),
    #[error("webhook signature is invalid")]
    InvalidSignature,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BookingError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            BookingError::Validation(_)
            | BookingError::PlanCategoryMismatch { .. }
            | BookingError::PlanNotSelected
            | BookingError::InvalidWebhook(_) => StatusCode::BAD_REQUEST,
            BookingError::InvalidSignature => StatusCode::UNAUTHORIZED,
            BookingError::SessionNotFound | BookingError::PlanNotFound(_) => StatusCode::NOT_FOUND,
            BookingError::InvalidTransition { .. } => StatusCode::CONFLICT,
            BookingError::PaymentUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::PaymentUnavailable(_))
    }
}

impl From<IllegalTransition> for BookingError {
    fn from(value: IllegalTransition) -> Self {
        BookingError::InvalidTransition {
            from: value.from,
            action: value.transition.as_str(),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, BookingError>;

/// Date and time constraints applied when a session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingRules {
    pub min_lead_days: i64,
    pub window_start: NaiveTime,
    /// Exclusive.
    pub window_end: NaiveTime,
    /// Business time zone. Lead time is counted in its calendar days.
    pub time_zone: FixedOffset,
}

/// West Africa Time.
pub fn default_time_zone() -> FixedOffset {
    FixedOffset::east_opt(3600).unwrap_or_else(|| Utc.fix())
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            min_lead_days: 4,
            window_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            window_end: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
            time_zone: default_time_zone(),
        }
    }
}

impl BookingRules {
    pub fn accepts_time(&self, time: NaiveTime) -> bool {
        time >= self.window_start && time < self.window_end
    }
}

pub struct BookingPolicy {
    pub discount: DiscountPolicy,
    pub capacity: Arc<dyn CapacityPolicy>,
    pub rules: BookingRules,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentInitialization {
    pub reference: String,
    pub amount: i64,
    pub authorization_url: String,
    pub access_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// The candidate must complete payment on the gateway's page.
    AwaitingPayment {
        session: SessionDto,
        payment: PaymentInitialization,
    },
    Waitlisted { session: SessionDto },
    /// Nothing to pay; the session is already scheduled.
    Settled { session: SessionDto },
}

pub struct BookingUseCase<R, G, N>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    session_repo: Arc<R>,
    gateway: Arc<G>,
    notifier: Arc<N>,
    catalog: Arc<PricingCatalog>,
    policy: BookingPolicy,
    clock: Arc<dyn Clock>,
}

impl<R, G, N> BookingUseCase<R, G, N>
where
    R: SessionRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    pub fn new(
        session_repo: Arc<R>,
        gateway: Arc<G>,
        notifier: Arc<N>,
        catalog: Arc<PricingCatalog>,
        policy: BookingPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            session_repo,
            gateway,
            notifier,
            catalog,
            policy,
            clock,
        }
    }

    pub fn list_plans(&self, purpose: &str) -> UseCaseResult<Vec<Plan>> {
        let purpose = Purpose::from_str(purpose).ok_or_else(|| {
            let err = BookingError::Validation(format!("unknown purpose: {}", purpose.trim()));
            warn!(
                purpose,
                status = err.status_code().as_u16(),
                "bookings: plans requested for unknown purpose"
            );
            err
        })?;

        let plans = self.catalog.plans_for(purpose);
        debug!(purpose = %purpose, plan_count = plans.len(), "bookings: plans listed");
        Ok(plans)
    }

    pub async fn create(
        &self,
        owner_id: Uuid,
        model: CreateSessionModel,
    ) -> UseCaseResult<SessionDto> {
        let session = self.build_session(owner_id, model).map_err(|err| {
            warn!(
                %owner_id,
                reason = %err,
                status = err.status_code().as_u16(),
                "bookings: booking form rejected"
            );
            err
        })?;

        let session = self
            .session_repo
            .create_session(session)
            .await
            .map_err(|err| {
                error!(%owner_id, db_error = ?err, "bookings: failed to create session");
                BookingError::Internal(err)
            })?;

        info!(
            %owner_id,
            session_id = %session.id,
            purpose = %session.purpose,
            scheduled_date = %session.scheduled_date,
            lead_time_days = session.lead_time_days,
            "bookings: session created"
        );

        Ok(session.into())
    }

    pub async fn select_plan(
        &self,
        owner_id: Uuid,
        session_id: Uuid,
        plan_id: &str,
    ) -> UseCaseResult<SessionDto> {
        let session = self.load_owned_session(owner_id, session_id).await?;

        if session.status != SessionStatus::PendingPayment {
            return Err(self.rejected(
                session_id,
                BookingError::InvalidTransition {
                    from: session.status,
                    action: "change the plan of",
                },
            ));
        }
        if !session.is_profile_complete() {
            return Err(self.rejected(
                session_id,
                BookingError::Validation(
                    "complete the booking details before choosing a plan".to_string(),
                ),
            ));
        }

        let plan = self
            .catalog
            .lookup_plan(plan_id.trim())
            .ok_or_else(|| {
                self.rejected(session_id, BookingError::PlanNotFound(plan_id.trim().to_string()))
            })?;

        if !plan.category.serves(session.category()) {
            return Err(self.rejected(
                session_id,
                BookingError::PlanCategoryMismatch {
                    plan_id: plan.id.clone(),
                    plan_category: plan.category,
                    session_category: session.category(),
                },
            ));
        }

        let updated = self
            .session_repo
            .assign_plan(session_id, plan.id.clone())
            .await
            .map_err(|err| {
                error!(%session_id, db_error = ?err, "bookings: failed to assign plan");
                BookingError::Internal(err)
            })?;

        match updated {
            Some(session) => {
                info!(%session_id, plan_id = %plan.id, "bookings: plan selected");
                Ok(session.into())
            }
            None => Err(self
                .conflict(session_id, "change the plan of")
                .await),
        }
    }

    pub async fn checkout(&self, owner_id: Uuid, session_id: Uuid) -> UseCaseResult<CheckoutOutcome> {
        let session = self.load_owned_session(owner_id, session_id).await?;

        if session.status != SessionStatus::PendingPayment {
            return Err(self.rejected(
                session_id,
                BookingError::InvalidTransition {
                    from: session.status,
                    action: "check out",
                },
            ));
        }

        let plan = self.selected_plan(&session)?;
        let lead_time_days = i64::from(session.lead_time_days);

        if self.policy.capacity.is_exhausted(session.category()) {
            let committed = self.policy.discount.compute_charge(
                &plan,
                ChargeContext {
                    lead_time_days,
                    is_waitlist: true,
                },
            );
            return self.waitlist(session_id, plan, committed).await;
        }

        let charge = self.policy.discount.compute_charge(
            &plan,
            ChargeContext {
                lead_time_days,
                is_waitlist: false,
            },
        );
        info!(%session_id, plan_id = %plan.id, charge, "bookings: checkout started");

        self.begin_payment(session, plan, charge).await
    }

    pub async fn on_gateway_success(
        &self,
        session_id: Uuid,
        gateway_reference: &str,
    ) -> UseCaseResult<SettlementReceipt> {
        self.record_success(session_id, gateway_reference, None).await
    }

    pub async fn on_gateway_cancel(
        &self,
        owner_id: Uuid,
        session_id: Uuid,
    ) -> UseCaseResult<SessionDto> {
        let session = self.load_owned_session(owner_id, session_id).await?;
        info!(
            %session_id,
            status = %session.status,
            "bookings: payment abandoned on gateway; session unchanged"
        );
        Ok(session.into())
    }

    pub async fn promote_from_waitlist(&self, session_id: Uuid) -> UseCaseResult<CheckoutOutcome> {
        let session = self.load_session(session_id).await?;

        if session.status != SessionStatus::WaitingList {
            return Err(self.rejected(
                session_id,
                BookingError::InvalidTransition {
                    from: session.status,
                    action: "promote",
                },
            ));
        }

        let plan = self.selected_plan(&session)?;
        let charge = self.payable_charge(&session, &plan);
        info!(%session_id, plan_id = %plan.id, charge, "bookings: promoting waitlisted session");

        self.begin_payment(session, plan, charge).await
    }

    pub async fn update_profile(
        &self,
        owner_id: Uuid,
        session_id: Uuid,
        profile: SessionProfile,
    ) -> UseCaseResult<SessionDto> {
        let session = self.load_owned_session(owner_id, session_id).await?;

        if session.status.is_terminal() {
            return Err(self.rejected(
                session_id,
                BookingError::InvalidTransition {
                    from: session.status,
                    action: "edit",
                },
            ));
        }

        let updated = self
            .session_repo
            .update_profile(session_id, normalize_profile(profile))
            .await
            .map_err(|err| {
                error!(%session_id, db_error = ?err, "bookings: failed to update profile");
                BookingError::Internal(err)
            })?
            .ok_or(BookingError::SessionNotFound)?;

        info!(%session_id, "bookings: profile updated");
        Ok(updated.into())
    }

    pub async fn cancel(&self, owner_id: Uuid, session_id: Uuid) -> UseCaseResult<SessionDto> {
        let session = self.load_owned_session(owner_id, session_id).await?;
        let cancelled = self
            .apply_transition(session, SessionTransition::Cancel)
            .await?;
        self.notify(BookingEvent::Cancelled, &cancelled);
        Ok(cancelled.into())
    }

    pub async fn complete(&self, session_id: Uuid) -> UseCaseResult<SessionDto> {
        let session = self.load_session(session_id).await?;
        let completed = self
            .apply_transition(session, SessionTransition::Complete)
            .await?;
        self.notify(BookingEvent::Completed, &completed);
        Ok(completed.into())
    }

    pub async fn sessions_for_owner(&self, owner_id: Uuid) -> UseCaseResult<Vec<SessionDto>> {
        let sessions = self
            .session_repo
            .list_sessions_by_owner(owner_id)
            .await
            .map_err(|err| {
                error!(%owner_id, db_error = ?err, "bookings: failed to list sessions");
                BookingError::Internal(err)
            })?;

        info!(%owner_id, session_count = sessions.len(), "bookings: sessions listed");
        Ok(sessions.into_iter().map(SessionDto::from).collect())
    }

    pub async fn session_for_owner(
        &self,
        owner_id: Uuid,
        session_id: Uuid,
    ) -> UseCaseResult<SessionDetailDto> {
        let session = self.load_owned_session(owner_id, session_id).await?;
        let settlements = self
            .session_repo
            .list_settlements_for_session(session_id)
            .await
            .map_err(|err| {
                error!(%session_id, db_error = ?err, "bookings: failed to list settlements");
                BookingError::Internal(err)
            })?;

        Ok(SessionDetailDto {
            session: session.into(),
            settlements: settlements.into_iter().map(Into::into).collect(),
        })
    }

    pub async fn search_sessions(
        &self,
        mut filter: SessionSearchFilter,
    ) -> UseCaseResult<Vec<SessionDto>> {
        filter.limit = Some(
            filter
                .limit
                .unwrap_or(DEFAULT_SEARCH_LIMIT)
                .clamp(1, MAX_SEARCH_LIMIT),
        );

        let sessions = self
            .session_repo
            .search_sessions(filter)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "bookings: session search failed");
                BookingError::Internal(err)
            })?;

        Ok(sessions.into_iter().map(SessionDto::from).collect())
    }

    pub async fn booking_stats(&self) -> UseCaseResult<BookingStats> {
        let stats = self.session_repo.session_stats().await.map_err(|err| {
            error!(db_error = ?err, "bookings: failed to count sessions");
            BookingError::Internal(err)
        })?;

        debug!(total = stats.total, paid = stats.paid, "bookings: stats computed");
        Ok(stats)
    }

    /// CSV of the sessions matching `filter`, newest first. Row count is capped rather than paged.
    pub async fn export_sessions(
        &self,
        mut filter: SessionSearchFilter,
    ) -> UseCaseResult<BookingExport> {
        filter.limit = Some(
            filter
                .limit
                .unwrap_or(MAX_EXPORT_ROWS)
                .clamp(1, MAX_EXPORT_ROWS),
        );

        let sessions: Vec<SessionDto> = self
            .session_repo
            .search_sessions(filter)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "bookings: export search failed");
                BookingError::Internal(err)
            })?
            .into_iter()
            .map(SessionDto::from)
            .collect();

        let body = sessions_to_csv(&sessions).map_err(|err| {
            error!(error = ?err, "bookings: failed to write export");
            BookingError::Internal(err)
        })?;

        let filename = format!("meditin_bookings_{}.csv", self.local_today().format("%Y-%m-%d"));
        info!(rows = sessions.len(), %filename, "bookings: sessions exported");

        Ok(BookingExport {
            filename,
            body,
            rows: sessions.len(),
        })
    }

    /// Verifies a Paystack webhook and settles `charge.success` events. Other events
    /// are acknowledged and ignored.
    pub async fn handle_paystack_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> UseCaseResult<Option<SettlementReceipt>> {
        let event = self
            .gateway
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                let rejected = BookingError::InvalidSignature;
                warn!(
                    error = %err,
                    status = rejected.status_code().as_u16(),
                    "bookings: paystack webhook verification failed"
                );
                rejected
            })?;

        info!(event = %event.event, reference = %event.data.reference, "bookings: paystack webhook verified");

        if event.event != "charge.success" {
            debug!(event = %event.event, "bookings: unhandled paystack event");
            return Ok(None);
        }
        if let Some(status) = event.data.status.as_deref().filter(|s| *s != "success") {
            warn!(
                reference = %event.data.reference,
                gateway_status = status,
                "bookings: charge.success event carries a non-success status; ignored"
            );
            return Ok(None);
        }

        let session_id = event.data.session_id().ok_or_else(|| {
            let err = BookingError::InvalidWebhook("metadata.session_id is missing".to_string());
            warn!(
                reference = %event.data.reference,
                status = err.status_code().as_u16(),
                "bookings: paystack charge without session id"
            );
            err
        })?;

        self.record_success(session_id, &event.data.reference, event.data.amount)
            .await
            .map(Some)
    }

    fn build_session(&self, owner_id: Uuid, model: CreateSessionModel) -> UseCaseResult<SessionEntity> {
        let full_name = required(&model.full_name, "full name")?;
        let contact_email = required(&model.contact_email, "contact email")?;
        if !looks_like_email(&contact_email) {
            return Err(BookingError::Validation(
                "contact email is not a valid address".to_string(),
            ));
        }

        let field = required(&model.field, "field")?;
        let custom_field = optional(model.custom_field);
        if field == OTHER_FIELD && custom_field.is_none() {
            return Err(BookingError::Validation(format!(
                "custom field is required when field is {OTHER_FIELD}"
            )));
        }

        let purpose = Purpose::from_str(&model.purpose).ok_or_else(|| {
            BookingError::Validation(format!("unknown purpose: {}", model.purpose.trim()))
        })?;

        let scheduled_date = NaiveDate::parse_from_str(model.scheduled_date.trim(), "%Y-%m-%d")
            .map_err(|_| {
                BookingError::Validation("scheduled date must be formatted YYYY-MM-DD".to_string())
            })?;
        let scheduled_time = parse_time(model.scheduled_time.trim()).ok_or_else(|| {
            BookingError::Validation("scheduled time must be formatted HH:MM".to_string())
        })?;

        let rules = &self.policy.rules;
        if !rules.accepts_time(scheduled_time) {
            return Err(BookingError::Validation(format!(
                "sessions start between {} and {}",
                rules.window_start.format("%H:%M"),
                rules.window_end.format("%H:%M")
            )));
        }

        let now = self.clock.now();
        let lead_time_days = (scheduled_date - self.local_today()).num_days();
        if lead_time_days < rules.min_lead_days {
            return Err(BookingError::Validation(format!(
                "sessions must be booked at least {} days ahead",
                rules.min_lead_days
            )));
        }
        let lead_time_days = i32::try_from(lead_time_days).map_err(|_| {
            BookingError::Validation("scheduled date is too far ahead".to_string())
        })?;

        Ok(SessionEntity {
            id: Uuid::new_v4(),
            owner_id,
            contact_email,
            full_name,
            institution: optional(model.institution),
            field,
            custom_field,
            purpose,
            scheduled_date,
            scheduled_time,
            lead_time_days,
            profile: normalize_profile(model.profile),
            selected_plan_id: None,
            status: SessionStatus::PendingPayment,
            paid: false,
            committed_charge: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn local_today(&self) -> NaiveDate {
        self.clock
            .now()
            .with_timezone(&self.policy.rules.time_zone)
            .date_naive()
    }

    async fn load_session(&self, session_id: Uuid) -> UseCaseResult<SessionEntity> {
        self.session_repo
            .find_session(session_id)
            .await
            .map_err(|err| {
                error!(%session_id, db_error = ?err, "bookings: failed to load session");
                BookingError::Internal(err)
            })?
            .ok_or_else(|| self.rejected(session_id, BookingError::SessionNotFound))
    }

    /// Sessions owned by someone else are reported as missing.
    async fn load_owned_session(
        &self,
        owner_id: Uuid,
        session_id: Uuid,
    ) -> UseCaseResult<SessionEntity> {
        let session = self.load_session(session_id).await?;
        if session.owner_id != owner_id {
            warn!(%owner_id, %session_id, "bookings: session requested by another user");
            return Err(BookingError::SessionNotFound);
        }
        Ok(session)
    }

    fn selected_plan(&self, session: &SessionEntity) -> UseCaseResult<Plan> {
        let plan_id = session
            .selected_plan_id
            .as_deref()
            .ok_or_else(|| self.rejected(session.id, BookingError::PlanNotSelected))?;

        self.catalog.lookup_plan(plan_id).cloned().ok_or_else(|| {
            self.rejected(session.id, BookingError::PlanNotFound(plan_id.to_string()))
        })
    }

    /// The amount a success callback settles: the committed charge for waitlisted
    /// sessions, otherwise the charge implied by the lead time captured at creation.
    fn payable_charge(&self, session: &SessionEntity, plan: &Plan) -> i64 {
        session.committed_charge.unwrap_or_else(|| {
            self.policy.discount.compute_charge(
                plan,
                ChargeContext {
                    lead_time_days: i64::from(session.lead_time_days),
                    is_waitlist: false,
                },
            )
        })
    }

    async fn waitlist(
        &self,
        session_id: Uuid,
        plan: Plan,
        committed: i64,
    ) -> UseCaseResult<CheckoutOutcome> {
        let waitlisted = self
            .session_repo
            .move_to_waiting_list(session_id, committed)
            .await
            .map_err(|err| {
                error!(%session_id, db_error = ?err, "bookings: failed to waitlist session");
                BookingError::Internal(err)
            })?;

        let Some(waitlisted) = waitlisted else {
            return Err(self.conflict(session_id, "waitlist").await);
        };

        info!(
            %session_id,
            plan_id = %plan.id,
            committed_charge = committed,
            "bookings: capacity exhausted; session waitlisted"
        );
        self.notifier.notify(BookingNotification {
            event: BookingEvent::Waitlisted,
            session: waitlisted.clone(),
            plan: Some(plan),
        });

        Ok(CheckoutOutcome::Waitlisted {
            session: waitlisted.into(),
        })
    }

    async fn begin_payment(
        &self,
        session: SessionEntity,
        plan: Plan,
        charge: i64,
    ) -> UseCaseResult<CheckoutOutcome> {
        let session_id = session.id;

        if charge == 0 {
            let outcome = self
                .settle(&session, &plan, 0, free_reference(session_id))
                .await?;
            return match outcome {
                SettlementOutcome::Settled { session, .. } => Ok(CheckoutOutcome::Settled {
                    session: session.into(),
                }),
                SettlementOutcome::Duplicate { .. } => Ok(CheckoutOutcome::Settled {
                    session: self.load_session(session_id).await?.into(),
                }),
                SettlementOutcome::Unapplied { status, .. } => Err(BookingError::InvalidTransition {
                    from: status,
                    action: "settle",
                }),
            };
        }

        let request = TransactionRequest {
            email: session.contact_email.clone(),
            amount: charge,
            reference: charge_reference(session_id),
            session_id,
            plan_id: plan.id.clone(),
        };

        let initialization = self
            .gateway
            .initialize_payment(request.clone())
            .await
            .map_err(|err| {
                error!(
                    %session_id,
                    reference = %request.reference,
                    error = ?err,
                    "bookings: payment initialization failed"
                );
                BookingError::PaymentUnavailable(err)
            })?;

        info!(
            %session_id,
            reference = %initialization.reference,
            amount = charge,
            "bookings: awaiting payment"
        );

        Ok(CheckoutOutcome::AwaitingPayment {
            session: session.into(),
            payment: PaymentInitialization {
                reference: initialization.reference,
                amount: charge,
                authorization_url: initialization.authorization_url,
                access_code: initialization.access_code,
            },
        })
    }

    async fn record_success(
        &self,
        session_id: Uuid,
        gateway_reference: &str,
        reported_minor_amount: Option<i64>,
    ) -> UseCaseResult<SettlementReceipt> {
        let reference = gateway_reference.trim();
        if reference.is_empty() {
            return Err(self.rejected(
                session_id,
                BookingError::Validation("gateway reference is required".to_string()),
            ));
        }

        if let Some(existing) = self.recorded_settlement(session_id, reference).await? {
            return Ok(existing);
        }

        let session = self.load_session(session_id).await?;
        let plan = self.selected_plan(&session)?;
        let amount = self.payable_charge(&session, &plan);

        if let Some(reported) = reported_minor_amount {
            if Some(reported) != amount.checked_mul(100) {
                warn!(
                    %session_id,
                    reference,
                    reported_minor_amount = reported,
                    expected_amount = amount,
                    "bookings: gateway amount differs from the expected charge"
                );
            }
        }

        let outcome = self
            .settle(&session, &plan, amount, reference.to_string())
            .await?;

        let status = match &outcome {
            SettlementOutcome::Settled { session, .. } => session.status,
            SettlementOutcome::Unapplied { status, .. } => *status,
            SettlementOutcome::Duplicate { settlement } => {
                self.warn_foreign_reference(session_id, settlement);
                self.load_session(settlement.session_id).await?.status
            }
        };

        Ok(outcome.into_receipt(status))
    }

    /// Receipt for a reference that is already recorded. The settle write repeats this
    /// check atomically; this one skips plan and charge work for retried callbacks.
    async fn recorded_settlement(
        &self,
        session_id: Uuid,
        reference: &str,
    ) -> UseCaseResult<Option<SettlementReceipt>> {
        let existing = self
            .session_repo
            .find_settlement_by_reference(reference.to_string())
            .await
            .map_err(|err| {
                error!(%session_id, reference, db_error = ?err, "bookings: settlement lookup failed");
                BookingError::Internal(err)
            })?;

        let Some(settlement) = existing else {
            return Ok(None);
        };

        self.warn_foreign_reference(session_id, &settlement);
        info!(
            %session_id,
            reference,
            "bookings: duplicate success callback ignored"
        );

        let status = self.load_session(settlement.session_id).await?.status;
        Ok(Some(
            SettlementOutcome::Duplicate { settlement }.into_receipt(status),
        ))
    }

    fn warn_foreign_reference(&self, session_id: Uuid, settlement: &SettlementEntity) {
        if settlement.session_id != session_id {
            warn!(
                %session_id,
                owning_session_id = %settlement.session_id,
                reference = %settlement.gateway_reference,
                "bookings: callback reference belongs to another session"
            );
        }
    }

    async fn settle(
        &self,
        session: &SessionEntity,
        plan: &Plan,
        amount: i64,
        reference: String,
    ) -> UseCaseResult<SettlementOutcome> {
        let session_id = session.id;
        let record = InsertSettlementEntity {
            id: Uuid::new_v4(),
            session_id,
            plan_id: plan.id.clone(),
            amount_charged: amount,
            gateway_reference: reference,
            created_at: self.clock.now(),
        };

        let outcome = self
            .session_repo
            .settle_if_reference_absent(record)
            .await
            .map_err(|err| {
                error!(%session_id, db_error = ?err, "bookings: settlement write failed");
                BookingError::Internal(err)
            })?;

        match &outcome {
            SettlementOutcome::Settled {
                session: scheduled,
                settlement,
            } => {
                info!(
                    %session_id,
                    reference = %settlement.gateway_reference,
                    amount = settlement.amount_charged,
                    "bookings: payment settled; session scheduled"
                );
                self.notifier.notify(BookingNotification {
                    event: BookingEvent::Settled,
                    session: scheduled.clone(),
                    plan: Some(plan.clone()),
                });
            }
            SettlementOutcome::Duplicate { settlement } => {
                info!(
                    %session_id,
                    reference = %settlement.gateway_reference,
                    "bookings: duplicate success callback ignored"
                );
            }
            SettlementOutcome::Unapplied { settlement, status } => {
                error!(
                    %session_id,
                    reference = %settlement.gateway_reference,
                    amount = settlement.amount_charged,
                    status = %status,
                    "bookings: charge recorded for a session that is no longer payable; needs reconciliation"
                );
            }
        }

        Ok(outcome)
    }

    async fn apply_transition(
        &self,
        session: SessionEntity,
        transition: SessionTransition,
    ) -> UseCaseResult<SessionEntity> {
        let session_id = session.id;
        session
            .status
            .apply(transition)
            .map_err(|err| self.rejected(session_id, err.into()))?;

        let updated = self
            .session_repo
            .transition_status(session_id, transition)
            .await
            .map_err(|err| {
                error!(
                    %session_id,
                    transition = %transition,
                    db_error = ?err,
                    "bookings: status transition failed"
                );
                BookingError::Internal(err)
            })?;

        match updated {
            Some(updated) => {
                info!(
                    %session_id,
                    from = %session.status,
                    to = %updated.status,
                    "bookings: session transitioned"
                );
                Ok(updated)
            }
            None => Err(self.conflict(session_id, transition.as_str()).await),
        }
    }

    /// Builds the error for a compare-and-set write that found the session in another state.
    async fn conflict(&self, session_id: Uuid, action: &'static str) -> BookingError {
        match self.load_session(session_id).await {
            Ok(current) => self.rejected(
                session_id,
                BookingError::InvalidTransition {
                    from: current.status,
                    action,
                },
            ),
            Err(err) => err,
        }
    }

    fn notify(&self, event: BookingEvent, session: &SessionEntity) {
        let plan = session
            .selected_plan_id
            .as_deref()
            .and_then(|id| self.catalog.lookup_plan(id))
            .cloned();

        self.notifier.notify(BookingNotification {
            event,
            session: session.clone(),
            plan,
        });
    }

    fn rejected(&self, session_id: Uuid, err: BookingError) -> BookingError {
        warn!(
            %session_id,
            reason = %err,
            status = err.status_code().as_u16(),
            "bookings: request rejected"
        );
        err
    }
}

fn required(value: &str, name: &str) -> UseCaseResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BookingError::Validation(format!("{name} is required")));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !value.contains(' ')
        }
        None => false,
    }
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

fn normalize_profile(profile: SessionProfile) -> SessionProfile {
    SessionProfile {
        bio: optional(profile.bio),
        strengths: optional(profile.strengths),
        weaknesses: optional(profile.weaknesses),
        goals: optional(profile.goals),
    }
}

fn charge_reference(session_id: Uuid) -> String {
    format!("MED-{}-{}", session_id.simple(), Uuid::new_v4().simple())
}

fn free_reference(session_id: Uuid) -> String {
    format!("FREE-{}", session_id.simple())
}
