//! Movement lifecycle: draft creation, posting, cancellation, and the
//! read paths over movements, ledger entries and lifecycle events.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::audit::AuditSink;
use crate::db::DbPool;
use crate::entities::{
    article, lot, stock_balance, stock_ledger_entry, stock_location, stock_movement,
    stock_movement_event, stock_movement_line, AdjustmentDirection, MovementEventType,
    MovementStatus, MovementType,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::sequence::MovementNumberGenerator;
use crate::services::balances::{self, BalanceFilter, BalanceKey};
use crate::services::legs::{self, LineInput};

/// One requested line of a new movement.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMovementLine {
    /// Honored when supplied; otherwise lines are numbered 1..N in array
    /// order.
    pub line_no: Option<i32>,
    pub article_id: i64,
    pub lot_id: Option<i64>,
    pub qty: Decimal,
    pub unit_cost: Option<Decimal>,
    pub src_warehouse_id: Option<i64>,
    pub src_location_id: Option<i64>,
    pub dst_warehouse_id: Option<i64>,
    pub dst_location_id: Option<i64>,
    pub direction: Option<AdjustmentDirection>,
    pub notes: Option<String>,
}

/// Input to the draft builder.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMovement {
    pub movement_type: MovementType,
    /// Defaults to now.
    pub effective_at: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 128))]
    pub idempotency_key: Option<String>,
    pub source_document_type: Option<String>,
    pub source_document_id: Option<String>,
    pub reason_code: Option<String>,
    pub notes: Option<String>,
    pub lines: Vec<NewMovementLine>,
}

/// Full view of a movement: header, lines, applied ledger legs, lifecycle
/// events.
#[derive(Debug, Clone)]
pub struct MovementDetail {
    pub movement: stock_movement::Model,
    pub lines: Vec<stock_movement_line::Model>,
    pub ledger: Vec<stock_ledger_entry::Model>,
    pub events: Vec<stock_movement_event::Model>,
}

/// Pagination for movement listings.
#[derive(Debug, Clone, Deserialize)]
pub struct MovementPage {
    pub page: u64,
    pub per_page: u64,
}

impl Default for MovementPage {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

/// (line_no, article_id, lot_id) — what the article/lot checks need from a
/// line, whether it comes from draft input or a stored row.
type ArticleLine = (i32, i64, Option<i64>);

/// A leg scheduled for application, carrying everything the ledger row needs.
struct PlannedLeg {
    key: BalanceKey,
    line_id: i64,
    leg_no: i32,
    delta_qty: Decimal,
    unit_cost: Option<Decimal>,
}

/// Service for creating, posting and cancelling stock movements.
#[derive(Clone)]
pub struct MovementService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    numbers: Arc<dyn MovementNumberGenerator>,
    audit: Arc<dyn AuditSink>,
}

impl MovementService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        numbers: Arc<dyn MovementNumberGenerator>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            db,
            event_sender,
            numbers,
            audit,
        }
    }

    /// Creates a movement in DRAFT with its lines.
    ///
    /// Every line is validated before any row is written: structurally for
    /// the movement type, and against the catalog (article exists and is
    /// active, lot usage matches the tracking flag). Location checks wait
    /// until posting, since the catalog can change while a draft sits.
    /// When `idempotency_key` is supplied and a movement with that key
    /// already exists, the existing movement is returned unchanged; the
    /// uniqueness constraint on the key, not a prior read, is what makes
    /// this race-safe.
    #[instrument(skip(self, input), fields(movement_type = %input.movement_type))]
    pub async fn create_movement(
        &self,
        input: NewMovement,
        actor: &str,
    ) -> Result<stock_movement::Model, ServiceError> {
        if input.lines.is_empty() {
            return Err(ServiceError::EmptyMovement);
        }
        input
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        // Structural per-type validation of the whole movement, before any
        // persistence. Any bad line rejects everything. Line numbers are
        // resolved here too so a caller-supplied duplicate fails the draft
        // instead of surfacing as a unique-index violation.
        let mut line_nos: Vec<i32> = Vec::with_capacity(input.lines.len());
        let mut seen = HashSet::new();
        for (index, line) in input.lines.iter().enumerate() {
            legs::expand_line(input.movement_type, &line_input_from_new(line))?;
            let line_no = line.line_no.unwrap_or(index as i32 + 1);
            if !seen.insert(line_no) {
                return Err(ServiceError::InvalidLine(format!(
                    "line number {} appears more than once",
                    line_no
                )));
            }
            line_nos.push(line_no);
        }

        let article_lines: Vec<ArticleLine> = input
            .lines
            .iter()
            .zip(&line_nos)
            .map(|(line, &line_no)| (line_no, line.article_id, line.lot_id))
            .collect();
        self.check_articles(self.db.as_ref(), &article_lines).await?;

        let movement_no = self.numbers.next_movement_number().await?;
        let now = Utc::now();
        let effective_at = input.effective_at.unwrap_or(now);

        let txn = self.db.begin().await?;

        let header = stock_movement::ActiveModel {
            movement_no: Set(movement_no.clone()),
            movement_type: Set(input.movement_type),
            status: Set(MovementStatus::Draft),
            effective_at: Set(effective_at),
            idempotency_key: Set(input.idempotency_key.clone()),
            source_document_type: Set(input.source_document_type.clone()),
            source_document_id: Set(input.source_document_id.clone()),
            reason_code: Set(input.reason_code.clone()),
            notes: Set(input.notes.clone()),
            created_by: Set(actor.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let movement = match header.insert(&txn).await {
            Ok(model) => model,
            Err(err) => {
                let is_unique_violation =
                    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)));
                txn.rollback().await.ok();

                if is_unique_violation {
                    if let Some(key) = input.idempotency_key.as_deref() {
                        if let Some(existing) = self.find_by_idempotency_key(key).await? {
                            info!(
                                movement_id = existing.id,
                                idempotency_key = key,
                                "duplicate create resolved to existing movement"
                            );
                            return Ok(existing);
                        }
                    }
                }
                return Err(err.into());
            }
        };

        for (line, line_no) in input.lines.iter().zip(line_nos) {
            stock_movement_line::ActiveModel {
                movement_id: Set(movement.id),
                line_no: Set(line_no),
                article_id: Set(line.article_id),
                lot_id: Set(line.lot_id),
                qty: Set(line.qty),
                unit_cost: Set(line.unit_cost),
                src_warehouse_id: Set(line.src_warehouse_id),
                src_location_id: Set(line.src_location_id),
                dst_warehouse_id: Set(line.dst_warehouse_id),
                dst_location_id: Set(line.dst_location_id),
                direction: Set(line.direction),
                notes: Set(line.notes.clone()),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        self.record_event(
            &txn,
            &movement,
            MovementEventType::Created,
            actor,
            None,
            json!({ "line_count": input.lines.len() }),
        )
        .await?;

        txn.commit().await?;

        self.emit(Event::MovementCreated {
            movement_id: movement.id,
            movement_no: movement.movement_no.clone(),
            movement_type: movement.movement_type,
            line_count: input.lines.len(),
            created_at: now,
        })
        .await;
        self.audit
            .record(
                actor,
                "stock_movement.created",
                "stock_movement",
                &movement.id.to_string(),
                json!({ "movement_no": movement_no, "movement_type": movement.movement_type }),
            )
            .await;

        Ok(movement)
    }

    /// Posts a DRAFT movement: expands its lines into legs, locks the touched
    /// balance rows in canonical order, applies the legs all-or-nothing, and
    /// appends the ledger trail.
    ///
    /// Every step runs in one transaction. Any failure (including
    /// `NEGATIVE_STOCK` on any leg) rolls the whole posting back, leaving the
    /// movement in DRAFT and balances untouched.
    #[instrument(skip(self))]
    pub async fn post_movement(
        &self,
        movement_id: i64,
        actor: &str,
    ) -> Result<stock_movement::Model, ServiceError> {
        let txn = self.db.begin().await?;

        // Header lock comes first: it serializes post-vs-post and
        // post-vs-cancel on the same movement.
        let movement = lock_header(&txn, movement_id).await?;
        if movement.status != MovementStatus::Draft {
            return Err(ServiceError::InvalidStatus(format!(
                "movement {} is {}, only DRAFT movements can be posted",
                movement.movement_no, movement.status
            )));
        }

        let lines = stock_movement_line::Entity::find()
            .filter(stock_movement_line::Column::MovementId.eq(movement_id))
            .order_by_asc(stock_movement_line::Column::LineNo)
            .all(&txn)
            .await?;
        if lines.is_empty() {
            return Err(ServiceError::EmptyMovement);
        }

        self.check_catalog(&txn, movement.movement_type, &lines)
            .await?;

        let mut planned: Vec<PlannedLeg> = Vec::new();
        for line in &lines {
            for leg in legs::expand_line(movement.movement_type, &line_input_from_model(line))? {
                planned.push(PlannedLeg {
                    key: BalanceKey::from_leg(&leg),
                    line_id: line.id,
                    leg_no: leg.leg_no,
                    delta_qty: leg.delta_qty,
                    unit_cost: line.unit_cost,
                });
            }
        }

        // Lock balance rows in canonical key order; identical ordering across
        // concurrent postings is the deadlock-avoidance invariant.
        let keys: BTreeSet<BalanceKey> = planned.iter().map(|leg| leg.key).collect();
        let mut locked: HashMap<BalanceKey, stock_balance::Model> = HashMap::new();
        for key in &keys {
            let balance = balances::ensure_and_lock(&txn, key).await?;
            locked.insert(*key, balance);
        }

        // Apply legs in (key, line, leg_no) order so the before/after chain in
        // the ledger is deterministic.
        planned.sort_by(|a, b| {
            (a.key, a.line_id, a.leg_no).cmp(&(b.key, b.line_id, b.leg_no))
        });

        let posted_at = Utc::now();
        let mut running: HashMap<BalanceKey, Decimal> = locked
            .iter()
            .map(|(key, balance)| (*key, balance.qty_on_hand))
            .collect();

        for leg in &planned {
            let qty_before = running[&leg.key];
            let qty_after = qty_before + leg.delta_qty;
            if qty_after < Decimal::ZERO {
                return Err(ServiceError::NegativeStock {
                    article_id: leg.key.article_id,
                    warehouse_id: leg.key.warehouse_id,
                    location_id: leg.key.location_id,
                    lot_id: leg.key.lot_id,
                    qty_before,
                    delta_qty: leg.delta_qty,
                });
            }

            stock_ledger_entry::ActiveModel {
                movement_id: Set(movement.id),
                movement_line_id: Set(leg.line_id),
                leg_no: Set(leg.leg_no),
                article_id: Set(leg.key.article_id),
                warehouse_id: Set(leg.key.warehouse_id),
                location_id: Set(leg.key.location_id),
                lot_id: Set(leg.key.lot_id),
                delta_qty: Set(leg.delta_qty),
                qty_before: Set(qty_before),
                qty_after: Set(qty_after),
                unit_cost: Set(leg.unit_cost),
                effective_at: Set(movement.effective_at),
                posted_at: Set(posted_at),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            running.insert(leg.key, qty_after);
        }

        for (key, qty_after) in &running {
            let balance = locked
                .remove(key)
                .ok_or_else(|| ServiceError::NotFound(format!("locked balance for {:?}", key)))?;
            balances::save_qty(&txn, balance, *qty_after).await?;
        }

        let mut header = movement.clone().into_active_model();
        header.status = Set(MovementStatus::Posted);
        header.posted_at = Set(Some(posted_at));
        header.posted_by = Set(Some(actor.to_string()));
        header.updated_at = Set(posted_at);
        let posted = header.update(&txn).await?;

        self.record_event(
            &txn,
            &posted,
            MovementEventType::Posted,
            actor,
            Some(MovementStatus::Draft),
            json!({ "leg_count": planned.len() }),
        )
        .await?;

        txn.commit().await?;

        info!(
            movement_id,
            movement_no = %posted.movement_no,
            leg_count = planned.len(),
            "movement posted"
        );
        self.emit(Event::MovementPosted {
            movement_id: posted.id,
            movement_no: posted.movement_no.clone(),
            movement_type: posted.movement_type,
            leg_count: planned.len(),
            posted_at,
        })
        .await;
        self.audit
            .record(
                actor,
                "stock_movement.posted",
                "stock_movement",
                &posted.id.to_string(),
                json!({ "movement_no": posted.movement_no, "leg_count": planned.len() }),
            )
            .await;

        Ok(posted)
    }

    /// Cancels a DRAFT movement. No ledger entries exist for drafts, so this
    /// is a pure status flip plus an event, never a compensating reversal.
    /// POSTED movements are immutable; reversal would be a new movement.
    #[instrument(skip(self))]
    pub async fn cancel_movement(
        &self,
        movement_id: i64,
        actor: &str,
    ) -> Result<stock_movement::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let movement = lock_header(&txn, movement_id).await?;
        if movement.status != MovementStatus::Draft {
            return Err(ServiceError::InvalidStatus(format!(
                "movement {} is {}, only DRAFT movements can be cancelled",
                movement.movement_no, movement.status
            )));
        }

        let now = Utc::now();
        let mut header = movement.clone().into_active_model();
        header.status = Set(MovementStatus::Cancelled);
        header.cancelled_at = Set(Some(now));
        header.cancelled_by = Set(Some(actor.to_string()));
        header.updated_at = Set(now);
        let cancelled = header.update(&txn).await?;

        self.record_event(
            &txn,
            &cancelled,
            MovementEventType::Cancelled,
            actor,
            Some(MovementStatus::Draft),
            json!({}),
        )
        .await?;

        txn.commit().await?;

        self.emit(Event::MovementCancelled {
            movement_id: cancelled.id,
            movement_no: cancelled.movement_no.clone(),
            cancelled_at: now,
        })
        .await;
        self.audit
            .record(
                actor,
                "stock_movement.cancelled",
                "stock_movement",
                &cancelled.id.to_string(),
                json!({ "movement_no": cancelled.movement_no }),
            )
            .await;

        Ok(cancelled)
    }

    /// Loads a movement with its lines, ledger entries and lifecycle events.
    pub async fn get_movement(&self, movement_id: i64) -> Result<MovementDetail, ServiceError> {
        let db = self.db.as_ref();

        let movement = stock_movement::Entity::find_by_id(movement_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("movement", movement_id))?;

        let lines = stock_movement_line::Entity::find()
            .filter(stock_movement_line::Column::MovementId.eq(movement_id))
            .order_by_asc(stock_movement_line::Column::LineNo)
            .all(db)
            .await?;

        let ledger = stock_ledger_entry::Entity::find()
            .filter(stock_ledger_entry::Column::MovementId.eq(movement_id))
            .order_by_asc(stock_ledger_entry::Column::MovementLineId)
            .order_by_asc(stock_ledger_entry::Column::LegNo)
            .all(db)
            .await?;

        let events = stock_movement_event::Entity::find()
            .filter(stock_movement_event::Column::MovementId.eq(movement_id))
            .order_by_asc(stock_movement_event::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(MovementDetail {
            movement,
            lines,
            ledger,
            events,
        })
    }

    /// Lists movements, newest first.
    pub async fn list_movements(
        &self,
        status: Option<MovementStatus>,
        movement_type: Option<MovementType>,
        page: MovementPage,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        let mut query = stock_movement::Entity::find();
        if let Some(status) = status {
            query = query.filter(stock_movement::Column::Status.eq(status));
        }
        if let Some(movement_type) = movement_type {
            query = query.filter(stock_movement::Column::MovementType.eq(movement_type));
        }

        let paginator = query
            .order_by_desc(stock_movement::Column::CreatedAt)
            .order_by_desc(stock_movement::Column::Id)
            .paginate(self.db.as_ref(), page.per_page.clamp(1, 200));
        Ok(paginator.fetch_page(page.page.max(1) - 1).await?)
    }

    /// Lists committed balances matching the filter.
    pub async fn list_balances(
        &self,
        filter: &BalanceFilter,
    ) -> Result<Vec<stock_balance::Model>, ServiceError> {
        balances::list_balances(self.db.as_ref(), filter).await
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<stock_movement::Model>, ServiceError> {
        Ok(stock_movement::Entity::find()
            .filter(stock_movement::Column::IdempotencyKey.eq(key))
            .one(self.db.as_ref())
            .await?)
    }

    /// Article/lot validation shared by draft creation and posting: the
    /// article exists and is active, lot usage matches the article's
    /// tracking flag, and a referenced lot belongs to the line's article.
    async fn check_articles<C: ConnectionTrait>(
        &self,
        conn: &C,
        lines: &[ArticleLine],
    ) -> Result<(), ServiceError> {
        let mut articles: HashMap<i64, article::Model> = HashMap::new();

        for &(line_no, article_id, lot_id) in lines {
            if !articles.contains_key(&article_id) {
                let model = article::Entity::find_by_id(article_id)
                    .one(conn)
                    .await?
                    .filter(|a| a.is_active)
                    .ok_or_else(|| {
                        ServiceError::InvalidLine(format!(
                            "line {}: article {} does not exist or is inactive",
                            line_no, article_id
                        ))
                    })?;
                articles.insert(article_id, model);
            }
            let article = &articles[&article_id];

            match (article.lot_tracking, lot_id) {
                (true, None) => {
                    return Err(ServiceError::InvalidLine(format!(
                        "line {}: article {} is lot-tracked, a lot is required",
                        line_no, article.code
                    )))
                }
                (false, Some(_)) => {
                    return Err(ServiceError::InvalidLine(format!(
                        "line {}: article {} is not lot-tracked, no lot allowed",
                        line_no, article.code
                    )))
                }
                (true, Some(lot_id)) => {
                    lot::Entity::find_by_id(lot_id)
                        .filter(lot::Column::ArticleId.eq(article_id))
                        .one(conn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::InvalidLine(format!(
                                "line {}: lot {} does not exist for article {}",
                                line_no, lot_id, article.code
                            ))
                        })?;
                }
                (false, None) => {}
            }
        }

        Ok(())
    }

    /// Catalog validation for a posting: the article/lot checks re-run (the
    /// catalog can change after the draft is created), every referenced
    /// location exists under its stated warehouse, and SCRAP destinations
    /// carry the scrap flag.
    async fn check_catalog(
        &self,
        txn: &DatabaseTransaction,
        movement_type: MovementType,
        lines: &[stock_movement_line::Model],
    ) -> Result<(), ServiceError> {
        let article_lines: Vec<ArticleLine> = lines
            .iter()
            .map(|line| (line.line_no, line.article_id, line.lot_id))
            .collect();
        self.check_articles(txn, &article_lines).await?;

        for line in lines {
            if let (Some(warehouse_id), Some(location_id)) =
                (line.src_warehouse_id, line.src_location_id)
            {
                check_location(txn, warehouse_id, location_id, line.line_no).await?;
            }
            if let (Some(warehouse_id), Some(location_id)) =
                (line.dst_warehouse_id, line.dst_location_id)
            {
                let location = check_location(txn, warehouse_id, location_id, line.line_no).await?;
                if movement_type == MovementType::Scrap && !location.is_scrap {
                    return Err(ServiceError::InvalidScrapDestination(format!(
                        "line {}: location {} is not flagged as scrap",
                        line.line_no, location.code
                    )));
                }
            }
        }

        Ok(())
    }

    async fn record_event(
        &self,
        txn: &DatabaseTransaction,
        movement: &stock_movement::Model,
        event_type: MovementEventType,
        actor: &str,
        status_before: Option<MovementStatus>,
        details: serde_json::Value,
    ) -> Result<(), ServiceError> {
        stock_movement_event::ActiveModel {
            id: Set(Uuid::new_v4()),
            movement_id: Set(movement.id),
            event_type: Set(event_type),
            actor: Set(actor.to_string()),
            status_before: Set(status_before.map(|s| s.to_string())),
            status_after: Set(movement.status.to_string()),
            details: Set(Some(details)),
            created_at: Set(Utc::now()),
        }
        .insert(txn)
        .await?;
        Ok(())
    }

    /// The transition is already committed by the time events go out, so a
    /// closed channel is logged, not surfaced to the caller.
    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("failed to publish movement event: {}", e);
        }
    }
}

/// Locks the movement header row for update.
async fn lock_header(
    txn: &DatabaseTransaction,
    movement_id: i64,
) -> Result<stock_movement::Model, ServiceError> {
    stock_movement::Entity::find_by_id(movement_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("movement", movement_id))
}

async fn check_location(
    txn: &DatabaseTransaction,
    warehouse_id: i64,
    location_id: i64,
    line_no: i32,
) -> Result<stock_location::Model, ServiceError> {
    stock_location::Entity::find_by_id(location_id)
        .filter(stock_location::Column::WarehouseId.eq(warehouse_id))
        .one(txn)
        .await?
        .ok_or_else(|| {
            ServiceError::InvalidLocation(format!(
                "line {}: location {} does not exist in warehouse {}",
                line_no, location_id, warehouse_id
            ))
        })
}

fn line_input_from_new(line: &NewMovementLine) -> LineInput {
    LineInput {
        article_id: line.article_id,
        lot_id: line.lot_id,
        qty: line.qty,
        src_warehouse_id: line.src_warehouse_id,
        src_location_id: line.src_location_id,
        dst_warehouse_id: line.dst_warehouse_id,
        dst_location_id: line.dst_location_id,
        direction: line.direction,
    }
}

fn line_input_from_model(line: &stock_movement_line::Model) -> LineInput {
    LineInput {
        article_id: line.article_id,
        lot_id: line.lot_id,
        qty: line.qty,
        src_warehouse_id: line.src_warehouse_id,
        src_location_id: line.src_location_id,
        dst_warehouse_id: line.dst_warehouse_id,
        dst_location_id: line.dst_location_id,
        direction: line.direction,
    }
}
