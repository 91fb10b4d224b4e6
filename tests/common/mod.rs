#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};

use stockledger::db::{self, DbConfig, DbPool};
use stockledger::entities::{article, lot, stock_location, warehouse};
use stockledger::{EventSender, MovementService, TimestampSequence, TracingAuditSink};

pub struct TestApp {
    pub db: Arc<DbPool>,
    pub service: MovementService,
}

/// Boots an in-memory SQLite database with migrations applied and a wired
/// movement service. The pool is capped at one connection so every operation
/// sees the same in-memory database.
pub async fn setup() -> TestApp {
    stockledger::logging::init("info");

    let config = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        connect_timeout: Duration::from_secs(5),
        idle_timeout: Duration::from_secs(60),
        acquire_timeout: Duration::from_secs(30),
    };
    let pool = db::establish_connection_with_config(&config)
        .await
        .expect("db connect");
    db::run_migrations(&pool).await.expect("migrations");

    let db = Arc::new(pool);
    let service = MovementService::new(
        db.clone(),
        EventSender::spawn(100),
        Arc::new(TimestampSequence::new()),
        Arc::new(TracingAuditSink),
    );

    TestApp { db, service }
}

pub async fn seed_article(db: &DbPool, code: &str, lot_tracking: bool) -> i64 {
    let now = Utc::now();
    article::ActiveModel {
        code: Set(code.to_string()),
        description: Set(None),
        lot_tracking: Set(lot_tracking),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed article")
    .id
}

pub async fn seed_warehouse(db: &DbPool, code: &str) -> i64 {
    let now = Utc::now();
    warehouse::ActiveModel {
        code: Set(code.to_string()),
        name: Set(format!("Warehouse {}", code)),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed warehouse")
    .id
}

pub async fn seed_location(db: &DbPool, warehouse_id: i64, code: &str, is_scrap: bool) -> i64 {
    let now = Utc::now();
    stock_location::ActiveModel {
        warehouse_id: Set(warehouse_id),
        code: Set(code.to_string()),
        is_scrap: Set(is_scrap),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed location")
    .id
}

pub async fn deactivate_article(db: &DbPool, article_id: i64) {
    let model = article::Entity::find_by_id(article_id)
        .one(db)
        .await
        .expect("find article")
        .expect("article exists");
    let mut active = model.into_active_model();
    active.is_active = Set(false);
    active.update(db).await.expect("deactivate article");
}

pub async fn seed_lot(db: &DbPool, article_id: i64, lot_number: &str) -> i64 {
    let now = Utc::now();
    lot::ActiveModel {
        article_id: Set(article_id),
        lot_number: Set(lot_number.to_string()),
        expiration_date: Set(None),
        notes: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed lot")
    .id
}
