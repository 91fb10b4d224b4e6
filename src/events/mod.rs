use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use crate::entities::MovementType;

/// Events published by the posting engine after a lifecycle transition has
/// committed. Consumers (projections, notifications, integrations) must treat
/// them as at-least-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    MovementCreated {
        movement_id: i64,
        movement_no: String,
        movement_type: MovementType,
        line_count: usize,
        created_at: DateTime<Utc>,
    },
    MovementPosted {
        movement_id: i64,
        movement_no: String,
        movement_type: MovementType,
        leg_count: usize,
        posted_at: DateTime<Utc>,
    },
    MovementCancelled {
        movement_id: i64,
        movement_no: String,
        cancelled_at: DateTime<Utc>,
    },
}

impl Event {
    pub fn movement_id(&self) -> i64 {
        match self {
            Event::MovementCreated { movement_id, .. }
            | Event::MovementPosted { movement_id, .. }
            | Event::MovementCancelled { movement_id, .. } => *movement_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Convenience constructor wiring a sender to a spawned consumer loop.
    pub fn spawn(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        tokio::spawn(process_events(rx));
        Self::new(tx)
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumer loop for movement events. Runs until all senders are dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting movement event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::MovementCreated {
                movement_id,
                movement_no,
                movement_type,
                line_count,
                ..
            } => {
                info!(
                    movement_id,
                    %movement_no,
                    %movement_type,
                    line_count,
                    "movement created"
                );
            }
            Event::MovementPosted {
                movement_id,
                movement_no,
                leg_count,
                ..
            } => {
                info!(movement_id, %movement_no, leg_count, "movement posted");
            }
            Event::MovementCancelled {
                movement_id,
                movement_no,
                ..
            } => {
                info!(movement_id, %movement_no, "movement cancelled");
            }
        }
    }

    info!("Movement event processing loop stopped");
}
