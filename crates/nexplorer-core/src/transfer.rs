use crate::error::CoreError;
use crate::events::{Event, EventBus};
use crate::executor::CommandExecutor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ToHost,
    ToClient,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::ToHost => "to_host",
            Direction::ToClient => "to_client",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferOrigin {
    Model,
    User,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub source: String,
    pub destination: String,
    pub direction: Direction,
    pub origin: TransferOrigin,
}

impl TransferRequest {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        direction: Direction,
        origin: TransferOrigin,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            direction,
            origin,
        }
    }
}

struct TransferJob {
    id: Uuid,
    request: TransferRequest,
}

/// One worker, FIFO: at most one transfer runs at a time.
#[derive(Clone)]
pub struct TransferQueue {
    sender: mpsc::Sender<TransferJob>,
}

impl TransferQueue {
    pub fn new(executor: Arc<CommandExecutor>, bus: EventBus, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<TransferJob>(capacity.max(1));
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                info!(job_id = %job.id, source = %job.request.source, "transfer start");
                let result = executor.transfer(&job.request).await;
                if let Err(ref err) = result {
                    error!(job_id = %job.id, error = %err, "transfer failed");
                }
                bus.send(Event::TransferFinished {
                    job_id: job.id,
                    request: job.request,
                    result: result.map_err(|e| e.to_string()),
                })
                .await;
            }
        });
        Self { sender: tx }
    }

    pub async fn enqueue(&self, request: TransferRequest) -> Result<Uuid, CoreError> {
        let id = Uuid::new_v4();
        self.sender
            .send(TransferJob { id, request })
            .await
            .map_err(|e| CoreError::Transfer(e.to_string()))?;
        Ok(id)
    }
}
