use crate::transfer::TransferRequest;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub enum Event {
    ModelReply {
        request_id: Uuid,
        result: Result<String, String>,
    },
    TransferFinished {
        job_id: Uuid,
        request: TransferRequest,
        result: Result<u64, String>,
    },
}

#[derive(Clone, Debug)]
pub struct EventBus {
    sender: mpsc::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub async fn send(&self, event: Event) {
        let _ = self.sender.send(event).await;
    }
}
