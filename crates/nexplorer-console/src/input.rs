use crate::render;
use async_trait::async_trait;
use nexplorer_core::{Confirmer, Prompt};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Lines typed by the user. The console loop and the confirmer share one
/// reader, so a y/n answer is never taken as a request.
#[derive(Clone)]
pub struct InputLines {
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl InputLines {
    pub fn from_receiver(rx: mpsc::Receiver<String>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn spawn_stdin() -> Self {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            debug!("stdin closed");
        });
        Self::from_receiver(rx)
    }

    pub async fn next_line(&self) -> Option<String> {
        self.rx.lock().await.recv().await
    }
}

pub struct ConsoleConfirmer {
    input: InputLines,
}

impl ConsoleConfirmer {
    pub fn new(input: InputLines) -> Self {
        Self { input }
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[async_trait]
impl Confirmer for ConsoleConfirmer {
    async fn confirm(&self, prompt: &Prompt) -> bool {
        if render::print_prompt(prompt).is_err() {
            return false;
        }
        match self.input.next_line().await {
            Some(answer) => is_yes(&answer),
            None => false,
        }
    }
}
