use crate::error::CoreError;
use crate::transfer::TransferRequest;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub message: String,
}

#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &Prompt) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmStage {
    InitialAccess,
    FinalAuthorization,
}

impl ConfirmStage {
    pub fn number(&self) -> u8 {
        match self {
            ConfirmStage::InitialAccess => 1,
            ConfirmStage::FinalAuthorization => 2,
        }
    }
}

/// Two confirmations, in order, for every copy regardless of direction.
/// The second is only shown once the first is accepted.
#[derive(Clone)]
pub struct PermissionGate {
    confirmer: Arc<dyn Confirmer>,
}

impl PermissionGate {
    pub fn new(confirmer: Arc<dyn Confirmer>) -> Self {
        Self { confirmer }
    }

    pub async fn authorize(&self, request: &TransferRequest) -> Result<(), CoreError> {
        for stage in [ConfirmStage::InitialAccess, ConfirmStage::FinalAuthorization] {
            let prompt = stage_prompt(stage, request);
            if !self.confirmer.confirm(&prompt).await {
                info!(stage = stage.number(), source = %request.source, "copy rejected");
                return Err(CoreError::PermissionDenied { stage });
            }
        }
        info!(source = %request.source, destination = %request.destination, "copy authorized");
        Ok(())
    }
}

fn stage_prompt(stage: ConfirmStage, request: &TransferRequest) -> Prompt {
    match stage {
        ConfirmStage::InitialAccess => Prompt {
            title: "Permission Request 1/2".to_string(),
            message: format!(
                "AI wants to copy ({}):\n{} -> {}\n\nAllow initial access?",
                request.direction.label(),
                request.source,
                request.destination
            ),
        },
        ConfirmStage::FinalAuthorization => Prompt {
            title: "Final Authorization 2/2".to_string(),
            message: format!(
                "Confirming write operation to {}.\nThis action is irreversible.\nProceed?",
                request.destination
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConfirmer;
    use crate::transfer::{Direction, TransferOrigin};

    fn request(direction: Direction) -> TransferRequest {
        TransferRequest::new("/a", "/b", direction, TransferOrigin::Model)
    }

    #[tokio::test]
    async fn both_stages_required_in_every_direction() {
        for direction in [Direction::ToHost, Direction::ToClient] {
            for answers in [[false, false], [false, true], [true, false], [true, true]] {
                let confirmer = Arc::new(ScriptedConfirmer::new(answers));
                let gate = PermissionGate::new(confirmer.clone());
                let result = gate.authorize(&request(direction)).await;
                assert_eq!(result.is_ok(), answers == [true, true], "{direction:?} {answers:?}");
            }
        }
    }

    #[tokio::test]
    async fn rejection_names_the_stage() {
        let confirmer = Arc::new(ScriptedConfirmer::new([true, false]));
        let gate = PermissionGate::new(confirmer.clone());
        let err = gate.authorize(&request(Direction::ToHost)).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::PermissionDenied {
                stage: ConfirmStage::FinalAuthorization
            }
        ));
        assert_eq!(err.to_string(), "copy aborted at stage 2");
    }

    #[tokio::test]
    async fn second_stage_not_shown_after_first_rejection() {
        let confirmer = Arc::new(ScriptedConfirmer::new([false, true]));
        let gate = PermissionGate::new(confirmer.clone());
        let _ = gate.authorize(&request(Direction::ToClient)).await;
        let asked = confirmer.asked();
        assert_eq!(asked.len(), 1);
        assert_eq!(asked[0].title, "Permission Request 1/2");
        assert!(asked[0].message.contains("/a -> /b"));
    }
}
