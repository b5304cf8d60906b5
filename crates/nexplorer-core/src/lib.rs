pub mod action;
pub mod backend;
pub mod browser;
pub mod error;
pub mod events;
pub mod executor;
pub mod helper;
pub mod history;
pub mod listing;
pub mod model;
pub mod path;
pub mod permission;
pub mod remote;
pub mod router;
pub mod session;
pub mod state;
pub mod transfer;

#[cfg(test)]
mod testing;

pub use action::{parse_action, ActionRequest};
pub use backend::{ConnectionMode, LocalBackend, ShellBackend};
pub use browser::Browser;
pub use error::CoreError;
pub use events::{Event, EventBus};
pub use executor::{CommandExecutor, Preview, PreviewBody};
pub use history::NavigationHistory;
pub use listing::{parse_listing, DirectoryEntry, EntryKind};
pub use model::{spawn_request, HttpModelClient, ModelClient, ModelRequest};
pub use permission::{ConfirmStage, Confirmer, PermissionGate, Prompt};
pub use remote::RemoteBackend;
pub use router::{ActionRouter, DispatchOutcome, PendingRequest};
pub use session::{establish, ConnectionContext};
pub use state::{ActivityLog, LogEntry, LogLevel, RouterPhase, SessionState};
pub use transfer::{Direction, TransferOrigin, TransferQueue, TransferRequest};
