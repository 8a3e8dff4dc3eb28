pub mod engine;
pub mod entity;
pub mod mappers;
pub mod orchestrator;
pub mod recurring;
pub mod scheduler;

pub use engine::{SaveEngine, SaveReport};
pub use entity::EntityType;
pub use orchestrator::{SyncOrchestrator, SyncSummary};
pub use recurring::RefreshClass;
pub use scheduler::{SyncOutcome, SyncScheduler, SyncState};
