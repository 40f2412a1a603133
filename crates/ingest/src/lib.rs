mod clock;
mod cycle;
mod helix;
mod scheduler;
mod source;
mod types;

pub use clock::{Clock, SystemClock};
pub use cycle::{CycleState, Engine};
pub use helix::{DEFAULT_API_BASE, DEFAULT_AUTH_URL, HelixClient, HelixConfig, MAX_PAGE_SIZE};
pub use scheduler::{Scheduler, SchedulerTick};
pub use source::{CredentialSource, LiveSource, StreamPage, StreamRecord};
pub use types::{CycleOutcome, CycleStage, CycleStats, EngineSettings, IngestError, Result};
