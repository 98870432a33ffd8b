pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod types;

pub use config::MedwayConfig;
pub use error::{MedwayError, Result};
pub use events::{DomainEvent, EventBus};
pub use session::{SessionGuard, SessionToken};
pub use types::*;
