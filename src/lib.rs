pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod providers;
pub mod proxy;
pub mod relay;
pub mod server;

pub use config::RelayConfig;
pub use error::{ErrorEnvelope, RelayError, Result};
pub use logging::SharedJournal;
pub use server::{build_router, AppState};
