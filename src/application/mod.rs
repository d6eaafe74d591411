// Application layer - use cases and orchestration.
// Every mutation runs as one storage unit of work; the engine module holds
// the steps those units are built from.

pub mod config;
mod engine;
pub mod error;
pub mod reporting;
pub mod service;
pub mod withdrawals;

pub use config::*;
pub use error::*;
pub use reporting::*;
pub use service::*;
pub use withdrawals::*;
