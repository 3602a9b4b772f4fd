pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use crate::config::ConsultConfig;
pub use crate::core::{
    evaluation::{evaluate_eye, evaluate_pair},
    ranking::EligibilityRanker,
    report::ConsultationReport,
    resolver::{AblationResolver, TableSnapshot},
    session::ConsultationSession,
};
pub use utils::error::{ConsultError, Result};
