pub mod classify;
pub mod evaluation;
pub mod memo;
pub mod numeric;
pub mod ranking;
pub mod report;
pub mod residual;
pub mod resolver;
pub mod session;

pub use crate::domain::model::{EyeMeasurement, EyePair, RankedOutcome, TableId, TableRow};
pub use crate::domain::ports::{ConfigProvider, ReferenceTableProvider};
pub use crate::utils::error::Result;
