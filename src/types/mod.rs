mod dataset;
mod message;
mod step;

pub use dataset::{DatasetInfo, DatasetList, DatasetSample, HealthStatus};
pub use message::{ExecuteRequest, MessageParseError, ServerMessage, StreamFailure};
pub use step::{Step, StepType};
