use crate::state::ChannelUpdate;
use crate::types::{DatasetList, DatasetSample, HealthStatus};

/// Everything background tasks report back to the UI thread.
#[derive(Debug)]
pub enum UiUpdate {
    Channel(ChannelUpdate),
    SampleLoaded(DatasetSample),
    DatasetsListed(DatasetList),
    HealthChecked(HealthStatus),
    Error(String),
}
