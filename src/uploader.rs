//! Upload collaborator interface (spec §4.3 / §6).

use crate::error::ErrorModel;
use crate::record::ResponseRecord;
use async_trait::async_trait;

/// Delivers one record to the remote service. Implementations own transport
/// deadlines and must surface [`ErrorModel::Timeout`] themselves — the engine
/// imposes no upload-level timeout. Must not mutate the record.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, record: &ResponseRecord) -> Result<(), ErrorModel>;
}
