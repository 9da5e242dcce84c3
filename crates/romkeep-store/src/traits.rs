//! Store trait definitions

use romkeep_api::RomRecord;
use romkeep_util::RomFile;

use crate::StoreResult;

/// Main store trait
pub trait RomStore: Send + Sync {
    /// Point lookup; `None` for a file never saved
    fn load(&self, file: &RomFile) -> StoreResult<Option<RomRecord>>;

    /// Every record, most recently played first
    fn load_all(&self) -> StoreResult<Vec<RomRecord>>;

    /// Upsert with merge (see [`crate::merge_record`])
    fn save(&self, record: &RomRecord) -> StoreResult<()>;

    /// Delete a record; deleting an absent file is not an error
    fn remove(&self, file: &RomFile) -> StoreResult<()>;

    /// Current value of the store-wide change counter
    fn change_counter(&self) -> StoreResult<i64>;

    /// Whether another process changed the store since this one last looked
    fn is_external_change_pending(&self) -> StoreResult<bool>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
