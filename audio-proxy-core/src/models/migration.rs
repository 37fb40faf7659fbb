use std::collections::HashMap;

use crate::traits::handle_backend::Handle;

/// Old handle → new handle, total over the handles that were live when a
/// pool was migrated.
pub type MigrationMapping = HashMap<Handle, Handle>;

/// Result of copying one registry's live handles into its successor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InheritOutcome {
    pub mapping: MigrationMapping,
    /// Old handles whose state could not be fully re-applied.
    pub degraded: Vec<Handle>,
}

/// Summary of a completed device migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub buffers: MigrationMapping,
    pub sources: MigrationMapping,
    pub degraded_buffers: Vec<Handle>,
    pub degraded_sources: Vec<Handle>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.degraded_buffers.is_empty() && self.degraded_sources.is_empty()
    }
}
