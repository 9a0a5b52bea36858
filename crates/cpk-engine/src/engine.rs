use std::sync::Arc;

use cpk_schedule::IndexRateProvider;
use cpk_schemas::{CoreError, CoreResult, WorkspaceId};
use cpk_store::Store;

use crate::settings::EngineSettings;

/// Cheap to clone; all state lives behind the store.
#[derive(Clone)]
pub struct Engine {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) rates: Arc<dyn IndexRateProvider>,
    pub(crate) settings: EngineSettings,
}

impl Engine {
    pub fn new(
        store: Arc<dyn Store>,
        rates: Arc<dyn IndexRateProvider>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            rates,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

/// Rows handed in by a caller must belong to the workspace the call is for.
pub(crate) fn ensure_tenant(ws: WorkspaceId, row_ws: WorkspaceId, what: &str) -> CoreResult<()> {
    if row_ws != ws {
        return Err(CoreError::invalid(format!(
            "{what} belongs to workspace {row_ws}, not {ws}"
        )));
    }
    Ok(())
}
