use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use classroll_models::ClassId;

/// Query parameters for counter reconciliation.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ReconcileParams {
    /// Restrict the pass to one section; omit to check every section
    pub class_id: Option<Uuid>,
}

impl ReconcileParams {
    pub fn class_id(&self) -> Option<ClassId> {
        self.class_id.map(ClassId::from)
    }
}
