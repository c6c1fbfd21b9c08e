use std::sync::Arc;

use crate::config::AppConfig;
use crate::service::MeshService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: MeshService,
}
