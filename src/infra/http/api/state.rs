use std::sync::Arc;

use crate::application::activity::ActivityService;
use crate::application::resources::ResourceService;

#[derive(Clone)]
pub struct ApiState {
    pub resources: Arc<ResourceService>,
    pub activity: Arc<ActivityService>,
}
