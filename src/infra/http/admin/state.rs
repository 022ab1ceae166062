use std::sync::Arc;

use crate::application::admin::{AdminContentService, AdminGroupService};
use crate::infra::cache::ResponseCache;

#[derive(Clone)]
pub struct AdminState {
    pub groups: Arc<AdminGroupService>,
    pub content: Arc<AdminContentService>,
    /// Shared with the public listener so an operator can drop stale index pages.
    pub index_cache: ResponseCache,
    pub display_length: usize,
}
