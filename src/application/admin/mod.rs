//! Application services for the administrative surface.

pub mod content;
pub mod groups;

pub use content::{AdminContentError, AdminContentService, AdminPostRow};
pub use groups::{AdminGroupError, AdminGroupService, CreateGroupCommand};
