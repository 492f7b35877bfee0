//! REST API endpoints.

pub mod accounts;
pub mod institutions;
pub mod queues;
pub mod swaps;
pub mod tokens;

use crate::core::token::UserId;
use crate::directory::Directory;

/// Display name for a user id in read models. Falls back rather than
/// failing a whole dashboard over one missing row.
pub(crate) fn user_display_name(directory: &Directory, id: UserId) -> String {
    directory
        .get_user(id)
        .ok()
        .flatten()
        .map(|u| u.name)
        .unwrap_or_else(|| "Unknown".to_string())
}
