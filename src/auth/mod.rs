pub mod policy;

use crate::models::UserRow;

/// Identity attached to a connection or request once its credential checks out.
/// Built once by the gatekeeper or the auth middleware and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub is_admin: bool,
}

impl From<UserRow> for AuthUser {
    fn from(user: UserRow) -> Self {
        let is_admin = user.is_admin();
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            avatar: user.avatar,
            is_admin,
        }
    }
}
