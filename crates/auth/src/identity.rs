use serde::Serialize;

use boardroom_core::UserId;

use crate::User;

/// The authenticated principal for one request.
///
/// Produced by the session resolver and passed explicitly into every board
/// operation. Never cached across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}
