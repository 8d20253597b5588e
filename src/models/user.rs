use serde::{Deserialize, Serialize};

// the identity returned by the platform's auth service
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated owner together with the token that proves it.
#[derive(Clone, Debug)]
pub struct Session {
    pub user: User,
    pub access_token: String,
}
