//! The narrow view of an authenticated session the engine needs. The
//! Microsoft/Yggdrasil flows and the on-disk session store are external
//! collaborators (spec §1); this is only the bearer-token-shaped value
//! they hand the engine before an install/launch.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthSession {
    pub auth_player_name: String,
    pub auth_uuid: String,
    pub auth_access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_xuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_session: Option<String>,
    pub user_type: String,
    pub clientid: String,
}

impl AuthSession {
    /// An offline/demo session, the way a CLI would build one when no
    /// account is configured.
    pub fn offline(player_name: impl Into<String>) -> Self {
        Self {
            auth_player_name: player_name.into(),
            auth_uuid: uuid::Uuid::new_v4().to_string(),
            auth_access_token: String::new(),
            auth_xuid: None,
            auth_session: None,
            user_type: "legacy".to_string(),
            clientid: String::new(),
        }
    }
}
