//! Identity of the logged-in user.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Identity handed to the admin shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub email: Option<String>,
}

/// Who-am-i response body.
///
/// Both the OIDC agent (`/web/user_info`) and the API server
/// (`/api/users/me`) shapes are accepted. Each key is its own field, so a
/// body carrying both spellings still decodes; precedence is applied when
/// mapping to [`Identity`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl TryFrom<UserInfo> for Identity {
    type Error = AuthError;

    fn try_from(info: UserInfo) -> Result<Self, Self::Error> {
        // `id` wins over `sub`, which wins over `subject`.
        let id = non_empty(info.id)
            .or_else(|| non_empty(info.sub))
            .or_else(|| non_empty(info.subject))
            .ok_or_else(|| AuthError::Protocol("user info has no subject".to_string()))?;

        let full_name = non_empty(info.full_name)
            .or_else(|| non_empty(info.preferred_username))
            .or_else(|| {
                let joined = [info.given_name, info.family_name]
                    .into_iter()
                    .flatten()
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                non_empty(Some(joined))
            });

        Ok(Identity {
            id,
            full_name,
            avatar: non_empty(info.avatar).or_else(|| non_empty(info.picture)),
            email: non_empty(info.email),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_oidc_agent_shape() {
        let info: UserInfo = serde_json::from_value(serde_json::json!({
            "sub": "8d3e",
            "preferred_username": "alice",
            "given_name": "Alice",
            "family_name": "Liddell",
            "picture": "https://img.example/a.png",
            "updated_at": 1700000000
        }))
        .unwrap();

        let identity = Identity::try_from(info).unwrap();
        assert_eq!(identity.id, "8d3e");
        assert_eq!(identity.full_name.as_deref(), Some("alice"));
        assert_eq!(identity.avatar.as_deref(), Some("https://img.example/a.png"));
        assert_eq!(identity.email, None);
    }

    #[test]
    fn maps_api_server_shape() {
        let info: UserInfo = serde_json::from_value(serde_json::json!({
            "id": "u-1",
            "full_name": "Bob Smith",
            "email": "bob@example.com"
        }))
        .unwrap();

        let identity = Identity::try_from(info).unwrap();
        assert_eq!(identity.id, "u-1");
        assert_eq!(identity.full_name.as_deref(), Some("Bob Smith"));
        assert_eq!(identity.email.as_deref(), Some("bob@example.com"));
    }

    #[test]
    fn id_takes_precedence_over_sub() {
        let info: UserInfo = serde_json::from_value(serde_json::json!({
            "id": "u-1",
            "sub": "8d3e",
            "full_name": "Bob Smith",
            "preferred_username": "bob",
            "avatar": "https://img.example/b.png",
            "picture": "https://img.example/other.png"
        }))
        .unwrap();

        let identity = Identity::try_from(info).unwrap();
        assert_eq!(identity.id, "u-1");
        assert_eq!(identity.full_name.as_deref(), Some("Bob Smith"));
        assert_eq!(identity.avatar.as_deref(), Some("https://img.example/b.png"));
    }

    #[test]
    fn blank_id_falls_back_to_subject() {
        let info = UserInfo {
            id: Some(" ".to_string()),
            subject: Some("s-9".to_string()),
            ..Default::default()
        };
        assert_eq!(Identity::try_from(info).unwrap().id, "s-9");
    }

    #[test]
    fn falls_back_to_given_and_family_name() {
        let info = UserInfo {
            id: Some("x".to_string()),
            given_name: Some("Ada".to_string()),
            family_name: Some("Lovelace".to_string()),
            ..Default::default()
        };
        let identity = Identity::try_from(info).unwrap();
        assert_eq!(identity.full_name.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn missing_subject_is_protocol_error() {
        let result = Identity::try_from(UserInfo::default());
        assert!(matches!(result, Err(AuthError::Protocol(_))));
    }
}
