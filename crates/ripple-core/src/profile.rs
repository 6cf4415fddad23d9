//! Display profile resolved for outbound payload enrichment.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// The display fields resolved for a user when enriching an outbound
/// payload (live `new_message` events, notification bodies).
///
/// Profile storage and editing belong to the account system; this core only
/// reads these four fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// User identifier.
    pub user_id: UserId,
    /// Unique handle.
    pub username: String,
    /// Human-readable display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar image reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_camel_case() {
        let profile = Profile {
            user_id: UserId::from("u1"),
            username: "ada".into(),
            display_name: Some("Ada L.".into()),
            avatar: Some("/avatars/ada.png".into()),
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["displayName"], "Ada L.");
    }

    #[test]
    fn optional_fields_omitted() {
        let profile = Profile {
            user_id: UserId::from("u2"),
            username: "grace".into(),
            display_name: None,
            avatar: None,
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("displayName"));
        assert!(!json.contains("avatar"));
    }
}
