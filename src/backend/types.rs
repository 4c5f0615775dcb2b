//! Backend wire types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct AskLlmRequest<'a> {
    pub question: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct AskLlmResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct UserMessageRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct PendingMessagesResponse {
    #[serde(default)]
    pub messages: Vec<String>,
}

/// A friend record from `/random-friend`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Friend {
    pub name: String,
    pub ens_address: String,
}

impl Friend {
    /// The chat line announcing this friend.
    pub fn introduction(&self) -> String {
        format!("Meet {} : {}. Have fun!", self.name, self.ens_address)
    }
}

/// Lenient shape so a missing field is reported as a malformed payload
/// instead of a JSON error.
#[derive(Debug, Deserialize)]
pub(super) struct RawFriend {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    ens_address: Option<String>,
}

impl RawFriend {
    pub fn into_friend(self) -> Option<Friend> {
        match (self.name, self.ens_address) {
            (Some(name), Some(ens_address)) if !name.is_empty() && !ens_address.is_empty() => {
                Some(Friend { name, ens_address })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn introduction_format() {
        let f = Friend { name: "vitalik".into(), ens_address: "vitalik.eth".into() };
        assert_eq!(f.introduction(), "Meet vitalik : vitalik.eth. Have fun!");
    }

    #[test]
    fn raw_friend_requires_both_fields() {
        let missing: RawFriend = serde_json::from_str(r#"{"ens_address":"x.eth"}"#).unwrap();
        assert!(missing.into_friend().is_none());

        let empty: RawFriend = serde_json::from_str(r#"{"name":"","ens_address":"x.eth"}"#).unwrap();
        assert!(empty.into_friend().is_none());

        let ok: RawFriend = serde_json::from_str(r#"{"name":"x","ens_address":"x.eth","extra":1}"#).unwrap();
        assert_eq!(ok.into_friend().unwrap().name, "x");
    }
}
