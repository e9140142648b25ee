//! Namespace matching.
//!
//! A subscription to `/pets` receives everything published under
//! `/pets/dogs`, `/pets/cats`, and so on. The default rule is a raw byte
//! prefix comparison, so `/pet` also receives `/petstore`. Segment-aware
//! matching is available as an explicit opt-in.

use serde::{Deserialize, Serialize};

/// Rule used to decide whether a connection receives a message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Message namespace starts with the connection namespace (byte-wise).
    #[default]
    Prefix,
    /// Like `Prefix`, but the match must end on a `/` segment boundary.
    Segment,
}

impl MatchMode {
    /// Whether a connection subscribed to `subscription` receives a message
    /// published to `topic`.
    pub fn matches(self, subscription: &str, topic: &str) -> bool {
        match self {
            Self::Prefix => prefix_matches(subscription, topic),
            Self::Segment => segment_matches(subscription, topic),
        }
    }

    /// Parse a mode name (`"prefix"` or `"segment"`, case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "prefix" => Some(Self::Prefix),
            "segment" => Some(Self::Segment),
            _ => None,
        }
    }
}

/// Plain byte-wise prefix test.
pub fn prefix_matches(subscription: &str, topic: &str) -> bool {
    topic.as_bytes().starts_with(subscription.as_bytes())
}

/// Prefix test bounded to path segments: `/pet` matches `/pet` and
/// `/pet/x`, never `/petstore`.
pub fn segment_matches(subscription: &str, topic: &str) -> bool {
    match topic.strip_prefix(subscription) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || subscription.ends_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_namespace_matches() {
        assert!(MatchMode::Prefix.matches("/foo", "/foo"));
        assert!(MatchMode::Segment.matches("/foo", "/foo"));
    }

    #[test]
    fn child_namespace_matches_parent_subscription() {
        assert!(MatchMode::Prefix.matches("/pets", "/pets/dogs"));
        assert!(MatchMode::Segment.matches("/pets", "/pets/dogs"));
    }

    #[test]
    fn parent_namespace_does_not_reach_child_subscription() {
        assert!(!MatchMode::Prefix.matches("/pets/dogs", "/pets"));
        assert!(!MatchMode::Segment.matches("/pets/dogs", "/pets"));
    }

    #[test]
    fn sibling_does_not_match() {
        assert!(!MatchMode::Prefix.matches("/pets/cats", "/pets/dogs"));
    }

    #[test]
    fn prefix_crosses_segment_boundary() {
        assert!(MatchMode::Prefix.matches("/pet", "/petstore"));
    }

    #[test]
    fn segment_stops_at_boundary() {
        assert!(!MatchMode::Segment.matches("/pet", "/petstore"));
        assert!(MatchMode::Segment.matches("/pet", "/pet/store"));
    }

    #[test]
    fn root_subscription_receives_everything() {
        assert!(MatchMode::Prefix.matches("/", "/anything/at/all"));
        assert!(MatchMode::Segment.matches("/", "/anything/at/all"));
    }

    #[test]
    fn default_is_prefix() {
        assert_eq!(MatchMode::default(), MatchMode::Prefix);
    }

    #[test]
    fn parse_mode_names() {
        assert_eq!(MatchMode::parse("prefix"), Some(MatchMode::Prefix));
        assert_eq!(MatchMode::parse("SEGMENT"), Some(MatchMode::Segment));
        assert_eq!(MatchMode::parse("glob"), None);
    }

    #[test]
    fn serde_lowercase() {
        let json = serde_json::to_string(&MatchMode::Segment).unwrap();
        assert_eq!(json, "\"segment\"");
        let back: MatchMode = serde_json::from_str("\"prefix\"").unwrap();
        assert_eq!(back, MatchMode::Prefix);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prefix_is_starts_with(sub in "[/a-c]{0,6}", topic in "[/a-c]{0,8}") {
                prop_assert_eq!(
                    MatchMode::Prefix.matches(&sub, &topic),
                    topic.as_bytes().starts_with(sub.as_bytes())
                );
            }

            #[test]
            fn namespace_matches_its_own_children(ns in "(/[a-z]{1,4}){1,3}", child in "(/[a-z]{1,4}){0,2}") {
                let topic = format!("{ns}{child}");
                prop_assert!(MatchMode::Prefix.matches(&ns, &topic));
                prop_assert!(MatchMode::Segment.matches(&ns, &topic));
            }

            #[test]
            fn segment_implies_prefix(sub in "[/a-c]{0,6}", topic in "[/a-c]{0,8}") {
                if MatchMode::Segment.matches(&sub, &topic) {
                    prop_assert!(MatchMode::Prefix.matches(&sub, &topic));
                }
            }
        }
    }
}
