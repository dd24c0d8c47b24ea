//! Content reference and field types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of content entity a campaign can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Page,
    Post,
    SocialProfile,
    ExternalLink,
}

impl ContentKind {
    /// Returns the string representation for API responses and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Page => "page",
            ContentKind::Post => "post",
            ContentKind::SocialProfile => "social_profile",
            ContentKind::ExternalLink => "external_link",
        }
    }

    /// Parse a kind from its string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "page" => Some(ContentKind::Page),
            "post" => Some(ContentKind::Post),
            "social_profile" => Some(ContentKind::SocialProfile),
            "external_link" => Some(ContentKind::ExternalLink),
            _ => None,
        }
    }
}

/// Identifies a bound content entity. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef {
    pub kind: ContentKind,
    pub entity_id: String,
    pub website_id: String,
}

impl ContentRef {
    pub fn new(
        kind: ContentKind,
        website_id: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            website_id: website_id.into(),
        }
    }

    /// Stable key identifying this entity across stores and in-flight markers.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.kind.as_str(),
            self.website_id,
            self.entity_id
        )
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Fields a campaign instruction template binds to, one variant per
/// instruction kind. Pages and posts carry search fields, social profiles
/// carry engagement fields, external-link targets carry link-hunt fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentFields {
    SearchPost {
        /// Search keyword workers type into the engine.
        keyword: String,
        /// Display text to match on the results page (may be empty).
        target_text: String,
        /// Domain of the page the worker should land on.
        landing_domain: String,
    },
    SocialEngagement {
        /// Declared platform tag, fallback when the host is unparseable.
        platform_tag: String,
        /// URL of the profile or post to engage with.
        target_url: String,
    },
    ExternalLink {
        /// Search keyword for finding the article.
        keyword: String,
        /// Fragment of the article title to confirm the right page.
        article_title_fragment: String,
        /// Domain the hunted link must point at.
        target_domain: String,
    },
}

impl ContentFields {
    /// Whether these fields are valid for the given entity kind.
    pub fn matches_kind(&self, kind: ContentKind) -> bool {
        matches!(
            (self, kind),
            (ContentFields::SearchPost { .. }, ContentKind::Page)
                | (ContentFields::SearchPost { .. }, ContentKind::Post)
                | (
                    ContentFields::SocialEngagement { .. },
                    ContentKind::SocialProfile
                )
                | (ContentFields::ExternalLink { .. }, ContentKind::ExternalLink)
        )
    }
}

/// Work-state change persisted onto the content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkStateUpdate {
    pub work_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

/// Errors from the content-persistence collaborator.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Content entity not found: {0}")]
    NotFound(String),

    #[error("Content storage error: {0}")]
    Storage(String),
}

/// Content-persistence collaborator. Each entity kind has its own record
/// table behind this interface; the work-state semantics are identical.
pub trait ContentStore: Send + Sync {
    /// Persist the campaign work state onto the content record.
    fn update_work_state(
        &self,
        entity: &ContentRef,
        update: WorkStateUpdate,
    ) -> Result<(), ContentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind_roundtrip() {
        for kind in [
            ContentKind::Page,
            ContentKind::Post,
            ContentKind::SocialProfile,
            ContentKind::ExternalLink,
        ] {
            assert_eq!(ContentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ContentKind::parse("bogus"), None);
    }

    #[test]
    fn test_content_ref_key() {
        let entity = ContentRef::new(ContentKind::Post, "site-1", "42");
        assert_eq!(entity.key(), "post:site-1:42");
    }

    #[test]
    fn test_fields_match_kind() {
        let search = ContentFields::SearchPost {
            keyword: "k".into(),
            target_text: "".into(),
            landing_domain: "example.com".into(),
        };
        assert!(search.matches_kind(ContentKind::Page));
        assert!(search.matches_kind(ContentKind::Post));
        assert!(!search.matches_kind(ContentKind::SocialProfile));

        let social = ContentFields::SocialEngagement {
            platform_tag: "facebook".into(),
            target_url: "https://facebook.com/acme".into(),
        };
        assert!(social.matches_kind(ContentKind::SocialProfile));
        assert!(!social.matches_kind(ContentKind::ExternalLink));
    }

    #[test]
    fn test_fields_serialization_tagged() {
        let fields = ContentFields::ExternalLink {
            keyword: "best widgets".into(),
            article_title_fragment: "Top 10".into(),
            target_domain: "widgets.example".into(),
        };
        let json = serde_json::to_string(&fields).unwrap();
        assert!(json.contains("\"type\":\"external_link\""));
        let parsed: ContentFields = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, fields);
    }
}
