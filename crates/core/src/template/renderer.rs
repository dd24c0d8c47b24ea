//! Template expansion for each instruction kind.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::content::ContentFields;

use super::{RenderedTemplate, TemplateError};

/// Extracts the registrable host from a URL, scheme and www. stripped.
static HOST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:https?://)?(?:www\.)?([^/:?#]+)").unwrap());

/// Render the instruction document for the given content fields.
///
/// Pure and deterministic. Required fields are checked here, before any
/// remote call: `keyword` for search and link-hunt instructions,
/// `target_url` for social engagement.
pub fn render(fields: &ContentFields) -> Result<RenderedTemplate, TemplateError> {
    match fields {
        ContentFields::SearchPost {
            keyword,
            target_text,
            landing_domain,
        } => render_search_post(keyword, target_text, landing_domain),
        ContentFields::SocialEngagement {
            platform_tag,
            target_url,
        } => render_social_engagement(platform_tag, target_url),
        ContentFields::ExternalLink {
            keyword,
            article_title_fragment,
            target_domain,
        } => render_external_link(keyword, article_title_fragment, target_domain),
    }
}

fn require(field: &'static str, value: &str) -> Result<(), TemplateError> {
    if value.trim().is_empty() {
        Err(TemplateError::MissingRequiredField(field))
    } else {
        Ok(())
    }
}

fn render_search_post(
    keyword: &str,
    target_text: &str,
    landing_domain: &str,
) -> Result<RenderedTemplate, TemplateError> {
    require("keyword", keyword)?;

    let mut body = String::new();
    body.push_str(&format!(
        "1. Open your search engine and search for: \"{}\"\n",
        keyword.trim()
    ));
    if target_text.trim().is_empty() {
        body.push_str(&format!(
            "2. In the results, find a page on {} and click it.\n",
            landing_domain.trim()
        ));
    } else {
        body.push_str(&format!(
            "2. In the results, find the entry titled \"{}\" on {} and click it.\n",
            target_text.trim(),
            landing_domain.trim()
        ));
    }
    body.push_str(
        "3. Stay on the page for at least 60 seconds and scroll to the bottom.\n\
         4. Submit the full URL of the page you landed on as proof.\n",
    );

    Ok(RenderedTemplate {
        title: format!("Search and visit: {}", keyword.trim()),
        body,
    })
}

fn render_social_engagement(
    platform_tag: &str,
    target_url: &str,
) -> Result<RenderedTemplate, TemplateError> {
    require("target_url", target_url)?;

    let platform = platform_name(target_url).unwrap_or_else(|| platform_tag.trim().to_string());

    let body = format!(
        "1. Log in to your {platform} account.\n\
         2. Open this page: {url}\n\
         3. Follow the profile (or like the post) and leave a short, relevant comment.\n\
         4. Submit a link to your comment or a screenshot as proof.\n",
        platform = platform,
        url = target_url.trim(),
    );

    Ok(RenderedTemplate {
        title: format!("Engage on {}", platform),
        body,
    })
}

fn render_external_link(
    keyword: &str,
    article_title_fragment: &str,
    target_domain: &str,
) -> Result<RenderedTemplate, TemplateError> {
    require("keyword", keyword)?;

    let mut body = String::new();
    body.push_str(&format!(
        "1. Open your search engine and search for: \"{}\"\n",
        keyword.trim()
    ));
    if article_title_fragment.trim().is_empty() {
        body.push_str("2. Open an article from the results.\n");
    } else {
        body.push_str(&format!(
            "2. Open the article whose title contains \"{}\".\n",
            article_title_fragment.trim()
        ));
    }
    body.push_str(&format!(
        "3. In the article, find the link pointing to {} and click it.\n\
         4. Submit the URL of the page the link took you to as proof.\n",
        target_domain.trim()
    ));

    Ok(RenderedTemplate {
        title: format!("Find the link: {}", keyword.trim()),
        body,
    })
}

/// Derive a human platform name from the URL host. Returns `None` when the
/// host cannot be parsed, in which case the declared tag is used instead.
fn platform_name(url: &str) -> Option<String> {
    let host = HOST_RE.captures(url.trim())?.get(1)?.as_str();
    let name = host.split('.').next()?;
    if name.is_empty() {
        return None;
    }
    let mut chars = name.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().collect::<String>() + chars.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_post_includes_keyword_and_domain() {
        let rendered = render(&ContentFields::SearchPost {
            keyword: "print checks online".into(),
            target_text: "Print Checks in Minutes".into(),
            landing_domain: "example.com".into(),
        })
        .unwrap();

        assert!(rendered.title.contains("print checks online"));
        assert!(rendered.body.contains("print checks online"));
        assert!(rendered.body.contains("Print Checks in Minutes"));
        assert!(rendered.body.contains("example.com"));
    }

    #[test]
    fn test_search_post_empty_target_text_is_allowed() {
        let rendered = render(&ContentFields::SearchPost {
            keyword: "print checks online".into(),
            target_text: "".into(),
            landing_domain: "example.com".into(),
        })
        .unwrap();

        assert!(rendered.body.contains("example.com"));
        assert!(!rendered.body.contains("titled"));
    }

    #[test]
    fn test_search_post_requires_keyword() {
        let result = render(&ContentFields::SearchPost {
            keyword: "  ".into(),
            target_text: "t".into(),
            landing_domain: "example.com".into(),
        });
        assert_eq!(result, Err(TemplateError::MissingRequiredField("keyword")));
    }

    #[test]
    fn test_external_link_requires_keyword() {
        let result = render(&ContentFields::ExternalLink {
            keyword: "".into(),
            article_title_fragment: "Top 10".into(),
            target_domain: "widgets.example".into(),
        });
        assert_eq!(result, Err(TemplateError::MissingRequiredField("keyword")));
    }

    #[test]
    fn test_social_engagement_requires_target_url() {
        let result = render(&ContentFields::SocialEngagement {
            platform_tag: "facebook".into(),
            target_url: "".into(),
        });
        assert_eq!(
            result,
            Err(TemplateError::MissingRequiredField("target_url"))
        );
    }

    #[test]
    fn test_platform_derived_from_url_host() {
        let rendered = render(&ContentFields::SocialEngagement {
            platform_tag: "social".into(),
            target_url: "https://www.instagram.com/acme".into(),
        })
        .unwrap();
        assert_eq!(rendered.title, "Engage on Instagram");
        assert!(rendered.body.contains("Instagram account"));
    }

    #[test]
    fn test_platform_falls_back_to_declared_tag() {
        let rendered = render(&ContentFields::SocialEngagement {
            platform_tag: "Mastodon".into(),
            target_url: "/@acme".into(),
        })
        .unwrap();
        assert_eq!(rendered.title, "Engage on Mastodon");
    }

    #[test]
    fn test_render_is_deterministic() {
        let fields = ContentFields::ExternalLink {
            keyword: "best widgets".into(),
            article_title_fragment: "Top 10".into(),
            target_domain: "widgets.example".into(),
        };
        assert_eq!(render(&fields).unwrap(), render(&fields).unwrap());
    }
}
