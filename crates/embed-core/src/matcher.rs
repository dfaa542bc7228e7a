//! URL to service matching
//!
//! Classifies pasted text against the registry. Text may be a bare URL or
//! a full `<iframe src="...">` snippet copied from a provider's share dialog.

use crate::dimension::Dimension;
use crate::registry::Registry;
use crate::services::ServiceDefinition;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Outcome of a successful match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Registry key of the matched service
    pub service: String,
    /// URL the user supplied
    pub source: String,
    /// Embeddable URL with the resource id substituted
    pub embed: String,
    /// Service default width
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,
    /// Service default height
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Dimension>,
}

/// Extract the `src` of a pasted iframe snippet, or return the text as is
pub fn unwrap_iframe(raw: &str) -> &str {
    static IFRAME: OnceLock<Regex> = OnceLock::new();
    let re = IFRAME.get_or_init(|| {
        Regex::new(r#"(?is)<iframe\b[^>]*?\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>.*?</iframe>"#)
            .expect("iframe regex is valid")
    });

    re.captures(raw)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str())
        .unwrap_or(raw)
}

/// Find the first service whose pattern matches the text
///
/// First match in registry order wins; there is no scoring.
pub fn match_url(raw: &str, registry: &Registry) -> Option<MatchResult> {
    let url = unwrap_iframe(raw);
    if url.is_empty() {
        return None;
    }

    let found = registry
        .iter()
        .find(|(_, service)| service.regex.is_match(url))
        .map(|(key, service)| build_match(key, url, service));

    match &found {
        Some(result) => tracing::debug!("Matched {} as {}", url, result.service),
        None => tracing::debug!("No embed service matches {}", url),
    }
    found
}

/// Match a URL against one named service
///
/// Used when the host has already picked the service from its paste
/// patterns.
pub fn match_service(key: &str, raw: &str, registry: &Registry) -> Option<MatchResult> {
    let url = unwrap_iframe(raw);
    if url.is_empty() {
        return None;
    }

    let service = registry.get(key)?;
    if !service.regex.is_match(url) {
        return None;
    }
    Some(build_match(key, url, service))
}

fn build_match(key: &str, url: &str, service: &ServiceDefinition) -> MatchResult {
    let groups: Vec<String> = service
        .regex
        .captures(url)
        .map(|caps| {
            caps.iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();

    // An empty id is substituted as is.
    let remote_id = service.id.extract(&groups);
    if remote_id.is_empty() {
        tracing::debug!("Empty resource id for {} in {}", key, url);
    }

    MatchResult {
        service: key.to_string(),
        source: url.to_string(),
        embed: service.embed_url_for(&remote_id),
        width: service.width.clone(),
        height: service.height.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServiceConfig, ToolConfig};
    use crate::registry::resolve;
    use crate::services::builtin_catalog;

    fn builtin_registry() -> Registry {
        resolve(builtin_catalog(), &ToolConfig::default()).0
    }

    #[test]
    fn test_unwrap_iframe_double_quotes() {
        assert_eq!(
            unwrap_iframe(r#"<iframe width="560" src="https://example.com/embed/42" frameborder="0"></iframe>"#),
            "https://example.com/embed/42"
        );
    }

    #[test]
    fn test_unwrap_iframe_single_quotes() {
        assert_eq!(
            unwrap_iframe("<iframe src='https://example.com/embed/42'></iframe>"),
            "https://example.com/embed/42"
        );
    }

    #[test]
    fn test_unwrap_iframe_requires_consistent_quotes() {
        let raw = r#"<iframe src="https://example.com/embed/42'></iframe>"#;
        assert_eq!(unwrap_iframe(raw), raw);
    }

    #[test]
    fn test_unwrap_plain_url() {
        assert_eq!(unwrap_iframe("https://coub.com/view/abc"), "https://coub.com/view/abc");
        assert_eq!(unwrap_iframe("<iframe src=\"x\">"), "<iframe src=\"x\">");
    }

    #[test]
    fn test_match_youtube() {
        let result = match_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &builtin_registry()).unwrap();
        assert_eq!(result.service, "youtube");
        assert_eq!(result.embed, "https://www.youtube.com/embed/dQw4w9WgXcQ");
        assert_eq!(result.width, Some(Dimension::px(580.0)));
        assert_eq!(result.height, Some(Dimension::px(320.0)));
    }

    #[test]
    fn test_match_youtube_short_with_timestamp() {
        let result = match_url("https://youtu.be/dQw4w9WgXcQ?t=42", &builtin_registry()).unwrap();
        assert_eq!(result.embed, "https://www.youtube.com/embed/dQw4w9WgXcQ?start=42");
    }

    #[test]
    fn test_match_vimeo() {
        let result = match_url("https://vimeo.com/289836809", &builtin_registry()).unwrap();
        assert_eq!(result.service, "vimeo");
        assert_eq!(result.embed, "https://player.vimeo.com/video/289836809?title=0&byline=0");
    }

    #[test]
    fn test_match_joined_ids() {
        let registry = builtin_registry();

        let codepen = match_url("https://codepen.io/alice/pen/xyzAbc", &registry).unwrap();
        assert_eq!(codepen.service, "codepen");
        assert!(codepen.embed.starts_with("https://codepen.io/alice/embed/xyzAbc?height=300"));

        let twitter = match_url("https://twitter.com/rustlang/status/1234567890", &registry).unwrap();
        assert_eq!(
            twitter.embed,
            "https://twitframe.com/show?url=https://twitter.com/rustlang/status/1234567890"
        );

        let track = match_url("https://music.yandex.ru/album/123/track/456", &registry).unwrap();
        assert_eq!(track.service, "yandex-music-track");
        assert_eq!(track.embed, "https://music.yandex.ru/iframe/#track/123/456/");
    }

    #[test]
    fn test_match_pinterest_second_group() {
        let result = match_url("https://www.pinterest.com/pin/99999/", &builtin_registry()).unwrap();
        assert_eq!(result.embed, "https://assets.pinterest.com/ext/embed.html?id=99999");
        assert_eq!(result.width, None);
    }

    #[test]
    fn test_iframe_paste_matches_like_bare_url() {
        let registry = builtin_registry();
        let bare = match_url("https://coub.com/view/1a2b3c", &registry).unwrap();
        let wrapped = match_url(
            r#"<iframe src="https://coub.com/view/1a2b3c" allowfullscreen></iframe>"#,
            &registry,
        )
        .unwrap();
        assert_eq!(bare, wrapped);
    }

    #[test]
    fn test_no_match() {
        assert!(match_url("not a url", &builtin_registry()).is_none());
        assert!(match_url("", &builtin_registry()).is_none());
        assert!(match_url(r#"<iframe src=""></iframe>"#, &builtin_registry()).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let config = ToolConfig::default()
            .with_service("first", ServiceConfig::new(r"example\.com/(\d+)", "https://one/<%= remote_id %>", "<iframe></iframe>"))
            .with_service("second", ServiceConfig::new(r"example\.com/(\w+)", "https://two/<%= remote_id %>", "<iframe></iframe>"));
        let (registry, _) = resolve(&Default::default(), &config);

        let result = match_url("https://example.com/42", &registry).unwrap();
        assert_eq!(result.service, "first");
        assert_eq!(result.embed, "https://one/42");
    }

    #[test]
    fn test_empty_id_still_substituted() {
        let config = ToolConfig::default().with_service(
            "opt",
            ServiceConfig::new(r"https://opt\.test/(\d*)", "https://opt.test/e/<%= remote_id %>", "<iframe></iframe>"),
        );
        let (registry, _) = resolve(&Default::default(), &config);

        let result = match_url("https://opt.test/", &registry).unwrap();
        assert_eq!(result.embed, "https://opt.test/e/");
    }

    #[test]
    fn test_match_service_by_key() {
        let registry = builtin_registry();
        let result = match_service("coub", "https://coub.com/view/abc", &registry).unwrap();
        assert_eq!(result.embed, "https://coub.com/embed/abc");

        assert!(match_service("vimeo", "https://coub.com/view/abc", &registry).is_none());
        assert!(match_service("unknown", "https://coub.com/view/abc", &registry).is_none());
    }
}
