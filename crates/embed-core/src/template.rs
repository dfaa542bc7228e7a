//! Frame templates
//!
//! A service describes its embeddable frame as a one-element HTML snippet,
//! e.g. `<iframe height="320" frameborder="0" allowfullscreen></iframe>`.
//! The snippet is parsed once, when the service is accepted, and cloned with
//! a fresh `src` for every embed.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors that can occur while parsing a frame template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Template is blank
    #[error("Frame template is empty")]
    Empty,

    /// Template does not start with an opening tag
    #[error("Frame template must start with an element: {0:?}")]
    NotAnElement(String),

    /// Something other than the closing tag follows the element
    #[error("Frame template must contain exactly one element, found trailing {0:?}")]
    TrailingContent(String),
}

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Parsed one-element frame template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameTemplate {
    source: String,
    tag: String,
    attributes: Vec<(String, String)>,
}

impl FrameTemplate {
    /// Parse a template snippet
    ///
    /// Only whitespace and the element's own closing tag may follow the
    /// opening tag. Repeated attributes keep their first value, as an HTML
    /// parser would.
    pub fn parse(html: &str) -> Result<Self> {
        static OPEN_TAG: OnceLock<Regex> = OnceLock::new();
        let open = OPEN_TAG.get_or_init(|| {
            Regex::new(r#"^\s*<([A-Za-z][A-Za-z0-9-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
                .expect("open tag regex is valid")
        });

        if html.trim().is_empty() {
            return Err(TemplateError::Empty);
        }

        let caps = open
            .captures(html)
            .ok_or_else(|| TemplateError::NotAnElement(html.to_string()))?;
        let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let tag = caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_ascii_lowercase();
        let raw_attrs = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        let rest = html[whole..].trim();
        let closing = format!("</{}>", tag);
        let rest = match rest.get(..closing.len()) {
            Some(head) if head.eq_ignore_ascii_case(&closing) => rest[closing.len()..].trim(),
            _ => rest,
        };
        if !rest.is_empty() {
            return Err(TemplateError::TrailingContent(rest.to_string()));
        }

        Ok(Self {
            source: html.to_string(),
            tag,
            attributes: parse_attributes(raw_attrs.trim_end_matches('/')),
        })
    }

    /// The snippet this template was parsed from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Lowercased element name
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attributes in document order
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Get an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Clone the template with its `src` attribute set
    pub fn with_src(&self, src: &str) -> Self {
        let mut frame = self.clone();
        match frame.attributes.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case("src")) {
            Some((_, value)) => *value = src.to_string(),
            None => frame.attributes.push(("src".to_string(), src.to_string())),
        }
        frame
    }
}

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
    let re = ATTRIBUTE.get_or_init(|| {
        Regex::new(r#"([^\s="'/]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
            .expect("attribute regex is valid")
    });

    let mut attributes: Vec<(String, String)> = Vec::new();
    for cap in re.captures_iter(raw) {
        let Some(name) = cap.get(1) else { continue };
        let name = name.as_str().to_ascii_lowercase();
        if attributes.iter().any(|(existing, _)| *existing == name) {
            continue;
        }
        let value = cap
            .get(2)
            .or_else(|| cap.get(3))
            .or_else(|| cap.get(4))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        attributes.push((name, value));
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iframe() {
        let frame = FrameTemplate::parse(
            r#"<iframe style="width:100%;" height="320" frameborder="0" allowfullscreen></iframe>"#,
        )
        .unwrap();

        assert_eq!(frame.tag(), "iframe");
        assert_eq!(frame.attribute("style"), Some("width:100%;"));
        assert_eq!(frame.attribute("height"), Some("320"));
        assert_eq!(frame.attribute("allowfullscreen"), Some(""));
        assert_eq!(frame.attributes().len(), 4);
    }

    #[test]
    fn test_parse_mixed_quotes() {
        let frame = FrameTemplate::parse(
            "<iframe frameborder='0' scrolling=no style=\"width:100%;\" height='436' allowfullscreen ></iframe>",
        )
        .unwrap();
        assert_eq!(frame.attribute("frameborder"), Some("0"));
        assert_eq!(frame.attribute("scrolling"), Some("no"));
        assert_eq!(frame.attribute("height"), Some("436"));
    }

    #[test]
    fn test_duplicate_attribute_keeps_first() {
        let frame = FrameTemplate::parse(
            r#"<iframe style="border:none;" style="width:100%;" height="400"></iframe>"#,
        )
        .unwrap();
        assert_eq!(frame.attribute("style"), Some("border:none;"));
    }

    #[test]
    fn test_rejects_non_element() {
        assert_eq!(FrameTemplate::parse("   "), Err(TemplateError::Empty));
        assert!(matches!(
            FrameTemplate::parse("just text"),
            Err(TemplateError::NotAnElement(_))
        ));
    }

    #[test]
    fn test_rejects_two_elements() {
        assert!(matches!(
            FrameTemplate::parse("<iframe></iframe><iframe></iframe>"),
            Err(TemplateError::TrailingContent(_))
        ));
    }

    #[test]
    fn test_self_closing_and_unclosed() {
        assert!(FrameTemplate::parse("<iframe height=\"20\" />").is_ok());
        assert!(FrameTemplate::parse("<IFRAME></IFRAME>").is_ok());
        assert!(FrameTemplate::parse("<iframe>").is_ok());
    }

    #[test]
    fn test_with_src() {
        let frame = FrameTemplate::parse("<iframe height=\"320\"></iframe>").unwrap();
        let embedded = frame.with_src("https://player.vimeo.com/video/1");
        assert_eq!(embedded.attribute("src"), Some("https://player.vimeo.com/video/1"));
        assert_eq!(frame.attribute("src"), None);

        let again = embedded.with_src("https://player.vimeo.com/video/2");
        assert_eq!(again.attribute("src"), Some("https://player.vimeo.com/video/2"));
        assert_eq!(again.attributes().len(), 2);
    }
}
