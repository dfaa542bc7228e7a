//! Service definitions and the built-in service catalog
//!
//! A service is an external content provider whose URLs can be recognised by
//! a regular expression and turned into an embeddable iframe address by
//! substituting a resource id into a URL template.

use crate::config::ServiceConfig;
use crate::dimension::{Dimension, DimensionError};
use crate::template::{FrameTemplate, TemplateError};
use indexmap::IndexMap;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Placeholder substituted with the resource id in embed URL templates
pub const REMOTE_ID_PLACEHOLDER: &str = "<%= remote_id %>";

/// Errors that can occur while validating a service definition
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// A mandatory field is absent or blank
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Pattern does not compile
    #[error("Invalid regex: {0}")]
    InvalidRegex(String),

    /// Frame template is not a single element
    #[error("Invalid frame template: {0}")]
    InvalidTemplate(#[from] TemplateError),

    /// Width or height is not a CSS length
    #[error("Invalid {field}: {source}")]
    InvalidDimension {
        /// Which field failed
        field: &'static str,
        /// Underlying dimension error
        source: DimensionError,
    },
}

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Pure function turning regex capture groups into a resource id
pub type IdFn = Arc<dyn Fn(&[String]) -> String + Send + Sync>;

/// Strategy for deriving a resource id from regex capture groups
///
/// Capture groups are passed in order, excluding the whole match. Groups that
/// did not participate in the match are passed as empty strings.
#[derive(Clone, Default)]
pub enum IdExtractor {
    /// First capture group
    #[default]
    FirstGroup,
    /// A single capture group by index
    Nth(usize),
    /// All capture groups joined with a separator
    Join(&'static str),
    /// Video id plus the playback parameters YouTube accepts in embeds
    YouTube,
    /// Caller-supplied function
    Custom(IdFn),
}

impl IdExtractor {
    /// Wrap a closure as a custom extractor
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> String + Send + Sync + 'static,
    {
        IdExtractor::Custom(Arc::new(f))
    }

    /// Derive the resource id
    pub fn extract(&self, groups: &[String]) -> String {
        match self {
            IdExtractor::FirstGroup => groups.first().cloned().unwrap_or_default(),
            IdExtractor::Nth(n) => groups.get(*n).cloned().unwrap_or_default(),
            IdExtractor::Join(sep) => groups.join(sep),
            IdExtractor::YouTube => youtube_id(groups),
            IdExtractor::Custom(f) => f(groups),
        }
    }
}

impl fmt::Debug for IdExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdExtractor::FirstGroup => f.write_str("FirstGroup"),
            IdExtractor::Nth(n) => f.debug_tuple("Nth").field(n).finish(),
            IdExtractor::Join(sep) => f.debug_tuple("Join").field(sep).finish(),
            IdExtractor::YouTube => f.write_str("YouTube"),
            IdExtractor::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// YouTube id extraction
///
/// Group 1 is the id from the path (or `?v=`), group 2 the remaining query
/// string. Only `start`/`end`/`list` survive, `t` and `time_continue` are
/// renamed to `start`, and auto-generated playlists are dropped.
fn youtube_id(groups: &[String]) -> String {
    let mut id = groups.first().cloned().unwrap_or_default();
    let params = groups.get(1).map(String::as_str).unwrap_or_default();

    if params.is_empty() && !id.is_empty() {
        return id;
    }

    // Group 2 always starts with its `?` or `&` separator
    let query = params.get(1..).unwrap_or_default();
    let mut kept = Vec::new();
    for param in query.split('&') {
        let mut parts = param.split('=');
        let name = parts.next().unwrap_or_default();
        let value = parts.next().unwrap_or_default();

        if id.is_empty() && name == "v" {
            id = value.to_string();
            continue;
        }

        let mapped = match name {
            "start" | "t" | "time_continue" => "start",
            "end" => "end",
            "list" => "list",
            _ => continue,
        };

        if value == "LL" || value.starts_with("RDMM") || value.starts_with("FL") {
            continue;
        }

        kept.push(format!("{}={}", mapped, value));
    }

    format!("{}?{}", id, kept.join("&"))
}

/// A fully validated service
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    /// URL pattern; capture groups feed the id extractor
    pub regex: Regex,
    /// Embed URL template containing [`REMOTE_ID_PLACEHOLDER`]
    pub embed_url: String,
    /// Frame the embed is displayed in
    pub html: FrameTemplate,
    /// Default display height
    pub height: Option<Dimension>,
    /// Default display width
    pub width: Option<Dimension>,
    /// Resource id strategy
    pub id: IdExtractor,
}

impl ServiceDefinition {
    /// Build a definition from its parts, validating pattern and template
    pub fn new(regex: &str, embed_url: &str, html: &str) -> Result<Self> {
        if regex.is_empty() {
            return Err(ServiceError::MissingField("regex"));
        }
        if embed_url.trim().is_empty() {
            return Err(ServiceError::MissingField("embedUrl"));
        }
        if html.trim().is_empty() {
            return Err(ServiceError::MissingField("html"));
        }

        Ok(Self {
            regex: Regex::new(regex).map_err(|e| ServiceError::InvalidRegex(e.to_string()))?,
            embed_url: embed_url.to_string(),
            html: FrameTemplate::parse(html)?,
            height: None,
            width: None,
            id: IdExtractor::default(),
        })
    }

    /// Set the default size
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(Dimension::px(width));
        self.height = Some(Dimension::px(height));
        self
    }

    /// Set the id strategy
    pub fn with_id(mut self, id: IdExtractor) -> Self {
        self.id = id;
        self
    }

    /// Validate a user-supplied definition
    ///
    /// This is the only way configuration objects become services.
    pub fn validate(config: &ServiceConfig) -> Result<CustomService> {
        let regex = config.regex.as_deref().ok_or(ServiceError::MissingField("regex"))?;
        let embed_url = config.embed_url.as_deref().ok_or(ServiceError::MissingField("embedUrl"))?;
        let html = config.html.as_deref().ok_or(ServiceError::MissingField("html"))?;
        let base = Self::new(regex, embed_url, html)?;

        let height = config
            .height
            .as_ref()
            .map(Dimension::from_value)
            .transpose()
            .map_err(|source| ServiceError::InvalidDimension { field: "height", source })?;
        let width = config
            .width
            .as_ref()
            .map(Dimension::from_value)
            .transpose()
            .map_err(|source| ServiceError::InvalidDimension { field: "width", source })?;

        Ok(CustomService {
            regex: base.regex,
            embed_url: base.embed_url,
            html: base.html,
            height,
            width,
            id: config.id.clone(),
        })
    }

    /// Shallow-merge a custom definition over this one
    ///
    /// Mandatory fields always come from the custom definition; optional
    /// fields only when the custom definition sets them.
    pub fn overlay(&mut self, custom: CustomService) {
        self.regex = custom.regex;
        self.embed_url = custom.embed_url;
        self.html = custom.html;
        if let Some(height) = custom.height {
            self.height = Some(height);
        }
        if let Some(width) = custom.width {
            self.width = Some(width);
        }
        if let Some(id) = custom.id {
            self.id = id;
        }
    }

    /// Substitute a resource id into the embed URL template
    pub fn embed_url_for(&self, remote_id: &str) -> String {
        self.embed_url.replace(REMOTE_ID_PLACEHOLDER, remote_id)
    }
}

/// A user-supplied definition that passed validation
#[derive(Debug, Clone)]
pub struct CustomService {
    /// URL pattern
    pub regex: Regex,
    /// Embed URL template
    pub embed_url: String,
    /// Frame template
    pub html: FrameTemplate,
    /// Height, if the user set one
    pub height: Option<Dimension>,
    /// Width, if the user set one
    pub width: Option<Dimension>,
    /// Id strategy, if the user set one
    pub id: Option<IdExtractor>,
}

impl From<CustomService> for ServiceDefinition {
    fn from(custom: CustomService) -> Self {
        Self {
            regex: custom.regex,
            embed_url: custom.embed_url,
            html: custom.html,
            height: custom.height,
            width: custom.width,
            id: custom.id.unwrap_or_default(),
        }
    }
}

/// Services keyed by name, in catalog order
pub type ServiceCatalog = IndexMap<String, ServiceDefinition>;

const PLAYER_FRAME: &str =
    r#"<iframe style="width:100%;" height="320" frameborder="0" allowfullscreen></iframe>"#;
const TWITCH_FRAME: &str = r#"<iframe frameborder="0" allowfullscreen="true" scrolling="no" height="366" style="width:100%;"></iframe>"#;
const CENTERED_FRAME: &str = r#"<iframe width="600" height="300" style="margin: 0 auto;" frameborder="0" scrolling="no" allowtransparency="true"></iframe>"#;

struct Builtin {
    key: &'static str,
    regex: &'static str,
    embed_url: &'static str,
    html: &'static str,
    size: Option<(f64, f64)>,
    id: IdExtractor,
}

fn builtins() -> Vec<Builtin> {
    vec![
        Builtin {
            key: "vimeo",
            regex: r"(?:http[s]?://)?(?:www.)?(?:player.)?vimeo\.co(?:.+/([^/]\d+)(?:#t=[\d]+)?s?$)",
            embed_url: "https://player.vimeo.com/video/<%= remote_id %>?title=0&byline=0",
            html: r#"<iframe style="width:100%;" height="320" frameborder="0"></iframe>"#,
            size: Some((580.0, 320.0)),
            id: IdExtractor::FirstGroup,
        },
        Builtin {
            key: "youtube",
            regex: r"(?:https?://)?(?:www\.)?(?:(?:youtu\.be/)|(?:youtube\.com)/(?:v/|u/\w/|embed/|watch))(?:(?:\?v=)?([^#&?=]*))?((?:[?&]\w*=\w*)*)",
            embed_url: "https://www.youtube.com/embed/<%= remote_id %>",
            html: PLAYER_FRAME,
            size: Some((580.0, 320.0)),
            id: IdExtractor::YouTube,
        },
        Builtin {
            key: "coub",
            regex: r"https?://coub\.com/view/([^/?&]+)",
            embed_url: "https://coub.com/embed/<%= remote_id %>",
            html: PLAYER_FRAME,
            size: Some((580.0, 320.0)),
            id: IdExtractor::FirstGroup,
        },
        Builtin {
            key: "vine",
            regex: r"https?://vine\.co/v/([^/?&]+)",
            embed_url: "https://vine.co/v/<%= remote_id %>/embed/simple/",
            html: PLAYER_FRAME,
            size: Some((580.0, 320.0)),
            id: IdExtractor::FirstGroup,
        },
        Builtin {
            key: "imgur",
            regex: r"https?://(?:i\.)?imgur\.com.*/([a-zA-Z0-9]+)(?:\.gifv)?",
            embed_url: "http://imgur.com/<%= remote_id %>/embed",
            html: r#"<iframe allowfullscreen="true" scrolling="no" id="imgur-embed-iframe-pub-<%= remote_id %>" class="imgur-embed-iframe-pub" style="height: 500px; width: 100%; border: 1px solid #000"></iframe>"#,
            size: Some((540.0, 500.0)),
            id: IdExtractor::FirstGroup,
        },
        Builtin {
            key: "gfycat",
            regex: r"https?://gfycat\.com(?:/detail)?/([a-zA-Z]+)",
            embed_url: "https://gfycat.com/ifr/<%= remote_id %>",
            html: r#"<iframe frameborder='0' scrolling='no' style="width:100%;" height='436' allowfullscreen ></iframe>"#,
            size: Some((580.0, 436.0)),
            id: IdExtractor::FirstGroup,
        },
        Builtin {
            key: "twitch-channel",
            regex: r"https?://www\.twitch\.tv/([^/?&]*)/?$",
            embed_url: "https://player.twitch.tv/?channel=<%= remote_id %>",
            html: TWITCH_FRAME,
            size: Some((600.0, 366.0)),
            id: IdExtractor::FirstGroup,
        },
        Builtin {
            key: "twitch-video",
            regex: r"https?://www\.twitch\.tv/(?:[^/?&]*/v|videos)/([0-9]*)",
            embed_url: "https://player.twitch.tv/?video=v<%= remote_id %>",
            html: TWITCH_FRAME,
            size: Some((600.0, 366.0)),
            id: IdExtractor::FirstGroup,
        },
        Builtin {
            key: "yandex-music-album",
            regex: r"https?://music\.yandex\.ru/album/([0-9]*)/?$",
            embed_url: "https://music.yandex.ru/iframe/#album/<%= remote_id %>/",
            html: r#"<iframe frameborder="0" style="border:none;width:540px;height:400px;" style="width:100%;" height="400"></iframe>"#,
            size: Some((540.0, 400.0)),
            id: IdExtractor::FirstGroup,
        },
        Builtin {
            key: "yandex-music-track",
            regex: r"https?://music\.yandex\.ru/album/([0-9]*)/track/([0-9]*)",
            embed_url: "https://music.yandex.ru/iframe/#track/<%= remote_id %>/",
            html: r#"<iframe frameborder="0" style="border:none;width:540px;height:100px;" style="width:100%;" height="100"></iframe>"#,
            size: Some((540.0, 100.0)),
            id: IdExtractor::Join("/"),
        },
        Builtin {
            key: "yandex-music-playlist",
            regex: r"https?://music\.yandex\.ru/users/([^/?&]*)/playlists/([0-9]*)",
            embed_url: "https://music.yandex.ru/iframe/#playlist/<%= remote_id %>/show/cover/description/",
            html: r#"<iframe frameborder="0" style="border:none;width:540px;height:400px;" width="540" height="400"></iframe>"#,
            size: Some((540.0, 400.0)),
            id: IdExtractor::Join("/"),
        },
        Builtin {
            key: "codepen",
            regex: r"https?://codepen\.io/([^/?&]*)/pen/([^/?&]*)",
            embed_url: "https://codepen.io/<%= remote_id %>?height=300&theme-id=0&default-tab=css,result&embed-version=2",
            html: r#"<iframe height='300' scrolling='no' frameborder='no' allowtransparency='true' allowfullscreen='true' style='width: 100%;'></iframe>"#,
            size: Some((600.0, 300.0)),
            id: IdExtractor::Join("/embed/"),
        },
        Builtin {
            key: "instagram",
            regex: r"https?://www\.instagram\.com/p/([^/?&]+)/?.*",
            embed_url: "https://www.instagram.com/p/<%= remote_id %>/embed",
            html: r#"<iframe width="400" height="505" style="margin: 0 auto;" frameborder="0" scrolling="no" allowtransparency="true"></iframe>"#,
            size: Some((400.0, 505.0)),
            id: IdExtractor::FirstGroup,
        },
        Builtin {
            key: "twitter",
            regex: r"^https?://twitter\.com/(?:#!/)?(\w+)/status(?:es)?/(\d+)(?:/.*)?$",
            embed_url: "https://twitframe.com/show?url=https://twitter.com/<%= remote_id %>",
            html: r#"<iframe width="600" height="600" style="margin: 0 auto;" frameborder="0" scrolling="no" allowtransparency="true"></iframe>"#,
            size: Some((600.0, 300.0)),
            id: IdExtractor::Join("/status/"),
        },
        Builtin {
            key: "pinterest",
            regex: r"https?://([^/?&]*).pinterest.com/pin/([^/?&]*)/?$",
            embed_url: "https://assets.pinterest.com/ext/embed.html?id=<%= remote_id %>",
            html: r#"<iframe scrolling='no' frameborder='no' allowtransparency='true' allowfullscreen='true' style='width: 100%; min-height: 400px; max-height: 1000px;'></iframe>"#,
            size: None,
            id: IdExtractor::Nth(1),
        },
        Builtin {
            key: "facebook",
            regex: r"https?://www.facebook.com/([^/?&]*)/(.*)",
            embed_url: "https://www.facebook.com/plugins/post.php?href=https://www.facebook.com/<%= remote_id %>&width=500",
            html: r#"<iframe scrolling='no' frameborder='no' allowtransparency='true' allowfullscreen='true' style='width: 100%; min-height: 500px; max-height: 1000px;'></iframe>"#,
            size: None,
            id: IdExtractor::Join("/"),
        },
        Builtin {
            key: "aparat",
            regex: r"(?:http[s]?://)?(?:www.)?aparat\.com/v/([^/?&]+)/?",
            embed_url: "https://www.aparat.com/video/video/embed/videohash/<%= remote_id %>/vt/frame",
            html: CENTERED_FRAME,
            size: Some((600.0, 300.0)),
            id: IdExtractor::FirstGroup,
        },
        Builtin {
            key: "miro",
            regex: r"https://miro.com/\S+(\S{12})/(\S+)?",
            embed_url: "https://miro.com/app/live-embed/<%= remote_id %>",
            html: r#"<iframe width="700" height="500" style="margin: 0 auto;" allowFullScreen frameBorder="0" scrolling="no"></iframe>"#,
            size: None,
            id: IdExtractor::FirstGroup,
        },
    ]
}

/// The built-in service catalog
///
/// Built once per process. An entry that fails to build is logged and left
/// out rather than taking the rest of the catalog down with it.
pub fn builtin_catalog() -> &'static ServiceCatalog {
    static CATALOG: OnceLock<ServiceCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let mut catalog = ServiceCatalog::new();
        for builtin in builtins() {
            match ServiceDefinition::new(builtin.regex, builtin.embed_url, builtin.html) {
                Ok(definition) => {
                    let definition = match builtin.size {
                        Some((width, height)) => definition.with_size(width, height),
                        None => definition,
                    };
                    catalog.insert(builtin.key.to_string(), definition.with_id(builtin.id));
                }
                Err(e) => {
                    tracing::warn!("Skipping built-in service {}: {}", builtin.key, e);
                }
            }
        }
        catalog
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn groups(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builtin_catalog_complete() {
        let catalog = builtin_catalog();
        assert_eq!(catalog.len(), 18);
        assert_eq!(catalog.get_index(0).map(|(k, _)| k.as_str()), Some("vimeo"));
        assert_eq!(catalog.get_index(1).map(|(k, _)| k.as_str()), Some("youtube"));
        assert!(catalog.contains_key("miro"));
    }

    #[test]
    fn test_builtin_frames_are_iframes() {
        for (key, service) in builtin_catalog() {
            assert_eq!(service.html.tag(), "iframe", "{key}");
            assert!(service.embed_url.contains(REMOTE_ID_PLACEHOLDER), "{key}");
        }
    }

    #[test]
    fn test_first_group_extractor() {
        assert_eq!(IdExtractor::FirstGroup.extract(&groups(&["abc", "def"])), "abc");
        assert_eq!(IdExtractor::FirstGroup.extract(&[]), "");
    }

    #[test]
    fn test_join_and_nth_extractors() {
        assert_eq!(IdExtractor::Join("/embed/").extract(&groups(&["user", "pen"])), "user/embed/pen");
        assert_eq!(IdExtractor::Nth(1).extract(&groups(&["www", "12345"])), "12345");
        assert_eq!(IdExtractor::Nth(5).extract(&groups(&["www"])), "");
    }

    #[test]
    fn test_custom_extractor() {
        let id = IdExtractor::custom(|groups| groups.concat().to_uppercase());
        assert_eq!(id.extract(&groups(&["ab", "cd"])), "ABCD");
        assert_eq!(format!("{:?}", id), "Custom(..)");
    }

    #[test]
    fn test_youtube_plain_id() {
        assert_eq!(IdExtractor::YouTube.extract(&groups(&["dQw4w9WgXcQ", ""])), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_youtube_keeps_playback_params() {
        let id = IdExtractor::YouTube.extract(&groups(&["dQw4w9WgXcQ", "&t=42&list=PL1&foo=bar"]));
        assert_eq!(id, "dQw4w9WgXcQ?start=42&list=PL1");
    }

    #[test]
    fn test_youtube_drops_generated_playlists() {
        let id = IdExtractor::YouTube.extract(&groups(&["abc", "&list=RDMMxyz&end=10"]));
        assert_eq!(id, "abc?end=10");
        let id = IdExtractor::YouTube.extract(&groups(&["abc", "&list=LL"]));
        assert_eq!(id, "abc?");
    }

    #[test]
    fn test_youtube_id_from_v_param() {
        let id = IdExtractor::YouTube.extract(&groups(&["", "?v=abc&time_continue=5"]));
        assert_eq!(id, "abc?start=5");
    }

    #[test]
    fn test_definition_requires_fields() {
        assert_eq!(
            ServiceDefinition::new("", "x", "<iframe></iframe>").unwrap_err(),
            ServiceError::MissingField("regex")
        );
        assert_eq!(
            ServiceDefinition::new("a", " ", "<iframe></iframe>").unwrap_err(),
            ServiceError::MissingField("embedUrl")
        );
        assert_eq!(
            ServiceDefinition::new("a", "x", "").unwrap_err(),
            ServiceError::MissingField("html")
        );
        assert!(matches!(
            ServiceDefinition::new("(unclosed", "x", "<iframe></iframe>"),
            Err(ServiceError::InvalidRegex(_))
        ));
        assert!(matches!(
            ServiceDefinition::new("a", "x", "<iframe></iframe><p></p>"),
            Err(ServiceError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_validate_config() {
        let config: ServiceConfig = serde_json::from_value(json!({
            "regex": "https://example\\.com/v/(\\w+)",
            "embedUrl": "https://example.com/embed/<%= remote_id %>",
            "html": "<iframe height=\"200\"></iframe>",
            "height": 200,
            "width": "100%"
        }))
        .unwrap();

        let custom = ServiceDefinition::validate(&config).unwrap();
        assert_eq!(custom.height, Some(Dimension::px(200.0)));
        assert_eq!(custom.width, Some(Dimension::Length("100%".into())));
        assert!(custom.id.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_dimension() {
        let config: ServiceConfig = serde_json::from_value(json!({
            "regex": "x",
            "embedUrl": "y",
            "html": "<iframe></iframe>",
            "height": "very tall"
        }))
        .unwrap();

        assert!(matches!(
            ServiceDefinition::validate(&config),
            Err(ServiceError::InvalidDimension { field: "height", .. })
        ));
    }

    #[test]
    fn test_overlay_preserves_unset_optionals() {
        let mut youtube = builtin_catalog()["youtube"].clone();
        let custom = CustomService {
            regex: Regex::new("yt/(\\w+)").unwrap(),
            embed_url: "https://yt.example/<%= remote_id %>".into(),
            html: FrameTemplate::parse("<iframe></iframe>").unwrap(),
            height: Some(Dimension::px(300.0)),
            width: None,
            id: None,
        };

        youtube.overlay(custom);
        assert_eq!(youtube.regex.as_str(), "yt/(\\w+)");
        assert_eq!(youtube.height, Some(Dimension::px(300.0)));
        assert_eq!(youtube.width, Some(Dimension::px(580.0)));
        assert!(matches!(youtube.id, IdExtractor::YouTube));
    }

    #[test]
    fn test_embed_url_for() {
        let coub = &builtin_catalog()["coub"];
        assert_eq!(coub.embed_url_for("1a2b"), "https://coub.com/embed/1a2b");
        assert_eq!(coub.embed_url_for(""), "https://coub.com/embed/");
    }
}
