//! Request Descriptors
//!
//! Derives `{method, url, payload}` from an element's declarative configuration
//! and turns it into the concrete request handed to the transport.
//!
//! Payload routing follows one rule: a GET request carries its payload in the
//! URL's query component and never sends a body; every other verb sends the
//! payload as the body and leaves the URL untouched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::element::ElementConfig;

/// Headers sent with every dispatched request
pub const BASELINE_HEADERS: &[(&str, &str)] = &[("HX-Request", "true")];

const CONTENT_TYPE: &str = "Content-Type";

/// Content type of an encoded form body
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Supported request verbs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
}

impl HttpMethod {
    /// Verbs in directive priority order
    pub const PRIORITY: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
    ];

    /// Lowercase verb name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Patch => "patch",
        }
    }

    /// Whether the payload travels in the URL rather than the body
    #[must_use]
    pub fn payload_in_query(&self) -> bool {
        matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unsupported verb
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported HTTP method: {0}")]
pub struct ParseMethodError(String);

impl FromStr for HttpMethod {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::PRIORITY
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseMethodError(s.to_string()))
    }
}

/// Ordered form fields collected from the source element
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    /// Create empty form data
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field (duplicates are kept, in order)
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Builder-style append
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    /// Whether there are no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate the fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encode as `application/x-www-form-urlencoded`
    #[must_use]
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.fields)
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Method, URL and payload derived from an element's configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Request verb
    pub method: HttpMethod,
    /// Base URL from the winning directive (may be empty)
    pub url: String,
    /// Payload source
    pub payload: FormData,
}

impl RequestDescriptor {
    /// Build a descriptor from an element configuration
    ///
    /// The first verb directive present in [`HttpMethod::PRIORITY`] order wins.
    /// Without any, the fallback action URL is used with GET. The URL is empty
    /// when nothing is configured; validating that is the caller's job.
    #[must_use]
    pub fn from_config(config: &ElementConfig, payload: FormData) -> Self {
        let (method, url) = HttpMethod::PRIORITY
            .into_iter()
            .find_map(|method| config.directive(method).map(|url| (method, url.to_string())))
            .unwrap_or_else(|| (HttpMethod::Get, config.action.clone().unwrap_or_default()));

        Self {
            method,
            url,
            payload,
        }
    }

    /// URL actually dispatched to the transport
    #[must_use]
    pub fn dispatch_url(&self) -> String {
        if !self.method.payload_in_query() || self.payload.is_empty() {
            return self.url.clone();
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, separator, self.payload.encode())
    }

    /// Encoded request body, if the verb carries one
    #[must_use]
    pub fn body(&self) -> Option<String> {
        if self.method.payload_in_query() {
            None
        } else {
            Some(self.payload.encode())
        }
    }

    /// Produce the transport-level request, adding the given headers
    ///
    /// [`BASELINE_HEADERS`] are always sent with their fixed values, and a
    /// form body always carries [`FORM_CONTENT_TYPE`]. Caller headers with
    /// those names are dropped.
    #[must_use]
    pub fn into_dispatch(self, headers: &[(String, String)]) -> DispatchRequest {
        let url = self.dispatch_url();
        let body = self.body();

        let mut all_headers = baseline_headers();
        all_headers.extend(
            headers
                .iter()
                .filter(|(name, _)| {
                    !is_baseline_header(name)
                        && !(body.is_some() && name.eq_ignore_ascii_case(CONTENT_TYPE))
                })
                .cloned(),
        );
        if body.is_some() {
            all_headers.push((CONTENT_TYPE.to_string(), FORM_CONTENT_TYPE.to_string()));
        }

        DispatchRequest {
            method: self.method,
            url,
            body,
            headers: all_headers,
        }
    }
}

/// Fully resolved request handed to a [`Transport`](crate::transport::Transport)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Request verb
    pub method: HttpMethod,
    /// Final URL (query already appended for GET)
    pub url: String,
    /// Encoded body, never present for GET
    pub body: Option<String>,
    /// Headers to send
    pub headers: Vec<(String, String)>,
}

/// Whether `name` is one of the [`BASELINE_HEADERS`] (case-insensitive)
#[must_use]
pub fn is_baseline_header(name: &str) -> bool {
    BASELINE_HEADERS
        .iter()
        .any(|(baseline, _)| baseline.eq_ignore_ascii_case(name))
}

/// Baseline headers as owned pairs
#[must_use]
pub fn baseline_headers() -> Vec<(String, String)> {
    BASELINE_HEADERS
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fields() -> FormData {
        FormData::new().with("a", "1").with("b", "2")
    }

    #[test]
    fn test_directive_priority_order() {
        let config = ElementConfig::new()
            .with_directive(HttpMethod::Patch, "/patch")
            .with_directive(HttpMethod::Post, "/post")
            .with_action("/action");

        let descriptor = RequestDescriptor::from_config(&config, FormData::new());
        assert_eq!(descriptor.method, HttpMethod::Post);
        assert_eq!(descriptor.url, "/post");
    }

    #[test]
    fn test_fallback_to_action_with_get() {
        let config = ElementConfig::new().with_action("/search");
        let descriptor = RequestDescriptor::from_config(&config, FormData::new());
        assert_eq!(descriptor.method, HttpMethod::Get);
        assert_eq!(descriptor.url, "/search");
    }

    #[test]
    fn test_no_configuration_yields_empty_url() {
        let descriptor = RequestDescriptor::from_config(&ElementConfig::new(), fields());
        assert_eq!(descriptor.method, HttpMethod::Get);
        assert!(descriptor.url.is_empty());
    }

    #[test]
    fn test_get_appends_query() {
        let config = ElementConfig::new().with_directive(HttpMethod::Get, "/stream");
        let descriptor = RequestDescriptor::from_config(&config, fields());
        assert_eq!(descriptor.dispatch_url(), "/stream?a=1&b=2");
        assert_eq!(descriptor.body(), None);
    }

    #[test]
    fn test_get_extends_existing_query() {
        let config = ElementConfig::new().with_directive(HttpMethod::Get, "/stream?x=9");
        let descriptor = RequestDescriptor::from_config(&config, fields());
        assert_eq!(descriptor.dispatch_url(), "/stream?x=9&a=1&b=2");
    }

    #[test]
    fn test_get_without_payload_leaves_url_alone() {
        let config = ElementConfig::new().with_directive(HttpMethod::Get, "/stream");
        let descriptor = RequestDescriptor::from_config(&config, FormData::new());
        assert_eq!(descriptor.dispatch_url(), "/stream");
    }

    #[test]
    fn test_post_sends_body_and_keeps_url() {
        let config = ElementConfig::new().with_directive(HttpMethod::Post, "/chat?room=1");
        let descriptor = RequestDescriptor::from_config(&config, fields());
        assert_eq!(descriptor.dispatch_url(), "/chat?room=1");
        assert_eq!(descriptor.body(), Some("a=1&b=2".to_string()));
    }

    #[test]
    fn test_form_encoding_escapes() {
        let form = FormData::new().with("q", "fish & chips").with("note", "100%");
        assert_eq!(form.encode(), "q=fish+%26+chips&note=100%25");
    }

    #[test]
    fn test_into_dispatch_headers() {
        let post = RequestDescriptor::from_config(
            &ElementConfig::new().with_directive(HttpMethod::Post, "/p"),
            fields(),
        )
        .into_dispatch(&baseline_headers());

        assert_eq!(
            post.headers,
            vec![
                ("HX-Request".to_string(), "true".to_string()),
                ("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()),
            ]
        );

        let get = RequestDescriptor::from_config(
            &ElementConfig::new().with_directive(HttpMethod::Get, "/g"),
            fields(),
        )
        .into_dispatch(&baseline_headers());
        assert_eq!(get.headers.len(), 1);
        assert_eq!(get.body, None);
    }

    #[test]
    fn test_form_content_type_replaces_caller_content_type() {
        let headers = vec![
            ("HX-Request".to_string(), "true".to_string()),
            ("content-type".to_string(), "text/plain".to_string()),
            ("X-Client".to_string(), "cli".to_string()),
        ];
        let post = RequestDescriptor::from_config(
            &ElementConfig::new().with_directive(HttpMethod::Post, "/p"),
            fields(),
        )
        .into_dispatch(&headers);

        let content_types: Vec<&str> = post
            .headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(content_types, vec![FORM_CONTENT_TYPE]);
        assert!(post
            .headers
            .contains(&("X-Client".to_string(), "cli".to_string())));
    }

    #[test]
    fn test_get_keeps_caller_content_type() {
        let headers = vec![("Content-Type".to_string(), "text/plain".to_string())];
        let get = RequestDescriptor::from_config(
            &ElementConfig::new().with_directive(HttpMethod::Get, "/g"),
            fields(),
        )
        .into_dispatch(&headers);

        assert_eq!(
            get.headers,
            vec![
                ("HX-Request".to_string(), "true".to_string()),
                ("Content-Type".to_string(), "text/plain".to_string()),
            ]
        );
    }

    #[test]
    fn test_baseline_headers_always_sent() {
        let headers = vec![("hx-request".to_string(), "false".to_string())];
        let get = RequestDescriptor::from_config(
            &ElementConfig::new().with_directive(HttpMethod::Get, "/g"),
            FormData::new(),
        )
        .into_dispatch(&headers);
        assert_eq!(
            get.headers,
            vec![("HX-Request".to_string(), "true".to_string())]
        );

        let bare = RequestDescriptor::from_config(
            &ElementConfig::new().with_directive(HttpMethod::Get, "/g"),
            FormData::new(),
        )
        .into_dispatch(&[]);
        assert_eq!(bare.headers, baseline_headers());
        assert!(is_baseline_header("HX-REQUEST"));
        assert!(!is_baseline_header("X-Client"));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("POST".parse::<HttpMethod>(), Ok(HttpMethod::Post));
        assert_eq!(" delete ".parse::<HttpMethod>(), Ok(HttpMethod::Delete));
        assert!("head".parse::<HttpMethod>().is_err());
        assert_eq!(HttpMethod::Patch.to_string(), "patch");
    }
}
