//! Page location and socket address derivation.

use url::Url;

use crate::{LIVE_PATCH_ENDPOINT, ProtocolError};

/// Scheme a page was loaded over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Map a browser `location.protocol` value (`"https:"`, `"http:"`, ...).
    ///
    /// Anything other than `https:` is treated as plain transport.
    #[must_use]
    pub fn from_protocol(protocol: &str) -> Self {
        if protocol.eq_ignore_ascii_case("https:") {
            Self::Https
        } else {
            Self::Http
        }
    }

    /// WebSocket scheme mirroring this page scheme.
    #[must_use]
    pub fn socket_scheme(self) -> &'static str {
        match self {
            Self::Http => "ws",
            Self::Https => "wss",
        }
    }
}

/// Location of the page a client runs in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLocation {
    scheme: Scheme,
    host: String,
    path: String,
}

impl PageLocation {
    /// Create a location from its parts.
    ///
    /// `host` includes the port when there is one. An empty `path` becomes `/`.
    #[must_use]
    pub fn new(scheme: Scheme, host: impl Into<String>, path: impl Into<String>) -> Self {
        let mut path = path.into();
        if path.is_empty() {
            path.push('/');
        } else if !path.starts_with('/') {
            path.insert(0, '/');
        }
        Self {
            scheme,
            host: host.into(),
            path,
        }
    }

    /// Parse an absolute `http://` or `https://` page URL.
    ///
    /// Host and path come out the way a browser's `location` reports them:
    /// credentials and default ports are dropped, the path is normalized and
    /// percent-encoded. Query string and fragment are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error for other schemes, when the host is empty, or when
    /// the URL cannot be parsed.
    pub fn parse(url: &str) -> Result<Self, ProtocolError> {
        let parsed = Url::parse(url).map_err(|source| match source {
            url::ParseError::EmptyHost => ProtocolError::MissingHost(url.to_owned()),
            source => ProtocolError::InvalidUrl {
                url: url.to_owned(),
                source,
            },
        })?;

        let scheme = match parsed.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            _ => return Err(ProtocolError::UnsupportedScheme(url.to_owned())),
        };
        let host = match (parsed.host_str(), parsed.port()) {
            (None | Some(""), _) => return Err(ProtocolError::MissingHost(url.to_owned())),
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_owned(),
        };

        Ok(Self::new(scheme, host, parsed.path()))
    }

    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host, including the port when present.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path of the page, always starting with `/`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the page was loaded over secure transport.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.scheme == Scheme::Https
    }

    /// WebSocket address of the live-patch endpoint for this page.
    ///
    /// With `append_path`, the page path is appended to the endpoint so the
    /// server can start watching the page before the first frame arrives.
    #[must_use]
    pub fn socket_url(&self, append_path: bool) -> String {
        let scheme = self.scheme.socket_scheme();
        if append_path {
            format!("{scheme}://{}/{LIVE_PATCH_ENDPOINT}{}", self.host, self.path)
        } else {
            format!("{scheme}://{}/{LIVE_PATCH_ENDPOINT}", self.host)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_socket_url_with_page_path() {
        let location = PageLocation::parse("http://localhost:3000/chapter1").unwrap();
        assert_eq!(
            location.socket_url(true),
            "ws://localhost:3000/__mdbook_incremental_preview_live_patch/chapter1"
        );
    }

    #[test]
    fn test_socket_url_without_page_path() {
        let location = PageLocation::parse("http://localhost:3000/chapter1").unwrap();
        assert_eq!(
            location.socket_url(false),
            "ws://localhost:3000/__mdbook_incremental_preview_live_patch"
        );
    }

    #[test]
    fn test_https_uses_wss() {
        let location = PageLocation::parse("https://docs.example.com/").unwrap();
        assert!(location.is_secure());
        assert!(location.socket_url(true).starts_with("wss://docs.example.com/"));
        assert_eq!(
            location.socket_url(true),
            "wss://docs.example.com/__mdbook_incremental_preview_live_patch/"
        );
    }

    #[test]
    fn test_parse_drops_query_and_fragment() {
        let location = PageLocation::parse("http://127.0.0.1:3000/guide/intro.html?x=1#top").unwrap();
        assert_eq!(location.host(), "127.0.0.1:3000");
        assert_eq!(location.path(), "/guide/intro.html");
    }

    #[test]
    fn test_parse_without_path_defaults_to_root() {
        let location = PageLocation::parse("http://localhost:3000").unwrap();
        assert_eq!(location.path(), "/");

        let location = PageLocation::parse("http://localhost:3000#frag").unwrap();
        assert_eq!(location.path(), "/");
    }

    #[test]
    fn test_parse_scheme_is_case_insensitive() {
        let location = PageLocation::parse("HTTPS://Example.com/a").unwrap();
        assert_eq!(location.scheme(), Scheme::Https);
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert_eq!(
            PageLocation::parse("ftp://example.com/"),
            Err(ProtocolError::UnsupportedScheme("ftp://example.com/".to_owned()))
        );
        assert_eq!(
            PageLocation::parse("file:///book/index.html"),
            Err(ProtocolError::UnsupportedScheme("file:///book/index.html".to_owned()))
        );
    }

    #[test]
    fn test_parse_rejects_relative_url() {
        assert!(matches!(
            PageLocation::parse("example.com/page"),
            Err(ProtocolError::InvalidUrl { ref url, .. }) if url == "example.com/page"
        ));
    }

    #[test]
    fn test_parse_rejects_missing_host() {
        assert_eq!(
            PageLocation::parse("http://"),
            Err(ProtocolError::MissingHost("http://".to_owned()))
        );
    }

    #[test]
    fn test_parse_encodes_path_like_a_browser() {
        let location = PageLocation::parse("http://localhost:3000/my page.html").unwrap();
        assert_eq!(location.path(), "/my%20page.html");
        assert_eq!(
            location.socket_url(true),
            "ws://localhost:3000/__mdbook_incremental_preview_live_patch/my%20page.html"
        );
    }

    #[test]
    fn test_parse_normalizes_path() {
        let location = PageLocation::parse("http://localhost:3000/a/../b").unwrap();
        assert_eq!(location.path(), "/b");
    }

    #[test]
    fn test_parse_host_drops_credentials_and_default_port() {
        let location = PageLocation::parse("http://user:pw@localhost:3000/a").unwrap();
        assert_eq!(location.host(), "localhost:3000");

        let location = PageLocation::parse("http://localhost:80/a").unwrap();
        assert_eq!(location.host(), "localhost");

        let location = PageLocation::parse("https://Docs.Example.com:443/").unwrap();
        assert_eq!(location.host(), "docs.example.com");
    }

    #[test]
    fn test_from_protocol() {
        assert_eq!(Scheme::from_protocol("https:"), Scheme::Https);
        assert_eq!(Scheme::from_protocol("http:"), Scheme::Http);
        assert_eq!(Scheme::from_protocol("file:"), Scheme::Http);
    }

    #[test]
    fn test_new_normalizes_path() {
        assert_eq!(PageLocation::new(Scheme::Http, "h", "").path(), "/");
        assert_eq!(PageLocation::new(Scheme::Http, "h", "a/b").path(), "/a/b");
    }
}
