//! Classifying user queries before lookup

use url::Url;

/// Hosts whose links are looked up directly instead of searched
const VIDEO_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

/// What a user-supplied query looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// An http(s) link on a known video host
    VideoLink,

    /// Any other http(s) link
    Url,

    /// Free-text search terms
    Text,
}

impl QueryKind {
    /// Classify a query
    ///
    /// Surrounding whitespace is ignored. Only `http` and `https` count as
    /// links; `file:` or `ftp:` strings are searched as text.
    pub fn classify(query: &str) -> Self {
        let Ok(url) = Url::parse(query.trim()) else {
            return Self::Text;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return Self::Text;
        }
        match url.host_str() {
            Some(host) if VIDEO_HOSTS.contains(&host.to_ascii_lowercase().as_str()) => {
                Self::VideoLink
            }
            Some(_) => Self::Url,
            None => Self::Text,
        }
    }

    /// Whether the query was given as a link of any kind
    pub fn is_link(self) -> bool {
        matches!(self, Self::VideoLink | Self::Url)
    }
}
