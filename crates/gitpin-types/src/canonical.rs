use std::fmt;
use std::hash::{Hash, Hasher};

use url::Url;

/// A wrapper around [`Url`] that represents a "canonical" version of an
/// original remote URL, for comparison and keying purposes only.
///
/// A "canonical" url papers over mistakes such as depending on
/// `github.com/foo/bar` vs. `github.com/foo/bar.git`. It is **not** a URL
/// that should ever be handed to `git`: fetching must still use the
/// original, un-canonicalized repository string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CanonicalUrl(Url);

impl CanonicalUrl {
    pub fn new(url: &Url) -> Self {
        let mut url = url.clone();

        // Strip a trailing slash.
        if url.path().ends_with('/') {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty();
            }
        }

        // GitHub treats hosts/paths case-insensitively; normalize so that
        // `Github.com/Foo/Bar` and `github.com/foo/bar` hash the same.
        if url.host_str() == Some("github.com") {
            let _ = url.set_scheme(&url.scheme().to_lowercase());
            let path = url.path().to_lowercase();
            url.set_path(&path);
        }

        // Repos can generally be accessed with or without a `.git` suffix.
        if let Some(stripped) = url.path().strip_suffix(".git") {
            let stripped = stripped.to_string();
            url.set_path(&stripped);
        }

        Self(url)
    }

    pub fn parse(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(&Url::parse(url)?))
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl Hash for CanonicalUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_str().hash(state);
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Like [`CanonicalUrl`], but additionally strips the user-supplied
/// version/fragment so that two specifiers that name the same repository at
/// different refs are recognized as the same repository.
///
/// This is the key used by the C9 lock queue and the C6 capability cache, so
/// that concurrent resolves of `github.com/a/b#v1` and
/// `github.com/a/b#v2` share one working directory instead of racing two
/// clones into the same path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepositoryUrl(CanonicalUrl);

impl RepositoryUrl {
    pub fn new(url: &Url) -> Self {
        let mut canonical = CanonicalUrl::new(url);
        canonical.0.set_fragment(None);
        canonical.0.set_query(None);
        Self(canonical)
    }

    pub fn parse(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(&Url::parse(url)?))
    }

    pub fn as_url(&self) -> &Url {
        self.0.as_url()
    }
}

impl fmt::Display for RepositoryUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
