use std::fmt;

/// The transport a [`GitUrl`] will be fetched over. Always rendered with its
/// trailing colon, matching the raw form `git` itself expects in a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Ssh,
    Https,
    Http,
    Git,
    File,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ssh => "ssh:",
            Self::Https => "https:",
            Self::Http => "http:",
            Self::Git => "git:",
            Self::File => "file:",
        }
    }

    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "ssh" => Some(Self::Ssh),
            "https" => Some(Self::Https),
            "http" => Some(Self::Http),
            "git" => Some(Self::Git),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three well-known hosted-git providers recognized by the shorthand and
/// alias specifier forms.
///
/// Each provider's recognized-hostname set is self-referential. A prior
/// version of this table had `gitlab`'s alias accidentally listing
/// `github.com` as its hostname; this table does not reproduce that bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostedProvider {
    GitHub,
    GitLab,
    Bitbucket,
}

impl HostedProvider {
    /// The canonical default hostname used to rebuild an HTTPS remote.
    pub fn default_host(self) -> &'static str {
        match self {
            Self::GitHub => "github.com",
            Self::GitLab => "gitlab.com",
            Self::Bitbucket => "bitbucket.org",
        }
    }

    /// All hostnames that identify this provider (including aliases).
    pub fn hostnames(self) -> &'static [&'static str] {
        match self {
            Self::GitHub => &["github.com"],
            Self::GitLab => &["gitlab.com"],
            Self::Bitbucket => &["bitbucket.org", "bitbucket.com"],
        }
    }

    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias {
            "github" => Some(Self::GitHub),
            "gitlab" => Some(Self::GitLab),
            "bitbucket" => Some(Self::Bitbucket),
            _ => None,
        }
    }

    pub fn from_hostname(host: &str) -> Option<Self> {
        [Self::GitHub, Self::GitLab, Self::Bitbucket]
            .into_iter()
            .find(|provider| provider.hostnames().contains(&host))
    }
}

/// The pieces recovered from a hosted-provider specifier or alias, retained
/// across normalization so higher layers can compute HTTPS mirrors or
/// reflog URLs without re-parsing the original string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExplodedFragment {
    pub user: String,
    /// Repository name with any trailing `.git` stripped.
    pub repo: String,
    /// The raw fragment after `#`, unescaped. `None` if no fragment was present.
    pub hash: Option<String>,
}

/// A hosted-provider specifier's exploded form, plus which provider it names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostedGit {
    pub provider: HostedProvider,
    pub fragment: ExplodedFragment,
}

/// A specifier normalized to a concrete, `git`-addressable remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GitUrl {
    pub protocol: Protocol,
    pub hostname: Option<String>,
    /// The string handed verbatim to the `git` executable.
    pub repository: String,
    pub hosted_git: Option<HostedGit>,
}

impl GitUrl {
    pub fn is_ssh_with_host(&self) -> bool {
        self.protocol == Protocol::Ssh && self.hostname.is_some()
    }
}

impl fmt::Display for GitUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repository)
    }
}
