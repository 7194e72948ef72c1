use gitpin_types::Refs;

/// Raised by C1 when the `git` subprocess exits nonzero.
#[derive(Debug, thiserror::Error)]
#[error("git {args} failed: {stderr}")]
pub struct GitProcessError {
    pub args: String,
    pub stderr: String,
}

/// Raised by C4 when the transport security policy refuses to proceed: an
/// unauthenticated, unpinned fetch over an insecure transport.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("refusing to fetch `{url}` over `git://` without a commit pin")]
    InsecureGitProtocol { url: String },
    #[error("refusing to fetch `{url}` over `http://`: no secure mirror is reachable")]
    InsecureHttpProtocol { url: String },
    #[error("refusing to fetch `{url}`: the remote could not be reached over HTTPS")]
    UnreachableHttps { url: String },
}

/// Raised by C5 when no version-resolution strategy matches.
#[derive(Debug, thiserror::Error)]
#[error("could not find a ref matching `{version}` in `{remote}`; known refs: {}", format_known_refs(.refs))]
pub struct NotFoundError {
    pub version: String,
    pub remote: String,
    pub refs: Refs,
}

fn format_known_refs(refs: &Refs) -> String {
    if refs.is_empty() {
        return "(none)".to_string();
    }
    refs.keys().cloned().collect::<Vec<_>>().join(", ")
}

/// The top-level error surfaced at the resolver's boundary.
#[derive(Debug, thiserror::Error)]
pub enum GitpinError {
    #[error("`{0}` is not a recognizable git specifier")]
    Validation(String),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Process(GitProcessError),

    #[error("git executable not found on PATH")]
    GitNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

/// `base_command`'s "git not found on PATH" failure is reported as a
/// [`GitProcessError`] with a sentinel `args` of `"(locate)"` since there's
/// no subprocess invocation to attach to; unwrap it back to the dedicated
/// [`GitpinError::GitNotFound`] variant here instead of surfacing it as an
/// ordinary process failure.
impl From<GitProcessError> for GitpinError {
    fn from(err: GitProcessError) -> Self {
        if err.args == "(locate)" {
            GitpinError::GitNotFound
        } else {
            GitpinError::Process(err)
        }
    }
}
