use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum BaseUrlError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
}

/// Validates the base URL static content is served from.
pub fn validate_base_url(url_str: &str) -> Result<Url, BaseUrlError> {
    let url = Url::parse(url_str)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(BaseUrlError::UnsupportedScheme(scheme.to_owned())),
    }
}

/// Joins the static content base URL with a stored relative location.
///
/// Returns `None` for an empty location so callers omit the field instead of
/// publishing a URL that points at the content root.
///
/// ```
/// use castdrop::util::join_url;
///
/// assert_eq!(
///     join_url("https://cdn.example.org/podcasts/", "/3/cover.png").as_deref(),
///     Some("https://cdn.example.org/podcasts/3/cover.png")
/// );
/// assert_eq!(join_url("https://cdn.example.org", ""), None);
/// ```
pub fn join_url(base: &str, location: &str) -> Option<String> {
    let location = location.trim_start_matches('/');
    if location.is_empty() {
        return None;
    }
    Some(format!("{}/{}", base.trim_end_matches('/'), location))
}
