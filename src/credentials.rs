use std::fmt;

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            token: token.into(),
        }
    }

    /// Returns `url` with the percent-encoded username and token as its user-info.
    /// A URL without a scheme is returned as is.
    pub fn embed_in_url(&self, url: &str) -> String {
        match url.split_once("://") {
            Some((scheme, rest)) => format!(
                "{}://{}:{}@{}",
                scheme,
                urlencoding::encode(&self.username),
                urlencoding::encode(&self.token),
                rest
            ),
            None => {
                log::warn!("Cannot embed credentials in url without scheme: {}", url);
                url.to_owned()
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}
