use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::auth::{auth_from_dsn_and_client, Auth};
use crate::project_id::{ProjectId, ProjectIdParseError};

/// Represents a dsn url parsing error.
#[derive(Debug, Error)]
pub enum DsnParseError {
    /// raised on completely invalid urls
    #[error("no valid url provided")]
    InvalidUrl,
    /// raised the scheme is invalid / unsupported.
    #[error("no valid scheme")]
    InvalidScheme,
    /// raised if the username (public key) portion is missing.
    #[error("username is empty")]
    NoUsername,
    /// raised the project is is missing (first path component)
    #[error("empty path")]
    NoProjectId,
    /// raised the project id is invalid.
    #[error("invalid project id")]
    InvalidProjectId(#[from] ProjectIdParseError),
}

/// Represents the scheme of an url http/https.
///
/// This holds schemes that are supported by sentry and relays.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Scheme {
    /// unencrypted HTTP scheme (should not be used)
    Http,
    /// encrypted HTTPS scheme
    Https,
}

impl Scheme {
    /// Returns the default port for this scheme.
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match *self {
                Scheme::Https => "https",
                Scheme::Http => "http",
            }
        )
    }
}

/// Represents a Sentry dsn.
///
/// The DSN is the destination endpoint of all events: it names the
/// collector host, the project and the credentials used in the
/// `X-Sentry-Auth` header.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Dsn {
    scheme: Scheme,
    public_key: String,
    secret_key: Option<String>,
    host: String,
    port: Option<u16>,
    path: String,
    project_id: ProjectId,
    store_url: Url,
}

impl Dsn {
    /// Converts the dsn into an auth object.
    ///
    /// This always attaches the latest and greatest protocol
    /// version to the auth header.
    pub fn to_auth(&self, client_agent: Option<&str>) -> Auth {
        auth_from_dsn_and_client(self, client_agent)
    }

    /// Returns the submission API URL.
    ///
    /// This is the legacy store endpoint that accepts single, compressed
    /// JSON events.
    pub fn store_api_url(&self) -> &Url {
        &self.store_url
    }

    /// Returns the scheme
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Returns the public_key
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Returns secret_key
    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key.as_deref()
    }

    /// Returns the host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.scheme.default_port())
    }

    /// Returns the path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the project_id
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }
}

impl fmt::Display for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.public_key)?;
        if let Some(ref secret_key) = self.secret_key {
            write!(f, ":{}", secret_key)?;
        }
        write!(f, "@{}", self.host)?;
        if let Some(ref port) = self.port {
            write!(f, ":{}", port)?;
        }
        write!(f, "{}{}", self.path, self.project_id)?;
        Ok(())
    }
}

impl FromStr for Dsn {
    type Err = DsnParseError;

    fn from_str(s: &str) -> Result<Dsn, DsnParseError> {
        let url = Url::parse(s).map_err(|_| DsnParseError::InvalidUrl)?;

        if url.path() == "/" {
            return Err(DsnParseError::NoProjectId);
        }

        let mut path_segments = url.path().trim_matches('/').rsplitn(2, '/');

        let public_key = match url.username() {
            "" => return Err(DsnParseError::NoUsername),
            username => username.to_string(),
        };

        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            _ => return Err(DsnParseError::InvalidScheme),
        };

        let secret_key = url.password().map(|s| s.into());
        let port = url.port();
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.into(),
            _ => return Err(DsnParseError::InvalidUrl),
        };
        let project_id = path_segments
            .next()
            .ok_or(DsnParseError::NoProjectId)?
            .parse::<ProjectId>()?;
        let path = match path_segments.next().unwrap_or("") {
            "" | "/" => "/".into(),
            other => format!("/{}/", other),
        };

        let store_url = format!(
            "{}://{}:{}{}api/{}/store/",
            scheme,
            host,
            port.unwrap_or_else(|| scheme.default_port()),
            path,
            project_id
        )
        .parse::<Url>()
        .map_err(|_| DsnParseError::InvalidUrl)?;

        Ok(Dsn {
            scheme,
            public_key,
            secret_key,
            port,
            host,
            path,
            project_id,
            store_url,
        })
    }
}
