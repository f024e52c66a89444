use std::path::PathBuf;

use http::{header::InvalidHeaderValue, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::config::AuthInfo;

#[derive(Error, Debug)]
/// Client auth errors
pub enum Error {
    /// Invalid bearer token
    #[error("invalid bearer token: {0}")]
    InvalidBearerToken(#[source] InvalidHeaderValue),

    /// Invalid impersonation header value
    #[error("invalid impersonation value: {0}")]
    InvalidImpersonation(#[source] InvalidHeaderValue),

    /// Failed to read token file
    #[error("failed to read token file '{1:?}': {0}")]
    ReadTokenFile(#[source] std::io::Error, PathBuf),
}

#[derive(Debug, Clone)]
pub(crate) enum Auth {
    None,
    Basic(String, SecretString),
    Bearer(SecretString),
}

impl TryFrom<&AuthInfo> for Auth {
    type Error = Error;

    /// Static credentials from the kubeconfig user, in the order
    /// basic auth, inline token, token file.
    fn try_from(auth_info: &AuthInfo) -> Result<Self, Self::Error> {
        if let (Some(u), Some(p)) = (&auth_info.username, &auth_info.password) {
            return Ok(Self::Basic(u.to_owned(), p.to_owned()));
        }

        let token = match (&auth_info.token, &auth_info.token_file) {
            (Some(token), _) => Some(token.clone()),
            (None, Some(file)) => {
                let token = std::fs::read_to_string(file)
                    .map_err(|source| Error::ReadTokenFile(source, file.into()))?;
                Some(SecretString::from(token.trim().to_owned()))
            }
            (None, None) => None,
        };

        match token {
            Some(token) => {
                // `AddAuthorizationLayer::bearer` panics on invalid values
                HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                    .map_err(Error::InvalidBearerToken)?;
                Ok(Self::Bearer(token))
            }
            None => Ok(Self::None),
        }
    }
}
