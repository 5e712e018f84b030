use secrecy::SecretString;
use tokio_tungstenite::tungstenite::client::IntoClientRequest as _;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use url::Url;
use uuid::Uuid;

use crate::Result;
use crate::auth::bearer;
use crate::error::Error;

/// Header carrying the client-generated id of one transport connection.
pub const CONNECTION_ID_HEADER: &str = "x-connection-id";

/// Everything needed to (re)open the transport.
///
/// The token is captured once and reused for every automatic reconnection.
#[derive(Clone)]
pub struct Handshake {
    endpoint: Url,
    token: Option<SecretString>,
}

impl Handshake {
    /// Validate `endpoint` and attach `token`.
    ///
    /// `http` and `https` bases are mapped onto `ws` and `wss`.
    pub fn new(endpoint: &str, token: Option<SecretString>) -> Result<Self> {
        Ok(Self {
            endpoint: normalize_endpoint(endpoint)?,
            token,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Build the upgrade request for one connection attempt.
    pub fn request(&self, connection_id: Uuid) -> Result<Request> {
        let mut request = self.endpoint.as_str().into_client_request()?;
        let headers = request.headers_mut();

        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&bearer(token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(
            CONNECTION_ID_HEADER,
            HeaderValue::from_str(&connection_id.to_string())?,
        );

        Ok(request)
    }
}

impl std::fmt::Debug for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handshake")
            .field("endpoint", &self.endpoint.as_str())
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

fn normalize_endpoint(endpoint: &str) -> Result<Url> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("endpoint must not be empty"));
    }

    let mut url = Url::parse(trimmed)?;
    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(Error::validation(format!(
                "unsupported endpoint scheme `{other}`, expected ws, wss, http or https"
            )));
        }
    };

    if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
        return Err(Error::validation(format!(
            "unable to use `{trimmed}` as a WebSocket endpoint"
        )));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret as _;

    use super::*;

    #[test]
    fn http_is_mapped_to_ws() {
        let handshake = Handshake::new("http://localhost:3001", None).unwrap();
        assert_eq!(handshake.endpoint().as_str(), "ws://localhost:3001/");
    }

    #[test]
    fn https_is_mapped_to_wss() {
        let handshake = Handshake::new("https://api.evcharge.example/realtime", None).unwrap();
        assert_eq!(
            handshake.endpoint().as_str(),
            "wss://api.evcharge.example/realtime"
        );
    }

    #[test]
    fn ws_is_kept() {
        let handshake = Handshake::new("  wss://rt.evcharge.example  ", None).unwrap();
        assert_eq!(handshake.endpoint().scheme(), "wss");
    }

    #[test]
    fn rejects_unknown_scheme() {
        let err = Handshake::new("ftp://example.com", None).unwrap_err();
        assert_eq!(err.kind(), crate::error::Kind::Validation);
    }

    #[test]
    fn rejects_empty_endpoint() {
        let err = Handshake::new("   ", None).unwrap_err();
        assert_eq!(err.kind(), crate::error::Kind::Validation);
    }

    #[test]
    fn request_carries_bearer_token_and_connection_id() {
        let token = SecretString::from("abc123".to_owned());
        let handshake = Handshake::new("ws://localhost:3001", Some(token)).unwrap();
        let id = Uuid::new_v4();

        let request = handshake.request(id).unwrap();

        assert_eq!(request.headers()[AUTHORIZATION], "Bearer abc123");
        assert_eq!(
            request.headers()[CONNECTION_ID_HEADER],
            id.to_string().as_str()
        );
    }

    #[test]
    fn request_without_token_has_no_authorization() {
        let handshake = Handshake::new("ws://localhost:3001", None).unwrap();

        let request = handshake.request(Uuid::new_v4()).unwrap();

        assert!(!request.headers().contains_key(AUTHORIZATION));
        assert!(!handshake.has_token());
    }

    #[test]
    fn debug_hides_token() {
        let token = SecretString::from("hidden".to_owned());
        let handshake = Handshake::new("ws://localhost:3001", Some(token.clone())).unwrap();

        assert!(!format!("{handshake:?}").contains(token.expose_secret()));
    }
}
