use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("{0}")]
    Network(String),
}

impl TransportError {
    /// The upstream answered but refused the request (4xx).
    pub fn is_refusal(&self) -> bool {
        matches!(self, TransportError::Status(code) if (400..500).contains(code))
    }
}

/// Plain GET access to the upstream services.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetch a textual document, optionally presenting a user agent.
    async fn fetch_text(&self, url: &str, user_agent: Option<&str>)
        -> Result<String, TransportError>;

    /// Fetch raw bytes.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// `Upstream` over surf, following up to five redirects.
pub struct SurfUpstream {
    client: surf::Client,
}

impl SurfUpstream {
    pub fn new() -> Self {
        Self {
            client: surf::Client::new().with(RedirectMiddleware::new(5)),
        }
    }

    async fn send(
        &self,
        url: &str,
        user_agent: Option<&str>,
    ) -> Result<surf::Response, TransportError> {
        let mut request = self.client.get(url);
        if let Some(agent) = user_agent {
            request = request.header("User-Agent", agent);
        }
        let response = request
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(TransportError::Status(status as u16))
        }
    }
}

impl Default for SurfUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Upstream for SurfUpstream {
    async fn fetch_text(
        &self,
        url: &str,
        user_agent: Option<&str>,
    ) -> Result<String, TransportError> {
        let mut response = self.send(url, user_agent).await?;
        response
            .body_string()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let mut response = self.send(url, None).await?;
        response
            .body_bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))
    }
}

struct RedirectMiddleware {
    max_attempts: u8,
}

impl RedirectMiddleware {
    pub fn new(max_attempts: u8) -> Self {
        Self { max_attempts }
    }
}

#[surf::utils::async_trait]
impl surf::middleware::Middleware for RedirectMiddleware {
    async fn handle(
        &self,
        req: surf::Request,
        client: surf::Client,
        next: surf::middleware::Next<'_>,
    ) -> surf::Result<surf::Response> {
        let mut attempts = 0;
        let mut current_req = req;

        loop {
            if attempts > self.max_attempts {
                return Err(surf::Error::from_str(
                    surf::StatusCode::LoopDetected,
                    "Too many redirects",
                ));
            }

            let response = next.run(current_req.clone(), client.clone()).await?;

            if !response.status().is_redirection() {
                return Ok(response);
            }
            let location = match response.header("Location") {
                Some(location) => location.last().as_str().to_string(),
                None => return Ok(response),
            };

            // Relative locations are joined against the URL that produced them.
            let new_url = match surf::Url::parse(&location) {
                Ok(url) => url,
                Err(_) => current_req.url().join(&location).map_err(|_| {
                    surf::Error::from_str(
                        surf::StatusCode::BadGateway,
                        "Invalid redirect location",
                    )
                })?,
            };

            let user_agent = current_req
                .header("User-Agent")
                .map(|values| values.last().as_str().to_string());
            let mut next_req = surf::Request::new(current_req.method(), new_url);
            if let Some(agent) = user_agent {
                next_req.insert_header("User-Agent", agent.as_str());
            }

            log::debug!("Following redirect to {}", next_req.url());
            current_req = next_req;
            attempts += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusal_classification() {
        assert!(TransportError::Status(400).is_refusal());
        assert!(TransportError::Status(404).is_refusal());
        assert!(!TransportError::Status(503).is_refusal());
        assert!(!TransportError::Network("reset".into()).is_refusal());
    }
}
