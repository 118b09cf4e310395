//! Blocking HTTP plumbing shared by the page fetcher and the API checks.

use std::io::Read;
use std::time::Duration;

use serde_json::Value;

use super::content::FetchedPage;
use super::{CollaboratorError, PageFetcher};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; fraud-review/0.1)";
const MAX_REDIRECTS: u32 = 5;
/// Upper bound on bytes read from a landing page.
const MAX_PAGE_BYTES: u64 = 512 * 1024;

/// Thin wrapper over a `ureq` agent with a per-request timeout. Calls are
/// never retried here; a failure is reported once and becomes uncertainty.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .redirects(MAX_REDIRECTS)
            .user_agent(USER_AGENT)
            .build();
        Self { agent }
    }

    /// GET a page, keeping the body of 4xx/5xx responses for inspection.
    pub fn get_page(&self, url: &str) -> Result<FetchedPage, CollaboratorError> {
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(CollaboratorError::Network(transport.to_string()))
            }
        };

        let status = response.status();
        let final_url = response.get_url().to_string();
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_PAGE_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|err| CollaboratorError::InvalidResponse(err.to_string()))?;

        Ok(FetchedPage {
            final_url,
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    pub fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
    ) -> Result<Value, CollaboratorError> {
        let mut request = self.agent.get(url);
        for (key, value) in query {
            request = request.query(key, value);
        }
        if let Some(token) = bearer {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        read_json(request.call())
    }

    pub fn post_json(
        &self,
        url: &str,
        payload: &Value,
        bearer: Option<&str>,
    ) -> Result<Value, CollaboratorError> {
        let mut request = self.agent.post(url);
        if let Some(token) = bearer {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        read_json(request.send_json(payload.clone()))
    }
}

impl PageFetcher for HttpClient {
    fn fetch(&self, url: &str) -> Result<FetchedPage, CollaboratorError> {
        self.get_page(url)
    }
}

fn read_json(result: Result<ureq::Response, ureq::Error>) -> Result<Value, CollaboratorError> {
    match result {
        Ok(response) => response
            .into_json::<Value>()
            .map_err(|err| CollaboratorError::InvalidResponse(err.to_string())),
        Err(ureq::Error::Status(429, _)) => Err(CollaboratorError::RateLimited),
        Err(ureq::Error::Status(code, _)) => Err(CollaboratorError::Status(code)),
        Err(ureq::Error::Transport(transport)) => {
            Err(CollaboratorError::Network(transport.to_string()))
        }
    }
}
