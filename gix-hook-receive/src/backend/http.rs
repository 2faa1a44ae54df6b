//! The private API spoken over HTTP, with JSON bodies.
//!
//! All endpoints are `POST` requests below `<base>/api/internal/`. Failures are reported with a
//! non-2xx status and a body of `{"err": "<technical>", "user_msg": "<for the user>"}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{Backend, BackendError, HookOptions, PostReceiveResponse, ProcReceiveResult};
use crate::config::InternalApiConfig;
use crate::env::RepoRef;
use crate::Error;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    err: String,
    user_msg: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProcReceiveBody {
    results: Vec<ProcReceiveResult>,
}

#[derive(Debug, Serialize)]
struct AuditLogBody<'a> {
    is_error: bool,
    message: &'a str,
}

/// A [`Backend`] calling the forge's private API.
pub struct HttpBackend {
    agent: ureq::Agent,
    base: url::Url,
    token: String,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend").field("base", &self.base.as_str()).finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Create a client for the API described by `config`.
    pub fn new(config: &InternalApiConfig) -> Result<Self, Error> {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(concat!("gix-hook/", env!("CARGO_PKG_VERSION")))
            .build();
        Ok(HttpBackend {
            agent,
            base: config.base_url()?,
            token: config.token.clone(),
        })
    }

    /// The URL of `api/internal/<segments...>`, with each segment escaped.
    pub fn endpoint(&self, segments: &[&str]) -> url::Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "internal"]).extend(segments);
        }
        url
    }

    fn post(&self, url: &url::Url, body: &impl Serialize) -> Result<ureq::Response, BackendError> {
        tracing::debug!(%url, "calling private API");
        let mut request = self.agent.post(url.as_str());
        if !self.token.is_empty() {
            request = request.set("Authorization", &format!("Bearer {}", self.token));
        }
        let body = serde_json::to_value(body)
            .map_err(|err| BackendError::internal(format!("could not encode request for {url}: {err}")))?;
        match request.send_json(body) {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(status, response)) => {
                let body: ErrorBody = response.into_json().unwrap_or_default();
                let message = if body.err.is_empty() {
                    format!("{url} responded with status {status}")
                } else {
                    body.err
                };
                Err(BackendError {
                    user_message: body.user_msg,
                    message,
                })
            }
            Err(ureq::Error::Transport(err)) => Err(BackendError::internal(format!(
                "could not reach the private API at {url}: {err}"
            ))),
        }
    }

    fn post_json<T: DeserializeOwned>(&self, url: &url::Url, body: &impl Serialize) -> Result<T, BackendError> {
        self.post(url, body)?
            .into_json()
            .map_err(|err| BackendError::internal(format!("could not decode response of {url}: {err}")))
    }

    fn hook_url(&self, hook: &str, repo: &RepoRef) -> url::Url {
        self.endpoint(&["hook", hook, &repo.owner, &repo.name])
    }
}

impl Backend for HttpBackend {
    fn pre_receive(&mut self, repo: &RepoRef, options: &HookOptions) -> Result<(), BackendError> {
        let url = self.hook_url("pre-receive", repo);
        self.post(&url, options).map(drop)
    }

    fn post_receive(&mut self, repo: &RepoRef, options: &HookOptions) -> Result<PostReceiveResponse, BackendError> {
        let url = self.hook_url("post-receive", repo);
        self.post_json(&url, options)
    }

    fn proc_receive(&mut self, repo: &RepoRef, options: &HookOptions) -> Result<Vec<ProcReceiveResult>, BackendError> {
        let url = self.hook_url("proc-receive", repo);
        self.post_json::<ProcReceiveBody>(&url, options).map(|body| body.results)
    }

    fn set_default_branch(&mut self, repo: &RepoRef, branch: &str) -> Result<(), BackendError> {
        let url = self.endpoint(&["hook", "set-default-branch", &repo.owner, &repo.name, branch]);
        self.post(&url, &serde_json::json!({})).map(drop)
    }

    fn audit_log(&mut self, is_error: bool, message: &str) -> Result<(), BackendError> {
        let url = self.endpoint(&["ssh", "log"]);
        self.post(&url, &AuditLogBody { is_error, message }).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(url: &str) -> HttpBackend {
        HttpBackend::new(&InternalApiConfig {
            url: url.into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn endpoints_are_below_the_base_path() {
        let backend = backend("http://127.0.0.1:3000/forge/");
        assert_eq!(
            backend.endpoint(&["ssh", "log"]).as_str(),
            "http://127.0.0.1:3000/forge/api/internal/ssh/log"
        );
    }

    #[test]
    fn path_segments_are_escaped() {
        let backend = backend("http://127.0.0.1:3000/");
        let repo = RepoRef {
            owner: "al ice".into(),
            name: "a/b".into(),
        };
        assert_eq!(
            backend.hook_url("pre-receive", &repo).as_str(),
            "http://127.0.0.1:3000/api/internal/hook/pre-receive/al%20ice/a%2Fb"
        );
    }

    #[test]
    fn unreachable_api_is_an_internal_error() {
        // Port 9 (discard) on localhost is not expected to accept connections.
        let mut backend = backend("http://127.0.0.1:9/");
        let err = backend.audit_log(true, "message").unwrap_err();
        assert!(err.user_message.is_empty());
        assert!(err.message.contains("could not reach the private API"), "{err}");
    }
}
