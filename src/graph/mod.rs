use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

pub mod assays;
pub mod counts;

/// Access/secret key pair read from the `--keys-file` JSON document.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

pub fn load_credentials(path: &Path) -> Result<Credentials, GraphError> {
    let body = fs::read_to_string(path).map_err(|err| GraphError::Credentials {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    serde_json::from_str(&body).map_err(|err| GraphError::Credentials {
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

/// Bounded retry for queries that come back without a `data` envelope.
/// Credentials are re-read between attempts so a rotated key file is
/// picked up without restarting the report.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unable to read credentials from {path}: {reason}")]
    Credentials { path: String, reason: String },
    #[error("graph query transport failure: {0}")]
    Transport(String),
    #[error("graph response was not valid JSON: {0}")]
    Decode(String),
    #[error("graph query returned no data after {attempts} attempt(s)")]
    EmptyData { attempts: u32 },
    #[error("graph response missing field '{0}'")]
    MissingField(String),
}

/// Blocking GraphQL client for the submission service. One query per
/// call, bearer-style auth from the keys file, no connection reuse
/// semantics beyond what the agent provides.
pub struct GraphClient {
    endpoint: String,
    keys_file: PathBuf,
    credentials: Credentials,
    retry: RetryPolicy,
    agent: ureq::Agent,
}

impl GraphClient {
    pub fn connect(
        endpoint: impl Into<String>,
        keys_file: impl Into<PathBuf>,
        retry: RetryPolicy,
    ) -> Result<Self, GraphError> {
        let keys_file = keys_file.into();
        let credentials = load_credentials(&keys_file)?;
        Ok(GraphClient {
            endpoint: endpoint.into(),
            keys_file,
            credentials,
            retry,
            agent: ureq::Agent::new_with_defaults(),
        })
    }

    fn auth_header(&self) -> String {
        format!(
            "Bearer {}:{}",
            self.credentials.access_key, self.credentials.secret_key
        )
    }

    /// Run one query and return the `data` payload. An `errors`
    /// envelope is logged; a missing or null `data` triggers the
    /// bounded re-auth retry and finally a typed failure, never a
    /// silently empty result.
    pub fn query(
        &mut self,
        query_text: &str,
        variables: Option<Value>,
    ) -> Result<Value, GraphError> {
        let body = match &variables {
            Some(vars) => json!({ "query": query_text, "variables": vars }),
            None => json!({ "query": query_text }),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let envelope = self.post(&body)?;

            if let Some(errors) = envelope.get("errors") {
                tracing::warn!("graph query returned errors: {}", errors);
            }
            match envelope.get("data") {
                Some(data) if !data.is_null() => return Ok(data.clone()),
                _ => {
                    tracing::warn!(
                        "graph query returned no data (attempt {}/{}): {}",
                        attempt,
                        self.retry.max_attempts,
                        query_text
                    );
                }
            }

            if attempt >= self.retry.max_attempts {
                return Err(GraphError::EmptyData { attempts: attempt });
            }
            std::thread::sleep(self.retry.delay);
            self.credentials = load_credentials(&self.keys_file)?;
        }
    }

    fn post(&self, body: &Value) -> Result<Value, GraphError> {
        let response = self
            .agent
            .post(&self.endpoint)
            .header("Authorization", &self.auth_header())
            .send_json(body)
            .map_err(|err| GraphError::Transport(err.to_string()))?;
        response
            .into_body()
            .read_json::<Value>()
            .map_err(|err| GraphError::Decode(err.to_string()))
    }

    /// Sorted project ids known to the service, minus the excluded set.
    pub fn get_projects(&mut self, excluded: &[&str]) -> Result<Vec<String>, GraphError> {
        let query_txt = "query Project { project(first:0) {project_id}} ";
        let data = self.query(query_txt, None)?;
        let projects = data
            .get("project")
            .and_then(Value::as_array)
            .ok_or_else(|| GraphError::MissingField("project".to_string()))?;

        let mut out: Vec<String> = projects
            .iter()
            .filter_map(|p| p.get("project_id").and_then(Value::as_str))
            .filter(|id| !excluded.contains(id))
            .map(str::to_string)
            .collect();
        out.sort();
        Ok(out)
    }
}
