//! Task suggestions from a generative model.
//!
//! Given a list title, asks the model for three to five tasks, each with a
//! generic role to assign it to. Every failure (no credential, network error,
//! bad status, unexpected response) degrades to "no suggestions".

use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::SuggestConfig;
use crate::ops;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub description: String,
    pub assignee_role: String,
}

pub struct Suggester {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    endpoint: String,
    office: Option<String>,
}

impl Suggester {
    /// `None` when no credential is configured: the action is then not
    /// offered at all.
    pub fn from_config(config: &SuggestConfig) -> Option<Self> {
        let api_key = config.api_key()?;
        let client = match reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                warn!("suggestions disabled: failed to build HTTP client: {e}");
                return None;
            }
        };
        Some(Self {
            client,
            api_key,
            model: config.model().to_string(),
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
            office: config.office.clone(),
        })
    }

    /// Suggestions for a list with this title. Empty on any failure.
    pub fn suggest(&self, title: &str) -> Vec<Suggestion> {
        match self.try_suggest(title) {
            Ok(suggestions) => {
                info!("received {} suggestion(s) for '{title}'", suggestions.len());
                suggestions
            }
            Err(e) => {
                warn!("task suggestion failed: {e:#}");
                Vec::new()
            }
        }
    }

    fn try_suggest(&self, title: &str) -> Result<Vec<Suggestion>> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let prompt = build_prompt(title, self.office.as_deref());
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(&prompt))
            .send()
            .context("request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("service answered {status}");
        }
        let body: Value = response.json().context("response is not JSON")?;
        parse_response(&body)
    }
}

pub fn build_prompt(title: &str, office: Option<&str>) -> String {
    let office = match office {
        Some(name) => format!("the law office \"{name}\""),
        None => "a law office".to_string(),
    };
    format!(
        "You are an experienced legal executive assistant for {office}.\n\
         Given a task list titled \"{title}\", suggest 3 to 5 essential, actionable and \
         professional tasks that belong on this list.\n\
         For each task, also suggest a generic role responsible for it \
         (e.g. Junior Lawyer, Intern, Secretary)."
    )
}

pub fn request_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "description": {
                            "type": "STRING",
                            "description": "Detailed description of the task (at least 50 characters)"
                        },
                        "assigneeRole": {
                            "type": "STRING",
                            "description": "Role suggested to carry out the task"
                        }
                    },
                    "required": ["description", "assigneeRole"]
                }
            }
        }
    })
}

/// Extract the suggestion array from a `generateContent` response.
pub fn parse_response(body: &Value) -> Result<Vec<Suggestion>> {
    let parts = body
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .context("response has no content parts")?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(text.trim()).context("response text is not a suggestion array")
}

/// Append each suggestion to the list, the role standing in for the
/// assignee. Suggestions missing either field are skipped. Returns how many
/// tasks were added.
pub fn apply_suggestions(
    conn: &Connection,
    list_id: &str,
    suggestions: &[Suggestion],
) -> Result<usize> {
    let mut added = 0;
    for s in suggestions {
        if s.description.trim().is_empty() || s.assignee_role.trim().is_empty() {
            warn!("skipping incomplete suggestion {s:?}");
            continue;
        }
        ops::add_task(conn, list_id, &s.description, &s.assignee_role, None)?;
        added += 1;
    }
    Ok(added)
}
