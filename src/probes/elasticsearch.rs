//! Search-index probe.
//!
//! Indexes one fixed document under a fixed id, so repeated checks overwrite
//! the same document instead of growing the index. Elasticsearch acknowledges
//! the first write with `"result": "created"` and later ones with `"updated"`;
//! both count as success. Clusters old enough to answer with the legacy
//! `"created"` boolean are accepted too.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Probe;
use crate::config::{
    InstanceDescriptor, ELASTICSEARCH_DEFAULT_PORT, ELASTICSEARCH_PROBE_DOC_ID,
    ELASTICSEARCH_PROBE_INDEX, PROBE_USER_AGENT,
};
use crate::error::ProbeError;

const DEFAULT_SCHEME: &str = "http";

#[derive(Debug, Serialize)]
struct ProbeDocument {
    author: &'static str,
    text: &'static str,
    timestamp: DateTime<Utc>,
}

impl ProbeDocument {
    fn now() -> Self {
        Self {
            author: "kimchy",
            text: "Elasticsearch: cool. bonsai cool.",
            timestamp: Utc::now(),
        }
    }
}

/// Acknowledgment returned by the index API
#[derive(Debug, Deserialize)]
struct IndexResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    created: Option<bool>,
}

impl IndexResponse {
    fn acknowledge(self) -> Result<Value, ProbeError> {
        match (self.result, self.created) {
            (Some(result), _) if result == "created" || result == "updated" => {
                Ok(json!({ "result": result }))
            }
            (Some(result), _) => Err(ProbeError::UnexpectedResponse(format!(
                "index result was {:?}",
                result
            ))),
            (None, Some(created)) => Ok(json!({ "created": created })),
            (None, None) => Err(ProbeError::UnexpectedResponse(
                "index response carried no acknowledgment".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElasticsearchProbe {
    client: reqwest::Client,
}

impl ElasticsearchProbe {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(PROBE_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    fn document_url(instance: &InstanceDescriptor) -> String {
        format!(
            "{}://{}:{}/{}/_doc/{}",
            instance.scheme.as_deref().unwrap_or(DEFAULT_SCHEME),
            instance.host,
            instance.port_or(ELASTICSEARCH_DEFAULT_PORT),
            ELASTICSEARCH_PROBE_INDEX,
            ELASTICSEARCH_PROBE_DOC_ID
        )
    }
}

#[async_trait]
impl Probe for ElasticsearchProbe {
    async fn check(&self, instance: &InstanceDescriptor) -> Result<Option<Value>, ProbeError> {
        let mut request = self
            .client
            .put(Self::document_url(instance))
            .json(&ProbeDocument::now());

        if let Some(username) = &instance.username {
            request = request.basic_auth(username, instance.password.as_ref());
        }

        // The response body is consumed in full, which hands the connection back
        let response = request.send().await?.error_for_status()?;
        let ack: IndexResponse = response.json().await?;

        ack.acknowledge().map(Some)
    }
}
