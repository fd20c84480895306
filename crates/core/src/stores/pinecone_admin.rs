use crate::error::ProviderError;
use crate::stores::pinecone::{send_json, IndexStats, PineconeIndex, API_KEY_HEADER};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;
use url::Url;

pub const CONTROL_PLANE_URL: &str = "https://api.pinecone.io/";

const BACKEND: &str = "pinecone-control";
const API_VERSION_HEADER: &str = "X-Pinecone-API-Version";
const API_VERSION: &str = "2024-07";

/// Shape of a serverless index to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    pub cloud: String,
    pub region: String,
}

impl IndexSpec {
    /// Cosine index on the free-tier serverless region.
    pub fn serverless(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: "cosine".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    fn to_request(&self) -> Value {
        json!({
            "name": self.name,
            "dimension": self.dimension,
            "metric": self.metric,
            "spec": {
                "serverless": {
                    "cloud": self.cloud,
                    "region": self.region,
                }
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescription {
    pub name: String,
    /// Absent for sparse indexes.
    pub dimension: Option<usize>,
    pub metric: String,
    /// Data-plane host; may be empty right after creation.
    pub host: String,
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSetup {
    Existing {
        description: IndexDescription,
        stats: IndexStats,
    },
    Created(IndexDescription),
}

/// Control-plane client: lists and creates indexes for one project.
pub struct PineconeAdmin {
    base_url: Url,
    api_key: String,
    client: Client,
}

impl PineconeAdmin {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "pinecone api key is empty".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            api_key,
            client: Client::new(),
        })
    }

    pub async fn list_indexes(&self) -> Result<Vec<IndexDescription>, ProviderError> {
        let request = self
            .client
            .get(self.base_url.join("indexes")?)
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_VERSION_HEADER, API_VERSION);
        let parsed = send_json(BACKEND, request).await?;
        parse_index_list(&parsed)
    }

    pub async fn create_index(&self, spec: &IndexSpec) -> Result<IndexDescription, ProviderError> {
        let request = self
            .client
            .post(self.base_url.join("indexes")?)
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_VERSION_HEADER, API_VERSION)
            .json(&spec.to_request());
        let parsed = send_json(BACKEND, request).await?;
        parse_index_description(&parsed)
    }

    /// Creates the index when no index carries `spec.name`; otherwise describes the existing one.
    pub async fn ensure_index(&self, spec: &IndexSpec) -> Result<IndexSetup, ProviderError> {
        let existing = self
            .list_indexes()
            .await?
            .into_iter()
            .find(|index| index.name == spec.name);

        if let Some(description) = existing {
            let stats = PineconeIndex::new(&description.host, self.api_key.clone())?
                .describe_stats()
                .await?;
            info!(
                index = %description.name,
                dimension = stats.dimension,
                vectors = stats.total_vector_count,
                "pinecone index already exists"
            );
            return Ok(IndexSetup::Existing { description, stats });
        }

        let description = self.create_index(spec).await?;
        info!(
            index = %description.name,
            dimension = spec.dimension,
            metric = %spec.metric,
            "pinecone index created"
        );
        Ok(IndexSetup::Created(description))
    }
}

fn parse_index_description(item: &Value) -> Result<IndexDescription, ProviderError> {
    let name = item
        .pointer("/name")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::malformed(BACKEND, "index description has no name"))?;

    Ok(IndexDescription {
        name: name.to_string(),
        dimension: item
            .pointer("/dimension")
            .and_then(Value::as_u64)
            .map(|dimension| dimension as usize),
        metric: item
            .pointer("/metric")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        host: item
            .pointer("/host")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        ready: item
            .pointer("/status/ready")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

fn parse_index_list(parsed: &Value) -> Result<Vec<IndexDescription>, ProviderError> {
    parsed
        .pointer("/indexes")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::malformed(BACKEND, "index list has no indexes array"))?
        .iter()
        .map(parse_index_description)
        .collect()
}
