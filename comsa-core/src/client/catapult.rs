use crate::client::{ChainSource, MetadataSnapshot};
use crate::error::{ComsaError, Result};
use crate::metadata::MetadataEntry;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Mosaic metadata, as opposed to account or namespace metadata.
const MOSAIC_METADATA_TYPE: u8 = 1;

/// Largest `pageSize` a Catapult node serves on `/metadata`.
pub const MAX_METADATA_PAGE_SIZE: u32 = 100;

/// Upper bound on `/metadata` pages walked for a single mosaic.
pub const DEFAULT_MAX_METADATA_PAGES: u32 = 1000;

#[derive(Debug, Clone)]
pub struct CatapultClientConfig {
    pub node_url: String,
    pub request_timeout: Duration,
    pub metadata_page_size: u32,
    pub max_metadata_pages: u32,
}

impl CatapultClientConfig {
    pub fn new(node_url: impl Into<String>) -> Self {
        Self {
            node_url: node_url.into(),
            request_timeout: Duration::from_secs(30),
            metadata_page_size: MAX_METADATA_PAGE_SIZE,
            max_metadata_pages: DEFAULT_MAX_METADATA_PAGES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkProperties {
    pub epoch_adjustment: u64,
    pub currency_mosaic_id: u64,
}

#[derive(Deserialize)]
struct MetadataPage {
    data: Vec<MetadataRecord>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    #[serde(default)]
    page_number: Option<u32>,
    #[serde(default)]
    page_size: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataRecord {
    metadata_entry: MetadataEntry,
}

#[derive(Deserialize)]
struct NetworkPropertiesResponse {
    network: NetworkSection,
    chain: ChainSection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkSection {
    epoch_adjustment: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainSection {
    currency_mosaic_id: String,
}

/// REST client for a Catapult (Symbol) node.
#[derive(Debug, Clone)]
pub struct CatapultClient {
    node_url: String,
    client: reqwest::Client,
    metadata_page_size: u32,
    max_metadata_pages: u32,
}

impl CatapultClient {
    pub fn new(config: CatapultClientConfig) -> Result<Self> {
        let node_url = config.node_url.trim().trim_end_matches('/').to_string();
        if node_url.is_empty() {
            return Err(ComsaError::Config("node url cannot be empty".to_string()));
        }
        if !node_url.starts_with("http://") && !node_url.starts_with("https://") {
            return Err(ComsaError::Config(format!(
                "node url must start with http:// or https://: {}",
                node_url
            )));
        }
        if config.metadata_page_size == 0 || config.metadata_page_size > MAX_METADATA_PAGE_SIZE {
            return Err(ComsaError::Config(format!(
                "metadata page size must be between 1 and {}: {}",
                MAX_METADATA_PAGE_SIZE, config.metadata_page_size
            )));
        }
        if config.max_metadata_pages == 0 {
            return Err(ComsaError::Config(
                "max metadata pages must be positive".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| ComsaError::Config(format!("failed to build http client: {}", error)))?;

        Ok(Self {
            node_url,
            client,
            metadata_page_size: config.metadata_page_size,
            max_metadata_pages: config.max_metadata_pages,
        })
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    pub async fn network_properties(&self) -> Result<NetworkProperties> {
        let response: NetworkPropertiesResponse =
            self.get_json("/network/properties", &[]).await?;

        let epoch_adjustment = response
            .network
            .epoch_adjustment
            .trim_end_matches('s')
            .parse::<u64>()
            .map_err(|error| {
                ComsaError::PayloadDecode(format!(
                    "invalid epochAdjustment '{}': {}",
                    response.network.epoch_adjustment, error
                ))
            })?;

        let currency_mosaic_id = parse_grouped_hex(&response.chain.currency_mosaic_id)?;

        Ok(NetworkProperties {
            epoch_adjustment,
            currency_mosaic_id,
        })
    }

    pub async fn mosaic_info(&self, mosaic_id: &str) -> Result<Value> {
        self.get_json(&format!("/mosaics/{}", mosaic_id), &[]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.node_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|error| ComsaError::Network(format!("GET {} failed: {}", url, error)))?;

        if !response.status().is_success() {
            return Err(ComsaError::Network(format!(
                "GET {} failed: status={}",
                url,
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|error| ComsaError::Network(format!("GET {} returned bad body: {}", url, error)))
    }
}

#[async_trait]
impl ChainSource for CatapultClient {
    async fn fetch_metadata(&self, mosaic_id: &str) -> Result<MetadataSnapshot> {
        let mut snapshot = MetadataSnapshot::default();
        let mut page_number = 1u32;

        loop {
            let query = [
                ("targetId", mosaic_id.to_string()),
                ("metadataType", MOSAIC_METADATA_TYPE.to_string()),
                ("pageSize", self.metadata_page_size.to_string()),
                ("pageNumber", page_number.to_string()),
            ];
            let raw: Value = self.get_json("/metadata", &query).await?;
            let page = MetadataPage::deserialize(&raw).map_err(|error| {
                ComsaError::Network(format!(
                    "metadata page {} of mosaic {} has bad body: {}",
                    page_number, mosaic_id, error
                ))
            })?;

            let pagination = page.pagination.unwrap_or_default();
            if let Some(served) = pagination.page_number {
                if served != page_number {
                    return Err(ComsaError::Network(format!(
                        "node answered metadata page {} when asked for page {}",
                        served, page_number
                    )));
                }
            }

            // Nodes may serve fewer entries per page than requested; the
            // page size they report is what a full page holds.
            let full_page = pagination.page_size.unwrap_or(self.metadata_page_size) as usize;
            let received = page.data.len();

            tracing::debug!(
                "metadata page fetched. mosaic={} page={} entries={} page_size={}",
                mosaic_id,
                page_number,
                received,
                full_page
            );

            snapshot
                .entries
                .extend(page.data.into_iter().map(|record| record.metadata_entry));
            snapshot.raw_pages.push(raw);

            if received == 0 || received < full_page {
                break;
            }
            if page_number >= self.max_metadata_pages {
                return Err(ComsaError::Network(format!(
                    "metadata of mosaic {} spans more than {} pages",
                    mosaic_id, self.max_metadata_pages
                )));
            }
            page_number += 1;
        }

        Ok(snapshot)
    }

    async fn fetch_transaction(&self, reference: &str) -> Result<Value> {
        self.get_json(&format!("/transactions/confirmed/{}", reference), &[])
            .await
    }
}

/// Parse ids rendered like `0x6BED'913F'A202'23F8`.
fn parse_grouped_hex(value: &str) -> Result<u64> {
    let cleaned: String = value.chars().filter(|c| *c != '\'').collect();
    let digits = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
        .unwrap_or(&cleaned);

    u64::from_str_radix(digits, 16).map_err(|error| {
        ComsaError::PayloadDecode(format!("invalid hex id '{}': {}", value, error))
    })
}
