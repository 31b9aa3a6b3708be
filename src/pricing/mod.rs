pub(crate) mod dashboard;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filters::DataType;
use crate::grid::Node;

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("JSON decoding failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableYears {
    pub years: Vec<i32>,
    pub markets: Vec<String>,
}

/// GeoJSON FeatureCollection of the Voronoi partition, one polygon per
/// priced node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoronoiMap {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<VoronoiFeature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoronoiFeature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: PolygonGeometry,
    pub properties: CellProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<Vec<f64>>>,
}

/// Per-cell payload. Depending on data type the server labels the
/// scalar `price` or `value`; both land here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellProperties {
    pub node_id: i64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(alias = "value")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusIndicator {
    pub node_id: i64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub zone: Option<String>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyComparison {
    pub node_id: i64,
    pub node_code: String,
    pub node_name: String,
    pub year: i32,
    pub day: u32,
    pub hour: u32,
    pub data: Vec<MonthlyPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: u32,
    pub value: Option<f64>,
}

/// One bar of the all-nodes distribution; the server ranks these from
/// highest to lowest and that order is preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedNodePrice {
    pub node_id: i64,
    pub node_code: String,
    pub node_name: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CongestionPoint {
    pub timestamp: DateTime<Utc>,
    pub node1_price: Option<f64>,
    pub node2_price: Option<f64>,
    pub congestion_price: Option<f64>,
    pub node1_code: String,
    pub node2_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedStats {
    pub avg: Option<f64>,
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub count: i64,
}

pub struct PricingClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl PricingClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    /// Attach a bearer token to every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Years and markets present in the price archive.
    pub async fn available_years(&self) -> Result<AvailableYears, PricingError> {
        self.get_json("/prices/available-years", &[]).await
    }

    /// The node directory.
    pub async fn nodes(&self, limit: u32) -> Result<Vec<Node>, PricingError> {
        self.get_json("/nodes", &[("limit", limit.to_string())])
            .await
    }

    /// Voronoi heatmap polygons for one representative instant. Note
    /// the parameter is `datatype` here, not `data_type`.
    pub async fn voronoi_map(
        &self,
        timestamp: &str,
        market: &str,
        data_type: DataType,
    ) -> Result<VoronoiMap, PricingError> {
        self.get_json(
            "/prices/voronoi-map",
            &[
                ("timestamp", timestamp.to_string()),
                ("market", market.to_string()),
                ("datatype", data_type.as_str().to_string()),
            ],
        )
        .await
    }

    /// Flat per-node values for the status circles; same `datatype`
    /// spelling as the map endpoint.
    pub async fn status_indicators(
        &self,
        timestamp: &str,
        market: &str,
        data_type: DataType,
    ) -> Result<Vec<StatusIndicator>, PricingError> {
        self.get_json(
            "/prices/status-indicators",
            &[
                ("timestamp", timestamp.to_string()),
                ("market", market.to_string()),
                ("datatype", data_type.as_str().to_string()),
            ],
        )
        .await
    }

    /// Month-by-month values for one node at a fixed day and hour.
    pub async fn monthly_comparison(
        &self,
        node_id: i64,
        year: i32,
        day: u32,
        hour: u32,
        data_type: DataType,
    ) -> Result<MonthlyComparison, PricingError> {
        self.get_json(
            &format!("/prices/monthly-comparison/{node_id}"),
            &[
                ("year", year.to_string()),
                ("day", day.to_string()),
                ("hour", hour.to_string()),
                ("data_type", data_type.as_str().to_string()),
            ],
        )
        .await
    }

    /// All nodes ranked by value at one instant.
    pub async fn all_nodes_distribution(
        &self,
        timestamp: &str,
        market: &str,
        data_type: DataType,
    ) -> Result<Vec<RankedNodePrice>, PricingError> {
        self.get_json(
            "/prices/all-nodes-distribution",
            &[
                ("timestamp", timestamp.to_string()),
                ("market", market.to_string()),
                ("data_type", data_type.as_str().to_string()),
            ],
        )
        .await
    }

    /// Congestion cost series between two nodes over a date range.
    pub async fn congestion(
        &self,
        node1_id: i64,
        node2_id: i64,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<CongestionPoint>, PricingError> {
        self.get_json(
            "/prices/congestion",
            &[
                ("node1_id", node1_id.to_string()),
                ("node2_id", node2_id.to_string()),
                ("start_date", start_date.to_string()),
                ("end_date", end_date.to_string()),
            ],
        )
        .await
    }

    /// Aggregated statistics for one node over a date range.
    pub async fn aggregated_stats(
        &self,
        node_id: i64,
        start_date: &str,
        end_date: &str,
        data_type: DataType,
    ) -> Result<AggregatedStats, PricingError> {
        self.get_json(
            &format!("/prices/stats/{node_id}"),
            &[
                ("start_date", start_date.to_string()),
                ("end_date", end_date.to_string()),
                ("data_type", data_type.as_str().to_string()),
            ],
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PricingError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PricingError::Status {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

fn excerpt(body: &str) -> String {
    const MAX: usize = 300;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut cut = MAX;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &body[..cut])
    }
}
