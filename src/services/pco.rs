// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Planning Center Online Services API client

use serde::Deserialize;

use super::{fetch_text, http_client, parse_json, ApiError};

const PCO_BASE_URL: &str = "https://api.planningcenteronline.com";

/// A service type (e.g., "Sunday Morning")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceType {
    pub id: String,
    pub name: String,
}

/// One plan of a service type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub id: String,
    pub service_type_id: String,
    pub title: Option<String>,
    pub dates: Option<String>,
}

/// A song item of a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSong {
    /// Song id (not the plan item id)
    pub id: String,
    pub title: String,
    pub key: Option<String>,
}

// JSON:API documents. Only the fields we read are declared.

#[derive(Debug, Deserialize)]
struct Document<A> {
    data: Vec<Resource<A>>,
}

#[derive(Debug, Deserialize)]
struct Resource<A> {
    id: String,
    attributes: A,
    #[serde(default)]
    relationships: Option<Relationships>,
}

#[derive(Debug, Default, Deserialize)]
struct Relationships {
    song: Option<Relationship>,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    data: Option<ResourceRef>,
}

#[derive(Debug, Deserialize)]
struct ResourceRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ServiceTypeAttributes {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PlanAttributes {
    title: Option<String>,
    dates: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemAttributes {
    title: Option<String>,
    item_type: String,
    key_name: Option<String>,
}

fn service_types_from(document: Document<ServiceTypeAttributes>) -> Vec<ServiceType> {
    document
        .data
        .into_iter()
        .map(|resource| ServiceType {
            id: resource.id,
            name: resource.attributes.name,
        })
        .collect()
}

fn plans_from(service_type_id: &str, document: Document<PlanAttributes>) -> Vec<PlanSummary> {
    document
        .data
        .into_iter()
        .map(|resource| PlanSummary {
            id: resource.id,
            service_type_id: service_type_id.to_string(),
            title: resource.attributes.title,
            dates: resource.attributes.dates,
        })
        .collect()
}

/// Keep the song items of a plan, in plan order
fn songs_from(document: Document<ItemAttributes>) -> Vec<PlanSong> {
    document
        .data
        .into_iter()
        .filter(|item| item.attributes.item_type == "song")
        .map(|item| {
            let song_id = item
                .relationships
                .and_then(|r| r.song)
                .and_then(|song| song.data)
                .map_or(item.id, |song| song.id);
            PlanSong {
                id: song_id,
                title: item.attributes.title.unwrap_or_default(),
                key: item.attributes.key_name,
            }
        })
        .collect()
}

/// Parse a plan items document into songs
pub fn parse_plan_songs(json: &str) -> Result<Vec<PlanSong>, ApiError> {
    parse_json(json).map(songs_from)
}

/// Parse a service types document
pub fn parse_service_types(json: &str) -> Result<Vec<ServiceType>, ApiError> {
    parse_json(json).map(service_types_from)
}

/// Parse the plans document of one service type
pub fn parse_plans(service_type_id: &str, json: &str) -> Result<Vec<PlanSummary>, ApiError> {
    parse_json(json).map(|document| plans_from(service_type_id, document))
}

/// Planning Center client bound to one access token
pub struct PcoClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl PcoClient {
    pub fn new(token: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(PCO_BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self {
            http_client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    async fn get(&self, path: &str) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Querying Planning Center");
        fetch_text(self.http_client.get(&url).bearer_auth(&self.token)).await
    }

    pub async fn service_types(&self) -> Result<Vec<ServiceType>, ApiError> {
        parse_service_types(&self.get("/services/v2/service_types").await?)
    }

    pub async fn plans(&self, service_type_id: &str) -> Result<Vec<PlanSummary>, ApiError> {
        let path = format!("/services/v2/service_types/{}/plans", service_type_id);
        parse_plans(service_type_id, &self.get(&path).await?)
    }

    /// Plans of every service type
    pub async fn all_plans(&self) -> Result<Vec<PlanSummary>, ApiError> {
        let mut plans = Vec::new();
        for service_type in self.service_types().await? {
            plans.extend(self.plans(&service_type.id).await?);
        }
        Ok(plans)
    }

    pub async fn plan_songs(
        &self,
        service_type_id: &str,
        plan_id: &str,
    ) -> Result<Vec<PlanSong>, ApiError> {
        let path = format!(
            "/services/v2/service_types/{}/plans/{}/items?include=song",
            service_type_id, plan_id
        );
        let songs = parse_plan_songs(&self.get(&path).await?)?;
        tracing::info!(service_type_id, plan_id, songs = songs.len(), "Fetched plan songs");
        Ok(songs)
    }
}
