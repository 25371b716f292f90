pub mod answer;

pub use answer::*;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tenant configuration scoping catalogs, branding and example queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub catalog_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub agent_org_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub agent_catalog_descriptions: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ui_logo_html: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ui_display_html: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Website,
    #[default]
    #[serde(other)]
    Catalog,
}

/// A catalog is configured with one source URL or a list of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CatalogUrl {
    One(String),
    Many(Vec<String>),
}

impl CatalogUrl {
    pub fn urls(&self) -> Vec<&str> {
        match self {
            Self::One(url) => vec![url.as_str()],
            Self::Many(urls) => urls.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataCatalog {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kind: CatalogKind,
    #[serde(default)]
    pub url: Option<CatalogUrl>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub geo: Option<String>,
    #[serde(default)]
    pub http_headers: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ignore_query: bool,
    #[serde(default)]
    pub fetcher_proxy: Option<String>,
    /// Owning deployment. Filled in by the client, never sent by the backend.
    #[serde(skip)]
    pub deployment_id: Option<String>,
}

impl DataCatalog {
    pub fn is_website(&self) -> bool {
        self.kind == CatalogKind::Website
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QualityIssue {
    pub issue: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// Column description of a tabular resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Field {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_values: Vec<serde_json::Value>,
    #[serde(default)]
    pub missing_values_percent: Option<f64>,
    #[serde(default)]
    pub max_value: Option<serde_json::Value>,
    #[serde(default)]
    pub min_value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_format: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub db_schema: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_selected: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_loaded: bool,
    #[serde(default)]
    pub loading_error: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quality_issues: Vec<QualityIssue>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chunks: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Pending,
    Selected,
    Loaded,
    Error,
}

impl FetchStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Selected => "selected",
            Self::Loaded => "loaded",
            Self::Error => "error",
        }
    }
}

impl Resource {
    pub fn fetch_status(&self) -> FetchStatus {
        if self
            .loading_error
            .as_deref()
            .is_some_and(|err| !err.trim().is_empty())
        {
            FetchStatus::Error
        } else if self.status_loaded {
            FetchStatus::Loaded
        } else if self.status_selected {
            FetchStatus::Selected
        } else {
            FetchStatus::Pending
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    #[serde(rename = "catalogId", default)]
    pub catalog_id: String,
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub publisher: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub publisher_description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub better_title: Option<String>,
    #[serde(default)]
    pub better_description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_embedding: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_indexing: bool,
    #[serde(default)]
    pub improvement_score: Option<f64>,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quality_issues: Vec<QualityIssue>,
    #[serde(default)]
    pub versions: Option<serde_json::Value>,
}

impl Dataset {
    /// Distinct, non-empty resource formats in first-seen order.
    pub fn resource_formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = Vec::new();
        for resource in &self.resources {
            let format = resource.file_format.as_str();
            if !format.is_empty() && !formats.contains(&format) {
                formats.push(format);
            }
        }
        formats
    }

    pub fn quality_stars(&self) -> u8 {
        quality_stars(self.quality_score.unwrap_or(0.0))
    }
}

/// Maps a 0-100 quality score onto a 1-5 star rating.
pub fn quality_stars(score: f64) -> u8 {
    (score / 20.0 + 1.0).clamp(1.0, 5.0) as u8
}

/// A persisted question/answer exchange.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QA {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub question: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
}

impl QA {
    /// Timestamp rendered in local time as `DD/MM/YYYY HH:MM`.
    pub fn local_timestamp(&self) -> Option<String> {
        let raw = self.timestamp.as_deref()?.trim();
        let utc = if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            parsed.with_timezone(&Utc)
        } else {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
                .ok()?
                .and_utc()
        };
        Some(utc.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string())
    }
}

/// One page of datasets. `page` echoes the requested page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DatasetPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub datasets: Vec<Dataset>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pages: u64,
    #[serde(default = "first_page")]
    pub page: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuestionPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<QA>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pages: u64,
    #[serde(default = "first_page")]
    pub page: u32,
}

fn first_page() -> u32 {
    1
}

/// Treats an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
