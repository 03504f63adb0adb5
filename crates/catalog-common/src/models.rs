//! Catalog entities and API envelopes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Standard response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Query parameters for list endpoints. Unset fields are left off the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<Industry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ListParams {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Default::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = (!search.is_empty()).then_some(search);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(alias = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    /// Long-form markdown body.
    #[serde(default)]
    pub content: String,
    /// Product range tags.
    #[serde(default)]
    pub range: Vec<String>,
    /// Sort position in listings.
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    #[default]
    All,
    Chemicals,
    Oil,
}

impl Industry {
    pub fn as_str(self) -> &'static str {
        match self {
            Industry::All => "all",
            Industry::Chemicals => "chemicals",
            Industry::Oil => "oil",
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown industry {0:?}, expected one of: all, chemicals, oil")]
pub struct UnknownIndustry(pub String);

impl FromStr for Industry {
    type Err = UnknownIndustry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Industry::All),
            "chemicals" => Ok(Industry::Chemicals),
            "oil" => Ok(Industry::Oil),
            _ => Err(UnknownIndustry(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(alias = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub industry: Industry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    #[serde(alias = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub description: String,
    /// Markdown body, edited with the catalog editor.
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Blog {
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated_at.as_deref().and_then(parse_timestamp)
    }
}

/// Parse a server timestamp. Accepts RFC 3339 and bare `YYYY-MM-DD` dates,
/// which the console writes for locally edited posts.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// A contact request submitted through the public site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[serde(alias = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub request: String,
}
