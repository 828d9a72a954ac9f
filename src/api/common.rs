//! Common API utilities and shared types
//!
//! This module contains shared utilities used across multiple API endpoints.

use axum::extract::Multipart;
use serde::{Deserialize, Serialize};

use crate::api::middleware::ApiError;
use crate::models::ListParams;

// ============================================================================
// Pagination
// ============================================================================

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

pub fn default_per_page() -> u32 {
    20
}

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

// ============================================================================
// Bodies
// ============================================================================

/// Replacement id list for a many-to-many link
#[derive(Debug, Serialize, Deserialize)]
pub struct IdList {
    pub ids: Vec<i64>,
}

/// Response for a counter bump
#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: i32,
}

// ============================================================================
// Multipart
// ============================================================================

/// An uploaded file read from the `file` field
pub struct Upload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Read the `file` field of a multipart body, skipping any other fields
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

        return Ok(Upload {
            filename,
            data: data.to_vec(),
        });
    }

    Err(ApiError::validation_error("No file provided"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_query_clamps() {
        let query: PaginationQuery = serde_json::from_str(r#"{"page": 0, "per_page": 500}"#).unwrap();
        assert_eq!(query.params(), ListParams::new(1, 100));

        let query: PaginationQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.params(), ListParams::default());
    }
}
