//! API and Dataset Models
//!
//! This module defines the data structures of the sculpture dataset, used both
//! for deserializing the dataset file and for generating OpenAPI documentation
//! with `utoipa`.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// One sculpture's descriptive entry in the dataset.
///
/// Only `name` is required. The optional fields are free text by design:
/// `year` holds imprecise historical ranges ("around 1380", "before 1228")
/// that no date type can represent faithfully.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct SculptureRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cast_information: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_information: Option<String>,
}

impl SculptureRecord {
    /// A record with only a name set, for building fixtures and tests.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            year: None,
            location: None,
            artist: None,
            cast_information: None,
            original_material: None,
            dimensions: None,
            description: None,
            style: None,
            original_information: None,
        }
    }
}

/// A fixed informational block about the gallery or its period.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct GeneralInfo {
    pub title: String,
    pub description: String,
}

/// The two fixed informational blocks of the dataset.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GeneralInformation {
    pub gallery_collection: GeneralInfo,
    pub gothic_style: GeneralInfo,
}

/// The whole dataset file: general information plus the sculpture records.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DatasetDocument {
    pub general_information: GeneralInformation,
    pub sculptures: Vec<SculptureRecord>,
}

/// Optional filter criteria for the sculpture search, also the REST query
/// parameters of `GET /api/sculptures`.
#[derive(Deserialize, IntoParams, ToSchema, Debug, Default, Clone)]
pub struct SearchCriteria {
    pub name: Option<String>,
    pub artist: Option<String>,
    pub location: Option<String>,
    pub year: Option<String>,
}

/// JSON error body of the REST surface.
#[derive(Serialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub error: String,
}
