//! Flight and hotel search results
//!
//! Results are opaque records: the client reads only the fields it ranks and
//! prices by and passes everything else through untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One flight offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightResult {
    pub id: String,
    pub price: f64,
    /// Remaining backend fields (airline, times, stops...)
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl FlightResult {
    pub fn new(id: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            price,
            details: serde_json::Map::new(),
        }
    }

    /// String-valued pass-through field, e.g. `airline`
    pub fn field(&self, name: &str) -> Option<&str> {
        self.details.get(name).and_then(|v| v.as_str())
    }
}

/// One hotel offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelResult {
    pub id: String,
    pub rating: f64,
    #[serde(alias = "pricePerNight")]
    pub price_per_night: f64,
    /// Remaining backend fields (name, city, amenities...)
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl HotelResult {
    pub fn new(id: impl Into<String>, rating: f64, price_per_night: f64) -> Self {
        Self {
            id: id.into(),
            rating,
            price_per_night,
            details: serde_json::Map::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.details.get(name).and_then(|v| v.as_str())
    }
}

/// A search payload in one of its two wire shapes
///
/// Single-city searches answer with a flat list; multi-city searches answer
/// with a mapping from leg key (flights) or city name (hotels) to a list.
/// The shape is decided once, when the payload is decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultSet<T> {
    List(Vec<T>),
    ByKey(BTreeMap<String, Vec<T>>),
}

impl<T> ResultSet<T> {
    pub fn is_empty(&self) -> bool {
        match self {
            ResultSet::List(items) => items.is_empty(),
            ResultSet::ByKey(groups) => groups.values().all(Vec::is_empty),
        }
    }

    /// Total number of offers across all groups
    pub fn len(&self) -> usize {
        match self {
            ResultSet::List(items) => items.len(),
            ResultSet::ByKey(groups) => groups.values().map(Vec::len).sum(),
        }
    }
}

impl<T: serde::de::DeserializeOwned> ResultSet<T> {
    /// Decode a raw search payload, dispatching on its runtime shape
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
