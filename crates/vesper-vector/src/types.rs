//! Core types for vector storage

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{VectorError, VectorResult};
use crate::schema::DistanceMetric;

/// Vector representation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    /// Vector dimensions
    pub dimensions: usize,
    /// Vector data
    pub data: Vec<f32>,
}

impl Vector {
    /// Create a new vector
    pub fn new(data: Vec<f32>) -> Self {
        let dimensions = data.len();
        Self { dimensions, data }
    }

    /// Decode a little-endian float32 buffer
    pub fn from_le_bytes(mut bytes: &[u8]) -> VectorResult<Self> {
        if bytes.len() % 4 != 0 {
            return Err(VectorError::invalid_query(format!(
                "vector buffer of {} bytes is not a whole number of float32 values",
                bytes.len()
            )));
        }
        let mut data = Vec::with_capacity(bytes.len() / 4);
        while bytes.has_remaining() {
            data.push(bytes.get_f32_le());
        }
        Ok(Self::new(data))
    }

    /// Encode as the raw little-endian float32 buffer the search engine expects
    /// for vector query parameters.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.data.len() * 4);
        for value in &self.data {
            buf.put_f32_le(*value);
        }
        buf.to_vec()
    }

    /// Calculate cosine similarity with another vector
    pub fn cosine_similarity(&self, other: &Self) -> f32 {
        if self.dimensions != other.dimensions {
            return 0.0;
        }

        let dot = self.dot(other);
        let mag_a: f32 = self.data.iter().map(|x| x * x).sum::<f32>().sqrt();
        let mag_b: f32 = other.data.iter().map(|x| x * x).sum::<f32>().sqrt();

        if mag_a == 0.0 || mag_b == 0.0 {
            0.0
        } else {
            dot / (mag_a * mag_b)
        }
    }

    fn dot(&self, other: &Self) -> f32 {
        self.data.iter().zip(&other.data).map(|(a, b)| a * b).sum()
    }

    /// Distance under `metric`, using the same conventions as RediSearch:
    /// cosine is `1 - similarity`, L2 is the squared euclidean distance and
    /// inner product is `1 - dot`. Smaller always means closer.
    pub fn distance(&self, other: &Self, metric: DistanceMetric) -> f32 {
        match metric {
            DistanceMetric::Cosine => 1.0 - self.cosine_similarity(other),
            DistanceMetric::L2 => self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| (a - b) * (a - b))
                .sum(),
            DistanceMetric::InnerProduct => 1.0 - self.dot(other),
        }
    }

    /// Validate the vector against an expected dimension
    pub fn validate(&self, expected: usize) -> VectorResult<()> {
        if self.data.is_empty() {
            return Err(VectorError::invalid_query("vector cannot be empty"));
        }
        if self.dimensions != self.data.len() || self.data.len() != expected {
            return Err(VectorError::invalid_dimension(expected, self.data.len()));
        }
        if self.data.iter().any(|v| !v.is_finite()) {
            return Err(VectorError::invalid_query("vector contains non-finite values"));
        }
        Ok(())
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

/// Record as delivered by an ingestion source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRecord {
    #[serde(rename = "docId")]
    pub doc_id: String,
    pub title: String,
    #[serde(rename = "titleVector")]
    pub title_vector: Vec<f32>,
}

/// Document with its title embedding
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Identifier, unique within a key prefix
    pub id: String,
    /// Searchable title text
    pub title: String,
    /// Title embedding
    pub vector: Vector,
}

impl Document {
    /// Create a new document
    pub fn new(id: impl Into<String>, title: impl Into<String>, vector: Vector) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            vector,
        }
    }

    /// Store key for this document under `prefix`
    pub fn key(&self, prefix: &str) -> String {
        document_key(prefix, &self.id)
    }

    /// The JSON value persisted at the document root
    pub fn to_stored(&self) -> StoredDocument {
        StoredDocument {
            title: self.title.clone(),
            title_vector: self.vector.data.clone(),
        }
    }

    /// Rebuild a document from its stored form
    pub fn from_stored(id: impl Into<String>, stored: StoredDocument) -> Self {
        Self::new(id, stored.title, Vector::new(stored.title_vector))
    }
}

impl From<SourceRecord> for Document {
    fn from(record: SourceRecord) -> Self {
        Self::new(record.doc_id, record.title, Vector::new(record.title_vector))
    }
}

/// Build the store key for a document id
pub fn document_key(prefix: &str, id: &str) -> String {
    format!("{prefix}{id}")
}

/// Shape of the JSON value written at the root of each document key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredDocument {
    pub title: String,
    #[serde(rename = "titleVector")]
    pub title_vector: Vec<f32>,
}

/// A single search match
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Store key of the matched document
    pub id: String,
    /// Title taken from the stored payload, or a placeholder
    pub title: String,
    /// Distance to the query vector (smaller is more similar)
    pub score: f32,
}

/// Ordered search matches, ascending by score
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResults {
    /// Number of matches the store reported before pagination
    pub total: usize,
    /// Matches on the requested page
    pub hits: Vec<SearchHit>,
}

impl SearchResults {
    pub fn new(total: usize, hits: Vec<SearchHit>) -> Self {
        Self { total, hits }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// Batch operation result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    /// Successfully processed IDs
    pub succeeded: Vec<String>,
    /// Failed operations with errors
    pub failed: Vec<(String, String)>,
}

impl BatchResult {
    /// Create a new batch result
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a success
    pub fn add_success(&mut self, id: impl Into<String>) {
        self.succeeded.push(id.into());
    }

    /// Add a failure
    pub fn add_failure(&mut self, id: impl Into<String>, error: impl Into<String>) {
        self.failed.push((id.into(), error.into()));
    }

    /// Check if all operations succeeded
    pub fn is_all_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total count of operations
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn le_bytes_layout() {
        let vector = Vector::new(vec![1.0, -2.5]);
        let bytes = vector.to_le_bytes();

        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..], &(-2.5f32).to_le_bytes());
        assert_eq!(Vector::from_le_bytes(&bytes).unwrap(), vector);
    }

    #[test]
    fn from_le_bytes_rejects_partial_values() {
        assert!(Vector::from_le_bytes(&[0, 0, 128]).is_err());
    }

    #[test]
    fn cosine_distance_of_identical_vectors_is_zero() {
        let a = Vector::new(vec![0.3, 0.4, 0.5]);
        assert!(a.distance(&a, DistanceMetric::Cosine).abs() < 1e-6);

        let b = Vector::new(vec![-0.3, -0.4, -0.5]);
        assert!((a.distance(&b, DistanceMetric::Cosine) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn l2_distance_is_squared() {
        let a = Vector::new(vec![0.0, 0.0]);
        let b = Vector::new(vec![3.0, 4.0]);
        assert!((a.distance(&b, DistanceMetric::L2) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn validate_checks_dimension() {
        let vector = Vector::new(vec![0.1; 3]);
        assert!(vector.validate(3).is_ok());
        assert!(matches!(
            vector.validate(384),
            Err(VectorError::InvalidDimension {
                expected: 384,
                actual: 3
            })
        ));
        assert!(Vector::new(vec![]).validate(0).is_err());
        assert!(Vector::new(vec![f32::NAN]).validate(1).is_err());
    }

    #[test]
    fn source_record_maps_to_stored_shape() {
        let record: SourceRecord = serde_json::from_value(serde_json::json!({
            "docId": "gf0gc9ag0d",
            "title": "Livro - Pocket",
            "titleVector": [0.5, -0.25]
        }))
        .unwrap();

        let doc = Document::from(record);
        assert_eq!(doc.key("product-docs:"), "product-docs:gf0gc9ag0d");

        let stored = serde_json::to_value(doc.to_stored()).unwrap();
        assert_eq!(
            stored,
            serde_json::json!({"title": "Livro - Pocket", "titleVector": [0.5, -0.25]})
        );
    }

    #[test]
    fn batch_result_counts() {
        let mut batch = BatchResult::new();
        batch.add_success("a");
        batch.add_failure("b", "store unavailable");

        assert_eq!(batch.total(), 2);
        assert!(!batch.is_all_success());
    }
}
