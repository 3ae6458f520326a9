//! Index schema definitions
//!
//! An [`IndexDefinition`] names the index, scopes it to a key prefix and
//! declares the searchable fields. It renders itself into the argument list
//! of an `FT.CREATE ... ON JSON` command.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{VectorError, VectorResult};

/// JSON path of the title text
pub const TITLE_PATH: &str = "$.title";
/// Field alias of the title text
pub const TITLE_FIELD: &str = "title";
/// JSON path of the title embedding
pub const VECTOR_PATH: &str = "$.titleVector";
/// Field alias of the title embedding
pub const VECTOR_FIELD: &str = "titleVector";

/// Distance metric used by a vector field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
    InnerProduct,
}

impl DistanceMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "COSINE",
            Self::L2 => "L2",
            Self::InnerProduct => "IP",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = VectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COSINE" => Ok(Self::Cosine),
            "L2" => Ok(Self::L2),
            "IP" | "INNER_PRODUCT" => Ok(Self::InnerProduct),
            other => Err(VectorError::invalid_query(format!(
                "unknown distance metric: {other}"
            ))),
        }
    }
}

/// Approximate or exact vector index algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IndexAlgorithm {
    #[default]
    Hnsw,
    Flat,
}

impl IndexAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hnsw => "HNSW",
            Self::Flat => "FLAT",
        }
    }
}

impl fmt::Display for IndexAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexAlgorithm {
    type Err = VectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HNSW" => Ok(Self::Hnsw),
            "FLAT" => Ok(Self::Flat),
            other => Err(VectorError::invalid_query(format!(
                "unknown index algorithm: {other}"
            ))),
        }
    }
}

/// Parameters of a vector field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorFieldParams {
    pub algorithm: IndexAlgorithm,
    /// Number of components of every stored and queried vector
    pub dimension: usize,
    pub metric: DistanceMetric,
}

impl VectorFieldParams {
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            algorithm: IndexAlgorithm::default(),
            dimension,
            metric,
        }
    }

    pub fn with_algorithm(mut self, algorithm: IndexAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    // Elements are always FLOAT32, matching the query parameter encoding.
    fn args(&self) -> Vec<String> {
        let attributes = [
            ("TYPE", "FLOAT32".to_string()),
            ("DIM", self.dimension.to_string()),
            ("DISTANCE_METRIC", self.metric.as_str().to_string()),
        ];
        let mut args = vec![
            self.algorithm.as_str().to_string(),
            (attributes.len() * 2).to_string(),
        ];
        for (name, value) in attributes {
            args.push(name.to_string());
            args.push(value);
        }
        args
    }
}

/// Kind of an indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Vector(VectorFieldParams),
}

/// A searchable field: JSON path plus the alias queries refer to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    pub path: String,
    pub alias: String,
    pub kind: FieldKind,
}

impl IndexField {
    pub fn text(path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: alias.into(),
            kind: FieldKind::Text,
        }
    }

    pub fn vector(path: impl Into<String>, alias: impl Into<String>, params: VectorFieldParams) -> Self {
        Self {
            path: path.into(),
            alias: alias.into(),
            kind: FieldKind::Vector(params),
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![self.path.clone(), "AS".to_string(), self.alias.clone()];
        match &self.kind {
            FieldKind::Text => args.push("TEXT".to_string()),
            FieldKind::Vector(params) => {
                args.push("VECTOR".to_string());
                args.extend(params.args());
            }
        }
        args
    }
}

/// Index over JSON documents stored under a key prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub key_prefix: String,
    pub fields: Vec<IndexField>,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_prefix: key_prefix.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: IndexField) -> Self {
        self.fields.push(field);
        self
    }

    /// Standard document index: a text field on the title and a vector field
    /// on the title embedding.
    pub fn for_documents(
        name: impl Into<String>,
        key_prefix: impl Into<String>,
        params: VectorFieldParams,
    ) -> Self {
        Self::new(name, key_prefix)
            .with_field(IndexField::text(TITLE_PATH, TITLE_FIELD))
            .with_field(IndexField::vector(VECTOR_PATH, VECTOR_FIELD, params))
    }

    /// The vector field named `alias`
    pub fn vector_field(&self, alias: &str) -> Option<&VectorFieldParams> {
        self.fields.iter().find_map(|field| match &field.kind {
            FieldKind::Vector(params) if field.alias == alias => Some(params),
            _ => None,
        })
    }

    /// Check the definition is something the store can create
    pub fn validate(&self) -> VectorResult<()> {
        if self.name.trim().is_empty() {
            return Err(VectorError::invalid_query("index name cannot be empty"));
        }
        if self.key_prefix.is_empty() {
            return Err(VectorError::invalid_query("key prefix cannot be empty"));
        }
        if self.fields.is_empty() {
            return Err(VectorError::invalid_query("index needs at least one field"));
        }
        for field in &self.fields {
            if let FieldKind::Vector(params) = &field.kind {
                if params.dimension == 0 {
                    return Err(VectorError::invalid_query(format!(
                        "vector field {} needs a positive dimension",
                        field.alias
                    )));
                }
            }
        }
        Ok(())
    }

    /// Arguments following `FT.CREATE`
    pub fn create_args(&self) -> Vec<String> {
        let mut args = vec![
            self.name.clone(),
            "ON".to_string(),
            "JSON".to_string(),
            "PREFIX".to_string(),
            "1".to_string(),
            self.key_prefix.clone(),
            "SCHEMA".to_string(),
        ];
        for field in &self.fields {
            args.extend(field.args());
        }
        args
    }
}

/// Outcome of idempotent index provisioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexStatus {
    Created,
    AlreadyExists,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_args_match_ft_create_layout() {
        let def = IndexDefinition::for_documents(
            "productDocsIdx",
            "product-docs:",
            VectorFieldParams::new(384, DistanceMetric::Cosine),
        );

        assert_eq!(
            def.create_args().join(" "),
            "productDocsIdx ON JSON PREFIX 1 product-docs: SCHEMA \
             $.title AS title TEXT \
             $.titleVector AS titleVector VECTOR HNSW 6 TYPE FLOAT32 DIM 384 DISTANCE_METRIC COSINE"
        );
    }

    #[test]
    fn flat_algorithm_and_metric_render() {
        let params = VectorFieldParams::new(8, DistanceMetric::L2).with_algorithm(IndexAlgorithm::Flat);
        let def = IndexDefinition::for_documents("idx", "p:", params);
        let rendered = def.create_args().join(" ");

        assert!(rendered.ends_with("VECTOR FLAT 6 TYPE FLOAT32 DIM 8 DISTANCE_METRIC L2"));
    }

    #[test]
    fn vector_field_lookup() {
        let def = IndexDefinition::for_documents(
            "idx",
            "p:",
            VectorFieldParams::new(384, DistanceMetric::Cosine),
        );

        assert_eq!(def.vector_field(VECTOR_FIELD).map(|p| p.dimension), Some(384));
        assert!(def.vector_field(TITLE_FIELD).is_none());
    }

    #[test]
    fn metric_parsing() {
        assert_eq!("cosine".parse::<DistanceMetric>().unwrap(), DistanceMetric::Cosine);
        assert_eq!("IP".parse::<DistanceMetric>().unwrap(), DistanceMetric::InnerProduct);
        assert!("manhattan".parse::<DistanceMetric>().is_err());
        assert_eq!("flat".parse::<IndexAlgorithm>().unwrap(), IndexAlgorithm::Flat);
    }

    #[test]
    fn validate_rejects_zero_dimension() {
        let def = IndexDefinition::for_documents(
            "idx",
            "p:",
            VectorFieldParams::new(0, DistanceMetric::Cosine),
        );
        assert!(def.validate().is_err());
    }
}
