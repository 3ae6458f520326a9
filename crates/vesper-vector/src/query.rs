//! Vector query construction
//!
//! Both query forms compile to an `FT.SEARCH` request that binds the query
//! vector as a raw float32 parameter, aliases the computed distance as
//! `score`, sorts ascending by it and paginates with `LIMIT`.

use serde::{Deserialize, Serialize};

use crate::error::{VectorError, VectorResult};
use crate::schema::VECTOR_FIELD;
use crate::types::Vector;

/// Alias under which the computed distance is returned
pub const SCORE_ALIAS: &str = "score";
/// Lowest query dialect that understands KNN and VECTOR_RANGE syntax
pub const MIN_VECTOR_DIALECT: u32 = 2;

const VECTOR_PARAM: &str = "vec";
const RADIUS_PARAM: &str = "radius";

/// Offset/limit window applied on top of the matched set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { offset: 0, limit: 10 }
    }
}

/// The `k` nearest neighbours of a vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnQuery {
    pub k: usize,
    pub vector_field: String,
    pub vector: Vector,
    pub page: Page,
}

impl KnnQuery {
    pub fn new(vector: Vector, k: usize) -> Self {
        Self {
            k,
            vector_field: VECTOR_FIELD.to_string(),
            vector,
            page: Page::default(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.vector_field = field.into();
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.page = Page::new(offset, limit);
        self
    }
}

/// Every vector within `radius` of a vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub radius: f32,
    pub vector_field: String,
    pub vector: Vector,
    pub page: Page,
}

impl RangeQuery {
    pub fn new(vector: Vector, radius: f32) -> Self {
        Self {
            radius,
            vector_field: VECTOR_FIELD.to_string(),
            vector,
            page: Page::default(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.vector_field = field.into();
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.page = Page::new(offset, limit);
        self
    }
}

/// Search query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchQuery {
    Knn(KnnQuery),
    Range(RangeQuery),
}

impl SearchQuery {
    pub fn vector(&self) -> &Vector {
        match self {
            Self::Knn(q) => &q.vector,
            Self::Range(q) => &q.vector,
        }
    }

    pub fn vector_field(&self) -> &str {
        match self {
            Self::Knn(q) => &q.vector_field,
            Self::Range(q) => &q.vector_field,
        }
    }

    pub fn page(&self) -> Page {
        match self {
            Self::Knn(q) => q.page,
            Self::Range(q) => q.page,
        }
    }

    /// Validate the query independent of any index
    pub fn validate(&self) -> VectorResult<()> {
        let field = self.vector_field();
        if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(VectorError::invalid_query(format!(
                "invalid vector field name: {field:?}"
            )));
        }
        if self.vector().data.is_empty() {
            return Err(VectorError::invalid_query("query vector cannot be empty"));
        }
        if self.page().limit == 0 {
            return Err(VectorError::invalid_query("limit must be at least 1"));
        }
        match self {
            Self::Knn(q) if q.k == 0 => Err(VectorError::invalid_query("k must be at least 1")),
            Self::Range(q) if !q.radius.is_finite() || q.radius < 0.0 => Err(
                VectorError::invalid_query(format!("radius must be a non-negative number, got {}", q.radius)),
            ),
            _ => Ok(()),
        }
    }

    /// Compile into an `FT.SEARCH` request
    pub fn compile(&self, dialect: u32) -> VectorResult<CompiledQuery> {
        self.validate()?;
        if dialect < MIN_VECTOR_DIALECT {
            return Err(VectorError::invalid_query(format!(
                "vector queries need dialect {MIN_VECTOR_DIALECT} or later, got {dialect}"
            )));
        }

        let vector_bytes = QueryParam::Bytes(self.vector().to_le_bytes());
        let (query, params) = match self {
            Self::Knn(q) => (
                format!(
                    "*=>[KNN {} @{} ${VECTOR_PARAM} AS {SCORE_ALIAS}]",
                    q.k, q.vector_field
                ),
                vec![(VECTOR_PARAM.to_string(), vector_bytes)],
            ),
            Self::Range(q) => (
                format!(
                    "@{}:[VECTOR_RANGE ${RADIUS_PARAM} ${VECTOR_PARAM}]=>{{$YIELD_DISTANCE_AS: {SCORE_ALIAS}}}",
                    q.vector_field
                ),
                vec![
                    (RADIUS_PARAM.to_string(), QueryParam::Number(q.radius)),
                    (VECTOR_PARAM.to_string(), vector_bytes),
                ],
            ),
        };

        Ok(CompiledQuery {
            query,
            params,
            sort_by: SCORE_ALIAS.to_string(),
            ascending: true,
            page: self.page(),
            dialect,
        })
    }
}

/// A bound query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Number(f32),
    Bytes(Vec<u8>),
}

impl QueryParam {
    fn to_arg(&self) -> Vec<u8> {
        match self {
            Self::Number(n) => n.to_string().into_bytes(),
            Self::Bytes(b) => b.clone(),
        }
    }
}

/// A query ready to submit
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub query: String,
    pub params: Vec<(String, QueryParam)>,
    pub sort_by: String,
    pub ascending: bool,
    pub page: Page,
    pub dialect: u32,
}

impl CompiledQuery {
    /// Arguments following `FT.SEARCH <index>`
    pub fn args(&self) -> Vec<Vec<u8>> {
        let mut args: Vec<Vec<u8>> = vec![self.query.clone().into_bytes()];

        if !self.params.is_empty() {
            args.push(b"PARAMS".to_vec());
            args.push((self.params.len() * 2).to_string().into_bytes());
            for (name, value) in &self.params {
                args.push(name.clone().into_bytes());
                args.push(value.to_arg());
            }
        }

        args.push(b"SORTBY".to_vec());
        args.push(self.sort_by.clone().into_bytes());
        args.push(if self.ascending { b"ASC".to_vec() } else { b"DESC".to_vec() });

        args.push(b"LIMIT".to_vec());
        args.push(self.page.offset.to_string().into_bytes());
        args.push(self.page.limit.to_string().into_bytes());

        args.push(b"DIALECT".to_vec());
        args.push(self.dialect.to_string().into_bytes());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_args(compiled: &CompiledQuery) -> Vec<String> {
        compiled
            .args()
            .into_iter()
            .map(|arg| String::from_utf8(arg).unwrap_or_else(|_| "<bytes>".to_string()))
            .collect()
    }

    #[test]
    fn knn_query_binds_vector_and_sorts_by_score() {
        let query = SearchQuery::Knn(KnnQuery::new(Vector::new(vec![1.0, 0.0]), 5).with_page(0, 10));
        let compiled = query.compile(2).unwrap();

        assert_eq!(compiled.query, "*=>[KNN 5 @titleVector $vec AS score]");
        assert_eq!(
            compiled.params,
            vec![("vec".to_string(), QueryParam::Bytes(Vector::new(vec![1.0, 0.0]).to_le_bytes()))]
        );

        let args = text_args(&compiled);
        assert_eq!(&args[1..4], &["PARAMS", "2", "vec"]);
        assert_eq!(
            &args[5..],
            &["SORTBY", "score", "ASC", "LIMIT", "0", "10", "DIALECT", "2"]
        );
    }

    #[test]
    fn range_query_yields_distance_alias() {
        let query = SearchQuery::Range(RangeQuery::new(Vector::new(vec![0.5; 4]), 3.0).with_page(0, 5));
        let compiled = query.compile(2).unwrap();

        assert_eq!(
            compiled.query,
            "@titleVector:[VECTOR_RANGE $radius $vec]=>{$YIELD_DISTANCE_AS: score}"
        );

        let args = text_args(&compiled);
        assert_eq!(&args[1..6], &["PARAMS", "4", "radius", "3", "vec"]);
        assert_eq!(&args[7..10], &["SORTBY", "score", "ASC"]);
        assert_eq!(&args[10..13], &["LIMIT", "0", "5"]);
    }

    #[test]
    fn vector_parameter_is_raw_float32() {
        let vector = Vector::new(vec![0.25, -1.0, 8.0]);
        let compiled = SearchQuery::Knn(KnnQuery::new(vector.clone(), 1)).compile(2).unwrap();
        let args = compiled.args();

        assert_eq!(args[4], vector.to_le_bytes());
        assert_eq!(args[4].len(), 12);
    }

    #[test]
    fn custom_field_name_is_used() {
        let compiled = SearchQuery::Knn(KnnQuery::new(Vector::new(vec![1.0]), 3).with_field("embedding"))
            .compile(3)
            .unwrap();

        assert_eq!(compiled.query, "*=>[KNN 3 @embedding $vec AS score]");
        assert_eq!(compiled.dialect, 3);
    }

    #[test]
    fn rejects_dialect_below_two() {
        let query = SearchQuery::Knn(KnnQuery::new(Vector::new(vec![1.0]), 5));
        assert!(matches!(query.compile(1), Err(VectorError::InvalidQuery(_))));
    }

    #[test]
    fn rejects_invalid_parameters() {
        let vector = Vector::new(vec![1.0]);

        assert!(SearchQuery::Knn(KnnQuery::new(vector.clone(), 0)).validate().is_err());
        assert!(SearchQuery::Knn(KnnQuery::new(vector.clone(), 5).with_page(0, 0))
            .validate()
            .is_err());
        assert!(SearchQuery::Range(RangeQuery::new(vector.clone(), -0.1)).validate().is_err());
        assert!(SearchQuery::Range(RangeQuery::new(vector.clone(), f32::NAN)).validate().is_err());
        assert!(SearchQuery::Knn(KnnQuery::new(vector.clone(), 5).with_field("a b]"))
            .validate()
            .is_err());
        assert!(SearchQuery::Knn(KnnQuery::new(Vector::new(vec![]), 5)).validate().is_err());
    }
}
