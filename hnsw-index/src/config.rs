//! Validated graph configuration (§6, ambient component H).
//!
//! The teacher's `HnswConfig` is a plain struct with hand-picked defaults
//! and no validation; this crate's `GraphConfig` keeps that shape but
//! enforces the constraints §6 requires (`m`/`ef_construction` positive,
//! `dimension` positive if given) through `validator`'s derive, so a
//! misconfigured graph fails fast at construction instead of producing a
//! silently-degenerate index.

use std::str::FromStr;

use crate::error::GraphError;
use crate::metric::Metric;
use serde::{Deserialize, Serialize};
use validator::Validate;

use ::config::{Config, Environment, File};

/// Mirrors [`GraphConfig`]'s fields but leaves `metric` as a raw string,
/// so an unrecognized value can be routed through [`Metric::from_str`]
/// and surfaced as [`GraphError::InvalidMetric`] instead of the generic
/// deserialization error `serde`'s derived `Metric` impl would produce.
#[derive(Debug, Deserialize)]
struct RawGraphConfig {
    m: usize,
    ef_construction: usize,
    #[serde(default)]
    dimension: Option<usize>,
    metric: String,
    ef_search: usize,
}

/// Configuration accepted by [`crate::graph::Graph::new`].
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GraphConfig {
    /// Maximum neighbors per node per layer.
    #[validate(range(min = 1, message = "m must be positive"))]
    pub m: usize,

    /// Beam width used during insertion's layer search.
    #[validate(range(min = 1, message = "ef_construction must be positive"))]
    pub ef_construction: usize,

    /// Fixed once the first vector is inserted; `None` until then.
    #[serde(default)]
    #[validate(custom(function = "validate_dimension"))]
    pub dimension: Option<usize>,

    pub metric: Metric,

    /// Default beam width used at query time.
    pub ef_search: usize,
}

fn validate_dimension(dimension: &Option<usize>) -> Result<(), validator::ValidationError> {
    match dimension {
        Some(0) => Err(validator::ValidationError::new("dimension must be positive")),
        _ => Ok(()),
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            dimension: None,
            metric: Metric::Cosine,
            ef_search: 50,
        }
    }
}

impl GraphConfig {
    /// Builds a config from explicit values, validating it immediately.
    pub fn new(
        m: usize,
        ef_construction: usize,
        dimension: Option<usize>,
        metric: Metric,
        ef_search: usize,
    ) -> Result<Self, GraphError> {
        let config = Self {
            m,
            ef_construction,
            dimension,
            metric,
            ef_search,
        };
        config.validated()
    }

    /// Validates `self`, translating the first failure into a [`GraphError`].
    pub fn validated(self) -> Result<Self, GraphError> {
        self.validate().map_err(|errors| {
            let (field, reason) = errors
                .field_errors()
                .iter()
                .next()
                .map(|(field, errs)| {
                    let reason = errs
                        .first()
                        .and_then(|e| e.message.clone())
                        .unwrap_or_else(|| "invalid value".into());
                    (field.to_string(), reason.to_string())
                })
                .unwrap_or_else(|| ("config".to_string(), "invalid configuration".to_string()));
            GraphError::InvalidParameter { field, reason }
        })?;
        Ok(self)
    }

    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    pub fn with_ef_construction(mut self, ef_construction: usize) -> Self {
        self.ef_construction = ef_construction;
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search;
        self
    }

    /// Layered configuration load for embedding this crate in a larger
    /// service: starts from [`GraphConfig::default`], overlays an
    /// optional TOML file at `path` (missing file is not an error), then
    /// overlays environment variables prefixed `HNSW_` (e.g.
    /// `HNSW_M=32`, `HNSW_METRIC=euclidean`), and validates the result.
    ///
    /// Mirrors the workspace's `config`-crate layering convention (file
    /// base + env overrides) rather than hand-rolling `std::env::var`
    /// parsing for every field.
    pub fn load_layered(path: impl AsRef<str>) -> Result<Self, GraphError> {
        let defaults = Self::default();
        let built = Config::builder()
            .set_default("m", defaults.m as i64)
            .map_err(|e| GraphError::InvalidParameter {
                field: "m".into(),
                reason: e.to_string(),
            })?
            .set_default("ef_construction", defaults.ef_construction as i64)
            .map_err(|e| GraphError::InvalidParameter {
                field: "ef_construction".into(),
                reason: e.to_string(),
            })?
            .set_default("ef_search", defaults.ef_search as i64)
            .map_err(|e| GraphError::InvalidParameter {
                field: "ef_search".into(),
                reason: e.to_string(),
            })?
            .set_default("metric", "cosine")
            .map_err(|e| GraphError::InvalidParameter {
                field: "metric".into(),
                reason: e.to_string(),
            })?
            .add_source(File::with_name(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("HNSW"))
            .build()
            .map_err(|e| GraphError::InvalidParameter {
                field: "config".into(),
                reason: e.to_string(),
            })?;

        let raw: RawGraphConfig = built.try_deserialize().map_err(|e| GraphError::InvalidParameter {
            field: "config".into(),
            reason: e.to_string(),
        })?;
        let metric = Metric::from_str(&raw.metric)?;

        Self {
            m: raw.m,
            ef_construction: raw.ef_construction,
            dimension: raw.dimension,
            metric,
            ef_search: raw.ef_search,
        }
        .validated()
    }
}
