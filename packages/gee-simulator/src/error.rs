//! error.rs — Typed failure conditions for the navigation engine
//!
//! The engine fails closed: bad parameters are reported immediately as
//! `InvalidConfiguration`, never coerced into NaN or an empty curve.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeeError {
    /// Rejection sampling ran out of attempts before placing every station
    #[error(
        "layout unsatisfiable: placed fewer than {count} points with separation \
         {min_separation} after {attempts} attempts"
    )]
    LayoutUnsatisfiable {
        count: usize,
        min_separation: f64,
        attempts: usize,
    },

    /// Non-physical or degenerate parameters
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl GeeError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, GeeError>;
