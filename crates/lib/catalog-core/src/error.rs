use std::{error::Error, fmt};

use catalog_model::ParseEnumError;

/// Failure taxonomy shared by every catalog operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    InvalidFilter(String),
    UnknownAssetType(String),
    InvalidDirection(String),
    PageSizeExceeded { requested: usize, max: usize },
    MalformedQuery(String),
    UnsupportedAttribute(String),
    InvalidEnumValue(String),
    ArityMismatch { assets: usize, values: usize },
    InvalidInput(String),
    NotFound(String),
    Upstream(String),
}

impl CatalogError {
    /// Stable token naming the failure class.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFilter(_) => "InvalidFilterError",
            Self::UnknownAssetType(_) => "UnknownAssetTypeError",
            Self::InvalidDirection(_) => "InvalidDirectionError",
            Self::PageSizeExceeded { .. } => "PageSizeExceededError",
            Self::MalformedQuery(_) => "MalformedQueryError",
            Self::UnsupportedAttribute(_) => "UnsupportedAttributeError",
            Self::InvalidEnumValue(_) => "InvalidEnumValueError",
            Self::ArityMismatch { .. } => "ArityMismatchError",
            Self::InvalidInput(_) => "InvalidInputError",
            Self::NotFound(_) => "NotFoundError",
            Self::Upstream(_) => "UpstreamServiceError",
        }
    }

    /// True for failures raised by local validation, before any catalog call.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::Upstream(_) | Self::NotFound(_))
    }

    pub(crate) fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter(message.into())
    }

    pub(crate) fn upstream(message: impl fmt::Display) -> Self {
        Self::Upstream(message.to_string())
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilter(message) => write!(f, "invalid filter: {message}"),
            Self::UnknownAssetType(name) => write!(f, "unknown asset type: {name}"),
            Self::InvalidDirection(value) => write!(
                f,
                "invalid direction: {value}. Must be either 'UPSTREAM' or 'DOWNSTREAM'"
            ),
            Self::PageSizeExceeded { requested, max } => {
                write!(f, "requested page size {requested} exceeds the maximum of {max}")
            }
            Self::MalformedQuery(message) => write!(f, "malformed query: {message}"),
            Self::UnsupportedAttribute(name) => write!(
                f,
                "unsupported attribute: {name}. Only 'user_description' and 'certificate_status' can be updated"
            ),
            Self::InvalidEnumValue(message) => write!(f, "{message}"),
            Self::ArityMismatch { assets, values } => write!(
                f,
                "expected 1 or {assets} attribute values, got {values}"
            ),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::NotFound(message) => write!(f, "not found: {message}"),
            Self::Upstream(message) => write!(f, "catalog service error: {message}"),
        }
    }
}

impl Error for CatalogError {}

impl From<ParseEnumError> for CatalogError {
    fn from(err: ParseEnumError) -> Self {
        Self::InvalidEnumValue(err.to_string())
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        Self::upstream(err)
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
