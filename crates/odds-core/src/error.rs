#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateError {
    #[error("no sort mapping for column `{field}` in the {view} view")]
    UnknownSortField { view: &'static str, field: String },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("unknown route: /{0}")]
    Unknown(String),
    #[error("route segment is not valid UTF-8 after decoding: {0}")]
    InvalidSegment(String),
}
