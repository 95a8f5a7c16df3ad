/// Failures talking to the recipe API.
///
/// `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
  /// No connectivity or transport-level failure
  #[error("{0}")]
  Network(String),
  /// The server answered with a non-2xx status
  #[error("{message}")]
  Http { status: u16, message: String },
  /// A 2xx response whose body could not be understood
  #[error("Invalid response from the API: {0}")]
  InvalidResponse(String),
}

impl FeedError {
  /// Whether cached data is a reasonable stand-in for this failure.
  ///
  /// True for connectivity problems and server-side errors; client errors
  /// (404, validation, auth) mean the cached copy should not be shown.
  pub fn is_unavailable(&self) -> bool {
    match self {
      Self::Network(_) => true,
      Self::Http { status, .. } => *status >= 500,
      Self::InvalidResponse(_) => false,
    }
  }
}
