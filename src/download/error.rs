use std::fmt;

/// Category of a failed fetch attempt.
///
/// The job runner only ever asks one question of a kind: "may the request be retried
/// without credentials?". Everything else is informational (logs, reports).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The browser credential store could not be read (locked profile, permission denied,
    /// cookie extraction failure)
    CredentialAccess,
    /// Network-level failure (timeouts inside yt-dlp, DNS, connection resets)
    Network,
    /// The media is private, removed or region locked
    Unavailable,
    /// The requested format could not be satisfied
    FormatUnavailable,
    /// Our own wall-clock ceiling expired
    Timeout,
    /// The downloader binary could not be started
    Spawn,
    /// Catch-all for uncategorized errors
    Other,
}

impl FetchErrorKind {
    /// Whether a privileged attempt failing with this kind warrants an anonymous retry.
    pub fn is_retryable(self) -> bool {
        matches!(self, FetchErrorKind::CredentialAccess)
    }

    /// Returns subcategory for logs
    pub fn subcategory(self) -> &'static str {
        match self {
            FetchErrorKind::CredentialAccess => "credential_access",
            FetchErrorKind::Network => "network",
            FetchErrorKind::Unavailable => "unavailable",
            FetchErrorKind::FormatUnavailable => "format_unavailable",
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::Spawn => "spawn",
            FetchErrorKind::Other => "other",
        }
    }
}

/// Structured error returned by a [`MediaFetcher`](crate::download::fetcher::MediaFetcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the inner message
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FetchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::new(FetchErrorKind::Network, "yt-dlp failed");
        assert_eq!(err.to_string(), "yt-dlp failed");
    }

    #[test]
    fn test_only_credential_access_is_retryable() {
        assert!(FetchErrorKind::CredentialAccess.is_retryable());
        for kind in [
            FetchErrorKind::Network,
            FetchErrorKind::Unavailable,
            FetchErrorKind::FormatUnavailable,
            FetchErrorKind::Timeout,
            FetchErrorKind::Spawn,
            FetchErrorKind::Other,
        ] {
            assert!(!kind.is_retryable(), "{:?} must be fatal", kind);
        }
    }

    #[test]
    fn test_fetch_error_subcategory() {
        assert_eq!(FetchErrorKind::CredentialAccess.subcategory(), "credential_access");
        assert_eq!(FetchErrorKind::Timeout.subcategory(), "timeout");
        assert_eq!(FetchErrorKind::Other.subcategory(), "other");
    }
}
