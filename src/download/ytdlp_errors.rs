//! Analysis of yt-dlp failures.
//!
//! yt-dlp exposes no structured error codes across its process boundary, so the
//! kind of a failure is decided from its stderr. The credential-related patterns form
//! an explicit allow-list ([`CredentialErrorRules`]); only matches against that list
//! make an attempt retryable. The remaining categories are informational.

use crate::download::error::{FetchError, FetchErrorKind};

/// Default substrings (case-insensitive) that mark a credential-store failure.
pub const DEFAULT_CREDENTIAL_PATTERNS: &[&str] = &["permission denied", "cookie", "lock"];

/// Allow-list of stderr substrings that classify a failure as a credential-access
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialErrorRules {
    patterns: Vec<String>,
}

impl Default for CredentialErrorRules {
    fn default() -> Self {
        Self::new(DEFAULT_CREDENTIAL_PATTERNS.iter().copied())
    }
}

impl CredentialErrorRules {
    /// Builds a rule set from explicit patterns. Empty entries are ignored; matching
    /// is case-insensitive.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    /// Parses a comma separated list, e.g. `"permission denied,cookie,lock"`.
    /// Returns the defaults when the list holds no usable entry.
    pub fn parse_list(list: &str) -> Self {
        let rules = Self::new(list.split(','));
        if rules.patterns.is_empty() {
            Self::default()
        } else {
            rules
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.patterns.iter().any(|p| lower.contains(p.as_str()))
    }
}

/// Analyzes yt-dlp stderr and decides the failure kind.
///
/// Credential rules are checked first; a locked browser profile often comes with
/// secondary extraction errors in the same output.
pub fn analyze_ytdlp_error(stderr: &str, rules: &CredentialErrorRules) -> FetchErrorKind {
    if rules.matches(stderr) {
        return FetchErrorKind::CredentialAccess;
    }

    let stderr_lower = stderr.to_lowercase();

    if stderr_lower.contains("private video")
        || stderr_lower.contains("video unavailable")
        || stderr_lower.contains("this video is not available")
        || stderr_lower.contains("video is private")
        || stderr_lower.contains("video has been removed")
        || stderr_lower.contains("this video does not exist")
        || stderr_lower.contains("video is not available")
    {
        return FetchErrorKind::Unavailable;
    }

    if stderr_lower.contains("requested format is not available")
        || stderr_lower.contains("requested format not available")
    {
        return FetchErrorKind::FormatUnavailable;
    }

    if stderr_lower.contains("timed out")
        || stderr_lower.contains("timeout")
        || stderr_lower.contains("connection")
        || stderr_lower.contains("network")
        || stderr_lower.contains("socket")
        || stderr_lower.contains("dns")
        || stderr_lower.contains("failed to connect")
    {
        return FetchErrorKind::Network;
    }

    FetchErrorKind::Other
}

/// Builds a [`FetchError`] from the collected `ERROR:` lines (or the stderr tail when
/// yt-dlp printed none).
pub fn fetch_error_from_stderr(error_lines: &[String], stderr_tail: &str, rules: &CredentialErrorRules) -> FetchError {
    let message = if error_lines.is_empty() {
        let tail = stderr_tail.trim();
        if tail.is_empty() {
            "yt-dlp exited with an error and printed no diagnostics".to_string()
        } else {
            tail.to_string()
        }
    } else {
        error_lines.join("\n")
    };
    let kind = analyze_ytdlp_error(&format!("{}\n{}", message, stderr_tail), rules);
    FetchError::new(kind, message)
}

/// Short human readable hint for a failure kind, used in job log lines.
pub fn get_error_message(kind: FetchErrorKind) -> &'static str {
    match kind {
        FetchErrorKind::CredentialAccess => "Browser credentials could not be read",
        FetchErrorKind::Network => "Network problem, try again in a minute",
        FetchErrorKind::Unavailable => "The video is private, removed or region locked",
        FetchErrorKind::FormatUnavailable => "The requested quality is not offered for this video",
        FetchErrorKind::Timeout => "The download took longer than the configured limit",
        FetchErrorKind::Spawn => "yt-dlp could not be started, check TUBEFORGE_YTDLP_BIN",
        FetchErrorKind::Other => "Download failed, check that the link is correct",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_match_credential_failures() {
        let rules = CredentialErrorRules::default();
        let cases = [
            "ERROR: Could not copy Chrome cookie database. See  https://github.com/yt-dlp/yt-dlp/issues/7271",
            "PermissionError: [Errno 13] Permission denied: 'C:\\Users\\me\\AppData\\Local\\Microsoft\\Edge\\User Data\\Default\\Network\\Cookies'",
            "ERROR: database is locked",
        ];
        for stderr in cases {
            assert_eq!(
                analyze_ytdlp_error(stderr, &rules),
                FetchErrorKind::CredentialAccess,
                "{}",
                stderr
            );
        }
    }

    #[test]
    fn test_other_categories() {
        let rules = CredentialErrorRules::default();
        assert_eq!(
            analyze_ytdlp_error("ERROR: [youtube] abc: Private video", &rules),
            FetchErrorKind::Unavailable
        );
        assert_eq!(
            analyze_ytdlp_error("ERROR: Requested format is not available", &rules),
            FetchErrorKind::FormatUnavailable
        );
        assert_eq!(
            analyze_ytdlp_error("ERROR: Unable to download webpage: timed out", &rules),
            FetchErrorKind::Network
        );
        assert_eq!(
            analyze_ytdlp_error("ERROR: Unsupported URL: https://example.com", &rules),
            FetchErrorKind::Other
        );
    }

    #[test]
    fn test_custom_rules_replace_defaults() {
        let rules = CredentialErrorRules::parse_list("keyring, failed to decrypt");
        assert_eq!(rules.patterns(), &["keyring".to_string(), "failed to decrypt".to_string()]);
        assert_eq!(
            analyze_ytdlp_error("ERROR: failed to decrypt with DPAPI", &rules),
            FetchErrorKind::CredentialAccess
        );
        // "cookie" is no longer on the list
        assert_eq!(
            analyze_ytdlp_error("ERROR: could not find cookie", &rules),
            FetchErrorKind::Other
        );
    }

    #[test]
    fn test_empty_list_falls_back_to_defaults() {
        assert_eq!(CredentialErrorRules::parse_list(" , ,"), CredentialErrorRules::default());
    }

    #[test]
    fn test_fetch_error_from_stderr_prefers_error_lines() {
        let rules = CredentialErrorRules::default();
        let err = fetch_error_from_stderr(
            &["ERROR: [youtube] xyz: Video unavailable".to_string()],
            "WARNING: something\nERROR: [youtube] xyz: Video unavailable",
            &rules,
        );
        assert_eq!(err.kind, FetchErrorKind::Unavailable);
        assert_eq!(err.message(), "ERROR: [youtube] xyz: Video unavailable");
    }

    #[test]
    fn test_fetch_error_from_empty_stderr() {
        let err = fetch_error_from_stderr(&[], "   ", &CredentialErrorRules::default());
        assert_eq!(err.kind, FetchErrorKind::Other);
        assert!(err.message().contains("no diagnostics"));
    }
}
