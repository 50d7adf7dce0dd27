//! What to do when the embedded PostgreSQL cluster will not start.
//!
//! CI runs the Diesel suites for real. Sandboxes without the privileges
//! the cluster needs can set `SKIP_TEST_CLUSTER=1` to skip them instead.

use std::fmt::Display;

const SKIP_VAR: &str = "SKIP_TEST_CLUSTER";

/// Outcome for a suite whose cluster failed to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnClusterFailure {
    Skip,
    Fail,
}

impl OnClusterFailure {
    /// `1`, `true` or `yes` in any case means skip; anything else fails.
    fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(|value| value.trim().to_ascii_lowercase()) {
            Some(value) if matches!(value.as_str(), "1" | "true" | "yes") => Self::Skip,
            _ => Self::Fail,
        }
    }

    fn from_env() -> Self {
        Self::from_flag(std::env::var(SKIP_VAR).ok().as_deref())
    }
}

/// Skip the calling test (returning `None`) or panic, per `SKIP_TEST_CLUSTER`.
pub fn handle_cluster_setup_failure<T>(reason: impl Display) -> Option<T> {
    match OnClusterFailure::from_env() {
        OnClusterFailure::Skip => {
            eprintln!("skipping companion Diesel test, cluster unavailable: {reason}");
            None
        }
        OnClusterFailure::Fail => {
            panic!("embedded postgres did not start: {reason} (set {SKIP_VAR}=1 to skip)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::OnClusterFailure;
    use rstest::rstest;

    #[rstest]
    #[case(Some("1"), OnClusterFailure::Skip)]
    #[case(Some(" Yes "), OnClusterFailure::Skip)]
    #[case(Some("TRUE"), OnClusterFailure::Skip)]
    #[case(Some("0"), OnClusterFailure::Fail)]
    #[case(Some(""), OnClusterFailure::Fail)]
    #[case(None, OnClusterFailure::Fail)]
    fn only_truthy_flags_skip(#[case] flag: Option<&str>, #[case] expected: OnClusterFailure) {
        assert_eq!(OnClusterFailure::from_flag(flag), expected);
    }
}
