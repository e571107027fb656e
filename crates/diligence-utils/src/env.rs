//! Environment variable helpers used by the config builders

use std::time::Duration;

/// Read an environment variable, treating blank values as unset
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read a whole number of seconds from the environment.
///
/// Unparseable values are ignored with a warning so a typo in the
/// environment falls back to the default instead of aborting start-up.
pub fn env_duration_secs(name: &str) -> Option<Duration> {
    let raw = env_non_empty(name)?;
    match raw.parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => {
            tracing::warn!("Ignoring {name}={raw}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_unset() {
        // SAFETY: test-local variable names, no other thread reads them
        unsafe {
            std::env::set_var("DILIGENCE_UTILS_TEST_BLANK", "   ");
        }
        assert_eq!(env_non_empty("DILIGENCE_UTILS_TEST_BLANK"), None);
        assert_eq!(env_non_empty("DILIGENCE_UTILS_TEST_MISSING"), None);
    }

    #[test]
    fn test_duration_parsing() {
        // SAFETY: test-local variable names, no other thread reads them
        unsafe {
            std::env::set_var("DILIGENCE_UTILS_TEST_SECS", "42");
            std::env::set_var("DILIGENCE_UTILS_TEST_BAD_SECS", "soon");
        }
        assert_eq!(
            env_duration_secs("DILIGENCE_UTILS_TEST_SECS"),
            Some(Duration::from_secs(42))
        );
        assert_eq!(env_duration_secs("DILIGENCE_UTILS_TEST_BAD_SECS"), None);
    }
}
