use compact_str::CompactString;
use std::sync::Arc;

/// Outcome of an upstream call once retries have been exhausted.
///
/// Everything that makes a response unusable for good (client errors, empty bodies,
/// payloads missing the fields we need) collapses into [`ApiResult::Absent`], so callers
/// only ever have to tell "nothing to store" apart from "something broke".
#[derive(Debug, Clone)]
pub enum ApiResult<T> {
    /// The call succeeded and produced data.
    Found(T),

    /// The item does not exist, is empty, or came back malformed.
    Absent(CompactString),

    /// The call failed after its retry budget was spent.
    Error(Arc<ohno::AppError>),
}

impl<T> ApiResult<T> {
    /// Returns `true` if the result is `Found`.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Returns a reference to the contained data if `Found`, otherwise `None`.
    #[must_use]
    pub const fn as_ref(&self) -> Option<&T> {
        match self {
            Self::Found(data) => Some(data),
            _ => None,
        }
    }

    /// Converts into the contained data, discarding the reason for any other outcome.
    #[must_use]
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(data) => Some(data),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResult<U> {
        match self {
            Self::Found(data) => ApiResult::Found(f(data)),
            Self::Absent(reason) => ApiResult::Absent(reason),
            Self::Error(e) => ApiResult::Error(e),
        }
    }

    /// Chains a fallible conversion, typically payload validation.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> ApiResult<U>) -> ApiResult<U> {
        match self {
            Self::Found(data) => f(data),
            Self::Absent(reason) => ApiResult::Absent(reason),
            Self::Error(e) => ApiResult::Error(e),
        }
    }

    pub(crate) fn absent(reason: impl Into<CompactString>) -> Self {
        Self::Absent(reason.into())
    }

    pub(crate) fn error(e: ohno::AppError) -> Self {
        Self::Error(Arc::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ohno::app_err;

    #[test]
    fn found_exposes_data() {
        let result = ApiResult::Found(42);
        assert!(result.is_found());
        assert_eq!(result.as_ref(), Some(&42));
        assert_eq!(result.found(), Some(42));
    }

    #[test]
    fn absent_has_no_data() {
        let result: ApiResult<u32> = ApiResult::absent("404 Not Found");
        assert!(!result.is_found());
        assert_eq!(result.as_ref(), None);
        match result {
            ApiResult::Absent(reason) => assert_eq!(reason, "404 Not Found"),
            other => panic!("expected Absent, got {other:?}"),
        }
    }

    #[test]
    fn error_has_no_data() {
        let result: ApiResult<u32> = ApiResult::error(app_err!("server error"));
        assert!(!result.is_found());
        assert!(result.found().is_none());
    }

    #[test]
    fn map_preserves_variant() {
        let found = ApiResult::Found(2).map(|v| v * 10);
        assert_eq!(found.as_ref(), Some(&20));

        let absent: ApiResult<u32> = ApiResult::absent("gone");
        assert!(matches!(absent.map(|v| v * 10), ApiResult::Absent(_)));
    }

    #[test]
    fn and_then_can_reject_payload() {
        let result = ApiResult::Found(Vec::<u32>::new()).and_then(|v| {
            if v.is_empty() {
                ApiResult::absent("empty payload")
            } else {
                ApiResult::Found(v)
            }
        });
        assert!(matches!(result, ApiResult::Absent(reason) if reason == "empty payload"));
    }
}
