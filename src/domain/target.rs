use crate::error::SdkError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One gateway endpoint call: method, path, parameters and the stub fixture
/// that answers it offline.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub method: HttpMethod,
    pub path: &'static str,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub fixture: &'static str,
    /// Authorizes this call alone with another merchant key.
    pub api_key: Option<String>,
}

impl Target {
    pub fn get(path: &'static str, fixture: &'static str) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            query: Vec::new(),
            body: None,
            fixture,
            api_key: None,
        }
    }

    pub fn post(path: &'static str, fixture: &'static str) -> Self {
        Self {
            method: HttpMethod::Post,
            ..Self::get(path, fixture)
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Serializes `body` as the JSON request body.
    pub fn json<B: Serialize>(mut self, body: &B) -> Self {
        self.body = serde_json::to_value(body).ok();
        self
    }
}

/// How often a request may be tried and on which HTTP statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            retryable_status_codes: Vec::new(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retryable_status_codes: impl Into<Vec<u16>>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retryable_status_codes: retryable_status_codes.into(),
        }
    }

    /// Remote config: two tries on gateway-side failures.
    pub fn remote_config() -> Self {
        Self::new(2, [500, 502, 503, 504])
    }

    /// Payment order: four tries on 500/423 when retries are switched on.
    pub fn payment_order(retry_enabled: bool) -> Self {
        if retry_enabled {
            Self::new(4, [500, 423])
        } else {
            Self::default()
        }
    }

    /// Whether a failure on attempt `attempt` (1-based) earns another try.
    pub fn should_retry(&self, attempt: u32, error: &SdkError) -> bool {
        attempt < self.max_attempts
            && error
                .status_code()
                .is_some_and(|code| self.retryable_status_codes.contains(&code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> SdkError {
        SdkError::BadResponseWithStatus { code, payload: None }
    }

    #[test]
    fn test_default_policy_never_retries() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(1, &status(500)));
    }

    #[test]
    fn test_should_retry_only_listed_codes_within_budget() {
        let policy = RetryPolicy::new(2, [500]);
        assert!(policy.should_retry(1, &status(500)));
        assert!(!policy.should_retry(2, &status(500)));
        assert!(!policy.should_retry(1, &status(400)));
        assert!(!policy.should_retry(1, &SdkError::TimeOut));
    }

    #[test]
    fn test_target_builder() {
        let target = Target::post("sdk-gateway/v1/auth", "auth")
            .query("sessionId", "s1")
            .json(&serde_json::json!({"a": 1}));
        assert_eq!(target.method, HttpMethod::Post);
        assert_eq!(target.query, vec![("sessionId".to_string(), "s1".to_string())]);
        assert_eq!(target.body, Some(serde_json::json!({"a": 1})));
    }
}
