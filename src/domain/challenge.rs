use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FraudAction {
    Review,
    Deny,
}

/// How the user has to prove a flagged payment is genuine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfirmMethod {
    /// One-time code sent by SMS.
    Smsp,
    /// Explicit confirmation on a warning screen.
    Hint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudCheckResult {
    pub action_code: FraudAction,
    #[serde(default)]
    pub is_client_block: Option<bool>,
    #[serde(default)]
    pub confirm_method_factor: Option<ConfirmMethod>,
    #[serde(default)]
    pub form_parameters: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeResolution {
    ConfirmedGenuine,
    ConfirmedFraud,
    Unknown,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FraudEnvelope {
    fraud_mon_check_result: Option<FraudCheckResult>,
}

impl FraudCheckResult {
    /// Looks for a fraud check block in a raw response body.
    pub fn from_payload(payload: &str) -> Option<Self> {
        serde_json::from_str::<FraudEnvelope>(payload)
            .ok()
            .and_then(|envelope| envelope.fraud_mon_check_result)
    }

    pub fn is_denied(&self) -> bool {
        self.action_code == FraudAction::Deny || self.is_client_block == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_payload() {
        let payload = r#"{"errorCode": "7", "fraudMonCheckResult": {"actionCode": "REVIEW", "confirmMethodFactor": "SMSP"}}"#;
        let result = FraudCheckResult::from_payload(payload).unwrap();
        assert_eq!(result.action_code, FraudAction::Review);
        assert_eq!(result.confirm_method_factor, Some(ConfirmMethod::Smsp));
        assert!(!result.is_denied());

        assert!(FraudCheckResult::from_payload(r#"{"errorCode": "7"}"#).is_none());
        assert!(FraudCheckResult::from_payload("not json").is_none());
    }

    #[test]
    fn test_resolution_wire_names() {
        assert_eq!(
            serde_json::to_string(&ChallengeResolution::ConfirmedGenuine).unwrap(),
            "\"CONFIRMED_GENUINE\""
        );
    }
}
