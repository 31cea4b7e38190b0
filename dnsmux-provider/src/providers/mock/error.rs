//! Mock error classification

use std::sync::Arc;

use crate::classify::{ClassificationRules, RuleClassifier};
use crate::error::ClassifiedError;
use crate::traits::{ErrorClassifier, RawApiError};
use crate::utils::clock::Clock;

use super::{MOCK_ID, MockProvider};

/// Codes the mock vendor reports, by disposition. `NOT_FOUND`,
/// `TARGET_EXISTS` and `INVALID_INPUT` are left unlisted and so permanent.
pub(crate) fn classifier(clock: Arc<dyn Clock>) -> RuleClassifier {
    let rules = ClassificationRules::new()
        .validation_codes(&[MockProvider::MISSING_CREDENTIALS])
        .transient_codes(&[MockProvider::OPERATION_IN_PROGRESS])
        .transient_fragments(&["job running", "operation in progress"])
        .session_mismatch_codes(&[MockProvider::SESSION_MISMATCH])
        .session_mismatch_fragments(&["does not match current session"])
        .rate_limited_codes(&[MockProvider::THROTTLED]);
    RuleClassifier::new(MOCK_ID, rules).with_clock(clock)
}

impl ErrorClassifier for MockProvider {
    fn provider_name(&self) -> &str {
        MOCK_ID
    }

    fn classify(&self, raw: RawApiError) -> ClassifiedError {
        self.classifier.classify(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Disposition;
    use crate::error::VendorMessage;

    fn mapper() -> MockProvider {
        MockProvider::new()
    }

    #[test]
    fn missing_credentials_is_validation() {
        let err = mapper().classify(RawApiError::with_code(
            MockProvider::MISSING_CREDENTIALS,
            "no credentials supplied. mock requires username,password",
        ));
        assert_eq!(err.disposition, Disposition::Validation);
        assert_eq!(err.provider, "mock");
    }

    #[test]
    fn session_mismatch() {
        let err = mapper().classify(RawApiError::from_messages(vec![
            VendorMessage::coded("ILLEGAL_OPERATION", "IP address does not match current session"),
            VendorMessage::info("login: Login successful"),
        ]));
        assert_eq!(err.disposition, Disposition::Transient);
        assert!(err.session_mismatch);
    }

    #[test]
    fn throttled() {
        let err = mapper().classify(RawApiError::with_code(MockProvider::THROTTLED, "slow down"));
        assert_eq!(err.disposition, Disposition::RateLimited);
        assert!(err.retry_after.is_some());
    }

    #[test]
    fn conflicts_are_permanent() {
        for code in [
            MockProvider::NOT_FOUND,
            MockProvider::TARGET_EXISTS,
            MockProvider::INVALID_INPUT,
        ] {
            let err = mapper().classify(RawApiError::with_code(code, "nope"));
            assert_eq!(err.disposition, Disposition::Permanent, "{code}");
        }
    }
}
