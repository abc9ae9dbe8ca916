use serde::Serialize;

/// Text the provider puts in `invalid-argument` errors when the address is
/// not a structurally valid registration token.
pub const INVALID_TOKEN_MARKER: &str = "not a valid FCM registration token";

const PROVIDER_CODE_PREFIX: &str = "messaging/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The address will never succeed again and should be removed.
    Permanent,
    /// May succeed on a later attempt.
    Transient,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Permanent => "permanent",
            FailureClass::Transient => "transient",
        }
    }
}

pub fn classify_failure(error_code: &str, error_message: &str) -> FailureClass {
    let code = error_code
        .strip_prefix(PROVIDER_CODE_PREFIX)
        .unwrap_or(error_code);

    match code {
        "invalid-registration-token" | "registration-token-not-registered" => {
            FailureClass::Permanent
        }
        "invalid-argument" if error_message.contains(INVALID_TOKEN_MARKER) => {
            FailureClass::Permanent
        }
        _ => FailureClass::Transient,
    }
}
