//! Account records rebuilt from result spreadsheets.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One checked account as shown to API clients.
///
/// Successful accounts carry balance and deposit details, failed accounts carry
/// the credential that failed and the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_deposit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Display-only row synthesized when a finished job produced no results.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

impl Account {
    pub fn succeeded(
        username: impl Into<String>,
        balance: f64,
        last_deposit: f64,
        deposit_time: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: None,
            success: true,
            balance: Some(balance),
            last_deposit: Some(last_deposit),
            deposit_time: Some(deposit_time.into()),
            reason: None,
            placeholder: false,
        }
    }

    pub fn failed(
        username: impl Into<String>,
        password: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
            success: false,
            balance: None,
            last_deposit: None,
            deposit_time: None,
            reason: Some(reason.into()),
            placeholder: false,
        }
    }

    pub fn placeholder() -> Self {
        Self {
            placeholder: true,
            ..Self::succeeded("(no results)", 0.0, 0.0, "")
        }
    }
}
