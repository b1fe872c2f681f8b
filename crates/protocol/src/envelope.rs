use serde::{Deserialize, Serialize};

/// Envelope wrapping every JSON response from the feed API.
///
/// `data` is optional because toggle and confirmation endpoints answer
/// with `{ "success": true }` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Wraps a successful payload.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// Builds a rejected response carrying a server message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Returns the payload when the server reported success.
    ///
    /// `Err` carries the server message (or a generic one) for a
    /// `success: false` answer.
    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self
                .message
                .unwrap_or_else(|| "request rejected by server".into()))
        }
    }
}
