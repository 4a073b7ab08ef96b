//! Shared types for the birthday bot service and its RPC clients.

use serde::{Deserialize, Serialize};

// =====================================================
// Domain Types
// =====================================================

/// A stored birthday. `date` is an ISO `YYYY-MM-DD` string; the year is the
/// year of birth and the month/day are the part that recurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirthdayRecord {
    pub id: i64,
    pub chat_id: i64,
    pub name: String,
    pub date: String,
    pub external_id: Option<String>,
    pub pronoun: Option<String>,
    pub created_at: String,
}

/// A record annotated with values derived from "today".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingBirthday {
    pub record: BirthdayRecord,
    pub days_until_next: u32,
    pub current_age: f64,
    pub turning_age: u32,
    pub line: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BirthdayStats {
    pub total_birthdays: i64,
    pub chat_count: i64,
    pub notifications_sent: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentNotification {
    pub chat_id: i64,
    pub name: String,
    pub message: String,
}

// =====================================================
// RPC Request Types
// =====================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBirthdayRequest {
    pub chat_id: i64,
    pub name: String,
    pub date: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub pronoun: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveBirthdayRequest {
    pub chat_id: i64,
    pub name: String,
    /// Narrows the match when several records share a name.
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub chat_id: i64,
}

/// Runs a text command the same way a chat message would.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandRequest {
    pub chat_id: i64,
    #[serde(default)]
    pub is_group: bool,
    pub text: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TriggerRequest {
    /// Limit the run to one chat; all chats with records otherwise.
    #[serde(default)]
    pub chat_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupRestoreRequest {
    pub birthdays: Vec<BackupEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub chat_id: i64,
    pub name: String,
    pub date: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub pronoun: Option<String>,
}

// =====================================================
// RPC Response Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> RpcResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandReply {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveResult {
    pub removed: BirthdayRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TriggerResult {
    pub notified: Vec<SentNotification>,
    /// Most imminent birthday of the requested chat, when one was given.
    pub next: Option<UpcomingBirthday>,
}

// =====================================================
// Service Status
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub total_birthdays: i64,
    pub chat_count: i64,
    pub telegram_enabled: bool,
    pub last_tick_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_response_omits_empty_fields() {
        let ok = serde_json::to_value(RpcResponse::ok(3usize)).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "data": 3}));

        let err = serde_json::to_value(RpcResponse::<usize>::err("boom")).unwrap();
        assert_eq!(err, serde_json::json!({"success": false, "error": "boom"}));
    }

    #[test]
    fn test_add_request_optional_fields_default() {
        let req: AddBirthdayRequest = serde_json::from_str(
            r#"{"chat_id": -100, "name": "Ricardo", "date": "1980-07-01"}"#,
        )
        .unwrap();
        assert_eq!(req.chat_id, -100);
        assert!(req.external_id.is_none());
        assert!(req.pronoun.is_none());
    }
}
