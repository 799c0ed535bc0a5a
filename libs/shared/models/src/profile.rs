use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
    Fr,
    It,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::En, Language::De, Language::Fr, Language::It];

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "de" => Some(Language::De),
            "fr" => Some(Language::Fr),
            "it" => Some(Language::It),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
            Language::Fr => "fr",
            Language::It => "it",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Whether a chat identity books for itself or on behalf of a named patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub is_caregiver: bool,
    pub linked_patient: Option<String>,
    #[serde(default)]
    pub language: Language,
}

impl UserProfile {
    pub fn for_self(user_id: UserId, language: Language) -> Self {
        Self {
            user_id,
            is_caregiver: false,
            linked_patient: None,
            language,
        }
    }

    pub fn caregiver(user_id: UserId, patient: impl Into<String>, language: Language) -> Self {
        Self {
            user_id,
            is_caregiver: true,
            linked_patient: Some(patient.into()),
            language,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub user_id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportRequest {
    pub id: i64,
    pub user_id: UserId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub status: SupportStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_bookings: u64,
    pub active_users: u64,
    pub total_admins: u64,
    pub total_doctors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_codes_are_case_insensitive() {
        assert_eq!(Language::from_code(" DE "), Some(Language::De));
        assert_eq!(Language::from_code("es"), None);
    }

    #[test]
    fn profile_without_language_defaults_to_english() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "user_id": 7,
            "is_caregiver": true,
            "linked_patient": "Hans Muster"
        }))
        .unwrap();
        assert_eq!(profile.language, Language::En);
        assert_eq!(profile.linked_patient.as_deref(), Some("Hans Muster"));
    }
}
