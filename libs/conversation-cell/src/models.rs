// libs/conversation-cell/src/models.rs
use shared_models::{SlotKey, UserId};

use crate::commands::Command;

/// Which structured text an administrator is expected to type next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminInputKind {
    AddAdmin,
    RemoveAdminTarget,
    EditUser { user_id: UserId },
    AddSlot,
    AddDoctor,
    Broadcast,
}

/// One active state per user. Data gathered along the booking flow lives in
/// the variant, so leaving a state drops it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    SelectingDoctor,
    SelectingSlot {
        doctor_id: UserId,
    },
    CollectingPatientName {
        slot: SlotKey,
    },
    CollectingDateOfBirth {
        slot: SlotKey,
        patient_name: String,
    },
    CollectingCaregiverName,
    AwaitingSupportText,
    AwaitingAdminInput(AdminInputKind),
}

impl ConversationState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ConversationState::Idle)
    }

    /// States that interpret the next free-text message.
    pub fn expects_text(&self) -> bool {
        matches!(
            self,
            ConversationState::CollectingPatientName { .. }
                | ConversationState::CollectingDateOfBirth { .. }
                | ConversationState::CollectingCaregiverName
                | ConversationState::AwaitingSupportText
                | ConversationState::AwaitingAdminInput(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    Text(String),
    /// A button payload or slash command that did not decode.
    Unrecognized(String),
}

/// A transport-neutral inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub user_id: UserId,
    pub username: Option<String>,
    pub input: Inbound,
}

impl Event {
    pub fn command(user_id: UserId, command: Command) -> Self {
        Self {
            user_id,
            username: None,
            input: Inbound::Command(command),
        }
    }

    pub fn from_callback(user_id: UserId, username: Option<String>, data: &str) -> Self {
        let input = match Command::parse_callback(data) {
            Some(command) => Inbound::Command(command),
            None => Inbound::Unrecognized(data.to_string()),
        };
        Self { user_id, username, input }
    }

    /// Slash commands are decoded; any other text is passed through as-is.
    pub fn from_text(user_id: UserId, username: Option<String>, text: &str) -> Self {
        let input = if text.trim_start().starts_with('/') {
            match Command::parse_slash(text) {
                Some(command) => Inbound::Command(command),
                None => Inbound::Unrecognized(text.trim().to_string()),
            }
        } else {
            Inbound::Text(text.to_string())
        };
        Self { user_id, username, input }
    }
}
