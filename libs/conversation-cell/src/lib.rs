mod admin;
pub mod commands;
pub mod context;
pub mod controller;
pub mod menus;
pub mod models;
pub mod session;

pub use commands::Command;
pub use context::ServiceContext;
pub use controller::ConversationController;
pub use models::*;
pub use session::{ConversationSession, SessionStore};
