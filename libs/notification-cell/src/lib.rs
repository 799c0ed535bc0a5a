pub mod models;
pub mod services;

pub use models::{BroadcastReport, DeliveryOutcome};
pub use services::NotificationDispatcher;
