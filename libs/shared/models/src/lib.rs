pub mod booking;
pub mod error;
pub mod messaging;
pub mod profile;

pub use booking::*;
pub use error::AppError;
pub use messaging::{Action, DeliveryFailure, Messenger, OutboundMessage};
pub use profile::*;
