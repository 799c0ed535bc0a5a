pub mod admin;
pub mod support;

pub use admin::AdminService;
pub use support::{SupportReceipt, SupportService};
