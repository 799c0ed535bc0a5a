pub mod approval;
pub mod booking;
pub mod consistency;
pub mod lifecycle;

pub use approval::{ApprovalWorkflow, CancellationReport, CancelledBy};
pub use booking::BookingLedger;
pub use consistency::SlotLockRegistry;
pub use lifecycle::BookingLifecycleService;
