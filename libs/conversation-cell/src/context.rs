// libs/conversation-cell/src/context.rs
use std::sync::Arc;

use admin_cell::{AdminService, SupportService};
use appointment_cell::{ApprovalWorkflow, BookingLedger};
use doctor_cell::{AvailabilityService, DoctorService};
use notification_cell::NotificationDispatcher;
use shared_config::AppConfig;
use shared_database::BookingStore;
use shared_models::Messenger;
use shared_utils::Clock;

/// Everything the controller talks to, wired once at start-up.
pub struct ServiceContext {
    pub config: Arc<AppConfig>,
    pub clock: Arc<dyn Clock>,
    pub store: Arc<dyn BookingStore>,
    pub notifications: Arc<NotificationDispatcher>,
    pub doctors: Arc<DoctorService>,
    pub availability: Arc<AvailabilityService>,
    pub ledger: Arc<BookingLedger>,
    pub workflow: Arc<ApprovalWorkflow>,
    pub admin: Arc<AdminService>,
    pub support: Arc<SupportService>,
}

impl ServiceContext {
    pub fn new(
        store: Arc<dyn BookingStore>,
        messenger: Arc<dyn Messenger>,
        config: Arc<AppConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let notifications = Arc::new(NotificationDispatcher::new(messenger, store.clone(), &config));
        let doctors = Arc::new(DoctorService::new(store.clone()));
        let availability = Arc::new(AvailabilityService::new(store.clone(), config.clone(), clock.clone()));
        let ledger = Arc::new(BookingLedger::new(store.clone()));
        let workflow = Arc::new(ApprovalWorkflow::new(
            ledger.clone(),
            doctors.clone(),
            notifications.clone(),
            config.clone(),
            clock.clone(),
        ));
        let admin = Arc::new(AdminService::new(
            store.clone(),
            ledger.clone(),
            workflow.clone(),
            doctors.clone(),
            availability.clone(),
        ));
        let support = Arc::new(SupportService::new(store.clone(), notifications.clone()));

        Self {
            config,
            clock,
            store,
            notifications,
            doctors,
            availability,
            ledger,
            workflow,
            admin,
            support,
        }
    }
}
