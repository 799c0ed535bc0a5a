use std::sync::Arc;
use std::time::{Duration, Instant};

use notification_cell::NotificationDispatcher;
use shared_database::BookingStore;
use shared_models::{DeliveryFailure, OutboundMessage};
use shared_utils::test_utils::{RecordingMessenger, TestFixtures, ADMIN_ID};

#[tokio::test]
async fn test_broadcast_failures_do_not_block_remaining_sends() {
    let fixtures = TestFixtures::new().await;
    let messenger = Arc::new(RecordingMessenger::new());
    messenger.fail_for(2, DeliveryFailure::Blocked);
    messenger.fail_for(5, DeliveryFailure::Unreachable("chat not found".into()));

    let dispatcher = NotificationDispatcher::with_delay(
        messenger.clone(),
        fixtures.dyn_store(),
        Duration::from_millis(5),
    );

    let recipients = [1, 2, 3, 4, 5, 6];
    let started = Instant::now();
    let report = dispatcher
        .broadcast(&recipients, &OutboundMessage::text("📢 Announcement: new slots published"))
        .await;

    assert_eq!(report.success + report.failure, recipients.len());
    assert_eq!(report.failure, 2);
    assert_eq!(messenger.sent().len(), 4);
    assert!(messenger.sent_to(6).len() == 1);
    assert!(started.elapsed() >= Duration::from_millis(25));
}

#[tokio::test]
async fn test_notify_admins_uses_registry() {
    let fixtures = TestFixtures::new().await;
    let messenger = Arc::new(RecordingMessenger::new());
    let dispatcher = NotificationDispatcher::new(messenger.clone(), fixtures.dyn_store(), &fixtures.config);

    let report = dispatcher
        .notify_admins(&OutboundMessage::text("🆘 Support request"))
        .await
        .unwrap();

    assert_eq!(report.success, 1);
    assert_eq!(messenger.sent_to(ADMIN_ID).len(), 1);
}

#[tokio::test]
async fn test_escalation_with_unreachable_admin_is_isolated() {
    let fixtures = TestFixtures::new().await;
    fixtures.store.insert_admin(9001).await.unwrap();

    let messenger = Arc::new(RecordingMessenger::new());
    messenger.fail_for(ADMIN_ID, DeliveryFailure::Blocked);
    let dispatcher = NotificationDispatcher::new(messenger.clone(), fixtures.dyn_store(), &fixtures.config);

    let report = dispatcher
        .escalate("booking ID 3", 42, &DeliveryFailure::Blocked)
        .await;

    assert_eq!(report.success, 1);
    assert_eq!(report.failure, 1);
    assert!(messenger.sent_to(9001)[0].text.contains("booking ID 3"));
}
