//! Integration tests for the notification dispatch engine: fan-out, rate
//! limiting, retry backoff, quiet hours and queue sweeping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use printwatch::config::DispatchSettings;
use printwatch::dispatch::{ChannelSender, NotificationDispatcher};
use printwatch::models::{
    Alert, AlertSeverity, MessageStatus, NotificationChannel, NotificationRecipient,
    NotificationTemplate, SupplyKind,
};
use printwatch::test_helpers::{
    AlertBuilder, DeviceBuilder, RecipientBuilder, RecordingHistory, RecordingSender,
    TemplateBuilder,
};

fn build_dispatcher(
    settings: DispatchSettings,
    recipients: Vec<NotificationRecipient>,
    templates: Vec<NotificationTemplate>,
    sender: Arc<RecordingSender>,
) -> (NotificationDispatcher, Arc<RecordingHistory>) {
    let history = Arc::new(RecordingHistory::new());
    let mut senders: HashMap<NotificationChannel, Arc<dyn ChannelSender>> = HashMap::new();
    senders.insert(
        NotificationChannel::Email,
        Arc::clone(&sender) as Arc<dyn ChannelSender>,
    );

    let dispatcher =
        NotificationDispatcher::new(settings, recipients, templates, senders, history.clone());
    (dispatcher, history)
}

fn email_template() -> NotificationTemplate {
    TemplateBuilder::new("email", NotificationChannel::Email).build()
}

fn alert(device: &str) -> Alert {
    AlertBuilder::new(device, SupplyKind::Black)
        .severity(AlertSeverity::Warning)
        .site("hq")
        .build()
}

#[tokio::test]
async fn fans_out_only_to_eligible_recipients() {
    let sender = Arc::new(RecordingSender::new());
    let recipients = vec![
        RecipientBuilder::new("ops").build(),
        RecipientBuilder::new("branch-ops").site("branch").build(),
        RecipientBuilder::new("night-shift")
            .min_severity(AlertSeverity::Critical)
            .build(),
        RecipientBuilder::new("retired").disabled().build(),
    ];
    let (dispatcher, _) = build_dispatcher(
        DispatchSettings::default(),
        recipients,
        vec![email_template()],
        Arc::clone(&sender),
    );

    let device = DeviceBuilder::new("dev-1").build();
    let created = dispatcher.process_alert(&alert("dev-1"), &device).await;

    // Only "ops" matches: the site filter, severity floor and enabled flag
    // exclude the rest.
    assert_eq!(created.len(), 1);
    assert_eq!(sender.call_count(), 1);
    assert_eq!(sender.calls()[0].0, "ops@example.com");
}

#[tokio::test]
async fn recipient_without_matching_template_gets_no_message() {
    let sender = Arc::new(RecordingSender::new());
    let recipients = vec![RecipientBuilder::new("ops")
        .channel(NotificationChannel::Telegram)
        .build()];
    let (dispatcher, _) = build_dispatcher(
        DispatchSettings::default(),
        recipients,
        vec![email_template()],
        Arc::clone(&sender),
    );

    let device = DeviceBuilder::new("dev-1").build();
    let created = dispatcher.process_alert(&alert("dev-1"), &device).await;

    assert!(created.is_empty());
    assert_eq!(sender.call_count(), 0);
}

#[tokio::test]
async fn rate_limit_blocks_the_third_send_in_the_window() {
    let sender = Arc::new(RecordingSender::new());
    let settings = DispatchSettings {
        max_notifications_per_window: 2,
        rate_limit_window: Duration::from_secs(300),
        ..Default::default()
    };
    let (dispatcher, _) = build_dispatcher(
        settings,
        vec![RecipientBuilder::new("ops").build()],
        vec![email_template()],
        Arc::clone(&sender),
    );
    let device = DeviceBuilder::new("dev-1").build();

    let first = dispatcher.process_alert(&alert("dev-1"), &device).await;
    let second = dispatcher.process_alert(&alert("dev-1"), &device).await;
    let third = dispatcher.process_alert(&alert("dev-1"), &device).await;

    assert_eq!(dispatcher.message(first[0]).unwrap().status, MessageStatus::Sent);
    assert_eq!(dispatcher.message(second[0]).unwrap().status, MessageStatus::Sent);
    // The third message is deferred, not failed: no send side effect
    // happened.
    assert_eq!(
        dispatcher.message(third[0]).unwrap().status,
        MessageStatus::Pending
    );
    assert_eq!(sender.call_count(), 2);
}

#[tokio::test]
async fn failed_sends_back_off_exponentially() {
    let sender = Arc::new(RecordingSender::failing(3));
    let settings = DispatchSettings {
        max_retries: 5,
        retry_delay: Duration::from_millis(100),
        queue_sweep_interval: Duration::from_millis(10),
        ..Default::default()
    };
    let (dispatcher, _) = build_dispatcher(
        settings,
        vec![RecipientBuilder::new("ops").build()],
        vec![email_template()],
        Arc::clone(&sender),
    );
    let device = DeviceBuilder::new("dev-1").build();

    // Attempt 1 fails: next retry ~100ms out.
    let created = dispatcher.process_alert(&alert("dev-1"), &device).await;
    let id = created[0];
    let message = dispatcher.message(id).unwrap();
    assert_eq!(message.status, MessageStatus::Failed);
    assert_eq!(message.retry_count, 1);
    let offset = (message.next_retry_at.unwrap() - Utc::now()).num_milliseconds();
    assert!((0..=150).contains(&offset), "first backoff ~100ms, got {offset}");

    // Attempt 2 fails: backoff doubles to ~200ms.
    tokio::time::sleep(Duration::from_millis(120)).await;
    dispatcher.process_pending().await;
    let message = dispatcher.message(id).unwrap();
    assert_eq!(message.retry_count, 2);
    let offset = (message.next_retry_at.unwrap() - Utc::now()).num_milliseconds();
    assert!((100..=250).contains(&offset), "second backoff ~200ms, got {offset}");

    // Attempt 3 fails: ~400ms.
    tokio::time::sleep(Duration::from_millis(220)).await;
    dispatcher.process_pending().await;
    let message = dispatcher.message(id).unwrap();
    assert_eq!(message.retry_count, 3);
    let offset = (message.next_retry_at.unwrap() - Utc::now()).num_milliseconds();
    assert!((250..=450).contains(&offset), "third backoff ~400ms, got {offset}");

    // Attempt 4 succeeds.
    tokio::time::sleep(Duration::from_millis(420)).await;
    dispatcher.process_pending().await;
    // The sweep purged the sent message from the queue.
    assert!(dispatcher.message(id).is_none());
    assert_eq!(sender.call_count(), 4);
}

#[tokio::test]
async fn retry_cap_makes_failure_permanent() {
    let sender = Arc::new(RecordingSender::failing(10));
    let settings = DispatchSettings {
        max_retries: 2,
        retry_delay: Duration::from_millis(10),
        ..Default::default()
    };
    let (dispatcher, _) = build_dispatcher(
        settings,
        vec![RecipientBuilder::new("ops").build()],
        vec![email_template()],
        Arc::clone(&sender),
    );
    let device = DeviceBuilder::new("dev-1").build();

    let created = dispatcher.process_alert(&alert("dev-1"), &device).await;
    let id = created[0];

    tokio::time::sleep(Duration::from_millis(30)).await;
    dispatcher.process_pending().await;

    // Two attempts total; the second hit the cap, so no retry was scheduled
    // and the sweep purged the permanently failed message.
    assert_eq!(sender.call_count(), 2);
    assert!(dispatcher.message(id).is_none());

    // Further sweeps never resend.
    tokio::time::sleep(Duration::from_millis(30)).await;
    dispatcher.process_pending().await;
    assert_eq!(sender.call_count(), 2);
}

#[tokio::test]
async fn quiet_recipient_skips_without_side_effects() {
    let sender = Arc::new(RecordingSender::new());
    // An empty active-weekday set blocks at any wall-clock time, making the
    // quiet outcome deterministic for the test.
    let recipients = vec![RecipientBuilder::new("ops").weekdays(vec![]).build()];
    let (dispatcher, history) = build_dispatcher(
        DispatchSettings::default(),
        recipients,
        vec![email_template()],
        Arc::clone(&sender),
    );
    let device = DeviceBuilder::new("dev-1").build();

    let created = dispatcher.process_alert(&alert("dev-1"), &device).await;
    let id = created[0];

    assert_eq!(
        dispatcher.message(id).unwrap().status,
        MessageStatus::Skipped
    );
    assert_eq!(sender.call_count(), 0);
    assert!(history.entries().is_empty());

    // Skipped is terminal: the sweep purges it and never resends.
    dispatcher.process_pending().await;
    assert!(dispatcher.message(id).is_none());
    assert_eq!(sender.call_count(), 0);
}

#[tokio::test]
async fn site_quiet_hours_apply_when_recipient_has_no_window() {
    let sender = Arc::new(RecordingSender::new());
    let mut settings = DispatchSettings::default();
    settings.site_quiet_hours.insert(
        "hq".to_string(),
        // Every weekday, all day.
        r#"[{"weekdays":["Mon","Tue","Wed","Thu","Fri","Sat","Sun"],
             "start":"00:00:00","end":"23:59:59","enabled":true}]"#
            .to_string(),
    );
    let (dispatcher, _) = build_dispatcher(
        settings,
        vec![RecipientBuilder::new("ops").build()],
        vec![email_template()],
        Arc::clone(&sender),
    );
    let device = DeviceBuilder::new("dev-1").site("hq").build();

    // The alert carries site "hq", which routes into the site windows.
    let created = dispatcher.process_alert(&alert("dev-1"), &device).await;

    assert_eq!(
        dispatcher.message(created[0]).unwrap().status,
        MessageStatus::Skipped
    );
    assert_eq!(sender.call_count(), 0);
}

#[tokio::test]
async fn overnight_recipient_window_does_not_block() {
    let sender = Arc::new(RecordingSender::new());
    // An overnight window (start > end) never matches in the recipient-level
    // check.
    let recipients = vec![RecipientBuilder::new("ops")
        .quiet_hours((23, 59), (0, 0))
        .build()];
    let (dispatcher, _) = build_dispatcher(
        DispatchSettings::default(),
        recipients,
        vec![email_template()],
        Arc::clone(&sender),
    );
    let device = DeviceBuilder::new("dev-1").build();

    let created = dispatcher.process_alert(&alert("dev-1"), &device).await;

    assert_eq!(
        dispatcher.message(created[0]).unwrap().status,
        MessageStatus::Sent
    );
    assert_eq!(sender.call_count(), 1);
}

#[tokio::test]
async fn concurrent_sweeps_do_not_double_send() {
    let sender = Arc::new(RecordingSender::new());
    let settings = DispatchSettings {
        // Rate-limit the first attempt away so the message stays pending for
        // the sweeps.
        max_notifications_per_window: 0,
        ..Default::default()
    };
    let (dispatcher, _) = build_dispatcher(
        settings,
        vec![RecipientBuilder::new("ops").build()],
        vec![email_template()],
        Arc::clone(&sender),
    );
    let dispatcher = Arc::new(dispatcher);
    let device = DeviceBuilder::new("dev-1").build();

    let created = dispatcher.process_alert(&alert("dev-1"), &device).await;
    assert_eq!(
        dispatcher.message(created[0]).unwrap().status,
        MessageStatus::Pending
    );

    // Lift the limit, then race two sweeps.
    dispatcher.update_settings(DispatchSettings::default());
    let a = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.process_pending().await })
    };
    let b = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.process_pending().await })
    };
    a.await.unwrap();
    b.await.unwrap();

    assert_eq!(sender.call_count(), 1);
}
