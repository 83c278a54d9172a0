mod common;

use std::time::Duration;

use common::{init_logging, rows, Call, ScriptedChannel};
use draw_core::{format_digest, DigestStyle};
use draw_engine::{
    BroadcastReport, ChannelError, ChannelFailure, ChannelOutcome, ChannelSpec, CommitPolicy,
    DeliveryAction, DeliveryMode, Dispatcher, MessageHandle, RetrySettings,
};

fn fast_retry(max_retries: u32) -> RetrySettings {
    RetrySettings {
        max_retries,
        max_backoff: Duration::from_millis(5),
    }
}

fn rejected() -> ChannelError {
    ChannelError::new(ChannelFailure::HttpStatus(500), "boom")
}

#[tokio::test]
async fn failing_channel_does_not_block_others() {
    init_logging();
    let broken = ScriptedChannel::new("broken");
    let healthy = ScriptedChannel::new("healthy");
    broken.push_send(Err(rejected()));

    let mut dispatcher = Dispatcher::new(fast_retry(1));
    dispatcher.add_channel(broken.boxed(), ChannelSpec::new(40, DeliveryMode::Append));
    dispatcher.add_channel(healthy.boxed(), ChannelSpec::new(40, DeliveryMode::Append));

    let report = dispatcher.broadcast(&rows(1..=3)).await;
    assert_eq!(report.accepted_count(), 1);
    assert!(report.outcome("broken").unwrap().result.is_err());
    assert_eq!(
        report.outcome("healthy").unwrap().result,
        Ok(DeliveryAction::Sent)
    );
    assert!(CommitPolicy::AnyAccepted.allows_commit(&report));
    assert!(!CommitPolicy::AllAccepted.allows_commit(&report));

    // The broken channel is tried again on the next digest.
    let report = dispatcher.broadcast(&rows(1..=4)).await;
    assert!(report.all_accepted());
    assert_eq!(broken.calls().len(), 2);
}

#[tokio::test]
async fn edit_preferred_channel_edits_after_first_send() {
    init_logging();
    let channel = ScriptedChannel::new("tg");
    let mut dispatcher = Dispatcher::new(fast_retry(1));
    dispatcher.add_channel(
        channel.boxed(),
        ChannelSpec::new(40, DeliveryMode::EditPreferred),
    );

    let first = dispatcher.broadcast(&rows(1..=2)).await;
    assert_eq!(first.outcome("tg").unwrap().result, Ok(DeliveryAction::Sent));
    assert_eq!(
        dispatcher.remembered_handle("tg"),
        Some(&MessageHandle("tg-1".to_string()))
    );

    let second = dispatcher.broadcast(&rows(1..=3)).await;
    assert_eq!(
        second.outcome("tg").unwrap().result,
        Ok(DeliveryAction::Edited)
    );
    match channel.calls().as_slice() {
        [Call::Send(_), Call::Edit(handle, text)] => {
            assert_eq!(handle, "tg-1");
            assert!(text.contains("  3: "));
        }
        other => panic!("unexpected calls {other:?}"),
    }
}

#[tokio::test]
async fn vanished_message_falls_back_to_send() {
    init_logging();
    let channel = ScriptedChannel::new("tg");
    let mut dispatcher = Dispatcher::new(fast_retry(1));
    dispatcher.add_channel(
        channel.boxed(),
        ChannelSpec::new(40, DeliveryMode::EditPreferred),
    );

    dispatcher.broadcast(&rows(1..=2)).await;
    channel.push_edit(Err(ChannelError::new(ChannelFailure::NotFound, "gone")));
    let report = dispatcher.broadcast(&rows(1..=3)).await;

    let outcome = report.outcome("tg").unwrap();
    assert_eq!(outcome.result, Ok(DeliveryAction::Resent));
    assert_eq!(outcome.attempts, 2);
    assert_eq!(
        dispatcher.remembered_handle("tg"),
        Some(&MessageHandle("tg-2".to_string()))
    );
}

#[tokio::test]
async fn failed_edit_keeps_remembered_message() {
    init_logging();
    let channel = ScriptedChannel::new("tg");
    let mut dispatcher = Dispatcher::new(fast_retry(0));
    dispatcher.add_channel(
        channel.boxed(),
        ChannelSpec::new(40, DeliveryMode::EditPreferred),
    );

    dispatcher.broadcast(&rows(1..=2)).await;
    channel.push_edit(Err(rejected()));
    let report = dispatcher.broadcast(&rows(1..=3)).await;

    assert!(report.outcome("tg").unwrap().result.is_err());
    assert_eq!(
        dispatcher.remembered_handle("tg"),
        Some(&MessageHandle("tg-1".to_string()))
    );
}

#[tokio::test]
async fn rate_limit_is_retried_once() {
    init_logging();
    let channel = ScriptedChannel::new("line");
    channel.push_send(Err(ChannelError::rate_limited(Duration::from_secs(30))));

    let mut dispatcher = Dispatcher::new(fast_retry(1));
    dispatcher.add_channel(channel.boxed(), ChannelSpec::new(40, DeliveryMode::Append));

    let report = dispatcher.broadcast(&rows(1..=2)).await;
    let outcome = report.outcome("line").unwrap();
    assert_eq!(outcome.result, Ok(DeliveryAction::Sent));
    assert_eq!(outcome.attempts, 2);
}

#[tokio::test]
async fn sustained_rate_limit_gives_up() {
    init_logging();
    let channel = ScriptedChannel::new("line");
    for _ in 0..3 {
        channel.push_send(Err(ChannelError::rate_limited(Duration::from_secs(30))));
    }

    let mut dispatcher = Dispatcher::new(fast_retry(1));
    dispatcher.add_channel(channel.boxed(), ChannelSpec::new(40, DeliveryMode::Append));

    let report = dispatcher.broadcast(&rows(1..=2)).await;
    let outcome = report.outcome("line").unwrap();
    assert!(matches!(
        outcome.result,
        Err(ChannelError {
            kind: ChannelFailure::RateLimited { .. },
            ..
        })
    ));
    assert_eq!(outcome.attempts, 2);
    assert_eq!(channel.calls().len(), 2);
}

#[tokio::test]
async fn each_channel_renders_its_own_retention_and_limit() {
    init_logging();
    let wide = ScriptedChannel::new("wide");
    let narrow = ScriptedChannel::new("narrow");
    let tiny = ScriptedChannel::new("tiny").with_max_chars(20);

    let mut dispatcher = Dispatcher::new(fast_retry(1));
    dispatcher.add_channel(wide.boxed(), ChannelSpec::new(40, DeliveryMode::Append));
    dispatcher.add_channel(narrow.boxed(), ChannelSpec::new(2, DeliveryMode::Append));
    dispatcher.add_channel(tiny.boxed(), ChannelSpec::new(40, DeliveryMode::Append));
    assert_eq!(dispatcher.max_retention(), Some(40));

    dispatcher.broadcast(&rows(1..=6)).await;

    let wide_text = &wide.sent_texts()[0];
    assert!(wide_text.contains("  1: "));
    assert!(wide_text.contains("  6: "));

    let narrow_text = &narrow.sent_texts()[0];
    assert!(!narrow_text.contains("  4: "));
    assert!(narrow_text.contains("  5: "));
    assert!(narrow_text.contains("  6: "));

    assert_eq!(tiny.sent_texts()[0].chars().count(), 20);
}

#[tokio::test]
async fn oversized_digest_drops_oldest_rows_and_keeps_footer() {
    init_logging();
    let fitting = format_digest(&rows(4..=6), &DigestStyle::live());
    let limited = ScriptedChannel::new("limited").with_max_chars(fitting.chars().count());

    let mut dispatcher = Dispatcher::new(fast_retry(1));
    dispatcher.add_channel(limited.boxed(), ChannelSpec::new(40, DeliveryMode::Append));
    dispatcher.broadcast(&rows(1..=6)).await;

    let sent = &limited.sent_texts()[0];
    assert_eq!(sent, &fitting);
    assert!(!sent.contains("  3: "));
    assert!(sent.contains("264world รอบที่ 6"));
}

#[test]
fn empty_broadcast_always_commits() {
    let report = BroadcastReport::default();
    assert!(CommitPolicy::Attempted.allows_commit(&report));
    assert!(CommitPolicy::AnyAccepted.allows_commit(&report));
    assert!(CommitPolicy::AllAccepted.allows_commit(&report));
}

#[test]
fn attempted_policy_commits_even_when_everything_failed() {
    let report = BroadcastReport {
        outcomes: vec![ChannelOutcome {
            channel: "only".to_string(),
            result: Err(rejected()),
            attempts: 1,
        }],
    };
    assert!(CommitPolicy::Attempted.allows_commit(&report));
    assert!(!CommitPolicy::AnyAccepted.allows_commit(&report));
}
