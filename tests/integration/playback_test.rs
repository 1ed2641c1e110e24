//! Integration tests for playback supervision
//!
//! These tests drive the supervisor the way the control server does, with
//! `sleep` standing in for the player binary.

use crate::test_utils::Fixture;
use audio_file_player::playback::{PlaybackOutcome, PlaybackStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[cfg(test)]
mod playback_integration_tests {
    use super::*;

    /// Playback of a file whose player exits 0 reports at least the wall time it took
    #[tokio::test]
    async fn test_end_to_end_success() {
        let fixture = Fixture::new("sleep", 10.0);
        let began = Instant::now();
        let ticket = fixture.supervisor.start("0.8").await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = fixture.supervisor.await_completion(&ticket, Some(&tx)).await;
        let wall = began.elapsed();

        match outcome {
            PlaybackOutcome::Succeeded { total_time } => {
                assert!(total_time >= Duration::from_millis(800));
                assert!(total_time <= wall);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(rx.try_recv().is_ok(), "no feedback emitted");
    }

    /// Cancelling at arbitrary points never turns into a failure report
    #[tokio::test]
    async fn test_repeated_cancellation_races() {
        let fixture = Fixture::new("sleep", 50.0);
        for delay_ms in [0u64, 5, 20, 60] {
            let ticket = fixture.supervisor.start("30").await.unwrap();
            let supervisor = Arc::clone(&fixture.supervisor);
            let waiter = tokio::spawn(async move { supervisor.await_completion(&ticket, None).await });

            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            assert!(fixture.supervisor.cancel().await);

            let outcome = tokio::time::timeout(Duration::from_secs(2), waiter).await.unwrap().unwrap();
            assert_eq!(outcome, PlaybackOutcome::Cancelled, "delay {}ms", delay_ms);
        }
        assert_eq!(fixture.supervisor.status().await, PlaybackStatus::Idle);
    }

    /// A playback keeps the volume ticker alive until it ends
    #[tokio::test]
    async fn test_playback_drives_volume_ticker() {
        let fixture = Fixture::new("sleep", 20.0);
        let mut updates = fixture.telemetry.subscribe();
        assert!(!fixture.telemetry.is_polling());

        let ticket = fixture.supervisor.start("0.5").await.unwrap();
        assert!(fixture.telemetry.is_polling());
        let reading = tokio::time::timeout(Duration::from_secs(2), updates.recv()).await.unwrap().unwrap();
        assert_eq!(reading, 51);

        fixture.supervisor.await_completion(&ticket, None).await;
        assert!(!fixture.telemetry.is_polling());
    }
}
