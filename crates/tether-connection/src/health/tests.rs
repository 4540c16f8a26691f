//! Tests for the health module

use super::*;
use std::time::Duration;

mod status_tests {
    use super::*;

    #[test]
    fn test_classification_boundaries() {
        let cases = [
            (50, HealthStatus::Healthy),
            (100, HealthStatus::Healthy),
            (101, HealthStatus::Degraded),
            (500, HealthStatus::Degraded),
            (501, HealthStatus::Unhealthy),
        ];
        for (ms, expected) in cases {
            assert_eq!(
                HealthThresholds::default().classify(Duration::from_millis(ms)),
                expected,
                "{}ms",
                ms
            );
        }
    }

    #[test]
    fn test_usable_statuses() {
        assert!(HealthStatus::Healthy.is_usable());
        assert!(HealthStatus::Degraded.is_usable());
        assert!(!HealthStatus::Unhealthy.is_usable());
        assert!(!HealthStatus::Degraded.is_healthy());
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = HealthThresholds::new(50, 200);

        assert_eq!(
            thresholds.classify(Duration::from_millis(100)),
            HealthStatus::Degraded
        );
        assert_eq!(
            thresholds.classify(Duration::from_millis(300)),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn test_degraded_threshold_at_least_healthy() {
        let thresholds = HealthThresholds::new(200, 100);
        assert_eq!(thresholds.healthy(), Duration::from_millis(200));
        assert_eq!(thresholds.degraded(), Duration::from_millis(200));
    }

    #[test]
    fn test_state_failure_and_disconnect_win() {
        let thresholds = HealthThresholds::default();
        let fast = Some(Duration::from_millis(5));

        assert_eq!(
            HealthStatus::from_state(true, false, fast, &thresholds),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthStatus::from_state(true, true, fast, &thresholds),
            HealthStatus::Unhealthy
        );
        assert_eq!(
            HealthStatus::from_state(false, false, fast, &thresholds),
            HealthStatus::Unhealthy
        );
        assert_eq!(
            HealthStatus::from_state(true, false, None, &thresholds),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthStatus::from_state(true, false, Some(Duration::from_millis(250)), &thresholds),
            HealthStatus::Degraded
        );
    }

    #[test]
    fn test_status_display_matches_serde() {
        for status in [
            HealthStatus::Healthy,
            HealthStatus::Degraded,
            HealthStatus::Unhealthy,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }
}

mod ping_tests {
    use super::*;
    use crate::testing::MockConnection;
    use tether_core::{Connection, TetherError};

    #[test]
    fn test_ping_error_display() {
        let err = PingError::ConnectionClosed;
        assert_eq!(err.to_string(), "Connection is closed");

        let err = PingError::Failed("test error".to_string());
        assert_eq!(err.to_string(), "Ping failed: test error");

        let err = PingError::Timeout(Duration::from_secs(3));
        assert_eq!(err.to_string(), "Ping timed out after 3s");
    }

    #[test]
    fn test_ping_error_into_tether_error() {
        let err: TetherError = PingError::Timeout(Duration::from_secs(1)).into();
        assert!(matches!(err, TetherError::Timeout(_)));

        let err: TetherError = PingError::ConnectionClosed.into();
        assert!(matches!(err, TetherError::Connection(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_live_connection() {
        let conn = MockConnection::new(1);

        let latency = ping_database(&conn, Duration::from_secs(1)).await.unwrap();

        assert_eq!(latency, Duration::ZERO);
        assert_eq!(conn.pings(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_measures_latency() {
        let conn = MockConnection::new(1).with_ping_delay(Some(Duration::from_millis(150)));

        let latency = ping_database(&conn, Duration::from_secs(1)).await.unwrap();

        assert_eq!(latency, Duration::from_millis(150));
        assert_eq!(
            HealthStatus::from_probe(&Ok(latency), &HealthThresholds::default()),
            HealthStatus::Degraded
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_dead_connection() {
        let conn = MockConnection::new(1);
        conn.kill();

        let result = ping_database(&conn, Duration::from_secs(1)).await;

        assert!(matches!(result, Err(PingError::Failed(ref msg)) if msg.contains("gone away")));
        assert_eq!(
            HealthStatus::from_probe(&result, &HealthThresholds::default()),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_times_out() {
        let conn = MockConnection::new(1).with_ping_delay(Some(Duration::from_secs(30)));

        let result = ping_database(&conn, Duration::from_secs(2)).await;

        assert_eq!(result, Err(PingError::Timeout(Duration::from_secs(2))));
    }

    #[tokio::test]
    async fn test_ping_closed_connection_skips_driver() {
        let conn = MockConnection::new(1);
        conn.close().await.unwrap();

        let result = ping_database(&conn, Duration::from_secs(1)).await;

        assert_eq!(result, Err(PingError::ConnectionClosed));
        assert_eq!(conn.pings(), 0);
    }
}
