//! Tests for the reconnect module

use super::*;
use std::time::Duration;

mod backoff_tests {
    use super::*;

    #[test]
    fn test_backoff_default_probe_schedule() {
        let backoff = BackoffStrategy::default();

        assert_eq!(backoff.calculate_delay(0), Duration::from_millis(200));
        assert_eq!(backoff.calculate_delay(1), Duration::from_millis(400));
        assert_eq!(backoff.calculate_delay(2), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_max_limit() {
        let backoff = BackoffStrategy::new(100, 1000);

        assert_eq!(backoff.calculate_delay(10), Duration::from_millis(1000));
        assert_eq!(backoff.calculate_delay(20), Duration::from_millis(1000));
        assert_eq!(backoff.calculate_delay(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_custom_multiplier() {
        let backoff = BackoffStrategy::new(100, 30_000).with_multiplier(3.0);

        assert_eq!(backoff.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(backoff.calculate_delay(1), Duration::from_millis(300));
        assert_eq!(backoff.calculate_delay(2), Duration::from_millis(900));
    }

    #[test]
    fn test_backoff_minimum_initial() {
        let backoff = BackoffStrategy::new(0, 1000);
        assert_eq!(backoff.initial_delay(), Duration::from_millis(1));
    }

    #[test]
    fn test_backoff_max_at_least_initial() {
        let backoff = BackoffStrategy::new(1000, 100);
        assert_eq!(backoff.max_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_multiplier_minimum() {
        let backoff = BackoffStrategy::new(100, 1000).with_multiplier(0.5);
        assert_eq!(backoff.multiplier(), 1.0);
        assert_eq!(backoff.calculate_delay(5), Duration::from_millis(100));
    }
}

mod policy_tests {
    use super::*;

    #[test]
    fn test_policy_defaults() {
        let policy = ReconnectPolicy::default();

        assert_eq!(policy.max_retries(), 3);
        assert_eq!(policy.retry_interval(), Duration::from_secs(1));
        assert_eq!(policy.ping_timeout(), Duration::from_secs(3));
        assert!(policy.auto_reconnect());
    }

    #[test]
    fn test_policy_clamps_max_retries() {
        let mut policy = ReconnectPolicy::default();

        policy.set_max_retries(0);
        assert_eq!(policy.max_retries(), 1);

        policy.set_max_retries(7);
        assert_eq!(policy.max_retries(), 7);
    }

    #[test]
    fn test_policy_clamps_retry_interval() {
        let mut policy = ReconnectPolicy::default();

        policy.set_retry_interval(Duration::from_millis(500));
        assert_eq!(policy.retry_interval(), MIN_RETRY_INTERVAL);

        policy.set_retry_interval(Duration::ZERO);
        assert_eq!(policy.retry_interval(), MIN_RETRY_INTERVAL);

        policy.set_retry_interval(Duration::from_secs(5));
        assert_eq!(policy.retry_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_policy_clamps_ping_timeout() {
        let mut policy = ReconnectPolicy::default();

        policy.set_ping_timeout(Duration::from_millis(10));
        assert_eq!(policy.ping_timeout(), MIN_PING_TIMEOUT);

        policy.set_ping_timeout(Duration::from_secs(10));
        assert_eq!(policy.ping_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_policy_constructor_applies_clamps() {
        let policy = ReconnectPolicy::new(0, Duration::ZERO, Duration::ZERO);

        assert_eq!(policy.max_retries(), 1);
        assert_eq!(policy.retry_interval(), MIN_RETRY_INTERVAL);
        assert_eq!(policy.ping_timeout(), MIN_PING_TIMEOUT);
    }

    #[test]
    fn test_policy_toggle_auto_reconnect() {
        let mut policy = ReconnectPolicy::default().with_auto_reconnect(false);
        assert!(!policy.auto_reconnect());

        policy.set_auto_reconnect(true);
        assert!(policy.auto_reconnect());
    }

    #[test]
    fn test_policy_deserialize_clamps_values() {
        let policy: ReconnectPolicy = serde_json::from_str(
            r#"{"max_retries": 0, "retry_interval_ms": 100, "ping_timeout_ms": 2500}"#,
        )
        .unwrap();

        assert_eq!(policy.max_retries(), 1);
        assert_eq!(policy.retry_interval(), MIN_RETRY_INTERVAL);
        assert_eq!(policy.ping_timeout(), Duration::from_millis(2500));
        assert!(policy.auto_reconnect());
    }

    #[test]
    fn test_policy_serialize_in_millis() {
        let policy = ReconnectPolicy::new(5, Duration::from_secs(2), Duration::from_secs(4))
            .with_auto_reconnect(false);
        let json = serde_json::to_value(&policy).unwrap();

        assert_eq!(json["max_retries"], 5);
        assert_eq!(json["retry_interval_ms"], 2000);
        assert_eq!(json["ping_timeout_ms"], 4000);
        assert_eq!(json["auto_reconnect"], false);
    }
}

mod reconnect_event_tests {
    use super::*;

    #[test]
    fn test_reconnect_event_alias() {
        let event = ReconnectEvent::Attempting {
            alias: "reporting".into(),
            attempt: 1,
            max_attempts: 3,
        };
        assert_eq!(event.alias(), "reporting");

        let event = ReconnectEvent::Exhausted {
            alias: "default".into(),
            total_attempts: 3,
        };
        assert_eq!(event.alias(), "default");
    }

    #[test]
    fn test_reconnect_event_serializes_tagged() {
        let event = ReconnectEvent::Failed {
            alias: "default".into(),
            attempt: 2,
            error: "Connection refused".into(),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "failed");
        assert_eq!(json["attempt"], 2);
        assert_eq!(json["error"], "Connection refused");
    }
}
