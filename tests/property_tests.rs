use pacer::batch::WINDOW_CAPACITY;
use pacer::{BatchPacer, BatchSizeConfig, BatchSizeController, ConnectionKey, DatasourceSpec};
use proptest::prelude::*;

fn arb_config() -> impl Strategy<Value = BatchSizeConfig> {
    (0i64..=1 << 40, 1i64..=100)
        .prop_map(|(hard, percent)| BatchSizeConfig::adaptive(hard, percent))
}

fn arb_reading() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(0i64),
        Just(i64::MAX),
        Just(-1i64),
        0i64..=1 << 20,
        any::<i64>(),
    ]
}

fn arb_principal() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("anonymous".to_string())),
        Just(Some("~".to_string())),
        Just(Some(String::new())),
        "[a-z_~%]{0,8}".prop_map(Some),
        any::<String>().prop_map(Some),
    ]
}

fn arb_key() -> impl Strategy<Value = ConnectionKey> {
    let datasource = prop_oneof![
        Just(DatasourceSpec::new("pg", "db", 5432, "sales").short_id()),
        Just(DatasourceSpec::new("pg", "db", 5432, "sales_a").short_id()),
        "[a-z_]{1,8}",
    ];
    let strategy = prop_oneof![
        Just("svc".to_string()),
        Just("kerberos".to_string()),
        "[a-z_~%]{0,6}",
    ];
    (datasource, strategy, arb_principal())
        .prop_map(|(ds, strategy, principal)| ConnectionKey::new(ds, strategy, principal))
}

proptest! {
    #[test]
    fn prop_next_batch_is_always_positive(
        config in arb_config(),
        readings in prop::collection::vec(arb_reading(), 1..60),
    ) {
        let mut controller = BatchSizeController::new();
        controller.initial();
        for reading in readings {
            let next = controller.next(&config, reading);
            prop_assert!(next >= 1, "next batch size {} below 1", next);
            prop_assert_eq!(controller.previous_batch_size(), next);
        }
    }

    #[test]
    fn prop_window_is_bounded_and_streaks_stay_positive(
        config in arb_config(),
        readings in prop::collection::vec(arb_reading(), 1..60),
    ) {
        let mut controller = BatchSizeController::new();
        for (round, reading) in readings.iter().enumerate() {
            controller.next(&config, *reading);
            let window = controller.window();
            prop_assert_eq!(window.len(), (round + 1).min(WINDOW_CAPACITY));
            prop_assert!(window.increment_streak() >= 1);
            prop_assert!(window.decrement_streak() >= 1);
            prop_assert!(window.samples().all(|s| s.memory_used_bytes >= 0));
        }
    }

    #[test]
    fn prop_disabled_pacer_keeps_default_size(
        default_size in 1i64..100_000,
        readings in prop::collection::vec(any::<i64>(), 0..20),
    ) {
        let config = BatchSizeConfig {
            default_batch_size: default_size,
            adaptive_enabled: false,
            ..BatchSizeConfig::default()
        };
        let mut pacer = BatchPacer::new(config);
        prop_assert_eq!(pacer.first_batch_size(), default_size);
        for reading in readings {
            prop_assert_eq!(pacer.record_batch(reading), default_size);
        }
    }

    #[test]
    fn prop_distinct_keys_get_distinct_pool_names(
        left in arb_key(),
        right in arb_key(),
    ) {
        prop_assume!(left != right);
        prop_assert_ne!(left.pool_name(), right.pool_name());
    }
}
