use super::*;
use std::thread;

#[test]
fn test_defaults_match_sensor_firmware() {
    let store = ThresholdStore::default();
    let t = store.get();
    assert_eq!(t.abs_threshold, 35.0);
    assert_eq!(t.rise_threshold, 5.0);
    assert_eq!(t.window_duration, Duration::from_secs(60));
}

#[test]
fn test_partial_update_leaves_other_fields() {
    let store = ThresholdStore::default();

    let updated = store
        .update(&ThresholdUpdate {
            abs_threshold: Some(20.0),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(updated.abs_threshold, 20.0);
    assert_eq!(updated.rise_threshold, 5.0);
    assert_eq!(updated.window_duration, Duration::from_secs(60));
    assert_eq!(store.get(), updated);
}

#[test]
fn test_window_update_accepts_fractional_seconds() {
    let store = ThresholdStore::default();
    let updated = store
        .update(&ThresholdUpdate {
            window_duration_secs: Some(1.5),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(updated.window_duration, Duration::from_millis(1500));
}

#[test]
fn test_invalid_update_leaves_store_unchanged() {
    let store = ThresholdStore::default();

    // Valid abs field alongside an invalid rise field: nothing is applied
    let err = store
        .update(&ThresholdUpdate {
            abs_threshold: Some(10.0),
            rise_threshold: Some(-1.0),
            window_duration_secs: None,
        })
        .unwrap_err();
    assert_eq!(
        err,
        InvalidThresholdError::Negative {
            field: "rise_threshold",
            value: -1.0
        }
    );
    assert_eq!(store.get(), Thresholds::default());

    let err = store
        .update(&ThresholdUpdate {
            window_duration_secs: Some(f64::NAN),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, InvalidThresholdError::NotFinite { .. }));

    let err = store
        .update(&ThresholdUpdate {
            abs_threshold: Some(f64::INFINITY),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(
        err,
        InvalidThresholdError::NotFinite {
            field: "abs_threshold",
            ..
        }
    ));
    assert_eq!(store.get(), Thresholds::default());
}

#[test]
fn test_zero_values_are_accepted() {
    let store = ThresholdStore::default();
    let updated = store
        .update(&ThresholdUpdate {
            abs_threshold: Some(0.0),
            rise_threshold: Some(0.0),
            window_duration_secs: Some(0.0),
        })
        .unwrap();
    assert_eq!(updated.window_duration, Duration::ZERO);
}

#[test]
fn test_serde_uses_seconds() {
    let json = serde_json::to_value(Thresholds::default()).unwrap();
    assert_eq!(json["window_duration_secs"], 60.0);
    assert_eq!(json["abs_threshold"], 35.0);

    let parsed: Thresholds = serde_json::from_value(serde_json::json!({
        "abs_threshold": 40.0,
        "rise_threshold": 2.5,
        "window_duration_secs": 30
    }))
    .unwrap();
    assert_eq!(parsed.window_duration, Duration::from_secs(30));
}

#[test]
fn test_concurrent_readers_never_see_mixed_values() {
    // Two consistent configurations; writers flip between them while readers
    // assert they only ever observe one or the other.
    let a = Thresholds {
        abs_threshold: 10.0,
        rise_threshold: 1.0,
        window_duration: Duration::from_secs(10),
    };
    let b = Thresholds {
        abs_threshold: 20.0,
        rise_threshold: 2.0,
        window_duration: Duration::from_secs(20),
    };
    let store = ThresholdStore::shared(a);

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..2000 {
                let target = if i % 2 == 0 { b } else { a };
                store
                    .update(&ThresholdUpdate {
                        abs_threshold: Some(target.abs_threshold),
                        rise_threshold: Some(target.rise_threshold),
                        window_duration_secs: Some(target.window_duration.as_secs_f64()),
                    })
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..5000 {
                    let seen = store.get();
                    assert!(seen == a || seen == b, "mixed thresholds observed: {:?}", seen);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
}

#[test]
fn test_concurrent_partial_updates_all_land() {
    let store = ThresholdStore::shared(Thresholds::default());

    let abs_writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..500 {
                store
                    .update(&ThresholdUpdate {
                        abs_threshold: Some(f64::from(i)),
                        ..Default::default()
                    })
                    .unwrap();
            }
        })
    };
    let rise_writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..500 {
                store
                    .update(&ThresholdUpdate {
                        rise_threshold: Some(f64::from(i)),
                        ..Default::default()
                    })
                    .unwrap();
            }
        })
    };
    abs_writer.join().unwrap();
    rise_writer.join().unwrap();

    // Neither writer clobbered the other's field
    let t = store.get();
    assert_eq!(t.abs_threshold, 499.0);
    assert_eq!(t.rise_threshold, 499.0);
    assert_eq!(t.window_duration, Duration::from_secs(60));
}

#[test]
fn test_reader_holding_a_snapshot_does_not_block_update() {
    let store = ThresholdStore::default();
    // A loaded guard stays valid across a swap
    let guard = store.current.load();

    store
        .update(&ThresholdUpdate {
            abs_threshold: Some(50.0),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(guard.abs_threshold, 35.0);
    assert_eq!(store.get().abs_threshold, 50.0);
}
