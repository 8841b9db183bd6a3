use cardiac_signal_engine::config::{parse_config, Config};
use cardiac_signal_engine::local::simulator::SyntheticEcg;
use cardiac_signal_engine::processing::{IngestOutcome, SampleReport, SignalEngine, SourceEvent};

use rand::rngs::StdRng;
use rand::SeedableRng;

fn accepted(outcome: IngestOutcome) -> SampleReport {
    match outcome {
        IngestOutcome::Accepted(report) => report,
        other => panic!("expected an accepted sample, got {:?}", other),
    }
}

/// 900 for `width` samples at the start of every `period`, 400 otherwise.
fn pulse(n: usize, period: usize, width: usize) -> f64 {
    if n % period < width {
        900.0
    } else {
        400.0
    }
}

fn fixed_threshold_engine(threshold: f64) -> SignalEngine {
    let mut config = Config::default();
    config.detector.fixed_threshold = Some(threshold);
    SignalEngine::new(config)
}

// A DC level this far above the signal threshold always takes the
// strong-signal path, so this checks priming; the smoothing stages settling
// under the full path is covered by `full_path_settles_after_a_burst`.
#[test]
fn flat_line_settles_on_its_level() {
    let mut engine = SignalEngine::new(Config::default());
    let mut last = None;
    for _ in 0..60 {
        last = Some(accepted(engine.ingest(500.0)));
    }
    let report = last.unwrap();

    assert!((engine.filter().low_pass_output() - 500.0).abs() < 1.0);
    assert!((report.filtered - 500.0).abs() < 1.0);
    assert_eq!(engine.heart_rate(), 0.0);
    assert_eq!(engine.beat_count(), 0);
}

#[test]
fn full_path_settles_after_a_burst() {
    let mut engine = SignalEngine::new(Config::default());

    // Zero-centred 5 Hz burst, then silence; zero never exceeds the guard
    for n in 0..100 {
        engine.ingest(10.0 * (2.0 * std::f64::consts::PI * n as f64 / 20.0).sin());
    }
    let mut last = None;
    for _ in 0..200 {
        last = Some(accepted(engine.ingest(0.0)));
    }

    let stages = engine.filter().last_stages();
    assert!(stages.bandpass.is_some());
    assert!(stages.low_pass.is_some());
    assert!(engine.filter().low_pass_output().abs() < 0.5);
    assert!(last.unwrap().filtered.abs() < 0.5);
}

#[test]
fn pulse_train_at_100_bpm() {
    let mut engine = fixed_threshold_engine(700.0);
    let mut detected = 0;
    let mut rate_at_fifth_beat = None;

    // 10 s at 100 Hz, one 4-sample pulse every 600 ms
    for n in 0..1000 {
        let report = accepted(engine.ingest(pulse(n, 60, 4)));
        if report.beat.is_some() {
            detected += 1;
            if detected == 5 {
                rate_at_fifth_beat = Some(report.heart_rate);
            }
        }
    }

    let rate = rate_at_fifth_beat.expect("fewer than five beats detected");
    assert!((rate - 100.0).abs() <= 5.0, "rate after five beats: {}", rate);
    assert!((engine.heart_rate() - 100.0).abs() <= 5.0);
    assert_eq!(detected, 17);
}

#[test]
fn synthetic_ecg_with_adaptive_threshold() {
    let mut engine = SignalEngine::new(Config::default());
    let mut ecg = SyntheticEcg::new(100.0, 75.0);
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..3000 {
        let report = accepted(engine.ingest(ecg.next_sample(&mut rng)));
        assert!(report.filtered.is_finite());
    }

    let rate = engine.heart_rate();
    assert!((rate - 75.0).abs() <= 5.0, "estimated {} BPM", rate);
    let (min, max) = engine.range();
    assert!(min < 512.0 && max > 700.0, "range {:?}", (min, max));
}

#[test]
fn nan_mid_stream_is_invisible() {
    let mut engine = fixed_threshold_engine(700.0);
    for n in 0..300 {
        engine.ingest(pulse(n, 60, 4));
    }
    let before = engine.snapshot(300);

    assert_eq!(engine.ingest(f64::NAN), IngestOutcome::Dropped);
    assert_eq!(engine.ingest(f64::INFINITY), IngestOutcome::Dropped);
    assert_eq!(engine.snapshot(300), before);

    let report = accepted(engine.ingest(400.0));
    assert_eq!(report.index, 300);
    assert!(report.filtered.is_finite());
}

#[test]
fn reset_behaves_like_a_fresh_engine() {
    let config = parse_config("detector:\n  fixed_threshold: 700.0\n").unwrap();

    let mut reused = SignalEngine::new(config.clone());
    for n in 0..2000 {
        reused.ingest(pulse(n, 45, 3) + (n % 11) as f64);
    }
    reused.handle(SourceEvent::LeadsOff);
    reused.reset();

    let mut fresh = SignalEngine::new(config);
    for n in 0..1200 {
        let value = pulse(n, 60, 4);
        assert_eq!(reused.ingest(value), fresh.ingest(value));
    }
    assert_eq!(reused.heart_rate(), fresh.heart_rate());
    assert_eq!(reused.snapshot(1200), fresh.snapshot(1200));
}

#[test]
fn display_range_keeps_a_minimum_span() {
    let mut engine = SignalEngine::new(Config::default());
    for _ in 0..20_000 {
        engine.ingest(512.0);
        let (min, max) = engine.range();
        assert!(max - min >= 10.0 - 1e-9);
    }
    let (min, _) = engine.range();
    assert!((min - 512.0).abs() < 1.0);
    assert!(engine.normalize(512.0) < 1e-3);
    assert_eq!(engine.normalize(600.0), 1.0);
}

#[test]
fn output_stays_finite_on_hostile_input() {
    let mut engine = SignalEngine::new(Config::default());
    let values = [0.0, 1023.0, 1e300, -1e300, 1e-300, 512.0, f64::MAX, f64::MIN];
    for n in 0..5000 {
        if let IngestOutcome::Accepted(report) = engine.ingest(values[n % values.len()]) {
            assert!(report.filtered.is_finite(), "sample {} filtered to {}", n, report.filtered);
        }
    }
    assert!(engine.heart_rate().is_finite());
    assert!(engine.threshold().is_finite());
}

#[test]
fn implausible_intervals_leave_the_rate_history_alone() {
    let mut engine = fixed_threshold_engine(700.0);

    // Three beats 800 ms apart
    for n in 0..161 {
        engine.ingest(pulse(n, 80, 4));
    }
    let history = engine.detector().rr_intervals();
    let rate = engine.heart_rate();
    assert_eq!(history, vec![800.0, 800.0]);

    // Next beat 2 s later: too slow
    for _ in 161..360 {
        engine.ingest(400.0);
    }
    let report = accepted(engine.ingest(900.0));
    let beat = report.beat.expect("pulse should trigger");
    assert_eq!(beat.rr_interval_ms, Some(2000.0));
    assert!(!beat.accepted);

    // And one 250 ms after that: too fast
    for _ in 0..24 {
        engine.ingest(400.0);
    }
    let report = accepted(engine.ingest(900.0));
    let beat = report.beat.expect("pulse should trigger");
    assert_eq!(beat.rr_interval_ms, Some(250.0));
    assert!(!beat.accepted);

    assert_eq!(engine.detector().rr_intervals(), history);
    assert_eq!(engine.heart_rate(), rate);
}

#[test]
fn leads_off_breaks_the_rr_chain() {
    let mut engine = fixed_threshold_engine(700.0);
    for n in 0..200 {
        engine.ingest(pulse(n, 60, 4));
    }
    let rate = engine.heart_rate();
    assert!(rate > 0.0);

    assert_eq!(engine.handle(SourceEvent::LeadsOff), IngestOutcome::ContactLost);
    assert!(!engine.contact());

    let first = accepted(engine.handle(SourceEvent::Sample(900.0)));
    assert!(first.contact_restored);
    let beat = first.beat.expect("first pulse after contact should trigger");
    assert_eq!(beat.rr_interval_ms, None);
    assert_eq!(engine.heart_rate(), rate);
}

#[test]
fn device_range_overrides_the_display_range() {
    let mut engine = SignalEngine::new(Config::default());
    let outcome = engine.handle(SourceEvent::parse("D:400,900", 0.0, 1023.0));
    assert_eq!(
        outcome,
        IngestOutcome::RangeReported {
            min: 400.0,
            max: 900.0
        }
    );
    let after_report = engine.threshold();

    // Display range rescans no longer move the threshold
    for n in 0..1000 {
        engine.ingest(pulse(n, 60, 4));
    }
    assert_eq!(engine.threshold(), after_report);
    assert_ne!(engine.range(), (0.0, 1023.0));
}
