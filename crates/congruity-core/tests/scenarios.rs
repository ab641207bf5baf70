//! End-to-end scenarios: observation streams in, verdicts out.

use std::sync::Arc;
use std::thread;

use congruity_core::{
    Analysis, Analyzer, AnalyzerConfig, AuthenticityResult, AuthenticityStatus, SessionSummary,
    SummaryPolicy,
};

fn analyzer() -> Analyzer {
    Analyzer::new(AnalyzerConfig::default()).unwrap()
}

fn scored(analysis: Analysis) -> AuthenticityResult {
    match analysis {
        Analysis::Scored(result) => result,
        other => panic!("expected a scored tick, got {other:?}"),
    }
}

/// Face and voice both steadily happy.
#[test]
fn test_congruent_steady_streams_are_authentic() {
    let a = analyzer();
    let mut ticks = Vec::new();
    for i in 0..30 {
        let t = i as f64;
        let _ = a.record_facial_observation("happy", Some(0.9), t);
        let _ = a.record_vocal_observation("happy", Some(0.9), t);
        ticks.push(a.analyze());
    }

    let last = scored(a.analyze());
    assert_eq!(last.status, AuthenticityStatus::Authentic);
    assert!(last.authenticity_score > 0.8, "score {}", last.authenticity_score);
    assert!(last.risk_score < 0.2);

    let summary = SessionSummary::from_analyses(&ticks, 0.6, SummaryPolicy::MeanThreshold).unwrap();
    assert_eq!(summary.status, AuthenticityStatus::Authentic);
    assert_eq!(summary.scored_ticks, 30);
    assert_eq!(summary.incomplete_ticks, 0);
}

/// Face steadily happy while the voice flips between angry and sad.
#[test]
fn test_incongruent_alternating_voice_is_spoof() {
    let a = analyzer();
    for i in 0..30 {
        let t = i as f64;
        let _ = a.record_facial_observation("happy", Some(0.9), t);
        let vocal = if i % 2 == 0 { "angry" } else { "sad" };
        let _ = a.record_vocal_observation(vocal, Some(0.9), t);
    }

    let last = scored(a.analyze());
    assert_eq!(last.status, AuthenticityStatus::PotentialSpoof);
    assert_eq!(last.congruence_score, 0.1);
    assert!(last.breakdown.voice_stability.score < last.breakdown.face_stability.score);
}

/// Same as above, with speech sampled every five seconds against 10 fps video.
#[test]
fn test_incongruent_voice_at_realistic_rates_is_spoof() {
    let a = analyzer();
    for frame in 0..1000 {
        let t = frame as f64 * 0.1;
        let _ = a.record_facial_observation("happy", Some(0.9), t);
        if frame % 50 == 0 {
            let vocal = if (frame / 50) % 2 == 0 { "angry" } else { "sad" };
            let _ = a.record_vocal_observation(vocal, Some(0.9), t);
        }
    }
    assert_eq!(scored(a.analyze()).status, AuthenticityStatus::PotentialSpoof);
}

/// Voice never detected while the face looks normal.
#[test]
fn test_missing_voice_drives_completeness_to_zero() {
    let a = analyzer();
    let mut completeness = Vec::new();

    // a short stretch of normal speech, then silence for 60 ticks
    for i in 0..70 {
        let t = i as f64;
        let _ = a.record_facial_observation("happy", Some(0.9), t);
        if i < 10 {
            let _ = a.record_vocal_observation("happy", Some(0.9), t);
        } else {
            let _ = a.record_vocal_observation("", None, t);
        }
        completeness.push(scored(a.analyze()).completeness_score);
    }

    for pair in completeness[10..].windows(2) {
        assert!(pair[1] <= pair[0], "completeness rose: {pair:?}");
    }

    let last = scored(a.analyze());
    assert_eq!(last.completeness_score, 0.0);
    assert!(last.authenticity_score < a.config().authenticity_threshold);
    assert_eq!(last.status, AuthenticityStatus::PotentialSpoof);
    // congruence itself is neutral, not a mismatch
    assert_eq!(last.congruence_score, 0.5);
    assert!(last.breakdown.incomplete);
}

/// Five distinct facial emotions inside one second vs. across thirty.
#[test]
fn test_rapid_transitions_less_stable_than_slow() {
    let labels = ["happy", "sad", "angry", "fear", "surprise"];

    let run = |span: f64| {
        let a = analyzer();
        for (i, label) in labels.iter().enumerate() {
            let t = i as f64 * span / 4.0;
            let _ = a.record_facial_observation(label, Some(0.9), t);
            let _ = a.record_vocal_observation("neutral", Some(0.9), t);
        }
        scored(a.analyze()).stability_score
    };

    let fast = run(1.0);
    let slow = run(30.0);
    assert!(fast < 0.2, "fast {fast}");
    assert!(slow - fast > 0.5, "fast {fast} slow {slow}");
}

/// Two producer threads and a consumer sharing one analyzer.
#[test]
fn test_independent_producers() {
    let a = Arc::new(analyzer());

    let face = {
        let a = Arc::clone(&a);
        thread::spawn(move || {
            for i in 0..300 {
                let outcome = a.record_facial_observation("happy", Some(0.9), i as f64 / 30.0);
                assert!(outcome.is_accepted());
            }
        })
    };
    let voice = {
        let a = Arc::clone(&a);
        thread::spawn(move || {
            for i in 0..3 {
                let outcome = a.record_vocal_observation("happy", Some(0.8), i as f64 * 5.0);
                assert!(outcome.is_accepted());
            }
        })
    };
    let consumer = {
        let a = Arc::clone(&a);
        thread::spawn(move || {
            for _ in 0..100 {
                if let Analysis::Scored(result) = a.analyze() {
                    assert!((0.0..=1.0).contains(&result.authenticity_score));
                }
            }
        })
    };

    face.join().unwrap();
    voice.join().unwrap();
    consumer.join().unwrap();

    let last = scored(a.analyze());
    assert_eq!(last.status, AuthenticityStatus::Authentic);
}

#[test]
fn test_results_serialize_with_outcome_tag() {
    let a = analyzer();
    let json = serde_json::to_value(a.analyze()).unwrap();
    assert_eq!(json["outcome"], "insufficient_data");

    let _ = a.record_facial_observation("happy", Some(0.9), 0.0);
    let _ = a.record_vocal_observation("happy", Some(0.9), 0.0);
    let json = serde_json::to_value(a.analyze()).unwrap();
    assert_eq!(json["outcome"], "scored");
    assert_eq!(json["status"], "AUTHENTIC");
}
