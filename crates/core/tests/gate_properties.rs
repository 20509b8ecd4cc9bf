// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end properties of the gate: scenarios, ratchet behaviour across
//! consecutive runs, determinism and order independence.

use benchgate_core::{
    evaluate, Action, BaselineDocument, BaselineEntry, BenchmarkResult, Direction, GatePolicy,
    MetricMap, MetricPolicy, MetricRule, RunResults, Verdict, Zone,
};

fn result(name: &str, metric: &str, value: f64, run_id: &str) -> BenchmarkResult {
    BenchmarkResult::new(name, [(metric, value)], run_id).unwrap()
}

fn entry(name: &str, metric: &str, value: f64) -> BaselineEntry {
    BaselineEntry::new(name, MetricMap::from([(metric.to_string(), value)]), "seed")
}

fn stored(doc: &BaselineDocument, name: &str, metric: &str) -> f64 {
    doc.get(name).and_then(|e| e.metric(metric)).unwrap()
}

#[test]
fn test_mixed_run_ratchets_only_the_improved_benchmark() {
    let baseline = BaselineDocument::from_entries([
        entry("matmul", "tflops", 100.0),
        entry("softmax", "gbps", 200.0),
    ]);
    let run = RunResults::from_results([
        result("matmul", "tflops", 120.0, "nightly-2"),
        result("softmax", "gbps", 180.0, "nightly-2"),
    ]);

    let outcome = evaluate(&run, &baseline, true, &GatePolicy::default());

    assert_eq!(outcome.verdict, Verdict::Fail);
    let next = outcome.persistable_baseline().unwrap();
    assert_eq!(stored(next, "matmul", "tflops"), 120.0);
    assert_eq!(next.get("softmax"), baseline.get("softmax"));

    let decisions = outcome.decisions().unwrap();
    assert_eq!(decisions[0].action, Action::Ratchet);
    assert_eq!(decisions[1].action, Action::Hold);
}

#[test]
fn test_ratchet_is_monotonic_across_trusted_runs() {
    let mut baseline = BaselineDocument::new();
    let mut history = Vec::new();

    for (i, value) in [100.0, 103.0, 120.0, 90.0, 95.0, 130.0, 126.0].into_iter().enumerate() {
        let run = RunResults::from_results([result("matmul", "tflops", value, &format!("nightly-{}", i))]);
        let outcome = evaluate(&run, &baseline, true, &GatePolicy::default());
        baseline = outcome.persistable_baseline().unwrap().clone();
        history.push(stored(&baseline, "matmul", "tflops"));
    }

    assert_eq!(history, vec![100.0, 100.0, 120.0, 120.0, 120.0, 130.0, 130.0]);
    assert!(history.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_lower_is_better_ratchets_downwards() {
    let policy = GatePolicy {
        metrics: MetricPolicy::default().with_rule(MetricRule::exact(
            "decode",
            "latency_ms",
            Direction::LowerIsBetter,
        )),
        ..GatePolicy::default()
    };
    let mut baseline = BaselineDocument::from_entries([entry("decode", "latency_ms", 10.0)]);
    let mut history = Vec::new();

    for value in [8.0, 9.5, 7.9, 12.0] {
        let run = RunResults::from_results([result("decode", "latency_ms", value, "nightly")]);
        let outcome = evaluate(&run, &baseline, true, &policy);
        baseline = outcome.persistable_baseline().unwrap().clone();
        history.push(stored(&baseline, "decode", "latency_ms"));
    }

    assert_eq!(history, vec![8.0, 8.0, 8.0, 8.0]);
}

#[test]
fn test_regressed_entry_is_identical_across_repeated_runs() {
    let original = BaselineDocument::from_entries([entry("softmax", "gbps", 200.0)]);
    let mut baseline = original.clone();

    for i in 0..4 {
        let run = RunResults::from_results([result("softmax", "gbps", 170.0 + i as f64, "nightly")]);
        let outcome = evaluate(&run, &baseline, true, &GatePolicy::default());
        assert_eq!(outcome.verdict, Verdict::Fail);
        baseline = outcome.persistable_baseline().unwrap().clone();
        assert_eq!(baseline.get("softmax"), original.get("softmax"));
    }

    let before = serde_json::to_vec(original.get("softmax").unwrap()).unwrap();
    let after = serde_json::to_vec(baseline.get("softmax").unwrap()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_evaluate_is_deterministic_and_order_independent() {
    let baseline = BaselineDocument::from_entries([
        entry("a", "tflops", 10.0),
        entry("b", "tflops", 10.0),
        entry("c", "tflops", 10.0),
        entry("gone", "tflops", 1.0),
    ]);
    let results = vec![
        result("a", "tflops", 12.0, "r"),
        result("b", "tflops", 8.0, "r"),
        result("c", "tflops", 10.2, "r"),
        result("d", "tflops", 3.0, "r"),
    ];

    let forward = evaluate(&RunResults::from_results(results.clone()), &baseline, true, &GatePolicy::default());
    let again = evaluate(&RunResults::from_results(results.clone()), &baseline, true, &GatePolicy::default());
    assert_eq!(forward, again);

    let mut reversed = results.clone();
    reversed.reverse();
    let mut rotated = results;
    rotated.rotate_left(2);
    for shuffled in [reversed, rotated] {
        let outcome = evaluate(&RunResults::from_results(shuffled), &baseline, true, &GatePolicy::default());
        assert_eq!(outcome, forward);
    }

    let zones: Vec<_> = forward.classifications.iter().map(|c| (c.name.as_str(), c.zone)).collect();
    assert_eq!(
        zones,
        vec![
            ("a", Zone::Improvement),
            ("b", Zone::Regression),
            ("c", Zone::Neutral),
            ("d", Zone::New),
        ]
    );
    assert_eq!(forward.not_run, vec!["gone".to_string()]);
}

#[test]
fn test_untrusted_improvement_passes_without_persisting() {
    let baseline = BaselineDocument::from_entries([entry("matmul", "tflops", 100.0)]);
    let run = RunResults::from_results([result("matmul", "tflops", 125.0, "pr-17")]);

    let outcome = evaluate(&run, &baseline, false, &GatePolicy::default());

    assert_eq!(outcome.verdict, Verdict::Pass);
    assert_eq!(outcome.classifications[0].zone, Zone::Improvement);
    assert!(outcome.persistable_baseline().is_none());
    let proposed = &outcome.update.as_ref().unwrap().baseline;
    assert_ne!(proposed, &baseline);
    assert_eq!(stored(proposed, "matmul", "tflops"), 125.0);
}

#[test]
fn test_untrusted_new_benchmark_stays_unseeded() {
    let run = RunResults::from_results([result("fresh", "tflops", 5.0, "pr-3")]);
    let outcome = evaluate(&run, &BaselineDocument::new(), false, &GatePolicy::default());
    assert!(outcome.persistable_baseline().is_none());
    assert_eq!(outcome.decisions().unwrap()[0].action, Action::Hold);

    let nightly = evaluate(&run, &BaselineDocument::new(), true, &GatePolicy::default());
    assert!(nightly.persistable_baseline().unwrap().contains("fresh"));
    assert_eq!(nightly.decisions().unwrap()[0].action, Action::Seed);
}
