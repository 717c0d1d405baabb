//! Batch financial-forensics engine.
//!
//! Ingests a transaction ledger and produces a structured risk report: a set
//! of flagged accounts with numeric suspicion scores, and a set of fraud
//! rings (groups of accounts acting in concert). The report is deterministic
//! for a given input and detection configuration.
//!
//! The single entry point is [`analyze`]. Everything upstream (CSV parsing,
//! `Transaction` validation) and downstream (JSON serialization) of it is a
//! thin collaborator; the core pipeline itself is a pure, synchronous
//! function from a transaction slice to a [`Report`].

pub mod centrality;
pub mod config;
pub mod consolidator;
pub mod graph;
pub mod ingest;
pub mod patterns;
pub mod profile;
pub mod report;
pub mod scorer;
pub mod transaction;

pub use config::DetectionConfig;
pub use report::Report;
pub use transaction::Transaction;

use std::time::Instant;

use centrality::CentralityCalculator;
use consolidator::RingConsolidator;
use graph::DirectedTransactionGraph;
use patterns::PatternDetector;
use profile::ProfileBuilder;
use report::ReportAssembler;
use scorer::Scorer;

/// Runs the full detection-and-scoring pipeline over a batch of
/// transactions and returns the finished [`Report`].
///
/// This function is total: it never panics or returns an error for a
/// well-typed `transactions` slice, including the empty slice. All
/// validation (malformed rows, non-numeric amounts, bad timestamps) is the
/// responsibility of the [`ingest`] boundary, which runs before this point.
pub fn analyze(transactions: &[Transaction], config: &DetectionConfig) -> Report {
    let start = Instant::now();
    let span = tracing::info_span!("analyze", transactions = transactions.len());
    let _guard = span.enter();

    let graph = DirectedTransactionGraph::build(transactions);
    tracing::debug!(accounts = graph.node_count(), "graph built");

    let detection = PatternDetector::detect(&graph, config);
    tracing::info!(candidates = detection.candidates.len(), "pattern detection complete");

    let profiles = ProfileBuilder::build(transactions);
    let payroll_stats = ProfileBuilder::build_payroll_stats(transactions);
    let centrality = CentralityCalculator::compute(&graph, config);

    let scored = Scorer::score(&detection.patterns, &profiles, &payroll_stats, &centrality, config);
    tracing::info!(
        flagged = scored.iter().filter(|a| a.suspicion_score >= config.suspicion_threshold).count(),
        "scoring complete"
    );

    let (rings, account_to_ring) = RingConsolidator::consolidate(&detection.candidates, &scored);
    tracing::info!(rings = rings.len(), "ring consolidation complete");

    let processing_time_seconds = start.elapsed().as_secs_f64();
    ReportAssembler::assemble(
        graph.node_count(),
        &scored,
        &rings,
        &account_to_ring,
        config.suspicion_threshold,
        processing_time_seconds,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn tx(id: &str, from: &str, to: &str, hour: i64, amount: rust_decimal::Decimal) -> Transaction {
        Transaction::new(id, from, to, amount, Utc::now() + Duration::hours(hour))
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let report = analyze(&[], &DetectionConfig::default());
        assert!(report.suspicious_accounts.is_empty());
        assert!(report.fraud_rings.is_empty());
        assert_eq!(report.summary.total_accounts_analyzed, 0);
    }

    #[test]
    fn scenario_s1_pure_triangle_cycle() {
        let txs = vec![
            tx("t1", "A", "B", 0, dec!(100)),
            tx("t2", "B", "C", 1, dec!(100)),
            tx("t3", "C", "A", 2, dec!(100)),
        ];
        let report = analyze(&txs, &DetectionConfig::default());

        assert_eq!(report.fraud_rings.len(), 1);
        assert_eq!(report.fraud_rings[0].ring_id, "RING_001");
        assert_eq!(report.fraud_rings[0].pattern_type, "cycle");
        assert_eq!(
            report.fraud_rings[0].member_accounts,
            vec!["A".to_string(), "B".to_string(), "C".to_string()]
        );
        assert_eq!(report.suspicious_accounts.len(), 3);
        for account in &report.suspicious_accounts {
            assert_eq!(account.suspicion_score, 100.0);
            assert!(account.detected_patterns.contains(&"cycle_length_3".to_string()));
        }
    }

    #[test]
    fn scenario_s2_fan_in_burst() {
        let mut txs = Vec::new();
        for i in 0..12 {
            txs.push(tx(&format!("t{i}"), &format!("S{i}"), "R", i, dec!(50)));
        }
        let report = analyze(&txs, &DetectionConfig::default());

        assert_eq!(report.fraud_rings.len(), 1);
        assert_eq!(report.fraud_rings[0].pattern_type, "fan_in");
        assert_eq!(report.fraud_rings[0].member_accounts.len(), 13);
        assert!(report
            .suspicious_accounts
            .iter()
            .find(|a| a.account_id == "R")
            .unwrap()
            .detected_patterns
            .contains(&"fan_in".to_string()));
    }

    #[test]
    fn scenario_s3_shell_chain() {
        let txs = vec![
            tx("t1", "SRC", "SH1", 0, dec!(100)),
            tx("t2", "SH1", "SH2", 1, dec!(95)),
            tx("t3", "SH2", "DEST", 2, dec!(90)),
        ];
        let report = analyze(&txs, &DetectionConfig::default());

        assert_eq!(report.fraud_rings.len(), 1);
        assert_eq!(report.fraud_rings[0].pattern_type, "layered_shell");
        assert_eq!(report.fraud_rings[0].member_accounts.len(), 4);
    }

    #[test]
    fn scenario_s4_merchant_suppression_excludes_receiver() {
        let mut txs = Vec::new();
        for i in 0..20 {
            txs.push(tx(&format!("S{i}"), &format!("S{i}"), "M", i * 3, dec!(5000)));
        }
        let report = analyze(&txs, &DetectionConfig::default());

        assert!(
            !report.suspicious_accounts.iter().any(|a| a.account_id == "M"),
            "merchant-like receiver M must be suppressed below the flag threshold"
        );
        assert!(report.suspicious_accounts.iter().any(|a| a.account_id.starts_with('S')));
    }

    #[test]
    fn scenario_s5_payroll_suppression_excludes_sender() {
        let mut txs = Vec::new();
        for i in 0..10 {
            txs.push(tx(&format!("P{i}"), "P", &format!("R{i}"), i * 6, dec!(2000)));
        }
        let report = analyze(&txs, &DetectionConfig::default());

        assert!(
            !report.suspicious_accounts.iter().any(|a| a.account_id == "P"),
            "payroll-like sender P must be suppressed below the flag threshold"
        );
        assert!(report.suspicious_accounts.iter().any(|a| a.account_id.starts_with('R')));
    }

    #[test]
    fn invariant_suspicious_accounts_sorted_descending_then_by_id() {
        let mut txs = Vec::new();
        for i in 0..12 {
            txs.push(tx(&format!("t{i}"), &format!("S{i}"), "R", i, dec!(50)));
        }
        txs.push(tx("t100", "A", "B", 100, dec!(1)));
        let report = analyze(&txs, &DetectionConfig::default());

        for window in report.suspicious_accounts.windows(2) {
            let (a, b) = (&window[0], &window[1]);
            assert!(
                a.suspicion_score > b.suspicion_score
                    || (a.suspicion_score == b.suspicion_score && a.account_id < b.account_id)
            );
        }
    }

    #[test]
    fn invariant_ring_ids_are_dense_and_ascending() {
        let txs = vec![
            tx("t1", "A", "B", 0, dec!(100)),
            tx("t2", "B", "C", 1, dec!(100)),
            tx("t3", "C", "A", 2, dec!(100)),
            tx("t4", "X", "Y", 0, dec!(100)),
            tx("t5", "Y", "Z", 1, dec!(100)),
            tx("t6", "Z", "X", 2, dec!(100)),
        ];
        let report = analyze(&txs, &DetectionConfig::default());
        let ids: Vec<&str> = report.fraud_rings.iter().map(|r| r.ring_id.as_str()).collect();
        assert_eq!(ids, vec!["RING_001", "RING_002"]);
    }

    #[test]
    fn determinism_across_repeated_runs() {
        let txs = vec![
            tx("t1", "A", "B", 0, dec!(100)),
            tx("t2", "B", "C", 1, dec!(100)),
            tx("t3", "C", "A", 2, dec!(100)),
        ];
        let config = DetectionConfig::default();
        let first = analyze(&txs, &config).to_json().unwrap();
        let second = analyze(&txs, &config).to_json().unwrap();
        assert_eq!(first, second);
    }
}
