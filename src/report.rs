//! Final report assembly and JSON serialization.
//!
//! Struct field declaration order is the JSON key order `serde_json`
//! produces, which is how this module guarantees spec.md §6's fixed
//! top-level key order (`suspicious_accounts`, `fraud_rings`, `summary`)
//! without a custom `Serialize` impl.

use std::collections::HashMap;

use serde::Serialize;

use crate::consolidator::Ring;
use crate::scorer::ScoredAccount;

#[derive(Debug, Clone, Serialize)]
pub struct SuspiciousAccount {
    pub account_id: String,
    pub suspicion_score: f64,
    pub detected_patterns: Vec<String>,
    pub ring_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FraudRing {
    pub ring_id: String,
    pub member_accounts: Vec<String>,
    pub pattern_type: String,
    pub risk_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_accounts_analyzed: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub processing_time_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    pub fraud_rings: Vec<FraudRing>,
    pub summary: Summary,
}

impl Report {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub struct ReportAssembler;

impl ReportAssembler {
    pub fn assemble(
        total_accounts: usize,
        scored: &[ScoredAccount],
        rings: &[Ring],
        account_to_ring: &HashMap<String, String>,
        suspicion_threshold: f64,
        processing_time_seconds: f64,
    ) -> Report {
        let mut suspicious_accounts: Vec<SuspiciousAccount> = scored
            .iter()
            .filter(|a| a.suspicion_score >= suspicion_threshold)
            .map(|a| {
                let mut detected_patterns: Vec<String> =
                    a.patterns.iter().map(|t| t.as_str().to_string()).collect();
                detected_patterns.sort();
                SuspiciousAccount {
                    account_id: a.account_id.clone(),
                    suspicion_score: a.suspicion_score,
                    detected_patterns,
                    ring_id: account_to_ring.get(&a.account_id).cloned().unwrap_or_else(|| "NONE".to_string()),
                }
            })
            .collect();

        suspicious_accounts.sort_by(|a, b| {
            b.suspicion_score
                .partial_cmp(&a.suspicion_score)
                .unwrap()
                .then_with(|| a.account_id.cmp(&b.account_id))
        });

        let fraud_rings: Vec<FraudRing> = rings
            .iter()
            .map(|r| FraudRing {
                ring_id: r.ring_id.clone(),
                member_accounts: r.members.clone(),
                pattern_type: r.pattern_type.clone(),
                risk_score: r.risk_score,
            })
            .collect();

        let summary = Summary {
            total_accounts_analyzed: total_accounts,
            suspicious_accounts_flagged: suspicious_accounts.len(),
            fraud_rings_detected: fraud_rings.len(),
            processing_time_seconds: round1(processing_time_seconds),
        };

        Report {
            suspicious_accounts,
            fraud_rings,
            summary,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
