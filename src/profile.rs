//! Per-account behavioral profiles and payroll statistics (spec §3, §4.2).

use std::collections::{HashMap, HashSet};

use crate::transaction::Transaction;

#[derive(Debug, Clone, Copy, Default)]
pub struct AccountProfile {
    pub sent_count: usize,
    pub received_count: usize,
    pub total_txns: usize,
    pub counterparty_count: usize,
    pub time_span_hours: f64,
    pub avg_amount: f64,
    pub amount_std: f64,
    pub velocity: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct PayrollStats {
    pub tx_count: usize,
    pub mean_amount: f64,
    pub amount_cv: f64,
    pub gap_cv: f64,
}

pub struct ProfileBuilder;

impl ProfileBuilder {
    pub fn build(transactions: &[Transaction]) -> HashMap<String, AccountProfile> {
        let mut sent_amounts: HashMap<&str, Vec<f64>> = HashMap::new();
        let mut received_amounts: HashMap<&str, Vec<f64>> = HashMap::new();
        let mut sent_peers: HashMap<&str, HashSet<&str>> = HashMap::new();
        let mut received_peers: HashMap<&str, HashSet<&str>> = HashMap::new();
        let mut touch_times: HashMap<&str, (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)> =
            HashMap::new();

        let mut accounts: HashSet<&str> = HashSet::new();

        for tx in transactions {
            accounts.insert(tx.sender_id.as_str());
            accounts.insert(tx.receiver_id.as_str());

            sent_amounts.entry(&tx.sender_id).or_default().push(tx.amount_f64());
            received_amounts.entry(&tx.receiver_id).or_default().push(tx.amount_f64());
            sent_peers.entry(&tx.sender_id).or_default().insert(&tx.receiver_id);
            received_peers.entry(&tx.receiver_id).or_default().insert(&tx.sender_id);

            for account in [tx.sender_id.as_str(), tx.receiver_id.as_str()] {
                touch_times
                    .entry(account)
                    .and_modify(|(min, max)| {
                        if tx.timestamp < *min {
                            *min = tx.timestamp;
                        }
                        if tx.timestamp > *max {
                            *max = tx.timestamp;
                        }
                    })
                    .or_insert((tx.timestamp, tx.timestamp));
            }
        }

        let mut profiles = HashMap::new();
        for account in accounts {
            let sent = sent_amounts.get(account).map(Vec::as_slice).unwrap_or(&[]);
            let received = received_amounts.get(account).map(Vec::as_slice).unwrap_or(&[]);
            let sent_count = sent.len();
            let received_count = received.len();
            let total_txns = sent_count + received_count;

            let counterparty_count = sent_peers.get(account).map(HashSet::len).unwrap_or(0)
                + received_peers.get(account).map(HashSet::len).unwrap_or(0);

            let time_span_hours = touch_times
                .get(account)
                .filter(|_| total_txns >= 2)
                .map(|(min, max)| (*max - *min).num_seconds() as f64 / 3600.0)
                .unwrap_or(0.0);

            let sent_mean = mean(sent);
            let received_mean = mean(received);
            let avg_amount = if total_txns == 0 {
                0.0
            } else {
                (sent_mean * sent_count as f64 + received_mean * received_count as f64) / total_txns as f64
            };

            let amount_std = std_dev(sent, sent_mean);

            let velocity = total_txns as f64 / time_span_hours.max(1.0) * 24.0;

            profiles.insert(
                account.to_string(),
                AccountProfile {
                    sent_count,
                    received_count,
                    total_txns,
                    counterparty_count,
                    time_span_hours,
                    avg_amount,
                    amount_std,
                    velocity,
                },
            );
        }

        profiles
    }

    /// Payroll statistics, one per account with >=1 sent transaction.
    pub fn build_payroll_stats(transactions: &[Transaction]) -> HashMap<String, PayrollStats> {
        let mut by_sender: HashMap<&str, Vec<&Transaction>> = HashMap::new();
        for tx in transactions {
            by_sender.entry(&tx.sender_id).or_default().push(tx);
        }

        let mut stats = HashMap::new();
        for (sender, mut sent) in by_sender {
            sent.sort_by_key(|tx| tx.timestamp);
            let amounts: Vec<f64> = sent.iter().map(|tx| tx.amount_f64()).collect();
            let tx_count = amounts.len();
            let mean_amount = mean(&amounts);
            let std_amount = std_dev(&amounts, mean_amount);
            let amount_cv = if mean_amount > 0.0 { std_amount / mean_amount } else { f64::INFINITY };

            let gap_cv = if tx_count < 3 {
                f64::INFINITY
            } else {
                let gaps: Vec<f64> = sent
                    .windows(2)
                    .map(|w| (w[1].timestamp - w[0].timestamp).num_seconds() as f64)
                    .collect();
                let gap_mean = mean(&gaps);
                if gap_mean > 0.0 {
                    std_dev(&gaps, gap_mean) / gap_mean
                } else {
                    f64::INFINITY
                }
            };

            stats.insert(
                sender.to_string(),
                PayrollStats {
                    tx_count,
                    mean_amount,
                    amount_cv,
                    gap_cv,
                },
            );
        }

        stats
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation; 0 when fewer than 2 samples (spec §3).
fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
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
    fn counterparty_count_double_counts_dual_role_peer() {
        let txs = vec![
            tx("t1", "A", "B", 0, dec!(10)),
            tx("t2", "B", "A", 1, dec!(10)),
        ];
        let profiles = ProfileBuilder::build(&txs);
        // B is both a distinct receiver (A->B) and a distinct sender (B->A) for A.
        assert_eq!(profiles["A"].counterparty_count, 2);
    }

    #[test]
    fn time_span_is_zero_with_fewer_than_two_transactions() {
        let txs = vec![tx("t1", "A", "B", 0, dec!(10))];
        let profiles = ProfileBuilder::build(&txs);
        assert_eq!(profiles["B"].time_span_hours, 0.0);
    }

    #[test]
    fn payroll_like_sequence_has_low_coefficients_of_variation() {
        let txs: Vec<Transaction> = (0..10)
            .map(|i| tx(&format!("t{i}"), "P", "X", i * 24 * 7, dec!(2000)))
            .collect();
        let stats = ProfileBuilder::build_payroll_stats(&txs);
        let p = stats["P"];
        assert_eq!(p.tx_count, 10);
        assert!(p.amount_cv < 1e-9);
        assert!(p.gap_cv < 1e-6);
    }
}
