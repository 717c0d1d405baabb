//! Suspicion scoring: base pattern weights, behavioral bonuses, merchant /
//! payroll false-positive suppression, and batch-wise normalization.

use std::collections::HashMap;

use crate::centrality::Centrality;
use crate::config::DetectionConfig;
use crate::patterns::{AccountPatterns, Tag, TagList};
use crate::profile::{AccountProfile, PayrollStats};

/// How (if at all) an account's raw score was suppressed. Merchant-like and
/// payroll-like reductions are independent and additive (spec.md §4.3 step
/// 3, `original_source/backend/app/scoring.py`) — an account can match both
/// and take both reductions.
#[derive(Debug, Clone, Default)]
pub struct Suppression {
    pub reduction: f64,
    pub justification: Option<String>,
}

/// Final, scored view of one account. Produced fresh by the scorer — the
/// detector's `AccountPatterns` output is never mutated in place; this
/// struct carries its own extended tag list (spec §9, "implicit mutation").
#[derive(Debug, Clone)]
pub struct ScoredAccount {
    pub account_id: String,
    pub suspicion_score: f64,
    pub patterns: TagList,
    pub suppression: Suppression,
}

pub struct Scorer;

impl Scorer {
    /// Returns every account that was tagged by at least one detector,
    /// scored and normalized against the batch maximum.
    pub fn score(
        base_patterns: &AccountPatterns,
        profiles: &HashMap<String, AccountProfile>,
        payroll_stats: &HashMap<String, PayrollStats>,
        centrality: &HashMap<String, Centrality>,
        config: &DetectionConfig,
    ) -> Vec<ScoredAccount> {
        let merchant_thresholds = MerchantThresholds::adaptive(profiles);

        let mut raw: HashMap<String, (f64, TagList, Suppression)> = HashMap::new();

        for (account_id, base_tags) in base_patterns {
            let mut tags = base_tags.clone();
            let mut score: f64 = base_tags
                .iter()
                .map(|t| config.pattern_weights.score_for(*t))
                .sum();

            let profile = profiles.get(account_id).copied().unwrap_or_default();
            let centrality = centrality.get(account_id).copied().unwrap_or_default();

            if profile.velocity > config.velocity_cutoff {
                score += 10.0;
                tags.push(Tag::HighVelocity);
            }
            if profile.avg_amount > 0.0 && profile.avg_amount < config.small_amount_cutoff {
                score += 5.0;
                tags.push(Tag::SmallAmounts);
            }
            if centrality.betweenness > config.betweenness_tiers[1] {
                score += 15.0;
                tags.push(Tag::HighBetweenness);
            } else if centrality.betweenness > config.betweenness_tiers[0] {
                score += 8.0;
                tags.push(Tag::HighBetweenness);
            }
            if centrality.pagerank > config.pagerank_cutoff {
                score += 5.0;
                tags.push(Tag::HighPagerank);
            }

            let suppression = classify_suppression(
                account_id,
                &tags,
                &profile,
                payroll_stats.get(account_id),
                &merchant_thresholds,
                config,
            );
            score = (score - suppression.reduction).max(0.0);

            raw.insert(account_id.clone(), (score, tags, suppression));
        }

        let max_raw = raw
            .values()
            .map(|(score, _, _)| *score)
            .fold(0.0_f64, f64::max);
        let normalizer = if max_raw <= 0.0 { 1.0 } else { max_raw };

        let mut scored: Vec<ScoredAccount> = raw
            .into_iter()
            .map(|(account_id, (score, patterns, suppression))| {
                let normalized = (100.0 * score / normalizer).min(100.0);
                ScoredAccount {
                    account_id,
                    suspicion_score: round1(normalized),
                    patterns,
                    suppression,
                }
            })
            .collect();

        scored.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        scored
    }
}

struct MerchantThresholds {
    counterparty_count: f64,
    time_span_hours: f64,
}

impl MerchantThresholds {
    /// `T_cp = max(3, 80th percentile counterparty_count)`,
    /// `T_span = max(2, median time_span_hours)`; falls back to the fixed
    /// 15/168 thresholds when the batch has fewer than 2 accounts.
    fn adaptive(profiles: &HashMap<String, AccountProfile>) -> Self {
        if profiles.len() < 2 {
            return Self {
                counterparty_count: 15.0,
                time_span_hours: 168.0,
            };
        }

        let mut counterparties: Vec<f64> = profiles.values().map(|p| p.counterparty_count as f64).collect();
        let mut spans: Vec<f64> = profiles.values().map(|p| p.time_span_hours).collect();
        counterparties.sort_by(|a, b| a.partial_cmp(b).unwrap());
        spans.sort_by(|a, b| a.partial_cmp(b).unwrap());

        Self {
            counterparty_count: percentile(&counterparties, 0.80).max(3.0),
            time_span_hours: median(&spans).max(2.0),
        }
    }
}

/// Matches `original_source/backend/app/scoring.py`'s `_is_merchant_like`
/// index arithmetic: `all_cp[int(len(all_cp) * p)]`, i.e. floor indexing,
/// not round-to-nearest-rank.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p * sorted.len() as f64).floor() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

/// Matches `original_source/backend/app/scoring.py`'s `span_median =
/// all_span[len(all_span) // 2]`: always the single upper-middle element,
/// never averaged.
fn median(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    sorted[sorted.len() / 2]
}

/// Merchant-like and payroll-like are independent predicates; both
/// reductions apply when both fire (spec.md §4.3 step 3).
fn classify_suppression(
    account_id: &str,
    tags: &TagList,
    profile: &AccountProfile,
    payroll: Option<&PayrollStats>,
    thresholds: &MerchantThresholds,
    config: &DetectionConfig,
) -> Suppression {
    let mut suppression = Suppression::default();

    let merchant_like = !tags.has_cycle_tag()
        && profile.counterparty_count as f64 >= thresholds.counterparty_count
        && profile.time_span_hours >= thresholds.time_span_hours
        && profile.received_count as f64 > 2.0 * profile.sent_count as f64;

    if merchant_like {
        suppression.reduction += config.merchant_reduction;
        suppression.justification = Some(format!(
            "{account_id} looks merchant-like: {} counterparties over {:.1}h, inbound-heavy ({} received vs {} sent)",
            profile.counterparty_count, profile.time_span_hours, profile.received_count, profile.sent_count
        ));
    }

    if let Some(stats) = payroll {
        let payroll_like =
            stats.tx_count >= 3 && stats.mean_amount > 0.0 && stats.amount_cv <= 0.15 && stats.gap_cv < 0.30;
        if payroll_like {
            suppression.reduction += config.payroll_reduction;
            let payroll_justification = format!(
                "{account_id} looks payroll-like: {} sends, amount_cv={:.3}, gap_cv={:.3}",
                stats.tx_count, stats.amount_cv, stats.gap_cv
            );
            suppression.justification = Some(match suppression.justification.take() {
                Some(existing) => format!("{existing} | Also matches payroll pattern: {payroll_justification}"),
                None => payroll_justification,
            });
        }
    }

    suppression
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
