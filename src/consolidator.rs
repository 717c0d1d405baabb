//! Union-find ring consolidation: merges overlapping ring candidates into
//! canonical, non-overlapping rings with stable `RING_NNN` ids.

use std::collections::{BTreeSet, HashMap};

use crate::patterns::RingCandidate;
use crate::scorer::ScoredAccount;

#[derive(Debug, Clone)]
pub struct Ring {
    pub ring_id: String,
    pub members: Vec<String>,
    pub pattern_type: String,
    pub risk_score: f64,
}

/// Minimal disjoint-set over candidate indices, path-compressed with
/// union-by-rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u32>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

pub struct RingConsolidator;

impl RingConsolidator {
    /// Builds canonical rings from overlapping candidates, and the
    /// account -> ring_id mapping (first ring, in sorted order, containing
    /// the account).
    pub fn consolidate(
        candidates: &[RingCandidate],
        scored: &[ScoredAccount],
    ) -> (Vec<Ring>, HashMap<String, String>) {
        if candidates.is_empty() {
            return (Vec::new(), HashMap::new());
        }

        let mut uf = UnionFind::new(candidates.len());
        let mut last_seen_by_account: HashMap<&str, usize> = HashMap::new();
        for (idx, candidate) in candidates.iter().enumerate() {
            for member in &candidate.members {
                if let Some(&prev) = last_seen_by_account.get(member.as_str()) {
                    uf.union(prev, idx);
                }
                last_seen_by_account.insert(member.as_str(), idx);
            }
        }

        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        for idx in 0..candidates.len() {
            let root = uf.find(idx);
            components.entry(root).or_default().push(idx);
        }

        let scores: HashMap<&str, f64> = scored.iter().map(|a| (a.account_id.as_str(), a.suspicion_score)).collect();

        let mut rings: Vec<Ring> = components
            .into_values()
            .map(|indices| {
                let mut members: BTreeSet<String> = BTreeSet::new();
                let mut pattern_types: Vec<&str> = Vec::new();
                for &idx in &indices {
                    let candidate = &candidates[idx];
                    members.extend(candidate.members.iter().cloned());
                    if !pattern_types.contains(&candidate.pattern_type) {
                        pattern_types.push(candidate.pattern_type);
                    }
                }

                let risk_score = ring_risk_score(&members, &scores);
                let members: Vec<String> = members.into_iter().collect();

                Ring {
                    ring_id: String::new(), // assigned after sort
                    members,
                    pattern_type: pattern_types.join("+"),
                    risk_score,
                }
            })
            .collect();

        rings.sort_by(|a, b| {
            a.pattern_type
                .cmp(&b.pattern_type)
                .then_with(|| a.members.cmp(&b.members))
        });

        for (idx, ring) in rings.iter_mut().enumerate() {
            ring.ring_id = format!("RING_{:03}", idx + 1);
        }

        let mut account_to_ring: HashMap<String, String> = HashMap::new();
        for ring in &rings {
            for member in &ring.members {
                account_to_ring.entry(member.clone()).or_insert_with(|| ring.ring_id.clone());
            }
        }

        (rings, account_to_ring)
    }
}

/// `round(min(100, 1.1 * mean(suspicion_score of members present)))`;
/// absent members contribute 0 but are still counted in the denominator.
fn ring_risk_score(members: &BTreeSet<String>, scores: &HashMap<&str, f64>) -> f64 {
    if members.is_empty() {
        return 0.0;
    }
    let sum: f64 = members.iter().map(|m| scores.get(m.as_str()).copied().unwrap_or(0.0)).sum();
    let mean = sum / members.len() as f64;
    ((1.1 * mean).min(100.0) * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn candidate(pattern_type: &'static str, members: &[&str]) -> RingCandidate {
        RingCandidate {
            members: members.iter().map(|s| s.to_string()).collect(),
            pattern_type,
        }
    }

    fn scored(account_id: &str, score: f64) -> ScoredAccount {
        ScoredAccount {
            account_id: account_id.to_string(),
            suspicion_score: score,
            patterns: Default::default(),
            suppression: crate::scorer::Suppression::default(),
        }
    }

    #[test]
    fn disjoint_candidates_stay_separate_rings() {
        let candidates = vec![candidate("cycle", &["A", "B", "C"]), candidate("fan_in", &["X", "Y"])];
        let (rings, _) = RingConsolidator::consolidate(&candidates, &[]);
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].ring_id, "RING_001");
        assert_eq!(rings[1].ring_id, "RING_002");
    }

    #[test]
    fn overlapping_candidates_merge_with_joined_pattern_type() {
        let candidates = vec![
            candidate("cycle", &["A", "B", "C"]),
            candidate("fan_in", &["C", "X1", "X2"]),
        ];
        let (rings, account_to_ring) = RingConsolidator::consolidate(&candidates, &[]);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].pattern_type, "cycle+fan_in");
        assert_eq!(
            rings[0].members,
            vec!["A".to_string(), "B".to_string(), "C".to_string(), "X1".to_string(), "X2".to_string()]
        );
        assert_eq!(account_to_ring["A"], "RING_001");
    }

    #[test]
    fn empty_ring_has_zero_risk() {
        let members = BTreeSet::new();
        let scores = HashMap::new();
        assert_eq!(ring_risk_score(&members, &scores), 0.0);
    }

    #[test]
    fn missing_members_count_as_zero_in_denominator() {
        let candidates = vec![candidate("cycle", &["A", "B"])];
        let scores = vec![scored("A", 100.0)];
        let (rings, _) = RingConsolidator::consolidate(&candidates, &scores);
        // mean(100, 0) * 1.1 = 55.0
        assert_eq!(rings[0].risk_score, 55.0);
    }
}
