//! Pattern detection: cycles, fan-in/fan-out bursts, layered shell chains.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use chrono::Duration;

use crate::config::DetectionConfig;
use crate::graph::DirectedTransactionGraph;

/// Closed set of pattern tags an account can accumulate (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    CycleLength3,
    CycleLength4,
    CycleLength5,
    FanIn,
    FanOut,
    LayeredShell,
    HighVelocity,
    SmallAmounts,
    HighBetweenness,
    HighPagerank,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::CycleLength3 => "cycle_length_3",
            Tag::CycleLength4 => "cycle_length_4",
            Tag::CycleLength5 => "cycle_length_5",
            Tag::FanIn => "fan_in",
            Tag::FanOut => "fan_out",
            Tag::LayeredShell => "layered_shell",
            Tag::HighVelocity => "high_velocity",
            Tag::SmallAmounts => "small_amounts",
            Tag::HighBetweenness => "high_betweenness",
            Tag::HighPagerank => "high_pagerank",
        }
    }

    fn cycle_of_length(len: usize) -> Tag {
        match len {
            3 => Tag::CycleLength3,
            4 => Tag::CycleLength4,
            5 => Tag::CycleLength5,
            other => panic!("cycle length {other} out of the enumerated 3..=5 range"),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// One raw detection before ring consolidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingCandidate {
    pub members: BTreeSet<String>,
    pub pattern_type: &'static str,
}

/// Insertion-ordered, dedup-on-insert tag list for one account.
#[derive(Debug, Clone, Default)]
pub struct TagList(Vec<Tag>);

impl TagList {
    pub fn push(&mut self, tag: Tag) {
        if !self.0.contains(&tag) {
            self.0.push(tag);
        }
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.0.contains(&tag)
    }

    pub fn has_cycle_tag(&self) -> bool {
        self.0.iter().any(|t| {
            matches!(t, Tag::CycleLength3 | Tag::CycleLength4 | Tag::CycleLength5)
        })
    }

    pub fn as_slice(&self) -> &[Tag] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }
}

/// `AccountPatterns` from spec §3: account id -> insertion-ordered tags.
pub type AccountPatterns = HashMap<String, TagList>;

/// Output of the full detection pass: raw candidates plus base tags.
pub struct DetectionResult {
    pub candidates: Vec<RingCandidate>,
    pub patterns: AccountPatterns,
}

pub struct PatternDetector;

impl PatternDetector {
    pub fn detect(graph: &DirectedTransactionGraph, config: &DetectionConfig) -> DetectionResult {
        let mut candidates = Vec::new();
        let mut patterns: AccountPatterns = HashMap::new();

        let cycles = detect_cycles(graph, config.cycle_cap);
        if cycles.len() >= config.cycle_cap {
            tracing::warn!(cap = config.cycle_cap, "cycle enumeration hit its cap; result is partial");
        }
        for cycle in cycles {
            let tag = Tag::cycle_of_length(cycle.len());
            for member in &cycle {
                patterns.entry(member.clone()).or_default().push(tag);
            }
            candidates.push(RingCandidate {
                members: cycle,
                pattern_type: "cycle",
            });
        }

        for candidate in detect_fan_in(graph, config) {
            for member in &candidate.members {
                patterns.entry(member.clone()).or_default().push(Tag::FanIn);
            }
            candidates.push(candidate);
        }

        for candidate in detect_fan_out(graph, config) {
            for member in &candidate.members {
                patterns.entry(member.clone()).or_default().push(Tag::FanOut);
            }
            candidates.push(candidate);
        }

        let chains = detect_shell_chains(graph, config.shell_depth_cap, config.shell_chain_cap);
        if chains.len() >= config.shell_chain_cap {
            tracing::warn!(
                cap = config.shell_chain_cap,
                "layered shell chain enumeration hit its cap; result is partial"
            );
        }
        for chain in chains {
            for member in &chain {
                patterns.entry(member.clone()).or_default().push(Tag::LayeredShell);
            }
            candidates.push(RingCandidate {
                members: chain,
                pattern_type: "layered_shell",
            });
        }

        DetectionResult { candidates, patterns }
    }
}

/// Elementary directed cycles of length 3..=5, deduplicated by vertex set.
///
/// Recursion depth is bounded by the 5-vertex cap, so a plain recursive DFS
/// (rather than an explicit stack) is safe here; the explicit-stack
/// requirement in the design notes targets shell-chain search, whose depth
/// bound is looser and whose branching factor is higher.
fn detect_cycles(graph: &DirectedTransactionGraph, cap: usize) -> Vec<BTreeSet<String>> {
    let mut found = Vec::new();
    let mut seen: HashSet<BTreeSet<String>> = HashSet::new();

    for start in graph.nodes() {
        if found.len() >= cap {
            break;
        }
        let mut path = vec![start.to_string()];
        let mut visited: HashSet<String> = HashSet::from([start.to_string()]);
        cycle_dfs(graph, start, &mut path, &mut visited, &mut seen, &mut found, cap);
    }

    found
}

fn cycle_dfs(
    graph: &DirectedTransactionGraph,
    start: &str,
    path: &mut Vec<String>,
    visited: &mut HashSet<String>,
    seen: &mut HashSet<BTreeSet<String>>,
    found: &mut Vec<BTreeSet<String>>,
    cap: usize,
) {
    if found.len() >= cap {
        return;
    }
    let current = path.last().unwrap().clone();
    for next in graph.successors(&current) {
        if found.len() >= cap {
            return;
        }
        if next == start {
            if path.len() >= 3 {
                let set: BTreeSet<String> = path.iter().cloned().collect();
                if seen.insert(set.clone()) {
                    found.push(set);
                }
            }
            continue;
        }
        if path.len() < 5 && !visited.contains(next) {
            path.push(next.clone());
            visited.insert(next.clone());
            cycle_dfs(graph, start, path, visited, seen, found, cap);
            path.pop();
            visited.remove(next);
        }
    }
}

/// Two-pointer sliding window over `R`'s inbound transactions: the oldest
/// representative of smurfing/fan-in detection.
fn detect_fan_in(graph: &DirectedTransactionGraph, config: &DetectionConfig) -> Vec<RingCandidate> {
    let window = Duration::hours(config.fan_window_hours);
    let mut out = Vec::new();

    for receiver in graph.nodes() {
        let edges = graph.inbound_edges(receiver);
        let distinct_total: HashSet<&str> = edges.iter().map(|e| e.counterparty.as_str()).collect();
        if distinct_total.len() < config.fan_threshold {
            continue;
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut distinct = 0usize;
        let mut left = 0usize;

        for right in 0..edges.len() {
            let sender = edges[right].counterparty.as_str();
            let entry = counts.entry(sender).or_insert(0);
            *entry += 1;
            if *entry == 1 {
                distinct += 1;
            }

            while edges[right].timestamp - edges[left].timestamp > window {
                let leaving = edges[left].counterparty.as_str();
                if let Some(c) = counts.get_mut(leaving) {
                    *c -= 1;
                    if *c == 0 {
                        distinct -= 1;
                        counts.remove(leaving);
                    }
                }
                left += 1;
            }

            if distinct >= config.fan_threshold {
                let mut members: BTreeSet<String> = counts.keys().map(|s| s.to_string()).collect();
                members.insert(receiver.to_string());
                out.push(RingCandidate {
                    members,
                    pattern_type: "fan_in",
                });
                break;
            }
        }
    }

    out
}

/// Symmetric to [`detect_fan_in`] over outbound edges.
fn detect_fan_out(graph: &DirectedTransactionGraph, config: &DetectionConfig) -> Vec<RingCandidate> {
    let window = Duration::hours(config.fan_window_hours);
    let mut out = Vec::new();

    for sender in graph.nodes() {
        let edges = graph.outbound_edges(sender);
        let distinct_total: HashSet<&str> = edges.iter().map(|e| e.counterparty.as_str()).collect();
        if distinct_total.len() < config.fan_threshold {
            continue;
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut distinct = 0usize;
        let mut left = 0usize;

        for right in 0..edges.len() {
            let receiver = edges[right].counterparty.as_str();
            let entry = counts.entry(receiver).or_insert(0);
            *entry += 1;
            if *entry == 1 {
                distinct += 1;
            }

            while edges[right].timestamp - edges[left].timestamp > window {
                let leaving = edges[left].counterparty.as_str();
                if let Some(c) = counts.get_mut(leaving) {
                    *c -= 1;
                    if *c == 0 {
                        distinct -= 1;
                        counts.remove(leaving);
                    }
                }
                left += 1;
            }

            if distinct >= config.fan_threshold {
                let mut members: BTreeSet<String> = counts.keys().map(|s| s.to_string()).collect();
                members.insert(sender.to_string());
                out.push(RingCandidate {
                    members,
                    pattern_type: "fan_out",
                });
                break;
            }
        }
    }

    out
}

/// Simple directed paths of >=4 nodes whose interior nodes are all shell
/// accounts, explored with an explicit stack (not recursion) per the
/// design notes, so a pathological fan of shell accounts cannot blow the
/// call stack.
fn detect_shell_chains(
    graph: &DirectedTransactionGraph,
    depth_cap: usize,
    output_cap: usize,
) -> Vec<BTreeSet<String>> {
    let mut results = Vec::new();
    let mut seen: HashSet<BTreeSet<String>> = HashSet::new();

    'start: for start in graph.nodes() {
        if results.len() >= output_cap {
            break;
        }

        let mut path = vec![start.to_string()];
        let mut visited: HashSet<String> = HashSet::from([start.to_string()]);
        // frames[d] = index of the next successor of path[d] to try.
        let mut frames: Vec<usize> = vec![0];

        loop {
            if results.len() >= output_cap {
                break 'start;
            }
            let depth = path.len() - 1;
            let current = path.last().unwrap().clone();
            let succs = graph.successors(&current);
            let idx = *frames.last().unwrap();

            if idx >= succs.len() || depth >= depth_cap {
                if path.len() == 1 {
                    break;
                }
                visited.remove(&current);
                path.pop();
                frames.pop();
                *frames.last_mut().unwrap() += 1;
                continue;
            }

            *frames.last_mut().unwrap() += 1;
            let next = succs[idx].clone();
            if visited.contains(&next) {
                continue;
            }

            path.push(next.clone());
            visited.insert(next.clone());
            frames.push(0);

            if path.len() >= 4 {
                let interior_is_shell = path[1..path.len() - 1].iter().all(|n| graph.is_shell_account(n));
                if interior_is_shell {
                    let set: BTreeSet<String> = path.iter().cloned().collect();
                    if seen.insert(set.clone()) {
                        results.push(set);
                        if results.len() >= output_cap {
                            break 'start;
                        }
                    }
                }
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::transaction::Transaction;

    fn tx(id: &str, from: &str, to: &str, hour: i64) -> Transaction {
        Transaction::new(id, from, to, dec!(100), Utc::now() + Duration::hours(hour))
    }

    #[test]
    fn triangle_cycle_is_detected_and_tagged() {
        let txs = vec![tx("t1", "A", "B", 0), tx("t2", "B", "C", 1), tx("t3", "C", "A", 2)];
        let graph = DirectedTransactionGraph::build(&txs);
        let config = DetectionConfig::default();
        let result = PatternDetector::detect(&graph, &config);

        let cycle = result
            .candidates
            .iter()
            .find(|c| c.pattern_type == "cycle")
            .expect("cycle candidate");
        assert_eq!(cycle.members, BTreeSet::from(["A".to_string(), "B".to_string(), "C".to_string()]));
        assert!(result.patterns["A"].contains(Tag::CycleLength3));
    }

    #[test]
    fn six_cycle_is_not_tagged() {
        let txs: Vec<Transaction> = ["A", "B", "C", "D", "E", "F"]
            .windows(2)
            .enumerate()
            .map(|(i, w)| tx(&format!("t{i}"), w[0], w[1], i as i64))
            .chain(std::iter::once(tx("t6", "F", "A", 6)))
            .collect();
        let graph = DirectedTransactionGraph::build(&txs);
        let config = DetectionConfig::default();
        let result = PatternDetector::detect(&graph, &config);
        assert!(!result.candidates.iter().any(|c| c.pattern_type == "cycle"));
    }

    #[test]
    fn nine_senders_no_fan_in_ten_senders_emits() {
        let mut txs: Vec<Transaction> = (0..9).map(|i| tx(&format!("t{i}"), &format!("S{i}"), "R", i)).collect();
        let graph = DirectedTransactionGraph::build(&txs);
        let config = DetectionConfig::default();
        let result = PatternDetector::detect(&graph, &config);
        assert!(!result.candidates.iter().any(|c| c.pattern_type == "fan_in"));

        txs.push(tx("t9", "S9", "R", 9));
        let graph = DirectedTransactionGraph::build(&txs);
        let result = PatternDetector::detect(&graph, &config);
        assert!(result.candidates.iter().any(|c| c.pattern_type == "fan_in"));
    }

    #[test]
    fn shell_chain_requires_shell_interior() {
        let txs = vec![tx("t1", "SRC", "SH1", 0), tx("t2", "SH1", "SH2", 1), tx("t3", "SH2", "DEST", 2)];
        let graph = DirectedTransactionGraph::build(&txs);
        let config = DetectionConfig::default();
        let result = PatternDetector::detect(&graph, &config);
        let chain = result
            .candidates
            .iter()
            .find(|c| c.pattern_type == "layered_shell")
            .expect("shell chain candidate");
        assert_eq!(chain.members.len(), 4);
    }

    #[test]
    fn tag_list_is_idempotent_and_order_preserving() {
        let mut tags = TagList::default();
        tags.push(Tag::CycleLength3);
        tags.push(Tag::FanIn);
        tags.push(Tag::CycleLength3);
        assert_eq!(tags.as_slice(), &[Tag::CycleLength3, Tag::FanIn]);
    }
}
