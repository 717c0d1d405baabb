//! Directed transaction multigraph, adjacency-list representation.
//!
//! Nodes are account ids. A directed edge is materialized per transaction
//! (parallel edges are expected and kept). Every account keeps a time-sorted
//! list of its inbound and outbound edges so the sliding-window detectors in
//! [`crate::patterns`] don't have to re-sort on every call, and a sorted,
//! deduplicated successor/predecessor list so graph traversal (cycle search,
//! shell-chain search) visits neighbors in a fixed, deterministic order.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::transaction::Transaction;

/// One directed edge, carrying the transaction that created it.
#[derive(Debug, Clone)]
pub struct Edge {
    pub counterparty: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub transaction_id: String,
}

/// Adjacency-list directed multigraph over account ids.
#[derive(Debug, Clone, Default)]
pub struct DirectedTransactionGraph {
    nodes: BTreeSet<String>,
    /// Outbound edges per account, ascending by timestamp.
    outbound: HashMap<String, Vec<Edge>>,
    /// Inbound edges per account, ascending by timestamp.
    inbound: HashMap<String, Vec<Edge>>,
    /// Distinct successors per account, sorted lexicographically.
    successors: HashMap<String, Vec<String>>,
    /// Distinct predecessors per account, sorted lexicographically.
    predecessors: HashMap<String, Vec<String>>,
}

impl DirectedTransactionGraph {
    pub fn build(transactions: &[Transaction]) -> Self {
        let mut graph = Self::default();
        for tx in transactions {
            graph.nodes.insert(tx.sender_id.clone());
            graph.nodes.insert(tx.receiver_id.clone());

            graph.outbound.entry(tx.sender_id.clone()).or_default().push(Edge {
                counterparty: tx.receiver_id.clone(),
                amount: tx.amount_f64(),
                timestamp: tx.timestamp,
                transaction_id: tx.transaction_id.clone(),
            });
            graph.inbound.entry(tx.receiver_id.clone()).or_default().push(Edge {
                counterparty: tx.sender_id.clone(),
                amount: tx.amount_f64(),
                timestamp: tx.timestamp,
                transaction_id: tx.transaction_id.clone(),
            });

            let succ: &mut Vec<String> = graph.successors.entry(tx.sender_id.clone()).or_default();
            if !succ.contains(&tx.receiver_id) {
                succ.push(tx.receiver_id.clone());
            }
            let pred: &mut Vec<String> = graph.predecessors.entry(tx.receiver_id.clone()).or_default();
            if !pred.contains(&tx.sender_id) {
                pred.push(tx.sender_id.clone());
            }
        }

        for edges in graph.outbound.values_mut() {
            edges.sort_by_key(|e| e.timestamp);
        }
        for edges in graph.inbound.values_mut() {
            edges.sort_by_key(|e| e.timestamp);
        }
        for succ in graph.successors.values_mut() {
            succ.sort();
        }
        for pred in graph.predecessors.values_mut() {
            pred.sort();
        }

        graph
    }

    /// Account ids in fixed, lexicographic order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, account: &str) -> bool {
        self.nodes.contains(account)
    }

    /// Distinct successors, sorted.
    pub fn successors(&self, account: &str) -> &[String] {
        self.successors.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Outbound edges, ascending by timestamp.
    pub fn outbound_edges(&self, account: &str) -> &[Edge] {
        self.outbound.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Inbound edges, ascending by timestamp.
    pub fn inbound_edges(&self, account: &str) -> &[Edge] {
        self.inbound.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sent_count(&self, account: &str) -> usize {
        self.outbound_edges(account).len()
    }

    pub fn received_count(&self, account: &str) -> usize {
        self.inbound_edges(account).len()
    }

    pub fn total_txns(&self, account: &str) -> usize {
        self.sent_count(account) + self.received_count(account)
    }

    /// Any account with 2 or 3 lifetime transactions (§3, "shell account").
    pub fn is_shell_account(&self, account: &str) -> bool {
        matches!(self.total_txns(account), 2 | 3)
    }
}
