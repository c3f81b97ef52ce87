//! MCTS node and edge structures.
//!
//! Nodes live in an arena (`MctsTree`) and refer to each other by `NodeId`.
//! Each edge is one candidate from the enumeration of its parent's state.

use smallvec::SmallVec;

use crate::agent::Candidate;
use crate::core::{PlayerId, PlayerMap};

/// Index into the tree's node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value representing no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this is the NONE sentinel.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

/// Edge from a parent node to the state reached by one candidate.
#[derive(Clone, Debug)]
pub struct Edge {
    /// The candidate this edge represents.
    pub candidate: Candidate,

    /// Child node (NONE if not yet expanded).
    pub child: NodeId,

    /// Visit count.
    pub visits: u32,

    /// Total reward accumulated through this edge, per player.
    pub total_reward: PlayerMap<f64>,
}

impl Edge {
    /// Create an unvisited edge.
    #[must_use]
    pub fn new(candidate: Candidate, player_count: usize) -> Self {
        Self {
            candidate,
            child: NodeId::NONE,
            visits: 0,
            total_reward: PlayerMap::with_value(player_count, 0.0),
        }
    }

    /// Mean reward for a player.
    #[must_use]
    pub fn mean_reward(&self, player: PlayerId) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.total_reward[player] / f64::from(self.visits)
        }
    }

    /// Check if this edge has a child.
    #[must_use]
    pub fn is_expanded(&self) -> bool {
        !self.child.is_none()
    }
}

/// A node in the search tree.
#[derive(Clone, Debug)]
pub struct MctsNode {
    /// Seat choosing at this node; rewards are maximized for it.
    pub to_move: PlayerId,

    /// Depth in tree (root = 0).
    pub depth: u16,

    /// Total visits.
    pub visits: u32,

    /// Rewards if the state is terminal.
    pub terminal_reward: Option<PlayerMap<f64>>,

    /// Outgoing edges.
    /// SmallVec optimizes for typical branching factor < 8.
    pub edges: SmallVec<[Edge; 8]>,
}

impl MctsNode {
    /// Create a node with no edges.
    #[must_use]
    pub fn new(to_move: PlayerId, depth: u16) -> Self {
        Self {
            to_move,
            depth,
            visits: 0,
            terminal_reward: None,
            edges: SmallVec::new(),
        }
    }

    /// `true` if the node's state ended the game.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal_reward.is_some()
    }

    /// Indices of edges without a child.
    pub fn unexpanded_edges(&self) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_expanded())
            .map(|(i, _)| i)
    }

    /// Index of the most visited edge. Ties go to the earlier edge.
    #[must_use]
    pub fn most_visited(&self) -> Option<usize> {
        self.edges
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|(_, e)| e.visits)
            .map(|(i, _)| i)
    }

    /// UCB1 choice among expanded edges for the player to move.
    ///
    /// Formula: Q(a) + c * sqrt(ln(N) / n(a)); unvisited edges go first.
    #[must_use]
    pub fn select_ucb1(&self, exploration: f64) -> Option<usize> {
        let ln_parent = f64::from(self.visits.max(1)).ln();

        self.edges
            .iter()
            .enumerate()
            .map(|(i, edge)| {
                let exploration = if edge.visits == 0 {
                    f64::INFINITY
                } else {
                    exploration * (ln_parent / f64::from(edge.visits)).sqrt()
                };
                (i, edge.mean_reward(self.to_move) + exploration)
            })
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(name: &str) -> Edge {
        Edge::new(Candidate::make_move(name, []), 2)
    }

    #[test]
    fn test_edge_mean_reward() {
        let mut edge = edge("a");
        assert_eq!(edge.mean_reward(PlayerId::new(0)), 0.0);

        edge.visits = 4;
        edge.total_reward[PlayerId::new(0)] = 3.0;
        edge.total_reward[PlayerId::new(1)] = 1.0;

        assert_eq!(edge.mean_reward(PlayerId::new(0)), 0.75);
        assert_eq!(edge.mean_reward(PlayerId::new(1)), 0.25);
    }

    #[test]
    fn test_unexpanded_edges() {
        let mut node = MctsNode::new(PlayerId::new(0), 0);
        node.edges.push(edge("a"));
        node.edges.push(edge("b"));
        node.edges.push(edge("c"));
        node.edges[1].child = NodeId(10);

        let unexpanded: Vec<_> = node.unexpanded_edges().collect();
        assert_eq!(unexpanded, vec![0, 2]);
    }

    #[test]
    fn test_most_visited_prefers_earlier_on_tie() {
        let mut node = MctsNode::new(PlayerId::new(0), 0);
        for name in ["a", "b", "c"] {
            node.edges.push(edge(name));
        }
        node.edges[1].visits = 5;
        node.edges[2].visits = 5;

        assert_eq!(node.most_visited(), Some(1));
    }

    #[test]
    fn test_ucb1_uses_mover_rewards() {
        let mut node = MctsNode::new(PlayerId::new(1), 0);
        node.visits = 20;
        let mut good = edge("good");
        good.visits = 10;
        good.total_reward[PlayerId::new(1)] = 9.0;
        let mut bad = edge("bad");
        bad.visits = 10;
        bad.total_reward[PlayerId::new(0)] = 9.0;
        node.edges.push(bad);
        node.edges.push(good);

        assert_eq!(node.select_ucb1(0.0), Some(1));
    }
}
