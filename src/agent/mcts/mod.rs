//! Monte Carlo Tree Search over the reducer.
//!
//! ## Algorithm
//!
//! Each iteration runs the classic four phases on a copy of the snapshot:
//! 1. **Selection**: descend fully expanded nodes with UCB1, scored for the
//!    seat choosing at each node
//! 2. **Expansion**: take one untried candidate and add its child
//! 3. **Simulation**: play random candidates until the game ends or the
//!    rollout depth limit is hit
//! 4. **Backpropagation**: add per-player rewards along the path
//!
//! Transitions go through `Game::reduce`, so search sees exactly the rules
//! a dispatched action would. The state is fully public; there is no
//! opponent sampling.
//!
//! ## Rewards
//!
//! Winners score 1, everyone else 0. Draws, undeclared endings, dead ends,
//! and depth-limited rollouts score 0.5 for every seat.

pub mod config;
pub mod node;
pub mod stats;
pub mod tree;

use std::time::Instant;

use tracing::debug;

pub use config::MctsConfig;
pub use node::{Edge, MctsNode, NodeId};
pub use stats::SearchStats;
pub use tree::MctsTree;

use super::{simulated_actor, Candidate, SearchContext, SelectionPolicy};
use crate::core::{GameRng, GameResult, PlayerId, PlayerMap, StateSnapshot};
use crate::game::{Game, GameData};

/// UCB1 tree search policy.
#[derive(Clone, Debug)]
pub struct Mcts {
    config: MctsConfig,
    rng: GameRng,
    tree: MctsTree,
    stats: SearchStats,
}

impl Mcts {
    /// Create a search policy.
    #[must_use]
    pub fn new(config: MctsConfig) -> Self {
        Self {
            rng: GameRng::new(config.seed),
            tree: MctsTree::with_capacity(config.max_nodes.min(4096)),
            stats: SearchStats::default(),
            config,
        }
    }

    /// Search configuration.
    #[must_use]
    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Statistics from the most recent search.
    #[must_use]
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Tree from the most recent search.
    #[must_use]
    pub fn tree(&self) -> &MctsTree {
        &self.tree
    }

    /// Visit counts of the root's candidates after the last search.
    #[must_use]
    pub fn root_visits(&self) -> Vec<u32> {
        self.tree
            .root()
            .map(|root| root.edges.iter().map(|e| e.visits).collect())
            .unwrap_or_default()
    }

    fn search<G: GameData>(&mut self, search: &SearchContext<'_, G>) -> Option<usize> {
        let start = Instant::now();
        self.stats = SearchStats::default();

        let ctx = &search.state.ctx;
        let mover = simulated_actor(ctx).unwrap_or(ctx.current_player);
        let mut root = MctsNode::new(mover, 0);
        for candidate in search.candidates {
            root.edges.push(Edge::new(candidate.clone(), ctx.num_players));
        }
        self.tree.reset(root);

        // No choice to make.
        if search.candidates.len() == 1 {
            return Some(0);
        }

        for _ in 0..self.config.iterations {
            self.iteration(search);
            self.stats.iterations += 1;

            if self.tree.len() >= self.config.max_nodes {
                break;
            }
        }

        self.stats.elapsed = start.elapsed();
        debug!(
            iterations = self.stats.iterations,
            nodes = self.tree.len(),
            max_depth = self.stats.max_depth,
            cutoff_rate = self.stats.cutoff_rate(),
            "mcts search finished"
        );

        self.tree.root().and_then(MctsNode::most_visited)
    }

    fn iteration<G: GameData>(&mut self, search: &SearchContext<'_, G>) {
        let num_players = search.state.ctx.num_players;
        let mut state = search.state.clone();
        let mut path: Vec<(NodeId, usize)> = Vec::new();
        let mut current = self.tree.root_id();

        loop {
            let node = self.tree.get(current);

            if let Some(rewards) = &node.terminal_reward {
                let rewards = rewards.clone();
                self.backpropagate(&path, &rewards);
                return;
            }
            if node.edges.is_empty() {
                self.backpropagate(&path, &neutral(num_players));
                return;
            }

            // === EXPANSION ===
            let unexpanded: Vec<usize> = node.unexpanded_edges().collect();
            if !unexpanded.is_empty() {
                let Some(&pick) = self.rng.pick(&unexpanded) else {
                    return;
                };
                path.push((current, pick));

                let candidate = &self.tree.get(current).edges[pick].candidate;
                state = apply(search.game, &state, candidate);
                let child = self.expand(current, pick, &state, search);

                // === SIMULATION ===
                let terminal = self.tree.get(child).terminal_reward.clone();
                let rewards = match terminal {
                    Some(rewards) => {
                        self.stats.terminal_hits += 1;
                        rewards
                    }
                    None => self.rollout(search, state),
                };
                self.backpropagate(&path, &rewards);
                return;
            }

            // === SELECTION ===
            let Some(pick) = node.select_ucb1(self.config.exploration_constant) else {
                return;
            };
            path.push((current, pick));
            let edge = &node.edges[pick];
            state = apply(search.game, &state, &edge.candidate);
            current = edge.child;
        }
    }

    fn expand<G: GameData>(
        &mut self,
        parent: NodeId,
        edge_idx: usize,
        state: &StateSnapshot<G>,
        search: &SearchContext<'_, G>,
    ) -> NodeId {
        let depth = self.tree.get(parent).depth.saturating_add(1);
        let num_players = state.ctx.num_players;
        let mover = simulated_actor(&state.ctx).unwrap_or(state.ctx.current_player);

        let mut node = MctsNode::new(mover, depth);
        match &state.ctx.gameover {
            Some(result) => node.terminal_reward = Some(rewards_for(result, num_players)),
            None => {
                for candidate in (search.enumerate)(&state.g, &state.ctx) {
                    node.edges.push(Edge::new(candidate, num_players));
                }
            }
        }

        let child = self.tree.alloc(node);
        self.tree.get_mut(parent).edges[edge_idx].child = child;
        self.stats.record_expansion(depth);
        child
    }

    fn rollout<G: GameData>(
        &mut self,
        search: &SearchContext<'_, G>,
        mut state: StateSnapshot<G>,
    ) -> PlayerMap<f64> {
        let num_players = state.ctx.num_players;
        let mut rng = self.rng.rollout();
        self.stats.rollouts += 1;

        for _ in 0..self.config.max_rollout_depth {
            if let Some(result) = &state.ctx.gameover {
                return rewards_for(result, num_players);
            }
            let candidates = (search.enumerate)(&state.g, &state.ctx);
            let Some(pick) = rng.index(candidates.len()) else {
                return neutral(num_players);
            };
            state = apply(search.game, &state, &candidates[pick]);
        }

        match &state.ctx.gameover {
            Some(result) => rewards_for(result, num_players),
            None => {
                self.stats.rollouts_cut_off += 1;
                neutral(num_players)
            }
        }
    }

    fn backpropagate(&mut self, path: &[(NodeId, usize)], rewards: &PlayerMap<f64>) {
        for &(node_id, edge_idx) in path.iter().rev() {
            let node = self.tree.get_mut(node_id);
            node.visits += 1;

            let edge = &mut node.edges[edge_idx];
            edge.visits += 1;
            for (player, reward) in rewards.iter() {
                edge.total_reward[player] += reward;
            }
        }
    }
}

impl Default for Mcts {
    fn default() -> Self {
        Self::new(MctsConfig::default())
    }
}

impl<G: GameData> SelectionPolicy<G> for Mcts {
    fn select(&mut self, search: &SearchContext<'_, G>) -> Option<usize> {
        if search.candidates.is_empty() {
            return None;
        }
        self.search(search)
    }
}

fn apply<G: GameData>(
    game: &Game<G>,
    state: &StateSnapshot<G>,
    candidate: &Candidate,
) -> StateSnapshot<G> {
    game.reduce(state, &candidate.to_action(simulated_actor(&state.ctx)))
}

fn neutral(num_players: usize) -> PlayerMap<f64> {
    PlayerMap::with_value(num_players, 0.5)
}

/// Convert a game result to per-player rewards.
#[must_use]
pub fn rewards_for(result: &GameResult, num_players: usize) -> PlayerMap<f64> {
    match result {
        GameResult::Draw | GameResult::Ended => neutral(num_players),
        won => PlayerMap::new(num_players, |p: PlayerId| {
            if won.is_winner(p) {
                1.0
            } else {
                0.0
            }
        }),
    }
}
