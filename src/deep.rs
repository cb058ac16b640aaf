//! PUCT search guided by policy and value oracles.
//!
//! [`DeepMctsAgent`] differs from the plain UCT agent in three ways: children
//! are expanded in the order the policy ranks them, selection scores carry
//! the policy prior, and leaf evaluation blends an oracle value estimate
//! with an optional rollout. Rewards live in [0, 1] from the perspective of
//! the player to move at each node and are flipped at every ply while
//! backing up.

use std::collections::VecDeque;

use crate::agent::{Agent, MovePrediction, PolicyOracle, RandomAgent, ValueOracle};
use crate::board::Move;
use crate::mcts::simulate;
use crate::rules::GameState;

struct Node {
    state: GameState,
    mv: Option<Move>,
    parent: Option<usize>,
    children: Vec<usize>,
    untried: VecDeque<MovePrediction>,
    prior: f32,
    value_sum: f32,
    visits: u32,
}

impl Node {
    fn new(
        state: GameState,
        mv: Option<Move>,
        parent: Option<usize>,
        prior: f32,
        policy: &dyn PolicyOracle,
    ) -> Node {
        // A finished game is a leaf; it offers no moves to try.
        let untried = if state.is_over() {
            VecDeque::new()
        } else {
            let mut untried: VecDeque<MovePrediction> = policy.predict(&state).into();
            if untried.is_empty() {
                untried.push_back(MovePrediction::pass());
            }
            untried
        };

        Node {
            state,
            mv,
            parent,
            children: Vec::new(),
            untried,
            prior,
            value_sum: 0.0,
            visits: 0,
        }
    }

    fn is_fully_expanded(&self) -> bool {
        self.untried.is_empty()
    }

    fn is_terminal(&self) -> bool {
        self.state.is_over()
    }

    /// Mean backed-up value, 0 before the first visit.
    fn mean_value(&self) -> f32 {
        if self.visits == 0 {
            return 0.0;
        }
        self.value_sum / self.visits as f32
    }
}

/// Monte Carlo tree search in the AlphaGo style.
///
/// `lambda` blends the two leaf evaluations: `(1 - lambda)` weight on the
/// value oracle and `lambda` on a random rollout. At 0 no rollouts are
/// played, at 1 the value oracle is never consulted.
pub struct DeepMctsAgent {
    rounds: u32,
    c_puct: f32,
    lambda: f32,
    policy: Box<dyn PolicyOracle>,
    value: Box<dyn ValueOracle>,
    rollout: Box<dyn Agent>,
}

impl DeepMctsAgent {
    pub fn new(
        rounds: u32,
        c_puct: f32,
        lambda: f32,
        policy: Box<dyn PolicyOracle>,
        value: Box<dyn ValueOracle>,
    ) -> DeepMctsAgent {
        DeepMctsAgent {
            rounds,
            c_puct,
            lambda,
            policy,
            value,
            rollout: Box::new(RandomAgent::new()),
        }
    }

    fn select(&self, nodes: &[Node]) -> usize {
        let mut current = 0;
        while nodes[current].is_fully_expanded() && !nodes[current].is_terminal() {
            match self.best_puct_child(nodes, current) {
                Some(child) => current = child,
                None => break,
            }
        }
        current
    }

    fn expand(&self, nodes: &mut Vec<Node>, index: usize) -> usize {
        let prediction = nodes[index]
            .untried
            .pop_front()
            .expect("node is already fully expanded");

        let state = nodes[index].state.apply_move(prediction.mv);
        let child = nodes.len();
        nodes.push(Node::new(
            state,
            Some(prediction.mv),
            Some(index),
            prediction.probability,
            self.policy.as_ref(),
        ));
        nodes[index].children.push(child);
        child
    }

    fn best_puct_child(&self, nodes: &[Node], index: usize) -> Option<usize> {
        nodes[index]
            .children
            .iter()
            .copied()
            .max_by(|&a, &b| {
                let score_a = self.puct_score(nodes, index, a);
                let score_b = self.puct_score(nodes, index, b);
                score_a.total_cmp(&score_b)
            })
    }

    /// PUCT: mean value plus a prior-weighted exploration term. The term
    /// stays finite for unvisited children, which is what lets the prior
    /// order the first visits.
    fn puct_score(&self, nodes: &[Node], parent: usize, child: usize) -> f32 {
        let exploration = self.c_puct
            * nodes[child].prior
            * (nodes[parent].visits as f32).sqrt()
            / (1.0 + nodes[child].visits as f32);
        nodes[child].mean_value() + exploration
    }

    /// Reward for the leaf from the perspective of the player to move there.
    fn evaluate(&mut self, state: &GameState) -> f32 {
        let oracle_part = if self.lambda < 1.0 {
            (1.0 - self.lambda) * self.value.estimate(state)
        } else {
            0.0
        };

        let rollout_part = if self.lambda > 0.0 {
            let reward = match simulate(state, self.rollout.as_mut()) {
                Some(winner) if winner == state.next_player() => 1.0,
                Some(_) => 0.0,
                None => 0.5,
            };
            self.lambda * reward
        } else {
            0.0
        };

        oracle_part + rollout_part
    }

    /// Back the reward up to the root, flipping the perspective each ply.
    fn backpropagate(nodes: &mut [Node], mut index: usize, mut value: f32) {
        loop {
            let node = &mut nodes[index];
            node.visits += 1;
            node.value_sum += value;
            value = 1.0 - value;
            match node.parent {
                Some(parent) => index = parent,
                None => break,
            }
        }
    }
}

impl Agent for DeepMctsAgent {
    fn select_move(&mut self, state: &GameState) -> Move {
        let mut nodes = vec![Node::new(
            state.clone(),
            None,
            None,
            1.0,
            self.policy.as_ref(),
        )];

        for _ in 0..self.rounds {
            let selected = self.select(&nodes);
            let leaf = if !nodes[selected].is_fully_expanded() {
                self.expand(&mut nodes, selected)
            } else {
                selected
            };

            let leaf_state = nodes[leaf].state.clone();
            let value = self.evaluate(&leaf_state);
            Self::backpropagate(&mut nodes, leaf, value);
        }

        // Robust child: the most visited one.
        let best = nodes[0]
            .children
            .iter()
            .copied()
            .max_by_key(|&child| nodes[child].visits);

        let chosen = match best {
            Some(child) => nodes[child].mv.unwrap_or(Move::Pass),
            None => Move::Pass,
        };

        log::debug!(
            "deep mcts: {} rounds, {} nodes, picked {}",
            self.rounds,
            nodes.len(),
            chosen.to_a1(state.board().size())
        );
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::UniformPolicy;
    use crate::board::{Board, Player, Point};
    use crate::rules::Rules;

    fn p(row: usize, col: usize) -> Point {
        Point::new(row, col)
    }

    /// Neutral value oracle for tests.
    struct FlatValue;

    impl ValueOracle for FlatValue {
        fn estimate(&self, _state: &GameState) -> f32 {
            0.5
        }
    }

    /// Policy that puts all weight on a single move.
    struct FixedPolicy(Move);

    impl PolicyOracle for FixedPolicy {
        fn predict(&self, state: &GameState) -> Vec<MovePrediction> {
            if state.is_valid_move(self.0) {
                vec![MovePrediction::new(self.0, 1.0)]
            } else {
                Vec::new()
            }
        }
    }

    fn uniform_agent(rounds: u32, lambda: f32) -> DeepMctsAgent {
        DeepMctsAgent::new(
            rounds,
            1.5,
            lambda,
            Box::new(UniformPolicy),
            Box::new(FlatValue),
        )
    }

    #[test]
    fn agent_returns_a_legal_move() {
        let state = GameState::new_game(5, Rules::general());
        let mut agent = uniform_agent(40, 0.5);

        let mv = agent.select_move(&state);
        assert!(state.is_valid_move(mv));
    }

    #[test]
    fn lambda_zero_skips_rollouts() {
        // With lambda 0 every evaluation is the flat 0.5 oracle value, so
        // the search still completes and answers.
        let state = GameState::new_game(5, Rules::general());
        let mut agent = uniform_agent(30, 0.0);

        let mv = agent.select_move(&state);
        assert!(state.is_valid_move(mv));
    }

    #[test]
    fn policy_priors_steer_the_search() {
        let state = GameState::new_game(5, Rules::general());
        let mut agent = DeepMctsAgent::new(
            50,
            1.5,
            0.0,
            Box::new(FixedPolicy(Move::Play(p(2, 2)))),
            Box::new(FlatValue),
        );

        // The policy only ever proposes the center point.
        assert_eq!(agent.select_move(&state), Move::Play(p(2, 2)));
    }

    #[test]
    fn backpropagation_flips_the_perspective_each_ply() {
        let policy = UniformPolicy;
        let root_state = GameState::new_game(3, Rules::general());
        let mut nodes = vec![Node::new(root_state, None, None, 1.0, &policy)];

        let agent = uniform_agent(1, 0.0);
        let child = agent.expand(&mut nodes, 0);
        let grandchild = agent.expand(&mut nodes, child);

        DeepMctsAgent::backpropagate(&mut nodes, grandchild, 1.0);

        assert_eq!(nodes[grandchild].value_sum, 1.0);
        assert_eq!(nodes[child].value_sum, 0.0);
        assert_eq!(nodes[0].value_sum, 1.0);
        for index in [0, child, grandchild] {
            assert_eq!(nodes[index].visits, 1);
        }
    }

    #[test]
    fn a_finished_game_is_a_leaf_in_the_tree() {
        let policy = UniformPolicy;
        let state = GameState::new_game(3, Rules::general())
            .apply_move(Move::Pass)
            .apply_move(Move::Pass);
        let node = Node::new(state, None, None, 1.0, &policy);

        // The double-pass position is fully expanded from the start, so a
        // search round evaluates it instead of playing past the game end.
        assert!(node.is_terminal());
        assert!(node.is_fully_expanded());
    }

    #[test]
    fn mean_value_of_an_unvisited_node_is_zero() {
        let policy = UniformPolicy;
        let state = GameState::new_game(3, Rules::general());
        let node = Node::new(state, None, None, 1.0, &policy);

        assert_eq!(node.mean_value(), 0.0);
    }

    #[test]
    #[should_panic(expected = "node is already fully expanded")]
    fn expanding_a_fully_expanded_node_panics() {
        let policy = FixedPolicy(Move::Play(p(0, 0)));
        let state = GameState::new_game(3, Rules::general());
        let mut nodes = vec![Node::new(state, None, None, 1.0, &policy)];

        let agent = DeepMctsAgent::new(
            1,
            1.5,
            0.0,
            Box::new(FixedPolicy(Move::Play(p(0, 0)))),
            Box::new(FlatValue),
        );
        agent.expand(&mut nodes, 0);
        agent.expand(&mut nodes, 0);
    }

    #[test]
    fn blended_evaluation_answers_on_capture_rules() {
        let mut board = Board::new(3);
        board.place_stone(Player::White, p(1, 1));
        board.place_stone(Player::Black, p(1, 0));
        let state = GameState::from_board(board, Player::Black, Rules::capture(1));

        let mut agent = uniform_agent(60, 1.0);
        let mv = agent.select_move(&state);
        assert!(state.is_valid_move(mv));
    }
}
