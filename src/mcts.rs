//! Single-threaded Monte Carlo tree search with UCT selection.
//!
//! The tree lives in a flat arena: nodes are `Vec` entries linked by index,
//! which keeps selection and backpropagation free of reference-counting and
//! borrow gymnastics. Each node tallies wins per player, so the win rate for
//! whichever player moved into a node falls directly out of the tally.

use crate::agent::{rollout_limit, Agent, RandomAgent};
use crate::board::{Move, Player};
use crate::rules::GameState;

struct Node {
    state: GameState,
    mv: Option<Move>,
    parent: Option<usize>,
    children: Vec<usize>,
    untried: Vec<Move>,
    wins: [u32; 2],
    visits: u32,
}

impl Node {
    fn new(state: GameState, mv: Option<Move>, parent: Option<usize>) -> Node {
        // A finished game is a leaf; it offers no moves to try.
        let untried = if state.is_over() {
            Vec::new()
        } else {
            state.legal_moves()
        };
        Node {
            state,
            mv,
            parent,
            children: Vec::new(),
            untried,
            wins: [0, 0],
            visits: 0,
        }
    }

    fn is_fully_expanded(&self) -> bool {
        self.untried.is_empty()
    }

    fn is_terminal(&self) -> bool {
        self.state.is_over()
    }

    /// Win rate from the perspective of the given player.
    fn win_rate(&self, player: Player) -> f64 {
        if self.visits == 0 {
            return 0.0;
        }
        f64::from(self.wins[player.index()]) / f64::from(self.visits)
    }
}

struct Tree {
    nodes: Vec<Node>,
    temperature: f64,
}

impl Tree {
    fn new(root_state: GameState, temperature: f64) -> Tree {
        Tree {
            nodes: vec![Node::new(root_state, None, None)],
            temperature,
        }
    }

    /// Walk down from the root until a node with untried moves or a
    /// terminal node is reached.
    fn select(&self) -> usize {
        let mut current = 0;
        while self.nodes[current].is_fully_expanded() && !self.nodes[current].is_terminal() {
            match self.best_child(current) {
                Some(child) => current = child,
                None => break,
            }
        }
        current
    }

    /// Attach one child for a not-yet-tried move.
    fn expand(&mut self, index: usize, rng: &mut fastrand::Rng) -> usize {
        let mv = {
            let node = &mut self.nodes[index];
            let pick = rng.usize(..node.untried.len());
            node.untried.swap_remove(pick)
        };

        let state = self.nodes[index].state.apply_move(mv);
        let child = self.nodes.len();
        self.nodes.push(Node::new(state, Some(mv), Some(index)));
        self.nodes[index].children.push(child);
        child
    }

    fn best_child(&self, index: usize) -> Option<usize> {
        let node = &self.nodes[index];
        let mover = node.state.next_player();
        node.children.iter().copied().max_by(|&a, &b| {
            let score_a = self.uct_score(index, a, mover);
            let score_b = self.uct_score(index, b, mover);
            score_a.total_cmp(&score_b)
        })
    }

    /// UCT: exploitation plus a temperature-weighted exploration bonus.
    /// Unvisited pairs score 0 so the formula never produces NaN or
    /// infinity; fresh children are reached through expansion instead.
    fn uct_score(&self, parent: usize, child: usize, mover: Player) -> f64 {
        let parent_visits = self.nodes[parent].visits;
        let child_visits = self.nodes[child].visits;
        if parent_visits == 0 || child_visits == 0 {
            return 0.0;
        }

        let exploitation = self.nodes[child].win_rate(mover);
        let exploration = (f64::from(parent_visits).ln() / f64::from(child_visits)).sqrt();
        exploitation + self.temperature * exploration
    }

    /// Credit a finished playout up the path to the root. A draw counts as
    /// a visit for both tallies but a win for neither.
    fn backpropagate(&mut self, mut index: usize, winner: Option<Player>) {
        loop {
            let node = &mut self.nodes[index];
            node.visits += 1;
            if let Some(player) = winner {
                node.wins[player.index()] += 1;
            }
            match node.parent {
                Some(parent) => index = parent,
                None => break,
            }
        }
    }
}

/// UCT search over full random playouts.
pub struct MctsAgent {
    rounds: u32,
    temperature: f64,
    rollout: Box<dyn Agent>,
    rng: fastrand::Rng,
}

impl MctsAgent {
    pub fn new(rounds: u32, temperature: f64) -> MctsAgent {
        MctsAgent::with_rollout(rounds, temperature, Box::new(RandomAgent::new()))
    }

    pub fn with_rollout(rounds: u32, temperature: f64, rollout: Box<dyn Agent>) -> MctsAgent {
        MctsAgent {
            rounds,
            temperature,
            rollout,
            rng: fastrand::Rng::new(),
        }
    }
}

impl Agent for MctsAgent {
    fn select_move(&mut self, state: &GameState) -> Move {
        let mut tree = Tree::new(state.clone(), self.temperature);

        for _ in 0..self.rounds {
            let selected = tree.select();
            let leaf = if !tree.nodes[selected].is_fully_expanded() {
                tree.expand(selected, &mut self.rng)
            } else {
                selected
            };

            let winner = simulate(&tree.nodes[leaf].state, self.rollout.as_mut());
            tree.backpropagate(leaf, winner);
        }

        // The root's mover is the player we answer for: pick the child with
        // the best win rate for them.
        let mover = state.next_player();
        let best = tree.nodes[0].children.iter().copied().max_by(|&a, &b| {
            tree.nodes[a]
                .win_rate(mover)
                .total_cmp(&tree.nodes[b].win_rate(mover))
        });

        let chosen = match best {
            Some(child) => tree.nodes[child].mv.unwrap_or(Move::Pass),
            None => Move::Pass,
        };

        log::debug!(
            "mcts: {} rounds, {} nodes, picked {}",
            self.rounds,
            tree.nodes.len(),
            chosen.to_a1(state.board().size())
        );
        chosen
    }
}

/// Play a capped random game from `state` and report the winner, if any.
pub(crate) fn simulate(state: &GameState, rollout: &mut dyn Agent) -> Option<Player> {
    let mut current = state.clone();
    let limit = rollout_limit(current.board().size());

    for _ in 0..limit {
        if current.is_over() {
            break;
        }
        let mv = rollout.select_move(&current);
        current = current.apply_move(mv);
    }
    current.winner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Point};
    use crate::rules::Rules;

    fn p(row: usize, col: usize) -> Point {
        Point::new(row, col)
    }

    #[test]
    fn backpropagation_increments_the_whole_path() {
        let mut tree = Tree::new(GameState::new_game(3, Rules::general()), 1.4);
        let mut rng = fastrand::Rng::with_seed(5);

        let child = tree.expand(0, &mut rng);
        let grandchild = tree.expand(child, &mut rng);

        for _ in 0..4 {
            tree.backpropagate(grandchild, Some(Player::Black));
        }

        for index in [0, child, grandchild] {
            assert_eq!(tree.nodes[index].visits, 4);
            assert_eq!(tree.nodes[index].wins[Player::Black.index()], 4);
            assert_eq!(tree.nodes[index].wins[Player::White.index()], 0);
        }
    }

    #[test]
    fn draws_count_as_visits_but_not_wins() {
        let mut tree = Tree::new(GameState::new_game(3, Rules::general()), 1.4);
        let mut rng = fastrand::Rng::with_seed(5);
        let child = tree.expand(0, &mut rng);

        tree.backpropagate(child, None);

        assert_eq!(tree.nodes[child].visits, 1);
        assert_eq!(tree.nodes[child].wins, [0, 0]);
    }

    #[test]
    fn uct_score_of_unvisited_nodes_is_zero() {
        let mut tree = Tree::new(GameState::new_game(3, Rules::general()), 1.4);
        let mut rng = fastrand::Rng::with_seed(5);
        let child = tree.expand(0, &mut rng);

        let score = tree.uct_score(0, child, Player::Black);
        assert_eq!(score, 0.0);
        assert!(score.is_finite());
    }

    #[test]
    fn visited_children_outrank_by_win_rate() {
        let mut tree = Tree::new(GameState::new_game(3, Rules::general()), 0.0);
        let mut rng = fastrand::Rng::with_seed(5);
        let first = tree.expand(0, &mut rng);
        let second = tree.expand(0, &mut rng);

        tree.backpropagate(first, Some(Player::Black));
        tree.backpropagate(second, Some(Player::White));

        // With zero temperature only the win rate matters; the root's
        // mover is Black.
        assert_eq!(tree.best_child(0), Some(first));
    }

    #[test]
    fn agent_returns_a_legal_move() {
        let mut agent = MctsAgent::new(40, 1.4);
        let state = GameState::new_game(5, Rules::general());

        let mv = agent.select_move(&state);
        assert!(state.is_valid_move(mv));
    }

    /*
        . x .
        x o x
        . . .
    */
    #[test]
    fn agent_finds_the_winning_capture() {
        let mut board = Board::new(3);
        board.place_stone(Player::White, p(1, 1));
        board.place_stone(Player::Black, p(1, 0));
        board.place_stone(Player::Black, p(1, 2));
        board.place_stone(Player::Black, p(0, 1));
        let state = GameState::from_board(board, Player::Black, Rules::capture(1));

        let mut agent = MctsAgent::new(200, 1.4);
        assert_eq!(agent.select_move(&state), Move::Play(p(2, 1)));
    }

    #[test]
    fn a_finished_game_is_a_leaf_in_the_tree() {
        // One pass already played; replying with a pass ends the game.
        let state = GameState::new_game(3, Rules::general()).apply_move(Move::Pass);
        let mut tree = Tree::new(state, 1.4);
        let mut rng = fastrand::Rng::with_seed(5);

        let terminal = loop {
            let child = tree.expand(0, &mut rng);
            if tree.nodes[child].mv == Some(Move::Pass) {
                break child;
            }
        };

        // The double-pass position is terminal and fully expanded, so a
        // search round stops here instead of playing past the game end.
        assert!(tree.nodes[terminal].is_terminal());
        assert!(tree.nodes[terminal].is_fully_expanded());
    }

    #[test]
    fn simulate_runs_to_completion() {
        let state = GameState::new_game(3, Rules::general());
        let mut rollout = RandomAgent::with_seed(9);
        // Any outcome is acceptable; the game must simply finish.
        let _ = simulate(&state, &mut rollout);
    }
}
