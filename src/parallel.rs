//! Root-parallel Monte Carlo tree search.
//!
//! One worker per processing unit runs the full select-expand-simulate-
//! backpropagate loop against a single shared tree. Nodes are linked with
//! `Arc` downward and `Weak` upward; visit and win counters are atomics, so
//! workers never take a lock to score or credit a node. The child list and
//! untried-move queue sit behind mutexes that are held only for pushes and
//! pops, never across a rollout.
//!
//! Concurrent reads of the counters are deliberately racy: a worker may
//! select on slightly stale statistics, which costs a little search quality
//! and buys lock-free scoring.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::agent::{Agent, RandomAgent};
use crate::board::{Move, Player};
use crate::mcts::simulate;
use crate::rules::GameState;

struct SharedNode {
    state: GameState,
    mv: Option<Move>,
    parent: Option<Weak<SharedNode>>,
    children: Mutex<Vec<Arc<SharedNode>>>,
    untried: Mutex<Vec<Move>>,
    visits: AtomicU32,
    wins: [AtomicU32; 2],
}

impl SharedNode {
    fn root(state: GameState) -> Arc<SharedNode> {
        Arc::new(SharedNode::new(state, None, None))
    }

    fn new(state: GameState, mv: Option<Move>, parent: Option<Weak<SharedNode>>) -> SharedNode {
        let mut untried = state.legal_moves();
        fastrand::shuffle(&mut untried);

        SharedNode {
            state,
            mv,
            parent,
            children: Mutex::new(Vec::new()),
            untried: Mutex::new(untried),
            visits: AtomicU32::new(0),
            wins: [AtomicU32::new(0), AtomicU32::new(0)],
        }
    }

    fn visits(&self) -> u32 {
        self.visits.load(Ordering::Relaxed)
    }

    fn win_rate(&self, player: Player) -> f64 {
        let visits = self.visits();
        if visits == 0 {
            return 0.0;
        }
        f64::from(self.wins[player.index()].load(Ordering::Relaxed)) / f64::from(visits)
    }

    fn record(&self, winner: Option<Player>) {
        self.visits.fetch_add(1, Ordering::Relaxed);
        if let Some(player) = winner {
            self.wins[player.index()].fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Root-parallel UCT over random playouts, one worker per core.
pub struct ParallelMctsAgent {
    rounds: u32,
    temperature: f64,
}

impl ParallelMctsAgent {
    pub fn new(rounds: u32, temperature: f64) -> ParallelMctsAgent {
        ParallelMctsAgent {
            rounds,
            temperature,
        }
    }
}

impl Agent for ParallelMctsAgent {
    fn select_move(&mut self, state: &GameState) -> Move {
        let root = SharedNode::root(state.clone());
        let rounds = self.rounds;
        let temperature = self.temperature;

        rayon::broadcast(|context| {
            let per_worker = (rounds as usize / context.num_threads()).max(1);
            let mut rollout = RandomAgent::new();

            for _ in 0..per_worker {
                let leaf = select(&root, temperature);
                let winner = simulate(&leaf.state, &mut rollout);
                backpropagate(&leaf, winner);
            }
        });

        // Robust child: the most visited one.
        let children = root.children.lock().expect("child list poisoned");
        let best = children
            .iter()
            .max_by_key(|child| child.visits())
            .and_then(|child| child.mv);

        let chosen = best.unwrap_or(Move::Pass);
        log::debug!(
            "parallel mcts: {} rounds, {} root children, picked {}",
            self.rounds,
            children.len(),
            chosen.to_a1(state.board().size())
        );
        chosen
    }
}

/// Descend until a node is expanded or a terminal node is reached.
fn select(root: &Arc<SharedNode>, temperature: f64) -> Arc<SharedNode> {
    let mut current = Arc::clone(root);

    while !current.state.is_over() {
        let pending = current.untried.lock().expect("untried queue poisoned").pop();
        if let Some(mv) = pending {
            return expand(&current, mv);
        }

        let children = current.children.lock().expect("child list poisoned");
        let mover = current.state.next_player();
        let best = children
            .iter()
            .max_by(|a, b| {
                let score_a = uct_score(&current, a, mover, temperature);
                let score_b = uct_score(&current, b, mover, temperature);
                score_a.total_cmp(&score_b)
            })
            .map(Arc::clone);
        drop(children);

        match best {
            Some(child) => current = child,
            // Another worker drained the queue but has not attached its
            // child yet; evaluate from here rather than spin.
            None => break,
        }
    }

    current
}

fn expand(parent: &Arc<SharedNode>, mv: Move) -> Arc<SharedNode> {
    let child = Arc::new(SharedNode::new(
        parent.state.apply_move(mv),
        Some(mv),
        Some(Arc::downgrade(parent)),
    ));
    parent
        .children
        .lock()
        .expect("child list poisoned")
        .push(Arc::clone(&child));
    child
}

/// UCT with the same zero-visit guard as the single-threaded search.
fn uct_score(parent: &SharedNode, child: &SharedNode, mover: Player, temperature: f64) -> f64 {
    let parent_visits = parent.visits();
    let child_visits = child.visits();
    if parent_visits == 0 || child_visits == 0 {
        return 0.0;
    }

    let exploration = (f64::from(parent_visits).ln() / f64::from(child_visits)).sqrt();
    child.win_rate(mover) + temperature * exploration
}

fn backpropagate(leaf: &Arc<SharedNode>, winner: Option<Player>) {
    let mut current = Some(Arc::clone(leaf));
    while let Some(node) = current {
        node.record(winner);
        current = node
            .parent
            .as_ref()
            .and_then(|parent| parent.upgrade());
    }
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
    fn agent_returns_a_legal_move() {
        let mut agent = ParallelMctsAgent::new(64, 1.4);
        let state = GameState::new_game(5, Rules::general());

        let mv = agent.select_move(&state);
        assert!(state.is_valid_move(mv));
    }

    #[test]
    fn root_visits_match_the_work_done() {
        let state = GameState::new_game(3, Rules::general());
        let root = SharedNode::root(state);
        let mut rollout = RandomAgent::with_seed(4);

        for _ in 0..10 {
            let leaf = select(&root, 1.4);
            let winner = simulate(&leaf.state, &mut rollout);
            backpropagate(&leaf, winner);
        }

        assert_eq!(root.visits(), 10);
        let child_visits: u32 = root
            .children
            .lock()
            .unwrap()
            .iter()
            .map(|child| child.visits())
            .sum();
        assert_eq!(child_visits, 10);
    }

    #[test]
    fn backpropagation_walks_weak_parent_links() {
        let state = GameState::new_game(3, Rules::general());
        let root = SharedNode::root(state);

        let child = expand(&root, Move::Play(p(1, 1)));
        let grandchild = expand(&child, Move::Play(p(0, 0)));

        backpropagate(&grandchild, Some(Player::Black));

        for node in [&root, &child, &grandchild] {
            assert_eq!(node.visits(), 1);
            assert_eq!(node.wins[Player::Black.index()].load(Ordering::Relaxed), 1);
        }
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

        let mut agent = ParallelMctsAgent::new(400, 1.4);
        assert_eq!(agent.select_move(&state), Move::Play(p(2, 1)));
    }
}
