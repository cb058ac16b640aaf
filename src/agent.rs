//! Move-selecting agents and the oracle traits the search agents consume.

use crate::board::{Move, Player};
use crate::rules::GameState;

/// Anything that can pick a move for the next player.
pub trait Agent {
    fn select_move(&mut self, state: &GameState) -> Move;
}

/// Playouts longer than this are abandoned as drawn. Random games on small
/// boards essentially always finish well within three moves per point.
pub(crate) fn rollout_limit(board_size: usize) -> usize {
    3 * board_size * board_size
}

/// Picks uniformly among legal moves, refusing to fill its own eyes unless
/// nothing else is left. Fast enough to drive playouts.
pub struct RandomAgent {
    rng: fastrand::Rng,
}

impl RandomAgent {
    pub fn new() -> RandomAgent {
        RandomAgent {
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(seed: u64) -> RandomAgent {
        RandomAgent {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for RandomAgent {
    fn default() -> RandomAgent {
        RandomAgent::new()
    }
}

impl Agent for RandomAgent {
    fn select_move(&mut self, state: &GameState) -> Move {
        let moves = state.legal_moves();

        let candidates: Vec<Move> = moves
            .iter()
            .copied()
            .filter(|&mv| match mv {
                Move::Play(point) => !state.board().is_point_an_eye(state.next_player(), point),
                _ => false,
            })
            .collect();

        if let Some(&mv) = self.rng.choice(&candidates) {
            return mv;
        }
        // Only eye fills (or nothing) left.
        self.rng.choice(&moves).copied().unwrap_or(Move::Pass)
    }
}

/// A greedy capture-game player: win in one if possible, save any own chain
/// in atari, otherwise press the opponent's weakest chain, and extend its
/// own weakest chain when there is nothing to attack.
pub struct CaptureAgent;

impl Agent for CaptureAgent {
    fn select_move(&mut self, state: &GameState) -> Move {
        let player = state.next_player();
        let board = state.board();

        // Capture in one move.
        for chain in board.chains() {
            if chain.player != player && chain.num_liberties() == 1 {
                let &point = chain.liberties.iter().next().unwrap();
                if state.is_valid_move(Move::Play(point)) {
                    return Move::Play(point);
                }
            }
        }

        // Escape atari by extending.
        let own_in_atari = board
            .chains()
            .filter(|chain| chain.player == player && chain.num_liberties() == 1)
            .min_by_key(|chain| chain.stones.len());
        if let Some(chain) = own_in_atari {
            let &point = chain.liberties.iter().next().unwrap();
            if state.is_valid_move(Move::Play(point)) {
                return Move::Play(point);
            }
        }

        // Press the enemy chain with the fewest liberties.
        let weakest_enemy = board
            .chains()
            .filter(|chain| chain.player != player)
            .min_by_key(|chain| chain.num_liberties());
        if let Some(chain) = weakest_enemy {
            let mut liberties: Vec<_> = chain.liberties.iter().copied().collect();
            liberties.sort();
            for point in liberties {
                if state.is_valid_move(Move::Play(point)) {
                    return Move::Play(point);
                }
            }
        }

        // Reinforce the own chain with the fewest liberties.
        let weakest_own = board
            .chains()
            .filter(|chain| chain.player == player)
            .min_by_key(|chain| chain.num_liberties());
        if let Some(chain) = weakest_own {
            let mut liberties: Vec<_> = chain.liberties.iter().copied().collect();
            liberties.sort();
            for point in liberties {
                if state.is_valid_move(Move::Play(point)) {
                    return Move::Play(point);
                }
            }
        }

        state
            .legal_moves()
            .first()
            .copied()
            .unwrap_or(Move::Resign)
    }
}

/// Decides when a wrapped agent should stop playing and pass.
pub trait TerminationStrategy {
    fn should_pass(&self, state: &GameState) -> bool;
}

/// Passes as soon as the opponent has passed, which lets a game against a
/// polite opponent end instead of playing the board full.
pub struct PassWhenOpponentPasses;

impl TerminationStrategy for PassWhenOpponentPasses {
    fn should_pass(&self, state: &GameState) -> bool {
        state.last_move() == Some(Move::Pass)
    }
}

/// Wraps an agent with a termination strategy.
pub struct TerminationAgent<A, S> {
    agent: A,
    strategy: S,
}

impl<A: Agent, S: TerminationStrategy> TerminationAgent<A, S> {
    pub fn new(agent: A, strategy: S) -> TerminationAgent<A, S> {
        TerminationAgent { agent, strategy }
    }
}

impl<A: Agent, S: TerminationStrategy> Agent for TerminationAgent<A, S> {
    fn select_move(&mut self, state: &GameState) -> Move {
        if state.rules().pass_allowed && self.strategy.should_pass(state) {
            Move::Pass
        } else {
            self.agent.select_move(state)
        }
    }
}

/// A move together with the prior probability an oracle assigns to it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MovePrediction {
    pub mv: Move,
    pub probability: f32,
}

impl MovePrediction {
    pub fn new(mv: Move, probability: f32) -> MovePrediction {
        MovePrediction { mv, probability }
    }

    /// A certain pass, the fallback when an oracle has nothing to offer.
    pub fn pass() -> MovePrediction {
        MovePrediction::new(Move::Pass, 1.0)
    }
}

/// Ranks candidate moves for a position.
pub trait PolicyOracle {
    fn predict(&self, state: &GameState) -> Vec<MovePrediction>;
}

/// Estimates the next player's winning probability for a position.
pub trait ValueOracle {
    fn estimate(&self, state: &GameState) -> f32;
}

/// A policy with no opinion: every legal move gets the same probability.
pub struct UniformPolicy;

impl PolicyOracle for UniformPolicy {
    fn predict(&self, state: &GameState) -> Vec<MovePrediction> {
        let moves = state.legal_moves();
        let probability = 1.0 / moves.len().max(1) as f32;
        moves
            .into_iter()
            .map(|mv| MovePrediction::new(mv, probability))
            .collect()
    }
}

/// Plays a full game between two agents, starting from `state`, and returns
/// the terminal state. Games that exceed the rollout limit are cut off.
pub fn run_game<'a>(
    mut state: GameState,
    black: &'a mut dyn Agent,
    white: &'a mut dyn Agent,
) -> GameState {
    let limit = rollout_limit(state.board().size());

    for _ in 0..limit {
        if state.is_over() {
            break;
        }
        let agent = match state.next_player() {
            Player::Black => &mut *black,
            Player::White => &mut *white,
        };
        let mv = agent.select_move(&state);
        state = state.apply_move(mv);
    }
    state
}
