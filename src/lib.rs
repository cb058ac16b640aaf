//! Tengen: a Go rules engine with a family of Monte Carlo tree search agents.
//!
//! The crate splits into a rules core and an agent layer:
//!
//! - [`board`] - Stones, chains, liberties, and capture resolution
//! - [`topology`] - Precomputed neighbor tables and Zobrist constants per board size
//! - [`rules`] - Rule descriptors, move validation, and immutable game states
//! - [`scoring`] - Territory flood fill and final results
//! - [`agent`] - The [`Agent`](agent::Agent) trait, baseline agents, and oracle traits
//! - [`mcts`] - Single-threaded UCT search
//! - [`deep`] - PUCT search guided by policy and value oracles
//! - [`parallel`] - Root-parallel UCT search over one shared tree
//!
//! ## Example
//!
//! ```
//! use tengen::agent::Agent;
//! use tengen::board::Move;
//! use tengen::mcts::MctsAgent;
//! use tengen::rules::{GameState, Rules};
//!
//! // Start a 5x5 game and let the search answer the first move.
//! let state = GameState::new_game(5, Rules::general());
//! let state = state.play(Move::from_a1("C3", 5).unwrap()).unwrap();
//!
//! let mut agent = MctsAgent::new(100, 1.4);
//! let reply = agent.select_move(&state);
//! assert!(state.is_valid_move(reply));
//! ```

pub mod agent;
pub mod board;
pub mod deep;
pub mod mcts;
pub mod parallel;
pub mod rules;
pub mod scoring;
pub mod topology;
