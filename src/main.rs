//! Command line front end for the tengen engine.
//!
//! ## Usage
//!
//! - `tengen demo` - Show the engine playing a short demo
//! - `tengen play` - Play a game against the search on the terminal
//! - `tengen selfplay` - Let two search agents play each other

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tengen::agent::Agent;
use tengen::board::{Move, Player};
use tengen::mcts::MctsAgent;
use tengen::parallel::ParallelMctsAgent;
use tengen::rules::{GameState, Rules};
use tengen::scoring::compute_result;

/// Tengen: a Go engine built on Monte Carlo tree search
#[derive(Parser)]
#[command(name = "tengen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a short demo of the engine
    Demo,
    /// Play against the engine; enter moves as A1 coordinates, "pass" or "resign"
    Play {
        /// Board size
        #[arg(long, default_value_t = 9)]
        size: usize,
        /// Search rounds per engine move
        #[arg(long, default_value_t = 4000)]
        rounds: u32,
        /// Use the multi-threaded search
        #[arg(long)]
        parallel: bool,
    },
    /// Watch two engines play each other
    Selfplay {
        /// Board size
        #[arg(long, default_value_t = 9)]
        size: usize,
        /// Search rounds per move
        #[arg(long, default_value_t = 1000)]
        rounds: u32,
    },
}

fn main() -> Result<()> {
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")
        .context("invalid log specification")?
        .start()
        .context("failed to start logger")?;

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Play {
            size,
            rounds,
            parallel,
        }) => play(size, rounds, parallel),
        Some(Commands::Selfplay { size, rounds }) => selfplay(size, rounds),
        Some(Commands::Demo) | None => demo(),
    }
}

fn demo() -> Result<()> {
    println!("Tengen: Go over Monte Carlo tree search\n");

    let mut state = GameState::new_game(5, Rules::general());
    let mut agent = MctsAgent::new(500, 1.4);

    for _ in 0..6 {
        let mv = agent.select_move(&state);
        state = state.apply_move(mv);
        println!("{}", state.describe_last_move());
    }
    println!("\n{}", state.board());
    Ok(())
}

fn play(size: usize, rounds: u32, parallel: bool) -> Result<()> {
    let mut engine: Box<dyn Agent> = if parallel {
        Box::new(ParallelMctsAgent::new(rounds, 1.4))
    } else {
        Box::new(MctsAgent::new(rounds, 1.4))
    };

    let stdin = io::stdin();
    let mut state = GameState::new_game(size, Rules::general());
    println!("{}", state.board());

    while !state.is_over() {
        let mv = match state.next_player() {
            Player::Black => match read_move(&stdin, size)? {
                Some(mv) => mv,
                None => break,
            },
            Player::White => {
                let mv = engine.select_move(&state);
                println!("engine plays {}", mv.to_a1(size));
                mv
            }
        };

        match state.play(mv) {
            Ok(next) => {
                state = next;
                println!("{}", state.board());
            }
            Err(violation) => println!("illegal move: {violation}"),
        }
    }

    report(&state);
    Ok(())
}

fn selfplay(size: usize, rounds: u32) -> Result<()> {
    let mut black = MctsAgent::new(rounds, 1.4);
    let mut white = ParallelMctsAgent::new(rounds, 1.4);
    let mut state = GameState::new_game(size, Rules::general());

    while !state.is_over() {
        let mv = match state.next_player() {
            Player::Black => black.select_move(&state),
            Player::White => white.select_move(&state),
        };
        state = state.apply_move(mv);
        println!("{}", state.describe_last_move());
    }

    println!("\n{}", state.board());
    report(&state);
    Ok(())
}

fn report(state: &GameState) {
    if state.last_move() == Some(Move::Resign) {
        println!("{} wins by resignation", state.next_player());
        return;
    }
    println!("result: {}", compute_result(state));
}

/// Prompt for one move; `None` means end of input.
fn read_move(stdin: &io::Stdin, size: usize) -> Result<Option<Move>> {
    loop {
        print!("your move: ");
        io::stdout().flush().context("failed to flush stdout")?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("failed to read from stdin")?;
        if read == 0 {
            return Ok(None);
        }

        match Move::from_a1(&line, size) {
            Some(mv) => return Ok(Some(mv)),
            None => println!("could not parse {:?}, try e.g. D4, pass or resign", line.trim()),
        }
    }
}
