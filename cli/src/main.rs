//! # Tile Merge CLI
//!
//! Play in the terminal, or run headless simulations with a simple policy.
//! Logs go to stderr and are filtered with `RUST_LOG` (default `warn`).

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use tile_merge_core::{Direction, Game, GameConfig, Transition};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tile-merge")]
#[command(author, version, about = "Play the tile merge puzzle in the terminal or run simulations")]
struct Args {
    /// Side length of the grid
    #[arg(long, default_value = "4")]
    size: usize,

    /// Number of episodes to run in headless mode (interactive if omitted)
    #[arg(short, long)]
    episodes: Option<u32>,

    /// Random seed for deterministic runs
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Maximum steps per episode (0 = unlimited)
    #[arg(short, long, default_value = "10000")]
    max_steps: u32,

    /// Policy for headless mode
    #[arg(short, long, value_enum, default_value = "random")]
    policy: Policy,

    /// Show the grid after each move in headless mode
    #[arg(long)]
    verbose: bool,

    /// Emit headless results as JSON lines
    #[arg(long)]
    json: bool,
}

impl Args {
    fn config(&self) -> GameConfig {
        GameConfig {
            size: self.size,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
enum Policy {
    /// Random legal moves
    Random,
    /// Cycle through directions: Left, Down, Right, Up
    Cycle,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    debug!(?args, "parsed arguments");

    match args.episodes {
        Some(episodes) => run_headless(&args, episodes),
        None => run_interactive(&args),
    }
}

// -----------------------------------------------------------------------------
// Interactive mode
// -----------------------------------------------------------------------------

const BANNER: &str = "=== Tile Merge ===\nControls: WASD or Arrow Keys | Q to quit | R to restart\n";

fn run_interactive(args: &Args) -> Result<()> {
    let mut game = Game::new(args.config()).context("failed to start game")?;
    let _raw = RawMode::enable();
    let mut stdin = io::stdin();
    let mut buffer = [0u8; 3];

    redraw(&game, None)?;

    loop {
        let bytes_read = stdin.read(&mut buffer).context("failed to read input")?;
        if bytes_read == 0 {
            break;
        }

        match parse_input(&buffer[..bytes_read]) {
            Key::Move(direction) => {
                if game.is_over() {
                    continue;
                }
                let transition = game.handle_direction(direction)?;
                redraw(&game, Some(&transition))?;
            }
            Key::Restart => {
                game.reset().context("failed to reset game")?;
                info!("restarted");
                redraw(&game, None)?;
            }
            Key::Quit => {
                println!("\nGoodbye!");
                break;
            }
            Key::Other => {}
        }
    }
    Ok(())
}

fn redraw(game: &Game, transition: Option<&Transition>) -> Result<()> {
    let mut out = io::stdout().lock();
    write!(out, "\x1b[2J\x1b[H")?; // Clear screen
    writeln!(out, "{}", BANNER)?;
    write!(out, "{}", game)?;

    if let Some(t) = transition {
        if t.score_delta > 0 {
            writeln!(out, "  +{} points!", t.score_delta)?;
        }
        if t.game_over {
            writeln!(out, "\n  *** GAME OVER ***")?;
            writeln!(out, "  Final Score: {}", game.score())?;
            writeln!(out, "  Max Tile: {}", game.max_tile())?;
            writeln!(out, "\n  Press R to restart or Q to quit")?;
        }
    }
    out.flush()?;
    Ok(())
}

enum Key {
    Move(Direction),
    Restart,
    Quit,
    Other,
}

fn parse_input(bytes: &[u8]) -> Key {
    match bytes {
        // Arrow keys (escape sequences)
        [27, 91, 65] => Key::Move(Direction::Up),
        [27, 91, 66] => Key::Move(Direction::Down),
        [27, 91, 67] => Key::Move(Direction::Right),
        [27, 91, 68] => Key::Move(Direction::Left),

        [b'w' | b'W'] => Key::Move(Direction::Up),
        [b's' | b'S'] => Key::Move(Direction::Down),
        [b'a' | b'A'] => Key::Move(Direction::Left),
        [b'd' | b'D'] => Key::Move(Direction::Right),

        [b'q' | b'Q' | 3 | 27] => Key::Quit, // q, Ctrl+C, Esc
        [b'r' | b'R'] => Key::Restart,

        _ => Key::Other,
    }
}

// -----------------------------------------------------------------------------
// Headless mode
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EpisodeReport {
    episode: u32,
    seed: u64,
    score: u64,
    max_tile: u32,
    steps: u32,
    game_over: bool,
}

#[derive(Debug, Serialize)]
struct Summary {
    episodes: u32,
    policy: Policy,
    seed: u64,
    size: usize,
    max_steps: u32,
    avg_score: f64,
    median_score: f64,
    min_score: u64,
    max_score: u64,
    max_tile_overall: u32,
    tile_distribution: BTreeMap<u32, u32>,
}

fn run_headless(args: &Args, episodes: u32) -> Result<()> {
    let mut reports = Vec::with_capacity(episodes as usize);
    // Separate RNG for move selection so the policy never perturbs spawns.
    let mut policy_rng = SmallRng::seed_from_u64(args.seed.wrapping_add(1000));

    for episode in 0..episodes {
        let seed = args.seed.wrapping_add(u64::from(episode));
        let mut game = Game::new(GameConfig { seed, ..args.config() })
            .with_context(|| format!("failed to start episode {}", episode + 1))?;
        let mut steps = 0;
        let mut cycle = 0;

        while !game.is_over() && (args.max_steps == 0 || steps < args.max_steps) {
            let legal = game.legal_directions();
            let choice = match args.policy {
                Policy::Random => select_random(&legal, &mut policy_rng),
                Policy::Cycle => select_cycle(&legal, &mut cycle),
            };
            let Some(direction) = choice else {
                break;
            };

            game.handle_direction(direction)?;
            steps += 1;

            if args.verbose && !args.json {
                println!("Episode {} Step {}: {}", episode + 1, steps, direction);
                print!("{}", game);
            }
        }

        let report = EpisodeReport {
            episode: episode + 1,
            seed,
            score: game.score(),
            max_tile: game.max_tile(),
            steps,
            game_over: game.is_over(),
        };
        info!(episode = report.episode, score = report.score, steps, "episode finished");
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else if args.verbose {
            println!(
                "Episode {}: Score={}, MaxTile={}, Steps={}",
                report.episode, report.score, report.max_tile, report.steps
            );
        }
        reports.push(report);
    }

    let summary = summarize(args, &reports);
    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn summarize(args: &Args, reports: &[EpisodeReport]) -> Summary {
    let mut scores: Vec<u64> = reports.iter().map(|r| r.score).collect();
    scores.sort_unstable();

    let count = scores.len();
    let avg_score = if count == 0 {
        0.0
    } else {
        scores.iter().sum::<u64>() as f64 / count as f64
    };
    let median_score = match count {
        0 => 0.0,
        n if n % 2 == 0 => (scores[n / 2 - 1] + scores[n / 2]) as f64 / 2.0,
        n => scores[n / 2] as f64,
    };

    let mut tile_distribution = BTreeMap::new();
    for report in reports {
        *tile_distribution.entry(report.max_tile).or_insert(0) += 1;
    }

    Summary {
        episodes: count as u32,
        policy: args.policy,
        seed: args.seed,
        size: args.size,
        max_steps: args.max_steps,
        avg_score,
        median_score,
        min_score: scores.first().copied().unwrap_or(0),
        max_score: scores.last().copied().unwrap_or(0),
        max_tile_overall: reports.iter().map(|r| r.max_tile).max().unwrap_or(0),
        tile_distribution,
    }
}

fn print_summary(summary: &Summary) {
    println!("=== Simulation Results ===");
    println!("episodes={}", summary.episodes);
    println!("policy={:?}", summary.policy);
    println!("seed={}", summary.seed);
    println!("size={}", summary.size);
    println!("max_steps={}", summary.max_steps);
    println!("avg_score={:.2}", summary.avg_score);
    println!("median_score={:.2}", summary.median_score);
    println!("min_score={}", summary.min_score);
    println!("max_score={}", summary.max_score);
    println!("max_tile_overall={}", summary.max_tile_overall);
    let distribution: Vec<String> = summary
        .tile_distribution
        .iter()
        .map(|(tile, count)| format!("{}:{}", tile, count))
        .collect();
    println!("tile_distribution={}", distribution.join(","));
}

/// Pick a uniformly random legal direction.
fn select_random(legal: &[bool; 4], rng: &mut SmallRng) -> Option<Direction> {
    let valid: Vec<Direction> = Direction::all()
        .into_iter()
        .zip(legal)
        .filter(|(_, &ok)| ok)
        .map(|(dir, _)| dir)
        .collect();

    if valid.is_empty() {
        None
    } else {
        Some(valid[rng.gen_range(0..valid.len())])
    }
}

/// Try directions in the order Left, Down, Right, Up, resuming where the last
/// call stopped.
fn select_cycle(legal: &[bool; 4], cycle: &mut usize) -> Option<Direction> {
    const ORDER: [Direction; 4] = [
        Direction::Left,
        Direction::Down,
        Direction::Right,
        Direction::Up,
    ];

    for _ in 0..ORDER.len() {
        let direction = ORDER[*cycle % ORDER.len()];
        *cycle += 1;
        if legal[direction as usize] {
            return Some(direction);
        }
    }
    None
}

// -----------------------------------------------------------------------------
// Terminal raw mode
// -----------------------------------------------------------------------------

/// Puts stdin in non-canonical, no-echo mode and restores it on drop.
struct RawMode {
    #[cfg(unix)]
    saved: Option<libc::termios>,
}

#[cfg(unix)]
impl RawMode {
    fn enable() -> Self {
        use std::os::unix::io::AsRawFd;
        let fd = io::stdin().as_raw_fd();
        // SAFETY: termios is plain old data and tcgetattr fully initializes it
        // on success; the fd belongs to this process for its whole lifetime.
        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &mut termios) != 0 {
                debug!("stdin is not a terminal, skipping raw mode");
                return RawMode { saved: None };
            }
            let saved = termios;
            termios.c_lflag &= !(libc::ICANON | libc::ECHO);
            termios.c_cc[libc::VMIN] = 1;
            termios.c_cc[libc::VTIME] = 0;
            libc::tcsetattr(fd, libc::TCSANOW, &termios);
            RawMode { saved: Some(saved) }
        }
    }
}

#[cfg(unix)]
impl Drop for RawMode {
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;
        if let Some(saved) = self.saved {
            // SAFETY: restores attributes previously read from the same fd.
            unsafe {
                libc::tcsetattr(io::stdin().as_raw_fd(), libc::TCSANOW, &saved);
            }
        }
    }
}

#[cfg(not(unix))]
impl RawMode {
    // Without termios, input is line-buffered and needs Enter after each key.
    fn enable() -> Self {
        RawMode {}
    }
}
