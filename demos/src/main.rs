//! Feedback RL Demos
//!
//! # Teacher Mode
//!
//! A reference Q-network is trained first with plain DQN, then a fresh
//! student learns with per-step feedback from the reference's greedy policy.
//!
//! ```bash
//! RUST_LOG=info cargo run --release -p demos -- teacher
//! ```
//!
//! # Rater Mode
//!
//! A rater thread pauses the run, reads the last action and posts a rating.
//! With `OPENAI_API_KEY` set, ratings are sent as text and scored by the LLM.
//!
//! ```bash
//! RUST_LOG=info cargo run --release -p demos -- rater
//! ```
//!
//! Set `API_SERVER_URL` to receive the completion callback.

mod common;
mod rater_mode;
mod teacher_mode;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            // Reference policy feedback on the track environment
            "teacher" => teacher_mode::run(),

            // Ratings posted through the control plane
            "rater" => rater_mode::run(),

            _ => {
                println!("Unknown demo: {}", args[1]);
                println!();
                print_usage();
            }
        }
    } else {
        print_usage();
    }
}

fn print_usage() {
    println!("Usage: cargo run --release -p demos -- <demo>");
    println!();
    println!("=============================================================================");
    println!("                         FEEDBACK-AUGMENTED DQN");
    println!("=============================================================================");
    println!();
    println!("  teacher                           Reference-policy feedback");
    println!("                                    Environment: TrackEnv (7 driving actions)");
    println!("                                    Reference trained with plain DQN first");
    println!();
    println!("  rater                             Ratings through the control plane");
    println!("                                    Pause, rate last action, auto-resume");
    println!("                                    LLM scoring when OPENAI_API_KEY is set");
    println!();
    println!("=============================================================================");
    println!("                              ENVIRONMENT");
    println!("=============================================================================");
    println!();
    println!("  RUST_LOG          log filter (default: info)");
    println!("  API_SERVER_URL    completion callback base URL");
    println!("  OPENAI_API_KEY    enables text ratings scored by an LLM");
    println!("  OPENAI_BASE_URL   chat completions endpoint base");
    println!("  OPENAI_MODEL      scoring model");
    println!();
}
