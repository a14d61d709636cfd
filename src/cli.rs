//! Demo CLI definitions (§9 C13). Not part of the core contract (§6): a
//! minimal binary for manually exercising an [`crate::Agent`].

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tg", about = "Demo CLI for the taskgraph scheduler", version)]
pub struct Cli {
    /// Increase log verbosity (can be repeated: -v, -vv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Send a prompt to a fresh Agent and print its result.
    Chat {
        /// The prompt to run as the root task.
        prompt: String,

        /// Enable the demonstration tool set (echo, add, plan_task).
        #[arg(long)]
        with_tools: bool,

        /// Use an in-process mock model instead of a live Anthropic call.
        #[arg(long)]
        mock: bool,
    },
}
