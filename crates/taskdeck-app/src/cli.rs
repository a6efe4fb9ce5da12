use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Taskdeck: see who else has a task open.
#[derive(Parser, Debug)]
#[command(name = "taskdeck", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter override (e.g. "taskdeck=debug").
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a task and stay present on it until interrupted.
    Open {
        /// Task id.
        #[arg(long)]
        task: String,

        /// Subject id to appear as. Without it the task is watched anonymously.
        #[arg(long)]
        user: Option<String>,

        /// Display name shown to other viewers.
        #[arg(long, requires = "user")]
        name: Option<String>,

        /// Avatar URL or asset key.
        #[arg(long, requires = "user")]
        avatar: Option<String>,
    },

    /// List the viewers of a task.
    Viewers {
        /// Task id.
        #[arg(long)]
        task: String,

        /// Keep printing updates until interrupted.
        #[arg(long)]
        follow: bool,
    },

    /// Print the effective configuration as JSON.
    Config,
}

pub fn parse() -> Args {
    Args::parse()
}
