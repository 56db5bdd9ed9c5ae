#![allow(dead_code)]

mod agent;
mod api;
mod app;
mod channels;
mod config;
mod logging;
mod persistence;
mod prompt;
mod session;
mod streaming;
mod tools;
mod ui;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run an agentic task from the terminal", long_about = None)]
struct Args {
    /// The task to perform
    task: String,

    /// Model id, overriding the configured default
    #[arg(long)]
    model: Option<String>,

    /// Chat-completions endpoint base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Maximum number of conversation turns
    #[arg(long)]
    max_turns: Option<u32>,

    /// Tool names the task may use (repeatable); defaults to all built-ins
    #[arg(long = "allow")]
    allow: Vec<String>,

    /// Named session to resume or create; omitted runs are not persisted
    #[arg(long)]
    session: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let result = app::run(app::RunOptions {
        task: args.task,
        model: args.model,
        base_url: args.base_url,
        max_turns: args.max_turns,
        allow: args.allow,
        session: args.session,
    })?;

    app::print_result(&result);
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
