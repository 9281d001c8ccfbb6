//! CLI argument parsing for fanout.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Fanout: delegate prompts to an external completion process, one at a time
/// or as bounded parallel batches.
///
/// Every delegated call starts the configured command, writes the prompt on
/// its stdin, and reads its output until it exits.
#[derive(Parser, Debug)]
#[command(name = "fanout")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command; they override `fanout.yaml`.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Config file (default: ./fanout.yaml if present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Command line of the completion process (e.g. "claude -p").
    #[arg(long = "exec", global = true, value_name = "COMMAND")]
    pub exec: Option<String>,

    /// Working directory for spawned processes.
    #[arg(long, global = true)]
    pub working_dir: Option<PathBuf>,

    /// Maximum number of concurrent calls in a batch.
    #[arg(short = 'j', long, global = true)]
    pub max_concurrency: Option<usize>,

    /// Append diagnostic events as NDJSON to this file.
    #[arg(long, global = true)]
    pub event_log: Option<PathBuf>,

    /// Trace every process event to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands for fanout.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Delegate a single instruction.
    ///
    /// Prints the process output, or fails with the exit code and stderr.
    Delegate(DelegateArgs),

    /// Apply one instruction template to many items in parallel.
    ///
    /// A template containing `{item}` gets each item substituted; any other
    /// template has the item appended. Prints `{"results": [...], "errors": [...]}`.
    Parallel(ParallelArgs),

    /// Map items in parallel, then fold the outputs one step at a time.
    ///
    /// The reduce template receives `{accumulator}` and `{result}`.
    /// Prints `{"result": "...", "errors": [...]}`.
    #[command(name = "map-reduce")]
    MapReduce(MapReduceArgs),

    /// Print the effective configuration as YAML.
    Config,
}

/// Arguments for the `delegate` command.
#[derive(Args, Debug)]
pub struct DelegateArgs {
    /// Instruction text (read from stdin when omitted or `-`).
    pub instruction: Option<String>,

    /// Ask the process for a flat key-value response.
    #[arg(long)]
    pub structured: bool,
}

/// Item sources shared by the batch commands.
#[derive(Args, Debug, Default)]
pub struct ItemArgs {
    /// Item value (repeatable).
    #[arg(long = "item", value_name = "ITEM")]
    pub items: Vec<String>,

    /// File with items: a JSON array of strings or one item per line (`-` for stdin).
    #[arg(long, value_name = "PATH")]
    pub items_file: Option<PathBuf>,
}

/// Arguments for the `parallel` command.
#[derive(Args, Debug)]
pub struct ParallelArgs {
    /// Instruction template applied to every item.
    pub template: String,

    #[command(flatten)]
    pub items: ItemArgs,
}

/// Arguments for the `map-reduce` command.
#[derive(Args, Debug)]
pub struct MapReduceArgs {
    /// Map template; `{item}` is replaced with each item.
    #[arg(long = "map", value_name = "TEMPLATE")]
    pub map_template: String,

    /// Reduce template; `{accumulator}` and `{result}` are replaced at each step.
    #[arg(long = "reduce", value_name = "TEMPLATE")]
    pub reduce_template: String,

    /// Starting accumulator value (default: empty).
    #[arg(long)]
    pub initial: Option<String>,

    #[command(flatten)]
    pub items: ItemArgs,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_delegate_minimal() {
        let cli = Cli::try_parse_from(["fanout", "delegate", "Say hi"]).unwrap();
        if let Command::Delegate(args) = cli.command {
            assert_eq!(args.instruction.as_deref(), Some("Say hi"));
            assert!(!args.structured);
        } else {
            panic!("Expected Delegate command");
        }
    }

    #[test]
    fn parse_delegate_from_stdin() {
        let cli = Cli::try_parse_from(["fanout", "delegate", "--structured"]).unwrap();
        if let Command::Delegate(args) = cli.command {
            assert!(args.instruction.is_none());
            assert!(args.structured);
        } else {
            panic!("Expected Delegate command");
        }
    }

    #[test]
    fn parse_parallel_items() {
        let cli = Cli::try_parse_from([
            "fanout",
            "parallel",
            "Summarize {item}",
            "--item",
            "a.txt",
            "--item",
            "b.txt",
        ])
        .unwrap();
        if let Command::Parallel(args) = cli.command {
            assert_eq!(args.template, "Summarize {item}");
            assert_eq!(args.items.items, vec!["a.txt", "b.txt"]);
            assert!(args.items.items_file.is_none());
        } else {
            panic!("Expected Parallel command");
        }
    }

    #[test]
    fn parse_map_reduce_full() {
        let cli = Cli::try_parse_from([
            "fanout",
            "map-reduce",
            "--map",
            "Count words in {item}",
            "--reduce",
            "Add {accumulator} and {result}",
            "--initial",
            "0",
            "--items-file",
            "files.txt",
        ])
        .unwrap();
        if let Command::MapReduce(args) = cli.command {
            assert_eq!(args.map_template, "Count words in {item}");
            assert_eq!(args.reduce_template, "Add {accumulator} and {result}");
            assert_eq!(args.initial.as_deref(), Some("0"));
            assert_eq!(args.items.items_file, Some(PathBuf::from("files.txt")));
        } else {
            panic!("Expected MapReduce command");
        }
    }

    #[test]
    fn parse_map_reduce_requires_templates() {
        let result = Cli::try_parse_from(["fanout", "map-reduce", "--map", "{item}"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fanout",
            "parallel",
            "go",
            "-j",
            "4",
            "--exec",
            "claude -p",
            "--verbose",
        ])
        .unwrap();
        assert_eq!(cli.global.max_concurrency, Some(4));
        assert_eq!(cli.global.exec.as_deref(), Some("claude -p"));
        assert!(cli.global.verbose);
    }

    #[test]
    fn parse_global_overrides_before_subcommand() {
        let cli = Cli::try_parse_from([
            "fanout",
            "--config",
            "custom.yaml",
            "--event-log",
            "events.ndjson",
            "config",
        ])
        .unwrap();
        assert_eq!(cli.global.config, Some(PathBuf::from("custom.yaml")));
        assert_eq!(cli.global.event_log, Some(PathBuf::from("events.ndjson")));
        assert!(matches!(cli.command, Command::Config));
    }
}
