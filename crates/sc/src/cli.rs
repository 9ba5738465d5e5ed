//! Clap CLI definitions for the `sc` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// sc -- Shortcut cookbook workflows.
///
/// Imports a Pivotal Tracker export into Shortcut and maintains what was
/// imported. Mutating commands are dry runs unless `--apply` is given.
#[derive(Parser, Debug)]
#[command(
    name = "sc",
    about = "Pivotal Tracker import and maintenance workflows for Shortcut",
    long_about = "Imports a Pivotal Tracker export into Shortcut and maintains what was imported. \
                  Mutating commands are dry runs unless --apply is given.",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration file (values can also come from SHORTCUT_* variables).
    #[arg(long, global = true, default_value = "config.json")]
    pub config: PathBuf,

    /// Output the result report as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging (RUST_LOG takes precedence).
    #[arg(short = 'v', long, visible_alias = "debug", global = true)]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // ===== Pivotal import =====
    /// Import the Pivotal Tracker CSV export.
    Import(ApplyArgs),

    /// Delete every entity recorded in the import ledger.
    Delete(ApplyArgs),

    /// Add "Pivotal Tracker Id" comments to imported stories.
    Comments(ApplyArgs),

    /// Remove the comments added by `sc comments`.
    DeleteComments(ApplyArgs),

    // ===== Reports & maintenance =====
    /// Report cycle times for the stories matching a search.
    CycleTime(CycleTimeArgs),

    /// Add a label to every story matching a search.
    Label(LabelArgs),

    // ===== Utilities =====
    /// Generate shell completion scripts.
    Completion(CompletionArgs),

    /// Print version information.
    Version,
}

/// Arguments shared by the mutating workflows.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Perform the changes (default is a dry run).
    #[arg(long)]
    pub apply: bool,
}

/// Arguments for `sc cycle-time`.
#[derive(Args, Debug)]
pub struct CycleTimeArgs {
    /// Shortcut search query, e.g. `type:feature completed:2024-03-01..2024-03-31`.
    #[arg(long)]
    pub query: String,

    /// Write the CSV here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Post the summary to this Slack incoming webhook.
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub slack_webhook: Option<String>,
}

/// Arguments for `sc label`.
#[derive(Args, Debug)]
pub struct LabelArgs {
    /// Label to add.
    #[arg(long)]
    pub name: String,

    /// Shortcut search query selecting the stories.
    #[arg(long)]
    pub query: String,

    /// Perform the changes (default is a dry run).
    #[arg(long)]
    pub apply: bool,
}

/// Arguments for `sc completion`.
#[derive(Args, Debug)]
pub struct CompletionArgs {
    #[command(subcommand)]
    pub command: CompletionCommands,
}

/// Completion subcommands.
#[derive(Subcommand, Debug)]
pub enum CompletionCommands {
    /// Generate Bash completions.
    Bash,
    /// Generate Zsh completions.
    Zsh,
    /// Generate Fish completions.
    Fish,
    /// Generate PowerShell completions.
    Powershell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn apply_defaults_to_dry_run() {
        let cli = Cli::parse_from(["sc", "delete"]);
        match cli.command {
            Some(Commands::Delete(args)) => assert!(!args.apply),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn debug_is_an_alias_for_verbose() {
        let cli = Cli::parse_from(["sc", "--debug", "import", "--apply"]);
        assert!(cli.global.verbose);
        assert!(matches!(cli.command, Some(Commands::Import(ApplyArgs { apply: true }))));
    }
}
