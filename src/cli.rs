use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use controlplane::EntityKind;
use controlplane::settings::{ENV_API_KEY, ENV_BASE_URL, ENV_ENVIRONMENT, ENV_LOG_FILE, ENV_ORG_ID};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kcp")]
#[command(version)]
#[command(about = "Declarative configuration for the Kubiya Control Plane", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest file (TOML, or JSON with a .json extension)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Give up on remote calls after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(flatten)]
    pub provider: ProviderArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Control Plane connection settings
#[derive(Args, Default)]
pub struct ProviderArgs {
    /// API key (bearer token)
    #[arg(long, global = true, env = ENV_API_KEY, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Organization id
    #[arg(long, global = true, env = ENV_ORG_ID)]
    pub org_id: Option<String>,

    /// API base URL
    #[arg(long, global = true, env = ENV_BASE_URL)]
    pub base_url: Option<String>,

    /// Environment label
    #[arg(long, global = true, env = ENV_ENVIRONMENT)]
    pub environment: Option<String>,

    /// Where failed requests are recorded
    #[arg(long, global = true, env = ENV_LOG_FILE, value_name = "PATH")]
    pub log_file: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(TargetArgs),

    /// Make the Control Plane match the manifest
    Apply(ApplyArgs),

    /// Delete every tracked resource
    Destroy(DestroyArgs),

    /// Re-read tracked resources and update state
    Refresh(TargetArgs),

    /// Track an existing resource
    Import {
        /// Entity kind (agent, team, worker_queue, ...)
        kind: EntityKind,

        /// Name to track it under, giving the address `kind.name`
        name: String,

        /// Remote identity
        id: String,
    },

    /// Show tracked state
    Show {
        /// Address to show in full (e.g. agent.svc_bot)
        address: Option<String>,
    },

    /// Manage tracked state without touching the Control Plane
    #[command(subcommand)]
    State(StateCommand),

    /// List remote records of a kind
    List {
        /// Entity kind
        kind: EntityKind,

        /// Environment id, required for worker queues
        #[arg(long)]
        environment_id: Option<String>,
    },

    /// Print one remote record
    Get {
        /// Entity kind
        kind: EntityKind,

        /// Remote identity
        id: String,
    },

    /// Enable or disable jobs
    #[command(subcommand)]
    Job(JobCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Reconcile
// ============================================================================

#[derive(Args)]
pub struct TargetArgs {
    /// Only this kind or address (e.g. agent, agent.svc_bot)
    pub target: Option<String>,

    /// Number of parallel reads
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only this kind or address (e.g. agent, agent.svc_bot)
    pub target: Option<String>,

    /// Show the plan without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Only this kind or address (e.g. agent, agent.svc_bot)
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

// ============================================================================
// State Commands
// ============================================================================

#[derive(Subcommand)]
pub enum StateCommand {
    /// List tracked addresses
    List {
        /// Only this kind or address
        target: Option<String>,
    },

    /// Stop tracking an address
    Rm {
        /// Address to forget
        address: String,
    },
}

// ============================================================================
// Job Commands
// ============================================================================

#[derive(Subcommand)]
pub enum JobCommand {
    /// Enable a job
    Enable {
        /// Job id
        id: String,
    },

    /// Disable a job
    Disable {
        /// Job id
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "kcp", "-vv", "--file", "prod.toml", "apply", "agent", "--yes", "-j", "8",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.file, Some(PathBuf::from("prod.toml")));
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.target.as_deref(), Some("agent"));
                assert!(args.yes);
                assert!(!args.dry_run);
                assert_eq!(args.jobs, 8);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_parse_kind_arguments() {
        let cli = Cli::try_parse_from([
            "kcp",
            "list",
            "worker-queue",
            "--environment-id",
            "env-1",
        ])
        .unwrap();
        match cli.command {
            Command::List {
                kind,
                environment_id,
            } => {
                assert_eq!(kind, EntityKind::WorkerQueue);
                assert_eq!(environment_id.as_deref(), Some("env-1"));
            }
            _ => panic!("expected list"),
        }

        assert!(Cli::try_parse_from(["kcp", "get", "robot", "r1"]).is_err());
    }

    #[test]
    fn test_provider_flags() {
        let cli = Cli::try_parse_from([
            "kcp",
            "plan",
            "--api-key",
            "sk-test",
            "--base-url",
            "http://localhost:8000",
        ])
        .unwrap();
        assert_eq!(cli.provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cli.provider.base_url.as_deref(), Some("http://localhost:8000"));
    }
}
