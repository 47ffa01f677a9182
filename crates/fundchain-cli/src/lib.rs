#![forbid(unsafe_code)]
//! `fundchain` command-line client.
//!
//! Each subcommand is one user action from the web client: it checks the locally decoded
//! session, runs the pure policies, then talks to the backend, the contract, or both.
//! Payloads go to stdout (compact with `--json`), errors and logs to stderr.

mod actions;
mod commands;
mod config;
mod logging;
mod output;
mod views;
mod workflows;

use clap::{error::ErrorKind, ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Generator, Shell};
use fundchain_core::{
    resolve_fundchain_cache_dir, resolve_fundchain_config_path, ConfigPathScope, ExitCode,
    MachineError,
};
use fundchain_model::ApprovalDecision;
use fundchain_policies::ProfileUpdateForm;
use serde_json::json;
use std::process::ExitCode as ProcessExitCode;

use actions::{AppContext, CreateCampaignArgs};
use commands::{
    CampaignsCommand, FundraisersCommand, ProfileCommand, RewardsCommand, SignupCommand, TrackBy,
};
use output::{emit_error, emit_ok, CliError, OutputMode};

pub use config::ClientConfig;
pub use logging::{build_filter, init_tracing, LogFlags};
pub use views::{CampaignDetail, ViewContext};
pub use workflows::{CampaignCreated, Outcome, UpdatePosted, WorkflowStep, Workflows};

pub const CRATE_NAME: &str = "fundchain-cli";

const FUNDCHAIN_HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
Usage: {usage}

Options:
{options}

Commands:
{subcommands}

{after-help}";

#[derive(Parser)]
#[command(name = "fundchain", version)]
#[command(about = "Crowdfunding client for the fundchain contract and backend")]
#[command(help_template = FUNDCHAIN_HELP_TEMPLATE)]
#[command(
    after_help = "Environment:\n  FUNDCHAIN_BACKEND_URL        Campaign backend base URL\n  FUNDCHAIN_RPC_URL            Wallet or node JSON-RPC endpoint\n  FUNDCHAIN_CONTRACT_ADDRESS   Crowdfunding contract\n  FUNDCHAIN_NFT_ADDRESS        Reward token contract\n  FUNDCHAIN_EXPLORER_API_KEY   Block explorer key\n  FUNDCHAIN_LOG_LEVEL          Log verbosity override\n  FUNDCHAIN_CACHE_DIR          Token and cache directory"
)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long, global = true, default_value_t = false)]
    trace: bool,
    #[arg(long = "print-config-paths", default_value_t = false)]
    print_config_paths: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Resolved settings; secrets are left out.
    Config,
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Whoami,
    Signup {
        #[command(subcommand)]
        command: SignupCommand,
    },
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    Campaigns {
        #[command(subcommand)]
        command: Box<CampaignsCommand>,
    },
    Invest {
        id: String,
        /// Amount in ether.
        #[arg(long)]
        amount: String,
    },
    Vote {
        id: String,
        #[arg(long, default_value_t = false)]
        against: bool,
    },
    Refund {
        id: String,
    },
    ClaimReward {
        id: String,
    },
    /// Post a progress update; owners only.
    Update {
        id: String,
        /// `YYYY-MM-DD`.
        #[arg(long)]
        date: String,
        #[arg(long)]
        description: String,
    },
    Rewards {
        #[command(subcommand)]
        command: RewardsCommand,
    },
    Fundraisers {
        #[command(subcommand)]
        command: FundraisersCommand,
    },
    /// Look up transactions on the block explorer.
    Track {
        #[arg(long, value_enum, default_value_t = TrackBy::Address)]
        by: TrackBy,
        query: String,
    },
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code as u8)
        }
    }
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => {
                return Err(CliError {
                    exit_code: ExitCode::Usage,
                    machine: MachineError::new("usage_error", "invalid command line arguments")
                        .with_detail("error", &err.to_string()),
                });
            }
        },
    };
    let output_mode = OutputMode { json: cli.json };
    if cli.print_config_paths {
        return emit_config_paths(output_mode);
    }
    let command = cli
        .command
        .ok_or_else(|| CliError::usage("missing command; see --help"))?;
    let log_flags = LogFlags {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
    };

    if let Commands::Completion { shell } = command {
        print_completion(shell);
        return Ok(());
    }

    let config = ClientConfig::from_env();
    init_tracing(log_flags, config.log_json);
    config.validate()?;

    if let Commands::Config = command {
        let resolved = serde_json::to_value(&config).map_err(|e| CliError::internal(e.to_string()))?;
        return emit_ok(
            output_mode,
            &json!({
                "config": resolved,
                "explorer_api_key_set": config.explorer_api_key.is_some(),
                "env": ClientConfig::env_names(),
            }),
        );
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::internal(format!("async runtime failed to start: {e}")))?;
    let ctx = AppContext::new(config, output_mode);
    runtime.block_on(run_command(&ctx, command))
}

async fn run_command(ctx: &AppContext, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Completion { .. } | Commands::Config => Ok(()),
        Commands::Login { email, password } => actions::login(ctx, email, password).await,
        Commands::Logout => actions::logout(ctx),
        Commands::Whoami => actions::whoami(ctx),
        Commands::Signup { command } => match command {
            SignupCommand::Investor { form } => actions::signup_investor(ctx, form).await,
            SignupCommand::Fundraiser { form, documents } => {
                actions::signup_fundraiser(ctx, form, documents).await
            }
        },
        Commands::Profile { command } => match command {
            ProfileCommand::Show => actions::profile_show(ctx).await,
            ProfileCommand::Update {
                username,
                email,
                phone_number,
                picture,
            } => {
                actions::profile_update(
                    ctx,
                    ProfileUpdateForm {
                        username,
                        email,
                        phone_number,
                    },
                    picture,
                )
                .await
            }
        },
        Commands::Campaigns { command } => match *command {
            CampaignsCommand::Browse {
                search,
                active,
                sort,
            } => actions::browse(ctx, search, active, sort).await,
            CampaignsCommand::Show { id } => actions::show_campaign(ctx, &id).await,
            CampaignsCommand::Mine => actions::my_campaigns(ctx).await,
            CampaignsCommand::Create {
                title,
                description,
                risk,
                location,
                target,
                deadline,
                rewards,
                image,
            } => {
                actions::create_campaign(
                    ctx,
                    CreateCampaignArgs {
                        title,
                        description,
                        risk,
                        location,
                        target,
                        deadline,
                        rewards,
                        image,
                    },
                )
                .await
            }
        },
        Commands::Invest { id, amount } => actions::invest(ctx, &id, &amount).await,
        Commands::Vote { id, against } => actions::vote(ctx, &id, !against).await,
        Commands::Refund { id } => actions::refund(ctx, &id).await,
        Commands::ClaimReward { id } => actions::claim_reward(ctx, &id).await,
        Commands::Update {
            id,
            date,
            description,
        } => actions::post_update(ctx, &id, date, description).await,
        Commands::Rewards { command } => match command {
            RewardsCommand::Description => actions::reward_description(ctx).await,
            RewardsCommand::Show { token_id } => actions::reward_show(ctx, &token_id).await,
            RewardsCommand::Redeem { token_id } => actions::reward_redeem(ctx, &token_id).await,
        },
        Commands::Fundraisers { command } => match command {
            FundraisersCommand::List => actions::list_fundraisers(ctx).await,
            FundraisersCommand::Approve { id } => {
                actions::decide_fundraiser(ctx, &id, ApprovalDecision::Approved).await
            }
            FundraisersCommand::Disapprove { id } => {
                actions::decide_fundraiser(ctx, &id, ApprovalDecision::Disapproved).await
            }
        },
        Commands::Track { by, query } => actions::track(ctx, by, &query).await,
    }
}

fn print_completion<G: Generator>(generator: G) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    generate(generator, &mut command, name, &mut std::io::stdout());
}

fn emit_config_paths(output_mode: OutputMode) -> Result<(), CliError> {
    emit_ok(
        output_mode,
        &json!({
            "workspace_config": resolve_fundchain_config_path(ConfigPathScope::Workspace),
            "user_config": resolve_fundchain_config_path(ConfigPathScope::User),
            "cache_dir": resolve_fundchain_cache_dir(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn vote_defaults_to_in_favor() {
        let cli = Cli::try_parse_from(["fundchain", "vote", "7"]).expect("parse");
        match cli.command {
            Some(Commands::Vote { id, against }) => {
                assert_eq!(id, "7");
                assert!(!against);
            }
            _ => panic!("expected vote"),
        }
    }

    #[test]
    fn repeated_rewards_and_documents_collect() {
        let cli = Cli::try_parse_from([
            "fundchain",
            "campaigns",
            "create",
            "--title",
            "t",
            "--description",
            "d",
            "--risk",
            "r",
            "--location",
            "l",
            "--target",
            "1",
            "--deadline",
            "2030-01-01T00:00",
            "--reward",
            "1:Mug",
            "--reward",
            "2:Hat",
            "--image",
            "cover.png",
        ])
        .expect("parse");
        let Some(Commands::Campaigns { command }) = cli.command else {
            panic!("expected campaigns");
        };
        let CampaignsCommand::Create { rewards, .. } = *command else {
            panic!("expected create");
        };
        assert_eq!(rewards, vec!["1:Mug".to_string(), "2:Hat".to_string()]);
    }
}
