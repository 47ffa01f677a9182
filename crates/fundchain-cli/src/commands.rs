// SPDX-License-Identifier: Apache-2.0

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Args)]
pub(crate) struct SignupArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub confirm_password: String,
    #[arg(long)]
    pub full_name: String,
    #[arg(long)]
    pub phone_number: String,
    #[arg(long)]
    pub wallet: String,
}

#[derive(Subcommand)]
pub(crate) enum SignupCommand {
    Investor {
        #[command(flatten)]
        form: SignupArgs,
    },
    Fundraiser {
        #[command(flatten)]
        form: SignupArgs,
        /// Verification document; repeat for several files.
        #[arg(long = "document")]
        documents: Vec<PathBuf>,
    },
}

#[derive(Subcommand)]
pub(crate) enum ProfileCommand {
    Show,
    Update {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone_number: String,
        /// URL of an already uploaded picture.
        #[arg(long)]
        picture: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum SortCli {
    Deadline,
    Target,
}

#[derive(Subcommand)]
pub(crate) enum CampaignsCommand {
    Browse {
        /// Case-insensitive match on title or description.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = false)]
        active: bool,
        #[arg(long, value_enum)]
        sort: Option<SortCli>,
    },
    Show {
        id: String,
    },
    /// Owned campaigns for fundraisers, funded campaigns for investors.
    Mine,
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        risk: String,
        #[arg(long)]
        location: String,
        /// Target in ether.
        #[arg(long)]
        target: String,
        /// `YYYY-MM-DDTHH:MM`, read as UTC.
        #[arg(long)]
        deadline: String,
        /// `amount:perk`; repeat for several tiers.
        #[arg(long = "reward")]
        rewards: Vec<String>,
        #[arg(long)]
        image: PathBuf,
    },
}

#[derive(Subcommand)]
pub(crate) enum RewardsCommand {
    /// Reward description the contract holds for the active account.
    Description,
    Show {
        token_id: String,
    },
    Redeem {
        token_id: String,
    },
}

#[derive(Subcommand)]
pub(crate) enum FundraisersCommand {
    List,
    Approve { id: String },
    Disapprove { id: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum TrackBy {
    Address,
    Hash,
}

impl TrackBy {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Hash => "hash",
        }
    }
}
