//! Distribution batch commands.

use anyhow::Result;
use clap::Subcommand;
use merit_service::ServiceContext;
use merit_service::protocol::{Identity, MarkClaimedTarget, Request};

use super::run_request;

/// Batch management subcommands (operator).
#[derive(Subcommand, Debug)]
pub enum BatchCommand {
    /// Build and commit the event's distribution batch
    Generate {
        /// Event identifier
        event_id: String,

        /// Roster cap
        #[arg(long, default_value_t = 10_000)]
        max_claimers: u64,
    },

    /// Record that an airdrop claim was consumed externally
    MarkClaimed {
        /// Event identifier
        event_id: String,

        /// The claiming wallet
        wallet: String,
    },
}

/// Runs a batch subcommand as the operator.
pub fn run(ctx: &ServiceContext, command: BatchCommand) -> Result<()> {
    match command {
        BatchCommand::Generate {
            event_id,
            max_claimers,
        } => run_request(
            ctx,
            Identity::Operator,
            Request::GenerateBatch {
                event_id,
                max_claimers,
            },
        ),
        BatchCommand::MarkClaimed { event_id, wallet } => run_request(
            ctx,
            Identity::Operator,
            Request::MarkClaimed {
                target: MarkClaimedTarget::Eligibility { event_id, wallet },
            },
        ),
    }
}
