//! Event, check-in, eligibility, and loyalty point commands.

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Args, Subcommand};
use merit_service::ServiceContext;
use merit_service::protocol::{Identity, Request};

use super::{run_request, wallet_identity};

/// Event management subcommands.
#[derive(Subcommand, Debug)]
pub enum EventCommand {
    /// Create an event
    Create {
        /// Event identifier
        event_id: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Window start (RFC 3339, e.g. 2026-08-01T00:00:00Z)
        #[arg(long)]
        starts: Option<String>,

        /// Window end (RFC 3339)
        #[arg(long)]
        ends: Option<String>,
    },
}

/// Arguments for recording a check-in.
#[derive(Args, Debug)]
pub struct CheckinArgs {
    /// Event identifier
    pub event_id: String,

    /// Wallet checking in
    pub wallet: String,

    /// Optional short code displayed by the venue
    #[arg(long)]
    pub code: Option<String>,
}

/// Arguments for fetching an eligibility ticket.
#[derive(Args, Debug)]
pub struct EligibilityArgs {
    /// Event identifier
    pub event_id: String,

    /// Wallet to query
    pub wallet: String,
}

/// Arguments for fetching a loyalty point total.
#[derive(Args, Debug)]
pub struct PointsArgs {
    /// Wallet to query
    pub wallet: String,
}

fn parse_timestamp(field: &str, raw: &str) -> Result<u64> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("{field} is not an RFC 3339 timestamp: {raw}"))?;
    u64::try_from(parsed.timestamp())
        .map_err(|_| anyhow::anyhow!("{field} precedes the Unix epoch: {raw}"))
}

/// Runs an event subcommand as the operator.
pub fn run_event(ctx: &ServiceContext, command: EventCommand) -> Result<()> {
    match command {
        EventCommand::Create {
            event_id,
            name,
            starts,
            ends,
        } => {
            let starts_at = starts
                .as_deref()
                .map(|raw| parse_timestamp("--starts", raw))
                .transpose()?;
            let ends_at = ends
                .as_deref()
                .map(|raw| parse_timestamp("--ends", raw))
                .transpose()?;
            run_request(
                ctx,
                Identity::Operator,
                Request::CreateEvent {
                    event_id,
                    name,
                    starts_at,
                    ends_at,
                },
            )
        }
    }
}

/// Records a check-in under the wallet's identity.
pub fn run_checkin(ctx: &ServiceContext, args: &CheckinArgs) -> Result<()> {
    run_request(
        ctx,
        wallet_identity(&args.wallet)?,
        Request::Checkin {
            event_id: args.event_id.clone(),
            wallet: args.wallet.clone(),
            code: args.code.clone(),
        },
    )
}

/// Fetches an eligibility ticket under the wallet's identity.
pub fn run_eligibility(ctx: &ServiceContext, args: &EligibilityArgs) -> Result<()> {
    run_request(
        ctx,
        wallet_identity(&args.wallet)?,
        Request::GetEligibility {
            event_id: args.event_id.clone(),
            wallet: args.wallet.clone(),
        },
    )
}

/// Fetches a loyalty point total under the wallet's identity.
pub fn run_points(ctx: &ServiceContext, args: &PointsArgs) -> Result<()> {
    run_request(
        ctx,
        wallet_identity(&args.wallet)?,
        Request::GetPoints {
            wallet: args.wallet.clone(),
        },
    )
}
