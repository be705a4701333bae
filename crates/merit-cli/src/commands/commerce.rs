//! Product, order, and badge ticket commands.

use anyhow::{Result, bail};
use clap::Subcommand;
use merit_service::ServiceContext;
use merit_service::protocol::{Identity, MarkClaimedTarget, Request};

use super::{run_request, wallet_identity};

/// Product management subcommands (operator).
#[derive(Subcommand, Debug)]
pub enum ProductCommand {
    /// Create a product
    Create {
        /// Product identifier
        product_id: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Badge contract address, if the product mints a badge
        #[arg(long)]
        badge_contract: Option<String>,

        /// Token identifier within the badge contract
        #[arg(long)]
        badge_token_id: Option<u64>,
    },
}

/// Order lifecycle subcommands (operator).
#[derive(Subcommand, Debug)]
pub enum OrderCommand {
    /// Create a pending order
    Create {
        /// Order identifier
        order_id: String,

        /// Buyer wallet
        #[arg(long)]
        buyer: String,

        /// Product identifier
        #[arg(long)]
        product: String,

        /// Purchased quantity
        #[arg(long, default_value_t = 1)]
        quantity: u64,
    },

    /// Complete a pending order (drives badge issuance)
    Complete {
        /// Order identifier
        order_id: String,
    },
}

/// Badge ticket subcommands.
#[derive(Subcommand, Debug)]
pub enum BadgeCommand {
    /// Fetch a badge ticket by order or by product
    Ticket {
        /// Wallet requesting its own ticket
        #[arg(long)]
        wallet: String,

        /// Query by order identifier
        #[arg(long, conflicts_with = "product")]
        order: Option<String>,

        /// Query by product identifier (latest completed order)
        #[arg(long)]
        product: Option<String>,
    },

    /// Record that a badge claim was consumed externally (operator)
    MarkClaimed {
        /// The owning order
        order_id: String,
    },
}

/// Runs a product subcommand as the operator.
pub fn run_product(ctx: &ServiceContext, command: ProductCommand) -> Result<()> {
    match command {
        ProductCommand::Create {
            product_id,
            name,
            badge_contract,
            badge_token_id,
        } => run_request(
            ctx,
            Identity::Operator,
            Request::CreateProduct {
                product_id,
                name,
                badge_contract,
                badge_token_id,
            },
        ),
    }
}

/// Runs an order subcommand as the operator.
pub fn run_order(ctx: &ServiceContext, command: OrderCommand) -> Result<()> {
    match command {
        OrderCommand::Create {
            order_id,
            buyer,
            product,
            quantity,
        } => run_request(
            ctx,
            Identity::Operator,
            Request::CreateOrder {
                order_id,
                buyer,
                product_id: product,
                quantity,
            },
        ),
        OrderCommand::Complete { order_id } => run_request(
            ctx,
            Identity::Operator,
            Request::CompleteOrder { order_id },
        ),
    }
}

/// Runs a badge subcommand.
pub fn run_badge(ctx: &ServiceContext, command: BadgeCommand) -> Result<()> {
    match command {
        BadgeCommand::Ticket {
            wallet,
            order,
            product,
        } => {
            let identity = wallet_identity(&wallet)?;
            let request = match (order, product) {
                (Some(order_id), None) => Request::GetBadgeTicketByOrder { order_id },
                (None, Some(product_id)) => Request::GetBadgeTicketByProduct { product_id },
                _ => bail!("pass exactly one of --order or --product"),
            };
            run_request(ctx, identity, request)
        }
        BadgeCommand::MarkClaimed { order_id } => run_request(
            ctx,
            Identity::Operator,
            Request::MarkClaimed {
                target: MarkClaimedTarget::Badge { order_id },
            },
        ),
    }
}
