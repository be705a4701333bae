//! CLI command implementations, one module per concern.

pub mod commerce;
pub mod distribution;
pub mod keys;
pub mod loyalty;

use anyhow::{Result, anyhow};
use merit_core::address::Address;
use merit_service::ServiceContext;
use merit_service::protocol::{ErrorBody, Identity, Request, dispatch};

/// Dispatches a request and prints the JSON response to stdout.
///
/// Service errors are rendered as their wire body (stable reason code plus
/// message) on stderr and surfaced as a non-zero exit.
pub fn run_request(ctx: &ServiceContext, identity: Identity, request: Request) -> Result<()> {
    match dispatch(ctx, identity, request) {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(err) => {
            let body = ErrorBody::from(&err);
            eprintln!("{}", serde_json::to_string_pretty(&body)?);
            Err(anyhow!("{}: {}", body.code, body.message))
        }
    }
}

/// Parses a wallet argument into the caller identity.
pub fn wallet_identity(raw: &str) -> Result<Identity> {
    let address: Address = raw
        .parse()
        .map_err(|err| anyhow!("invalid wallet address: {err}"))?;
    Ok(Identity::Wallet(address))
}
