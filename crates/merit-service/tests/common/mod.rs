//! Shared fixtures for the service integration tests.

// Each integration test binary compiles this module separately and uses a
// different subset of it.
#![allow(dead_code)]

use merit_core::address::Address;
use merit_core::crypto::sign::TicketSigner;
use merit_service::config::ServiceConfig;
use merit_service::protocol::{Identity, Request, Response, dispatch};
use merit_service::store::SqliteStore;
use merit_service::ServiceContext;

/// Deterministic test signer seed.
pub const TEST_SIGNER_SEED: [u8; 32] = [0x42; 32];

/// Builds a test wallet address from a tag byte.
pub fn addr(tag: u8) -> Address {
    Address::new([tag; merit_core::address::ADDRESS_SIZE])
}

/// Builds an in-memory service context with a deterministic signer.
pub fn test_context() -> ServiceContext {
    ServiceContext::new(
        SqliteStore::in_memory().expect("in-memory store"),
        Some(TicketSigner::from_seed_hex(&hex_seed()).expect("test signer")),
        ServiceConfig {
            distributor: addr(0xdd),
            ..ServiceConfig::default()
        },
    )
}

fn hex_seed() -> String {
    TEST_SIGNER_SEED.iter().map(|b| format!("{b:02x}")).collect()
}

/// Dispatches as the operator, panicking on error.
pub fn as_operator(ctx: &ServiceContext, request: Request) -> Response {
    dispatch(ctx, Identity::Operator, request).expect("operator request should succeed")
}

/// Dispatches as a wallet, panicking on error.
pub fn as_wallet(ctx: &ServiceContext, wallet: Address, request: Request) -> Response {
    dispatch(ctx, Identity::Wallet(wallet), request).expect("wallet request should succeed")
}

/// Creates an event with no time window.
pub fn create_event(ctx: &ServiceContext, event_id: &str) {
    as_operator(
        ctx,
        Request::CreateEvent {
            event_id: event_id.to_string(),
            name: format!("Event {event_id}"),
            starts_at: None,
            ends_at: None,
        },
    );
}

/// Creates a badge-eligible product.
pub fn create_badged_product(ctx: &ServiceContext, product_id: &str, contract: Address) {
    as_operator(
        ctx,
        Request::CreateProduct {
            product_id: product_id.to_string(),
            name: format!("Product {product_id}"),
            badge_contract: Some(contract.to_hex()),
            badge_token_id: Some(7),
        },
    );
}

/// Creates a pending order.
pub fn create_order(ctx: &ServiceContext, order_id: &str, buyer: Address, product_id: &str) {
    as_operator(
        ctx,
        Request::CreateOrder {
            order_id: order_id.to_string(),
            buyer: buyer.to_hex(),
            product_id: product_id.to_string(),
            quantity: 1,
        },
    );
}
