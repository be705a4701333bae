//! End-to-end airdrop distribution flow.
//!
//! Exercises the full accrual-to-redemption pipeline through the request
//! dispatcher: check-ins accrue eligibility, the operator commits a batch,
//! and wallets fetch proofs that verify against the committed root with the
//! external verifier's algorithm.

mod common;

use common::{addr, as_operator, as_wallet, create_event, test_context};
use merit_core::crypto::hash::decode_digest;
use merit_core::merkle::verify_proof;
use merit_service::protocol::{Identity, MarkClaimedTarget, Request, Response, dispatch};

fn checkin(ctx: &merit_service::ServiceContext, event: &str, tag: u8) -> Response {
    as_wallet(
        ctx,
        addr(tag),
        Request::Checkin {
            event_id: event.to_string(),
            wallet: addr(tag).to_hex(),
            code: Some("GM".to_string()),
        },
    )
}

#[test]
fn test_checkins_accrue_and_batch_serves_verifying_proofs() {
    let ctx = test_context();
    create_event(&ctx, "launch");

    // Three wallets; one of them checks in three times.
    for tag in [0xaa, 0xbb, 0xcc] {
        checkin(&ctx, "launch", tag);
    }
    checkin(&ctx, "launch", 0xaa);
    let Response::Checkin {
        cumulative_amount,
        checkin_count,
        ..
    } = checkin(&ctx, "launch", 0xaa)
    else {
        panic!("expected a check-in response");
    };
    assert_eq!(cumulative_amount, 3000);
    assert_eq!(checkin_count, 3);

    let Response::Batch {
        root,
        total_amount,
        claim_count,
        roster_size,
        ..
    } = as_operator(
        &ctx,
        Request::GenerateBatch {
            event_id: "launch".to_string(),
            max_claimers: 100,
        },
    )
    else {
        panic!("expected a batch response");
    };
    assert_eq!(claim_count, 3);
    assert_eq!(roster_size, 3);
    assert_eq!(total_amount, 5000);
    let root = decode_digest(&root).expect("batch root decodes");

    // Every wallet's served proof verifies against the served root.
    for tag in [0xaa, 0xbb, 0xcc] {
        let Response::Eligibility(ticket) = as_wallet(
            &ctx,
            addr(tag),
            Request::GetEligibility {
                event_id: "launch".to_string(),
                wallet: addr(tag).to_hex(),
            },
        ) else {
            panic!("expected an eligibility response");
        };
        assert!(ticket.eligible);
        assert!(ticket.ready);
        assert_eq!(ticket.claimed, Some(false));

        let proof: Vec<[u8; 32]> = ticket
            .proof
            .expect("proof present")
            .iter()
            .map(|entry| decode_digest(entry).expect("proof entry decodes"))
            .collect();
        verify_proof(
            &root,
            ticket.leaf_index.expect("leaf index present"),
            &addr(tag),
            ticket.amount.expect("amount present"),
            &proof,
        )
        .expect("served proof verifies against served root");
    }
}

#[test]
fn test_regeneration_same_roster_same_root() {
    let ctx = test_context();
    create_event(&ctx, "launch");
    for tag in [0xaa, 0xbb, 0xcc] {
        checkin(&ctx, "launch", tag);
    }

    let generate = Request::GenerateBatch {
        event_id: "launch".to_string(),
        max_claimers: 100,
    };
    let Response::Batch { root: first, .. } = as_operator(&ctx, generate.clone()) else {
        panic!("expected a batch response");
    };
    let Response::Batch { root: second, .. } = as_operator(&ctx, generate) else {
        panic!("expected a batch response");
    };
    assert_eq!(first, second);
}

#[test]
fn test_new_checkins_then_regeneration_updates_root_in_place() {
    let ctx = test_context();
    create_event(&ctx, "launch");
    checkin(&ctx, "launch", 0xaa);

    let generate = Request::GenerateBatch {
        event_id: "launch".to_string(),
        max_claimers: 100,
    };
    let Response::Batch { root: first, .. } = as_operator(&ctx, generate.clone()) else {
        panic!("expected a batch response");
    };

    checkin(&ctx, "launch", 0xbb);
    let Response::Batch {
        root: second,
        claim_count,
        ..
    } = as_operator(&ctx, generate)
    else {
        panic!("expected a batch response");
    };
    assert_ne!(first, second);
    assert_eq!(claim_count, 2);
}

#[test]
fn test_zero_checkins_is_not_an_error() {
    let ctx = test_context();
    create_event(&ctx, "launch");

    let Response::Eligibility(ticket) = as_wallet(
        &ctx,
        addr(0xaa),
        Request::GetEligibility {
            event_id: "launch".to_string(),
            wallet: addr(0xaa).to_hex(),
        },
    ) else {
        panic!("expected an eligibility response");
    };
    assert!(!ticket.eligible);
    assert!(!ticket.ready);
}

#[test]
fn test_eligibility_before_batch_is_not_ready() {
    let ctx = test_context();
    create_event(&ctx, "launch");
    checkin(&ctx, "launch", 0xaa);

    let Response::Eligibility(ticket) = as_wallet(
        &ctx,
        addr(0xaa),
        Request::GetEligibility {
            event_id: "launch".to_string(),
            wallet: addr(0xaa).to_hex(),
        },
    ) else {
        panic!("expected an eligibility response");
    };
    assert!(ticket.eligible);
    assert!(!ticket.ready);
    assert_eq!(ticket.amount, Some(1000));
}

#[test]
fn test_external_claim_freezes_the_batch() {
    let ctx = test_context();
    create_event(&ctx, "launch");
    checkin(&ctx, "launch", 0xaa);
    checkin(&ctx, "launch", 0xbb);

    as_operator(
        &ctx,
        Request::GenerateBatch {
            event_id: "launch".to_string(),
            max_claimers: 100,
        },
    );
    as_operator(
        &ctx,
        Request::MarkClaimed {
            target: MarkClaimedTarget::Eligibility {
                event_id: "launch".to_string(),
                wallet: addr(0xaa).to_hex(),
            },
        },
    );

    let err = dispatch(
        &ctx,
        Identity::Operator,
        Request::GenerateBatch {
            event_id: "launch".to_string(),
            max_claimers: 100,
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");

    // Marking the same claim twice is rejected, not silently absorbed.
    let err = dispatch(
        &ctx,
        Identity::Operator,
        Request::MarkClaimed {
            target: MarkClaimedTarget::Eligibility {
                event_id: "launch".to_string(),
                wallet: addr(0xaa).to_hex(),
            },
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "ALREADY_CLAIMED");
}

#[test]
fn test_empty_roster_rejected_with_code() {
    let ctx = test_context();
    create_event(&ctx, "launch");

    let err = dispatch(
        &ctx,
        Identity::Operator,
        Request::GenerateBatch {
            event_id: "launch".to_string(),
            max_claimers: 100,
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "EMPTY_ROSTER");
}

#[test]
fn test_wallet_cannot_generate_batches() {
    let ctx = test_context();
    create_event(&ctx, "launch");
    checkin(&ctx, "launch", 0xaa);

    let err = dispatch(
        &ctx,
        Identity::Wallet(addr(0xaa)),
        Request::GenerateBatch {
            event_id: "launch".to_string(),
            max_claimers: 100,
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");
}
