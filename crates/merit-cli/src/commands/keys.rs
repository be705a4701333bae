//! Signing key generation.

use anyhow::Result;
use merit_core::crypto::sign::TicketSigner;

/// Generates a fresh Ed25519 keypair and prints it as JSON.
///
/// The seed is the private key: it belongs in the service configuration (or
/// the signing-key environment variable), never in version control. The
/// public key is what the external verifier contract is configured with.
pub fn keygen() -> Result<()> {
    let signer = TicketSigner::generate();
    let rendered = serde_json::json!({
        "seed": signer.seed_hex(),
        "public_key": signer.public_key_hex(),
    });
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    eprintln!("keep the seed secret; configure the verifier with the public key");
    Ok(())
}
