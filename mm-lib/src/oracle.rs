use crate::error::ErrorCode;
use crate::operation::PriceAttestation;
use crate::types::OracleSigner;

use rust_decimal::Decimal;

/// Turns a price attestation into a verified price. Implementations own the
/// signature scheme; the engine only consumes the verdict.
pub trait PriceOracle: Send + Sync {
    fn verify(
        &self,
        attestation: &PriceAttestation,
        signers: &[OracleSigner],
    ) -> Result<Decimal, ErrorCode>;
}

/// Rejects every attestation. Nodes run with this until a verifier is wired
/// in; governance-voted prices keep working.
pub struct DisabledOracle;

impl PriceOracle for DisabledOracle {
    fn verify(
        &self,
        _attestation: &PriceAttestation,
        _signers: &[OracleSigner],
    ) -> Result<Decimal, ErrorCode> {
        Err(ErrorCode::InvalidArgument)
    }
}
