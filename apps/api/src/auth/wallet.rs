//! Wallet signature checks for `personal_sign` (EIP-191) messages.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use sha3::{Digest, Keccak256};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SignatureError {
    #[error("signature is not valid hex")]
    Hex,

    #[error("signature must be 65 bytes, got {0}")]
    Length(usize),

    #[error("signature has an invalid recovery byte")]
    RecoveryByte,

    #[error("signature is malformed")]
    Malformed,

    #[error("could not recover a signer from the signature")]
    Unrecoverable,
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// Digest wallets sign for `personal_sign`:
/// keccak256("\x19Ethereum Signed Message:\n" + len(message) + message).
pub fn personal_message_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Lowercase `0x`-prefixed address of a secp256k1 public key.
pub fn address_of(key: &VerifyingKey) -> String {
    let point = PublicKey::from(key).to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Recovers the lowercase address that produced `signature` over `message`.
/// Accepts recovery bytes as 0/1 or 27/28.
pub fn recover_personal_signer(message: &str, signature: &str) -> Result<String, SignatureError> {
    let raw = hex::decode(signature.trim().trim_start_matches("0x"))
        .map_err(|_| SignatureError::Hex)?;
    if raw.len() != 65 {
        return Err(SignatureError::Length(raw.len()));
    }

    let v = raw[64];
    let recovery_byte = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(recovery_byte).ok_or(SignatureError::RecoveryByte)?;
    let signature = Signature::from_slice(&raw[..64]).map_err(|_| SignatureError::Malformed)?;

    let key = VerifyingKey::recover_from_prehash(
        &personal_message_hash(message),
        &signature,
        recovery_id,
    )
    .map_err(|_| SignatureError::Unrecoverable)?;

    Ok(address_of(&key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn key_one() -> SigningKey {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        SigningKey::from_slice(&bytes).unwrap()
    }

    fn sign(key: &SigningKey, message: &str) -> String {
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&personal_message_hash(message))
            .unwrap();
        let mut raw = signature.to_bytes().to_vec();
        raw.push(recovery_id.to_byte() + 27);
        format!("0x{}", hex::encode(raw))
    }

    #[test]
    fn test_address_of_private_key_one() {
        assert_eq!(
            address_of(key_one().verifying_key()),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_recovers_signer() {
        let key = key_one();
        let signature = sign(&key, "Sign in to web3job");
        let signer = recover_personal_signer("Sign in to web3job", &signature).unwrap();
        assert_eq!(signer, address_of(key.verifying_key()));
    }

    #[test]
    fn test_different_message_recovers_different_address() {
        let key = key_one();
        let signature = sign(&key, "message A");
        let signer = recover_personal_signer("message B", &signature);
        assert_ne!(signer, Ok(address_of(key.verifying_key())));
    }

    #[test]
    fn test_rejects_bad_encodings() {
        assert_eq!(recover_personal_signer("m", "0xzz"), Err(SignatureError::Hex));
        assert_eq!(
            recover_personal_signer("m", "0x0102"),
            Err(SignatureError::Length(2))
        );
        let mut raw = vec![1u8; 64];
        raw.push(31);
        assert_eq!(
            recover_personal_signer("m", &hex::encode(raw)),
            Err(SignatureError::RecoveryByte)
        );
    }
}
