pub mod legacy;
pub mod plain;
pub mod sealed;

use crate::operation::OperationKind;

use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine as _,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

pub use legacy::LegacyStrategy;
pub use plain::PlainStrategy;
pub use sealed::{PayloadCipher, SealedStrategy};

/// A recognized instruction: its kind, the client correlation id and the
/// still-encoded parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub kind: OperationKind,
    pub follow_id: String,
    pub params: Vec<u8>,
}

/// Binary envelope shared by the plain and sealed generations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: u16,
    pub follow_id: String,
    pub params: Vec<u8>,
}

impl Envelope {
    pub fn into_instruction(self) -> Option<Instruction> {
        let kind = OperationKind::from_u16(self.kind)?;
        Some(Instruction {
            kind,
            follow_id: self.follow_id,
            params: self.params,
        })
    }
}

/// One historical payload encoding.
pub trait DecodeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this encoding is still accepted at the given protocol version.
    fn enabled(&self, version: i64) -> bool;

    fn decode(&self, memo: &str) -> Option<Instruction>;
}

/// Tries each encoding generation in order, newest first.
pub struct Decoder {
    strategies: Vec<Box<dyn DecodeStrategy>>,
}

impl Decoder {
    pub fn new(legacy_version_floor: i64, cipher: Option<Arc<dyn PayloadCipher>>) -> Self {
        let mut strategies: Vec<Box<dyn DecodeStrategy>> = Vec::new();
        if let Some(cipher) = cipher {
            strategies.push(Box::new(SealedStrategy::new(cipher)));
        }
        strategies.push(Box::new(PlainStrategy));
        strategies.push(Box::new(LegacyStrategy::new(legacy_version_floor)));

        Decoder { strategies }
    }

    /// Returns `None` when no enabled strategy recognizes the memo.
    pub fn decode(&self, memo: &str, version: i64) -> Option<Instruction> {
        for strategy in self.strategies.iter().filter(|s| s.enabled(version)) {
            if let Some(instruction) = strategy.decode(memo) {
                trace!("memo decoded by {} strategy", strategy.name());
                return Some(instruction);
            }
        }
        None
    }
}

/// Memos arrive base64 armored, padded or not.
pub(crate) fn decode_base64(memo: &str) -> Option<Vec<u8>> {
    let memo = memo.trim();
    if memo.is_empty() {
        return None;
    }

    STANDARD
        .decode(memo)
        .or_else(|_| STANDARD_NO_PAD.decode(memo))
        .or_else(|_| URL_SAFE.decode(memo))
        .or_else(|_| URL_SAFE_NO_PAD.decode(memo))
        .ok()
}

pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_legacy_below_the_floor() {
        let decoder = Decoder::new(2, None);
        let memo = legacy::encode(OperationKind::Supply, "f1", &[]);

        assert!(decoder.decode(&memo, 1).is_some());
        assert!(decoder.decode(&memo, 2).is_none());
    }

    #[test]
    fn plain_envelope_wins_at_any_version() {
        let decoder = Decoder::new(2, None);
        let memo = plain::encode(OperationKind::Repay, "f2", &[]).unwrap();

        let instruction = decoder.decode(&memo, 3).unwrap();
        assert_eq!(instruction.kind, OperationKind::Repay);
        assert_eq!(instruction.follow_id, "f2");
    }

    #[test]
    fn accepts_standard_alphabet_without_padding() {
        assert_eq!(decode_base64("//8="), Some(vec![0xff, 0xff]));
        assert_eq!(decode_base64("//8"), Some(vec![0xff, 0xff]));
        assert_eq!(decode_base64("__8"), Some(vec![0xff, 0xff]));

        let decoder = Decoder::new(2, None);
        let instruction = decoder.decode("AgEAA34/MAA", 3).unwrap();
        assert_eq!(instruction.kind, OperationKind::Supply);
        assert_eq!(instruction.follow_id, "~?0");
    }

    #[test]
    fn garbage_is_unrecognized() {
        let decoder = Decoder::new(2, None);

        assert!(decoder.decode("", 1).is_none());
        assert!(decoder.decode("not base64 at all!", 1).is_none());
        assert!(decoder.decode(&encode_base64(b"\x02\xff\xff"), 1).is_none());
    }

    #[test]
    fn unknown_kind_tag_is_unrecognized() {
        let decoder = Decoder::new(2, None);
        let envelope = Envelope {
            kind: 77,
            follow_id: "f3".into(),
            params: vec![],
        };
        let mut bytes = vec![crate::constant::ENVELOPE_TAG_PLAIN];
        bytes.extend(bcs::to_bytes(&envelope).unwrap());

        assert!(decoder.decode(&encode_base64(&bytes), 1).is_none());
    }
}
