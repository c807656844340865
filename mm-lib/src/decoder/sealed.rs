use super::{decode_base64, DecodeStrategy, Envelope, Instruction};
use crate::constant::ENVELOPE_TAG_SEALED;

use std::sync::Arc;

/// Opens sealed payloads. Key material lives outside this crate.
pub trait PayloadCipher: Send + Sync {
    fn open(&self, sealed: &[u8]) -> Option<Vec<u8>>;
}

/// `base64(0x03 || seal(bcs(Envelope)))`
pub struct SealedStrategy {
    cipher: Arc<dyn PayloadCipher>,
}

impl SealedStrategy {
    pub fn new(cipher: Arc<dyn PayloadCipher>) -> Self {
        SealedStrategy { cipher }
    }
}

impl DecodeStrategy for SealedStrategy {
    fn name(&self) -> &'static str {
        "sealed"
    }

    fn enabled(&self, _version: i64) -> bool {
        true
    }

    fn decode(&self, memo: &str) -> Option<Instruction> {
        let bytes = decode_base64(memo)?;
        let (tag, body) = bytes.split_first()?;
        if *tag != ENVELOPE_TAG_SEALED {
            return None;
        }

        let opened = self.cipher.open(body)?;
        let envelope: Envelope = bcs::from_bytes(&opened).ok()?;
        envelope.into_instruction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{encode_base64, plain, Decoder};
    use crate::operation::OperationKind;

    /// XORs every byte with a fixed key; enough to prove the seal is opened.
    struct XorCipher(u8);

    impl PayloadCipher for XorCipher {
        fn open(&self, sealed: &[u8]) -> Option<Vec<u8>> {
            Some(sealed.iter().map(|b| b ^ self.0).collect())
        }
    }

    #[test]
    fn opens_sealed_envelope_before_plain() {
        let body = plain::encode_envelope(OperationKind::Pledge, "f9", &[]).unwrap();
        let mut bytes = vec![ENVELOPE_TAG_SEALED];
        bytes.extend(body.iter().map(|b| b ^ 0x5a));

        let decoder = Decoder::new(2, Some(Arc::new(XorCipher(0x5a))));
        let instruction = decoder.decode(&encode_base64(&bytes), 3).unwrap();

        assert_eq!(instruction.kind, OperationKind::Pledge);
        assert_eq!(instruction.follow_id, "f9");
    }

    #[test]
    fn sealed_memo_without_cipher_is_unrecognized() {
        let body = plain::encode_envelope(OperationKind::Pledge, "f9", &[]).unwrap();
        let mut bytes = vec![ENVELOPE_TAG_SEALED];
        bytes.extend(body);

        assert!(Decoder::new(2, None).decode(&encode_base64(&bytes), 3).is_none());
    }
}
