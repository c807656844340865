use super::{decode_base64, encode_base64, DecodeStrategy, Instruction};
use crate::operation::OperationKind;

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

/// Unauthenticated JSON memos from before versioned envelopes:
/// `base64({"t": kind, "f": follow_id, "p": base64(params)})`.
#[serde_as]
#[derive(Debug, Serialize, Deserialize)]
struct LegacyMemo {
    t: u16,
    #[serde(default)]
    f: String,
    #[serde_as(as = "Base64")]
    #[serde(default)]
    p: Vec<u8>,
}

pub struct LegacyStrategy {
    version_floor: i64,
}

impl LegacyStrategy {
    pub fn new(version_floor: i64) -> Self {
        LegacyStrategy { version_floor }
    }
}

impl DecodeStrategy for LegacyStrategy {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn enabled(&self, version: i64) -> bool {
        version < self.version_floor
    }

    fn decode(&self, memo: &str) -> Option<Instruction> {
        let bytes = decode_base64(memo)?;
        let legacy: LegacyMemo = serde_json::from_slice(&bytes).ok()?;

        Some(Instruction {
            kind: OperationKind::from_u16(legacy.t)?,
            follow_id: legacy.f,
            params: legacy.p,
        })
    }
}

pub fn encode(kind: OperationKind, follow_id: &str, params: &[u8]) -> String {
    let legacy = LegacyMemo {
        t: kind.as_u16(),
        f: follow_id.to_string(),
        p: params.to_vec(),
    };
    // LegacyMemo has no map keys or floats, serialization cannot fail.
    let json = serde_json::to_vec(&legacy).unwrap_or_default();
    encode_base64(&json)
}
