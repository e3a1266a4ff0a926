//! Types for relay registration data and per-record submission outcomes

use serde::{Deserialize, Serialize};

const PUBKEY_BYTES: usize = 48;
const FEE_RECIPIENT_BYTES: usize = 20;

/// A validator's proposer-registration message as carried in the relay JSON
/// schema. Numeric fields are decimal strings on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    /// BLS validator public key, 0x-prefixed hex. Unique key for the record.
    pub pubkey: String,
    /// Address proposer rewards are sent to, 0x-prefixed hex.
    pub fee_recipient: String,
    /// Requested gas limit.
    #[serde(with = "quoted_u64")]
    pub gas_limit: u64,
    /// Unix time the registration was signed. For a given pubkey only the
    /// record with the greatest timestamp is meaningful.
    #[serde(with = "quoted_u64")]
    pub timestamp: u64,
}

/// A signed registration exactly as relays exchange it. The signature is
/// carried through unmodified; verifying it is the target relay's job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedRegistration {
    pub message: Registration,
    pub signature: String,
}

impl SignedRegistration {
    /// True iff this record supersedes `other`: same pubkey and a strictly
    /// greater timestamp. Ties are not newer, so unchanged data is never
    /// resent.
    pub fn is_newer_than(&self, other: &SignedRegistration) -> bool {
        self.message.pubkey == other.message.pubkey
            && self.message.timestamp > other.message.timestamp
    }

    /// Shape check only: field lengths and signature presence. Full
    /// signature verification is out of scope here and delegated to the
    /// target relay.
    pub fn validate(&self) -> Result<(), RecordError> {
        if decoded_len(&self.message.pubkey) != Some(PUBKEY_BYTES) {
            return Err(RecordError::InvalidPubkey);
        }
        if decoded_len(&self.message.fee_recipient) != Some(FEE_RECIPIENT_BYTES) {
            return Err(RecordError::InvalidFeeRecipient);
        }
        let signature = self.signature.strip_prefix("0x").unwrap_or(&self.signature);
        if signature.is_empty() {
            return Err(RecordError::MissingSignature);
        }
        Ok(())
    }
}

/// Decoded byte length of a 0x-prefixed hex field, `None` when it is not
/// valid hex.
fn decoded_len(value: &str) -> Option<usize> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).ok().map(|bytes| bytes.len())
}

/// One element of the source relay's GET response. The wrapper also carries
/// slot/validator_index metadata, which this daemon does not forward.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorEntry {
    pub entry: SignedRegistration,
}

/// Per-record result of a batch submission to the target relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    /// The target accepted the registration.
    Accepted,
    /// The target rejected the registration; retrying the same record blindly
    /// will not help, the source has to produce a corrected one.
    Rejected(String),
    /// The record's fate is unresolved; eligible for retry next cycle.
    Transient,
}

/// Submission status of a single record within a batch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub pubkey: String,
    pub status: SubmitStatus,
}

/// A registration failed the structural shape check
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid pubkey: expected a 48-byte hex value")]
    InvalidPubkey,

    #[error("invalid fee recipient: expected a 20-byte hex value")]
    InvalidFeeRecipient,

    #[error("missing signature")]
    MissingSignature,
}

/// Errors from reading the source relay
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source relay unavailable: {0}")]
    Unavailable(String),

    #[error("source response could not be decoded: {0}")]
    Format(String),
}

/// Errors from writing to the target relay
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("target relay unavailable: {0}")]
    Unavailable(String),
}

/// Serde helper for u64 fields the relay JSON schema encodes as decimal
/// strings.
mod quoted_u64 {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_field(byte: u8, len: usize) -> String {
        format!("0x{}", hex::encode(vec![byte; len]))
    }

    fn registration(tag: u8, timestamp: u64) -> SignedRegistration {
        SignedRegistration {
            message: Registration {
                pubkey: hex_field(tag, PUBKEY_BYTES),
                fee_recipient: hex_field(tag, FEE_RECIPIENT_BYTES),
                gas_limit: 30_000_000,
                timestamp,
            },
            signature: hex_field(0xee, 96),
        }
    }

    #[test]
    fn newer_requires_same_pubkey_and_strictly_greater_timestamp() {
        let old = registration(0xaa, 100);
        let updated = registration(0xaa, 150);
        let tie = registration(0xaa, 100);
        let other_key = registration(0xbb, 150);

        assert!(updated.is_newer_than(&old));
        assert!(!old.is_newer_than(&updated));
        assert!(!tie.is_newer_than(&old));
        assert!(!other_key.is_newer_than(&old));
    }

    #[test]
    fn validate_accepts_well_shaped_record() {
        assert!(registration(0xaa, 1).validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_field_shapes() {
        let mut record = registration(0xaa, 1);
        record.message.pubkey = hex_field(0xaa, 47);
        assert!(matches!(record.validate(), Err(RecordError::InvalidPubkey)));

        let mut record = registration(0xaa, 1);
        record.message.pubkey = "0xnot-hex".to_string();
        assert!(matches!(record.validate(), Err(RecordError::InvalidPubkey)));

        let mut record = registration(0xaa, 1);
        record.message.fee_recipient = hex_field(0xaa, 32);
        assert!(matches!(
            record.validate(),
            Err(RecordError::InvalidFeeRecipient)
        ));

        let mut record = registration(0xaa, 1);
        record.signature = "0x".to_string();
        assert!(matches!(
            record.validate(),
            Err(RecordError::MissingSignature)
        ));
    }

    #[test]
    fn wire_format_uses_quoted_numbers() {
        let record = registration(0xaa, 1_700_000_000);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["message"]["gas_limit"], "30000000");
        assert_eq!(json["message"]["timestamp"], "1700000000");

        let parsed: SignedRegistration = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn source_entry_wrapper_decodes() {
        let record = registration(0xaa, 42);
        let wrapped = serde_json::json!({
            "slot": "123",
            "validator_index": "7",
            "entry": serde_json::to_value(&record).unwrap(),
        });

        let entry: ValidatorEntry = serde_json::from_value(wrapped).unwrap();
        assert_eq!(entry.entry, record);
    }
}
