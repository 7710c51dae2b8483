//! Text-safe encoding of the persisted state.
//!
//! File payloads are stored as standard base64 text inside one JSON blob:
//! `{dataRooms, folders: [[id, Folder]], files: [[id, FileContent]]}`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::types::{DataRoom, FileContent, Folder};
use crate::error::{AppError, Result};

/// Encode a binary payload as base64 text.
pub fn encode_payload(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode base64 text back into a payload.
pub fn decode_payload(text: &str) -> Result<Bytes> {
    STANDARD
        .decode(text)
        .map(Bytes::from)
        .map_err(|e| AppError::Internal(format!("Invalid base64 payload: {}", e)))
}

/// Serde adapter for `Option<Bytes>` fields persisted as base64 text.
pub mod payload {
    use super::{decode_payload, encode_payload};
    use bytes::Bytes;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Option<Bytes>, serializer: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => serializer.serialize_some(&encode_payload(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Bytes>, D::Error> {
        let text: Option<String> = Option::deserialize(deserializer)?;
        text.map(|t| decode_payload(&t).map_err(D::Error::custom))
            .transpose()
    }
}

/// Shape of the persisted state blob.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub data_rooms: Vec<DataRoom>,
    #[serde(default)]
    pub folders: Vec<(String, Folder)>,
    #[serde(default)]
    pub files: Vec<(String, FileContent)>,
}

impl PersistedState {
    /// Serialize to the persisted text form.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the persisted text form.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Serialize the search history list.
pub fn encode_history(history: &[String]) -> Result<String> {
    Ok(serde_json::to_string(history)?)
}

/// Parse the search history list.
pub fn decode_history(text: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(text)?)
}
