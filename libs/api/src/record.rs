use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

// ════════════════════════════════════════════════════════════════
//  Record schemas
// ════════════════════════════════════════════════════════════════

/// GitHub activity event published on `stargazers-results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StargazerEvent {
    #[serde(rename = "LOGIN")]
    pub login: String,
    #[serde(rename = "TYPE")]
    pub r#type: String,
}

/// Aggregated order value per zip code, published on `stockapp.dollarsbyzip`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DollarsByZip {
    #[serde(rename = "ZIPCODE")]
    pub zipcode: String,
    #[serde(rename = "TOTAL_DOLLARS")]
    pub total_dollars: f64,
}

/// One decoded message body. The variant is fixed per deployment by
/// [`RecordKind`]; a single store never mixes variants.
///
/// Serialized untagged, so the query interface renders the same field
/// names the producer wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Stargazer(StargazerEvent),
    DollarsByZip(DollarsByZip),
}

// ════════════════════════════════════════════════════════════════
//  RecordKind — decoder selected once at startup
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    #[default]
    Stargazer,
    DollarsByZip,
}

impl RecordKind {
    /// Decode a JSON message body into the record variant of this kind.
    pub fn decode(self, bytes: &[u8]) -> Result<Record, DecodeError> {
        let wrap = |source| DecodeError { kind: self, source };
        match self {
            RecordKind::Stargazer => serde_json::from_slice(bytes)
                .map(Record::Stargazer)
                .map_err(wrap),
            RecordKind::DollarsByZip => serde_json::from_slice(bytes)
                .map(Record::DollarsByZip)
                .map_err(wrap),
        }
    }

    /// Topic the upstream producer publishes this kind on.
    pub fn default_topic(self) -> &'static str {
        match self {
            RecordKind::Stargazer => "stargazers-results",
            RecordKind::DollarsByZip => "stockapp.dollarsbyzip",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Stargazer => f.write_str("stargazer"),
            RecordKind::DollarsByZip => f.write_str("dollars-by-zip"),
        }
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stargazer" => Ok(RecordKind::Stargazer),
            "dollars-by-zip" | "dollars_by_zip" => Ok(RecordKind::DollarsByZip),
            other => Err(format!(
                "unknown record kind '{other}' (expected 'stargazer' or 'dollars-by-zip')"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_stargazer_body() {
        let record = RecordKind::Stargazer
            .decode(br#"{"LOGIN":"octocat","TYPE":"WatchEvent"}"#)
            .unwrap();
        assert_eq!(
            record,
            Record::Stargazer(StargazerEvent {
                login: "octocat".into(),
                r#type: "WatchEvent".into(),
            })
        );
    }

    #[test]
    fn decodes_dollars_by_zip_body() {
        let record = RecordKind::DollarsByZip
            .decode(br#"{"ZIPCODE":"94107","TOTAL_DOLLARS":1250.5}"#)
            .unwrap();
        assert_eq!(
            record,
            Record::DollarsByZip(DollarsByZip {
                zipcode: "94107".into(),
                total_dollars: 1250.5,
            })
        );
    }

    #[test]
    fn rejects_body_of_wrong_schema() {
        let err = RecordKind::DollarsByZip
            .decode(br#"{"LOGIN":"octocat","TYPE":"WatchEvent"}"#)
            .unwrap_err();
        assert_eq!(err.kind, RecordKind::DollarsByZip);
        assert!(err.to_string().starts_with("decode dollars-by-zip record"));
    }

    #[test]
    fn rejects_non_json_body() {
        assert!(RecordKind::Stargazer.decode(b"{not json").is_err());
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let record = Record::Stargazer(StargazerEvent {
            login: "octocat".into(),
            r#type: "WatchEvent".into(),
        });
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({"LOGIN": "octocat", "TYPE": "WatchEvent"})
        );
    }

    #[test]
    fn parses_kind_names() {
        assert_eq!("stargazer".parse::<RecordKind>().unwrap(), RecordKind::Stargazer);
        assert_eq!(
            "dollars-by-zip".parse::<RecordKind>().unwrap(),
            RecordKind::DollarsByZip
        );
        assert!("orders".parse::<RecordKind>().is_err());
        assert_eq!(RecordKind::DollarsByZip.default_topic(), "stockapp.dollarsbyzip");
    }
}
