//! Per-line output records and the field names they are emitted under.
use crate::pipeline::LineOutcome;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Output key for each derived field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFields {
    pub template: String,
    pub template_id: String,
    pub dynamic_tokens: String,
    pub masked_tokens: String,
    pub raw_line: String,
}

impl Default for OutputFields {
    fn default() -> Self {
        Self {
            template: "template_string".to_string(),
            template_id: "template_id".to_string(),
            dynamic_tokens: "dynamic_tokens".to_string(),
            masked_tokens: "masked_tokens".to_string(),
            raw_line: "raw_log".to_string(),
        }
    }
}

/// A raw line paired with what the miner made of it.
#[derive(Debug, Clone)]
pub struct MinedRecord {
    pub raw_line: String,
    pub outcome: LineOutcome,
}

impl MinedRecord {
    pub fn new(raw_line: impl Into<String>, outcome: LineOutcome) -> Self {
        Self {
            raw_line: raw_line.into(),
            outcome,
        }
    }

    /// Render as a flat JSON object. A skipped line keeps its raw text and
    /// carries `null` for every derived field.
    pub fn to_json(&self, fields: &OutputFields) -> Value {
        let mut object = Map::new();
        object.insert(fields.raw_line.clone(), Value::String(self.raw_line.clone()));

        match &self.outcome {
            LineOutcome::Mined(line) => {
                object.insert(fields.template.clone(), Value::String(line.template.clone()));
                object.insert(fields.template_id.clone(), Value::from(line.template_id));

                let dynamic: Map<String, Value> = line
                    .dynamic_tokens
                    .iter()
                    .map(|(pos, token)| (pos.to_string(), Value::String(token.clone())))
                    .collect();
                object.insert(fields.dynamic_tokens.clone(), Value::Object(dynamic));

                let masked: Map<String, Value> = line
                    .masked_tokens
                    .iter()
                    .map(|t| (t.label.clone(), Value::String(t.value.clone())))
                    .collect();
                object.insert(fields.masked_tokens.clone(), Value::Object(masked));
            }
            LineOutcome::Skipped(_) => {
                for key in [
                    &fields.template,
                    &fields.template_id,
                    &fields.dynamic_tokens,
                    &fields.masked_tokens,
                ] {
                    object.insert(key.clone(), Value::Null);
                }
            }
        }

        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masker::{MaskSource, MaskedToken};
    use crate::pipeline::{MinedLine, SkipReason};
    use std::collections::BTreeMap;

    fn mined() -> LineOutcome {
        let mut dynamic_tokens = BTreeMap::new();
        dynamic_tokens.insert(1, "<*>".to_string());

        LineOutcome::Mined(MinedLine {
            template: "took <*> ms ".to_string(),
            template_id: 3,
            dynamic_tokens,
            masked_tokens: vec![MaskedToken {
                label: "builtin_1".to_string(),
                source: MaskSource::BuiltIn,
                value: "12".to_string(),
            }],
        })
    }

    #[test]
    fn test_mined_record_json() {
        let record = MinedRecord::new("d t took 12 ms", mined());
        let json = record.to_json(&OutputFields::default());

        assert_eq!(json["raw_log"], "d t took 12 ms");
        assert_eq!(json["template_string"], "took <*> ms ");
        assert_eq!(json["template_id"], 3);
        assert_eq!(json["dynamic_tokens"]["1"], "<*>");
        assert_eq!(json["masked_tokens"]["builtin_1"], "12");
    }

    #[test]
    fn test_skipped_record_keeps_raw_line() {
        let record = MinedRecord::new("garbage", LineOutcome::Skipped(SkipReason::FormatMismatch));
        let json = record.to_json(&OutputFields::default());

        assert_eq!(json["raw_log"], "garbage");
        assert!(json["template_string"].is_null());
        assert!(json["template_id"].is_null());
        assert!(json["dynamic_tokens"].is_null());
    }

    #[test]
    fn test_renamed_fields() {
        let fields = OutputFields {
            template: "event_template".to_string(),
            raw_line: "message".to_string(),
            ..OutputFields::default()
        };
        let json = MinedRecord::new("d t took 12 ms", mined()).to_json(&fields);

        assert_eq!(json["event_template"], "took <*> ms ");
        assert_eq!(json["message"], "d t took 12 ms");
        assert!(json.get("template_string").is_none());
    }
}
