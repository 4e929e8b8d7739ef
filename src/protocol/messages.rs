//! Wire messages exchanged with the evaluation endpoint.

use serde::{Deserialize, Serialize};

use crate::audio::AudioFrame;
use crate::config::EngineConfig;

/// Byte-order mark the engine expects in front of the target text.
const TEXT_BOM: char = '\u{FEFF}';

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct Common<'a> {
    app_id: &'a str,
}

#[derive(Debug, Serialize)]
struct ConfigBusiness<'a> {
    sub: &'static str,
    ent: &'a str,
    category: &'a str,
    cmd: &'static str,
    text: String,
    tte: &'static str,
    ttp_skip: bool,
    aue: &'static str,
    auf: &'static str,
    aus: u8,
}

#[derive(Debug, Serialize)]
struct AudioBusiness {
    aue: &'static str,
    cmd: &'static str,
    aus: u8,
}

#[derive(Debug, Serialize)]
struct DataStage {
    status: u8,
    data: String,
    data_type: u8,
}

/// First message of a session: engine parameters plus the target text.
#[derive(Debug, Serialize)]
pub struct ConfigMessage<'a> {
    common: Common<'a>,
    business: ConfigBusiness<'a>,
    data: DataStage,
}

impl<'a> ConfigMessage<'a> {
    pub fn new(app_id: &'a str, engine: &'a EngineConfig, target_text: &str) -> Self {
        Self {
            common: Common { app_id },
            business: ConfigBusiness {
                sub: "ise",
                ent: &engine.ent,
                category: &engine.category,
                cmd: "ssb",
                text: format!("{TEXT_BOM}{target_text}"),
                tte: "utf-8",
                ttp_skip: true,
                aue: "raw",
                auf: "audio/L16;rate=16000",
                aus: 1,
            },
            data: DataStage {
                status: 0,
                data: String::new(),
                data_type: 1,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One audio chunk.  `data.status` is 2 only on the last chunk.
#[derive(Debug, Serialize)]
pub struct AudioMessage {
    business: AudioBusiness,
    data: DataStage,
}

impl AudioMessage {
    pub fn from_frame(frame: &AudioFrame<'_>) -> Self {
        Self {
            business: AudioBusiness {
                aue: "raw",
                cmd: "auw",
                aus: frame.position.aus(),
            },
            data: DataStage {
                status: frame.position.data_status(),
                data: frame.encode(),
                data_type: 1,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Stage marker carried in `data.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStatus {
    Interim,
    Final,
    Rejected,
    Empty,
}

impl EnvelopeStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(EnvelopeStatus::Interim),
            2 => Some(EnvelopeStatus::Final),
            3 => Some(EnvelopeStatus::Rejected),
            4 => Some(EnvelopeStatus::Empty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct EnvelopeData {
    pub status: Option<i64>,
    pub data: Option<String>,
    pub data_type: Option<i64>,
}

/// Any message received from the server.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ServerEnvelope {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub sid: Option<String>,
    pub data: Option<EnvelopeData>,
}

impl ServerEnvelope {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Top-level code, `0` when absent.
    pub fn code(&self) -> i64 {
        self.code.unwrap_or(0)
    }

    pub fn status(&self) -> Option<EnvelopeStatus> {
        self.data
            .as_ref()
            .and_then(|d| d.status)
            .and_then(EnvelopeStatus::from_code)
    }

    /// Non-empty `data.data`, if any.
    pub fn payload(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.data.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn message_or_default(&self) -> String {
        self.message.clone().unwrap_or_else(|| "no message".into())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFramer;
    use serde_json::{json, Value};

    #[test]
    fn config_message_shape() {
        let engine = EngineConfig::default();
        let json = ConfigMessage::new("app123", &engine, "红鲤鱼与绿鲤鱼与驴")
            .to_json()
            .unwrap();
        let v: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(
            v,
            json!({
                "common": { "app_id": "app123" },
                "business": {
                    "sub": "ise",
                    "ent": "cn_vip",
                    "category": "read_sentence",
                    "cmd": "ssb",
                    "text": "\u{FEFF}红鲤鱼与绿鲤鱼与驴",
                    "tte": "utf-8",
                    "ttp_skip": true,
                    "aue": "raw",
                    "auf": "audio/L16;rate=16000",
                    "aus": 1
                },
                "data": { "status": 0, "data": "", "data_type": 1 }
            })
        );
    }

    #[test]
    fn audio_messages_mark_only_the_last_chunk() {
        let pcm = vec![7u8; 6000];
        let framer = AudioFramer::new(&pcm, 2560);
        let msgs: Vec<Value> = framer
            .frames()
            .map(|f| serde_json::from_str(&AudioMessage::from_frame(&f).to_json().unwrap()).unwrap())
            .collect();

        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0]["data"]["status"], 1);
        assert_eq!(msgs[0]["business"]["aus"], 1);
        assert_eq!(msgs[1]["data"]["status"], 1);
        assert_eq!(msgs[1]["business"]["aus"], 2);
        assert_eq!(msgs[2]["data"]["status"], 2);
        assert_eq!(msgs[2]["business"]["aus"], 4);
        assert_eq!(msgs[2]["business"]["cmd"], "auw");
        assert_eq!(msgs[2]["data"]["data_type"], 1);
    }

    #[test]
    fn envelope_with_everything() {
        let env = ServerEnvelope::parse(
            r#"{"code":0,"message":"success","sid":"ise1","data":{"status":2,"data":"PGE+","data_type":1}}"#,
        )
        .unwrap();
        assert_eq!(env.code(), 0);
        assert_eq!(env.status(), Some(EnvelopeStatus::Final));
        assert_eq!(env.payload(), Some("PGE+"));
        assert_eq!(env.sid.as_deref(), Some("ise1"));
    }

    #[test]
    fn sparse_envelope_parses() {
        let env = ServerEnvelope::parse(r#"{"code":10165,"message":"invalid handle"}"#).unwrap();
        assert_eq!(env.code(), 10165);
        assert_eq!(env.status(), None);
        assert_eq!(env.payload(), None);
    }

    #[test]
    fn unknown_status_and_blank_payload() {
        let env = ServerEnvelope::parse(r#"{"data":{"status":9,"data":"  "}}"#).unwrap();
        assert_eq!(env.status(), None);
        assert_eq!(env.payload(), None);
    }

    #[test]
    fn malformed_envelope_is_an_error() {
        assert!(ServerEnvelope::parse("not json").is_err());
        assert!(ServerEnvelope::parse(r#"{"data":{"status":"two"}}"#).is_err());
    }
}
