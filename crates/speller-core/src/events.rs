use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Every transition of a session produces exactly one Event.
/// The external classifier consumes them through an
/// [`EventSink`](crate::channel::EventSink).
///
/// Serialized as `{"label": "...", "data": {...}}`; `data` is absent for events
/// without a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "label", content = "data", rename_all = "snake_case")]
pub enum Event {
    /// Session attached, with the resolved options.
    SessionBegins(Box<Config>),
    SessionEnds,
    CalibrationBegins,
    CalibrationEnds,
    #[serde(rename = "baseline-eyes-open_begins")]
    BaselineEyesOpenBegins,
    #[serde(rename = "baseline-eyes-open_ends")]
    BaselineEyesOpenEnds,
    #[serde(rename = "baseline-eyes-closed_begins")]
    BaselineEyesClosedBegins,
    #[serde(rename = "baseline-eyes-closed_ends")]
    BaselineEyesClosedEnds,
    TrainingBegins {
        targets: String,
    },
    TrainingEnds,
    FocusBegins {
        target: usize,
    },
    FocusEnds,
    /// `target` is `None` for test blocks.
    BlockBegins {
        target: Option<usize>,
    },
    BlockEnds,
    RoundBegins {
        groups: Vec<Vec<usize>>,
    },
    RoundEnds,
    /// `includes_target` is `None` while testing, since the true target is
    /// unknown to the stimulator.
    FlashBegins {
        group: Vec<usize>,
        includes_target: Option<bool>,
    },
    FlashEnds,
    TestingBegins,
    TestingEnds,
}

impl Event {
    /// Wire label of the event.
    pub fn label(&self) -> &'static str {
        match self {
            Event::SessionBegins(_) => "session_begins",
            Event::SessionEnds => "session_ends",
            Event::CalibrationBegins => "calibration_begins",
            Event::CalibrationEnds => "calibration_ends",
            Event::BaselineEyesOpenBegins => "baseline-eyes-open_begins",
            Event::BaselineEyesOpenEnds => "baseline-eyes-open_ends",
            Event::BaselineEyesClosedBegins => "baseline-eyes-closed_begins",
            Event::BaselineEyesClosedEnds => "baseline-eyes-closed_ends",
            Event::TrainingBegins { .. } => "training_begins",
            Event::TrainingEnds => "training_ends",
            Event::FocusBegins { .. } => "focus_begins",
            Event::FocusEnds => "focus_ends",
            Event::BlockBegins { .. } => "block_begins",
            Event::BlockEnds => "block_ends",
            Event::RoundBegins { .. } => "round_begins",
            Event::RoundEnds => "round_ends",
            Event::FlashBegins { .. } => "flash_begins",
            Event::FlashEnds => "flash_ends",
            Event::TestingBegins => "testing_begins",
            Event::TestingEnds => "testing_ends",
        }
    }

    pub fn stamp(self) -> StampedEvent {
        StampedEvent {
            at: Utc::now(),
            event: self,
        }
    }
}

/// An event with its emission time, as written to transports.
#[derive(Debug, Clone, Serialize)]
pub struct StampedEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labels_match_serialized_tag() {
        let events = [
            Event::SessionEnds,
            Event::BaselineEyesOpenBegins,
            Event::BaselineEyesClosedEnds,
            Event::TrainingBegins {
                targets: "AB".into(),
            },
            Event::BlockBegins { target: None },
            Event::FlashBegins {
                group: vec![1],
                includes_target: Some(true),
            },
            Event::TestingEnds,
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["label"], event.label());
        }
    }

    #[test]
    fn payloads_use_data_field() {
        let value = serde_json::to_value(Event::FlashBegins {
            group: vec![0, 3],
            includes_target: None,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"label": "flash_begins", "data": {"group": [0, 3], "includes_target": null}})
        );

        let value = serde_json::to_value(Event::RoundEnds).unwrap();
        assert_eq!(value, json!({"label": "round_ends"}));
    }

    #[test]
    fn session_begins_carries_options() {
        let value = serde_json::to_value(Event::SessionBegins(Box::default())).unwrap();
        assert_eq!(value["data"]["symbols"], "ABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890");
    }

    #[test]
    fn stamped_event_flattens() {
        let value = serde_json::to_value(Event::FocusBegins { target: 2 }.stamp()).unwrap();
        assert_eq!(value["label"], "focus_begins");
        assert_eq!(value["data"]["target"], 2);
        assert!(value["at"].is_string());
    }

    #[test]
    fn events_parse_back() {
        let event: Event =
            serde_json::from_str(r#"{"label":"block_begins","data":{"target":3}}"#).unwrap();
        assert_eq!(event, Event::BlockBegins { target: Some(3) });
        let event: Event = serde_json::from_str(r#"{"label":"baseline-eyes-open_ends"}"#).unwrap();
        assert_eq!(event, Event::BaselineEyesOpenEnds);
    }
}
