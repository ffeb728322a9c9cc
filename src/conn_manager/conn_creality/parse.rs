use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use serde_json::{Map, Value};
use tokio_tungstenite::tungstenite::Message;

/// What the receive loop should do with one websocket frame
#[derive(Debug, PartialEq)]
pub(crate) enum Frame {
    Update(Map<String, Value>),
    /// undecodable or not a JSON object
    Dropped,
    /// control frames, nothing to ingest
    Ignored,
    Closed,
}

pub(crate) fn parse_message(msg: Message) -> Frame {
    match msg {
        Message::Text(t) => parse_text(&t),
        Message::Binary(b) => match std::str::from_utf8(&b) {
            Ok(t) => parse_text(t),
            Err(e) => {
                debug!("dropping non-utf8 binary frame: {}", e);
                Frame::Dropped
            }
        },
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Frame::Ignored,
        Message::Close(frame) => {
            debug!("got close frame: {:?}", frame);
            Frame::Closed
        }
    }
}

pub(crate) fn parse_text(text: &str) -> Frame {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(m)) => Frame::Update(m),
        Ok(other) => {
            debug!("dropping non-object message: {}", other);
            Frame::Dropped
        }
        Err(e) => {
            debug!("bad JSON from WS: {}", e);
            Frame::Dropped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_become_updates() {
        let f = parse_message(Message::Text(r#"{"nozzleTemp": 20.5}"#.to_string()));
        assert_eq!(f, Frame::Update(json!({"nozzleTemp": 20.5}).as_object().cloned().unwrap()));

        let f = parse_message(Message::Binary(br#"{"fan": 1}"#.to_vec()));
        assert!(matches!(f, Frame::Update(_)));
    }

    #[test]
    fn junk_is_dropped() {
        assert_eq!(parse_text("{not json"), Frame::Dropped);
        assert_eq!(parse_text("[1, 2]"), Frame::Dropped);
        assert_eq!(parse_text("ok"), Frame::Dropped);
        assert_eq!(parse_message(Message::Binary(vec![0xff, 0xfe])), Frame::Dropped);
    }

    #[test]
    fn control_frames() {
        assert_eq!(parse_message(Message::Ping(vec![])), Frame::Ignored);
        assert_eq!(parse_message(Message::Close(None)), Frame::Closed);
    }
}
