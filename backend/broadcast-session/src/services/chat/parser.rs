/// Event Parser
///
/// Decodes one raw channel payload into a [`ChannelEvent`]. Malformed or unknown
/// payloads become `ChannelEvent::Empty`; nothing here can fail the channel.
use crate::models::{ChannelEvent, MessageModel};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub fn parse_channel_payload(payload: &str) -> ChannelEvent {
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            debug!("Dropping undecodable channel frame: {}", e);
            return ChannelEvent::Empty;
        }
    };

    let Some(object) = value.as_object() else {
        return ChannelEvent::Empty;
    };

    if let Some(viewers) = object.get("viewers") {
        return match viewers.as_u64().and_then(|v| u32::try_from(v).ok()) {
            Some(count) => ChannelEvent::NewViewer { count },
            None => ChannelEvent::Empty,
        };
    }

    if let Some(messages) = object.get("messages") {
        return match Vec::<MessageModel>::deserialize(messages) {
            Ok(messages) if !messages.is_empty() => ChannelEvent::NewMessages { messages },
            Ok(_) => ChannelEvent::Empty,
            Err(e) => {
                debug!("Dropping malformed messages frame: {}", e);
                ChannelEvent::Empty
            }
        };
    }

    ChannelEvent::Empty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_count() {
        assert_eq!(
            parse_channel_payload(r#"{"viewers": 7}"#),
            ChannelEvent::NewViewer { count: 7 }
        );
    }

    #[test]
    fn test_messages_keep_order_and_aliases() {
        let event = parse_channel_payload(
            r#"{"messages": [
                {"sender": "ann", "text": "hi", "timestamp": "12:00"},
                {"name": "bob", "message": "how much?", "time": "12:01"},
                {"sender": "cid", "text": "no time"}
            ]}"#,
        );

        let ChannelEvent::NewMessages { messages } = event else {
            panic!("expected messages, got {:?}", event);
        };
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].sender, "ann");
        assert_eq!(messages[1].sender, "bob");
        assert_eq!(messages[1].text, "how much?");
        assert_eq!(messages[1].timestamp, "12:01");
        assert_eq!(messages[2].timestamp, "");
    }

    #[test]
    fn test_unusable_payloads_are_empty() {
        for payload in [
            "",
            "not json",
            "[1,2,3]",
            "42",
            r#"{"viewers": -3}"#,
            r#"{"viewers": "many"}"#,
            r#"{"messages": []}"#,
            r#"{"messages": [{"text": "missing sender"}]}"#,
            r#"{"typing": true}"#,
        ] {
            assert_eq!(parse_channel_payload(payload), ChannelEvent::Empty, "payload: {payload}");
        }
    }
}
