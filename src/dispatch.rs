//! Request dispatch and answer classification.
//!
//! One dispatch serializes a signed payload, wraps it with the collector's
//! method tag, forwards it through the transport with the caller's timeout,
//! and classifies the outcome into success or a typed error. Exactly one
//! outcome is produced per dispatch.

use crate::payload::SigningPayload;
use crate::transport::{Quest, RawAnswer, Transport, TransportError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Method tag for event submission.
pub const METHOD_ADD_EVENTS: &str = "adds";

/// Quest flag marking an encoded application body.
pub const QUEST_FLAG: u8 = 1;

/// Errors surfaced to callers of the client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RumError {
    /// The client was destroyed before or during the call
    #[error("client has been destroyed")]
    ClientDestroyed,

    /// The submitted batch contained no well-formed events
    #[error("event batch contained no well-formed events")]
    EmptyBatch,

    /// The collector answered without an application body
    #[error("empty response from collector")]
    EmptyResponse,

    /// Server-reported application error
    #[error("code: {code}, ex: {ex}")]
    Answer { code: i64, ex: String },

    /// Payload encode/decode failure
    #[error("payload codec: {0}")]
    Codec(#[from] serde_json::Error),

    /// Transport-level failure, passed through
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Send one signed payload and classify the answer.
///
/// Fails fast with [`RumError::ClientDestroyed`] when no transport handle is
/// present, without contacting the transport.
pub(crate) async fn dispatch(
    transport: Option<Arc<dyn Transport>>,
    payload: &SigningPayload,
    timeout: Duration,
) -> Result<Value, RumError> {
    let Some(transport) = transport else {
        return Err(RumError::ClientDestroyed);
    };

    let quest = Quest {
        method: METHOD_ADD_EVENTS.to_owned(),
        flag: QUEST_FLAG,
        payload: serde_json::to_vec(payload)?,
    };

    tracing::debug!(
        method = METHOD_ADD_EVENTS,
        events = payload.events.len(),
        timeout_ms = timeout.as_millis() as u64,
        "dispatching event payload"
    );

    let answer = transport.send(quest, timeout).await?;
    classify(answer)
}

/// Classify one raw answer frame into success or a typed error.
///
/// An answer without an application body, or whose body decodes to `null`,
/// is an empty response. A frame flagged as an answer error whose body
/// carries both `code` and `ex` becomes a server-reported error combining
/// the two; any other body is a success.
pub(crate) fn classify(answer: RawAnswer) -> Result<Value, RumError> {
    let flagged_error = answer.is_answer_error();

    let Some(bytes) = answer.payload else {
        return Err(RumError::EmptyResponse);
    };

    let body: Value = serde_json::from_slice(&bytes)?;
    if body.is_null() {
        return Err(RumError::EmptyResponse);
    }

    if flagged_error {
        let code = body.get("code").and_then(Value::as_i64);
        let ex = body.get("ex").map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        });
        if let (Some(code), Some(ex)) = (code, ex) {
            return Err(RumError::Answer { code, ex });
        }
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MSG_TYPE_ANSWER, TransportEvent};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn answer(status: u8, body: Option<Value>) -> RawAnswer {
        RawAnswer {
            message_type: MSG_TYPE_ANSWER,
            status,
            payload: body.map(|value| serde_json::to_vec(&value).expect("body encodes")),
        }
    }

    #[test]
    fn flagged_answer_error_combines_code_and_ex() {
        let err = classify(answer(1, Some(json!({ "code": 4, "ex": "bad" }))))
            .expect_err("flagged answer must classify as error");
        let text = err.to_string();
        assert!(text.contains('4'), "missing code in {text}");
        assert!(text.contains("bad"), "missing ex in {text}");
    }

    #[test]
    fn ok_body_passes_through() {
        let body = classify(answer(0, Some(json!({ "ok": true })))).expect("success");
        assert_eq!(body, json!({ "ok": true }));
    }

    #[test]
    fn payload_less_answer_is_an_empty_response() {
        let err = classify(answer(0, None)).expect_err("no body must be an error");
        assert!(matches!(err, RumError::EmptyResponse));
    }

    #[test]
    fn null_body_is_an_empty_response() {
        let err = classify(answer(0, Some(Value::Null))).expect_err("null body must be an error");
        assert!(matches!(err, RumError::EmptyResponse));
    }

    #[test]
    fn flagged_error_without_code_and_ex_is_a_success() {
        let body = classify(answer(1, Some(json!({ "detail": "partial" })))).expect("success");
        assert_eq!(body, json!({ "detail": "partial" }));
    }

    #[test]
    fn undecodable_body_is_a_codec_error() {
        let frame = RawAnswer {
            message_type: MSG_TYPE_ANSWER,
            status: 0,
            payload: Some(vec![0xFF, 0xFE]),
        };
        assert!(matches!(classify(frame), Err(RumError::Codec(_))));
    }

    #[test]
    fn non_answer_frame_with_error_fields_is_a_success() {
        let frame = RawAnswer {
            message_type: 0,
            status: 9,
            payload: Some(
                serde_json::to_vec(&json!({ "code": 4, "ex": "bad" })).expect("body encodes"),
            ),
        };
        let body = classify(frame).expect("one-way frames are not answer errors");
        assert_eq!(body["code"], json!(4));
    }

    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn open(
            &self,
            _events: mpsc::UnboundedSender<TransportEvent>,
            _handshake: Option<&crate::transport::Handshake>,
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send(
            &self,
            quest: Quest,
            _timeout: Duration,
        ) -> Result<RawAnswer, TransportError> {
            assert_eq!(quest.method, METHOD_ADD_EVENTS);
            assert_eq!(quest.flag, QUEST_FLAG);
            // Echo the decoded project id back as the answer body.
            let sent: Value = serde_json::from_slice(&quest.payload).expect("payload decodes");
            Ok(RawAnswer {
                message_type: MSG_TYPE_ANSWER,
                status: 0,
                payload: Some(
                    serde_json::to_vec(&json!({ "pid": sent["pid"] })).expect("body encodes"),
                ),
            })
        }

        async fn close(&self) {}
    }

    fn sample_payload() -> SigningPayload {
        SigningPayload {
            project_id: 7,
            signature: "ABC".to_owned(),
            salt: 1,
            events: Vec::new(),
        }
    }

    #[tokio::test]
    async fn dispatch_without_transport_fails_fast() {
        let result = dispatch(None, &sample_payload(), Duration::from_millis(100)).await;
        assert!(matches!(result, Err(RumError::ClientDestroyed)));
    }

    #[tokio::test]
    async fn dispatch_round_trips_through_the_transport() {
        let transport: Arc<dyn Transport> = Arc::new(EchoTransport);
        let body = dispatch(Some(transport), &sample_payload(), Duration::from_millis(100))
            .await
            .expect("dispatch succeeds");
        assert_eq!(body, json!({ "pid": 7 }));
    }
}
