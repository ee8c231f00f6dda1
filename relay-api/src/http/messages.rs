//! Message endpoints
//!
//! Request and response bodies are binary protobuf
//! (`application/x-protobuf`), the same encoding the stream frames use.

use axum::{
    extract::{FromRequest, Request, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use bytes::Bytes;
use prost::Message;
use relay_proto::messaging::{
    AckMessagesRequest, AckMessagesResponse, PollMessagesRequest, PollMessagesResponse,
    SendMessageRequest, SendMessageResponse,
};

use crate::http::{AppError, AppResult, AppState};

pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// Protobuf request body / response
#[derive(Debug, Clone, Default)]
pub struct Protobuf<T>(pub T);

impl<S, T> FromRequest<S> for Protobuf<T>
where
    S: Send + Sync,
    T: Message + Default,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;
        Ok(Self(T::decode(bytes)?))
    }
}

impl<T: Message> IntoResponse for Protobuf<T> {
    fn into_response(self) -> Response {
        (
            [(header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE)],
            self.0.encode_to_vec(),
        )
            .into_response()
    }
}

pub fn create_messages_router() -> Router<AppState> {
    Router::new()
        .route("/v1/messages", post(send_message))
        .route("/v1/messages/poll", post(poll_messages))
        .route("/v1/messages/ack", post(ack_messages))
}

async fn send_message(
    State(state): State<AppState>,
    Protobuf(request): Protobuf<SendMessageRequest>,
) -> AppResult<Protobuf<SendMessageResponse>> {
    let id = state.relay.send_message(&request).await?;
    Ok(Protobuf(SendMessageResponse {
        message_id: Some(id.to_proto()),
    }))
}

async fn poll_messages(
    State(state): State<AppState>,
    Protobuf(request): Protobuf<PollMessagesRequest>,
) -> AppResult<Protobuf<PollMessagesResponse>> {
    let messages = state.relay.poll_for_messages(&request).await?;
    Ok(Protobuf(PollMessagesResponse { messages }))
}

async fn ack_messages(
    State(state): State<AppState>,
    Protobuf(request): Protobuf<AckMessagesRequest>,
) -> AppResult<Protobuf<AckMessagesResponse>> {
    state.relay.ack_messages(&request).await?;
    Ok(Protobuf(AckMessagesResponse {}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::ErrorResponse;
    use crate::http::testing::{post_proto, router, Signer};
    use axum::http::StatusCode;
    use relay_core::models::{AccountInfo, AccountType, MessageId};
    use relay_proto::messaging::{
        message::Kind, request_to_receive_bill, ExchangeData, RequestToGrabBill,
        RequestToReceiveBill,
    };

    fn send_request(rendezvous: &Signer, kind: Kind) -> SendMessageRequest {
        let mut request = SendMessageRequest {
            message: Some(relay_proto::messaging::Message {
                kind: Some(kind),
                ..Default::default()
            }),
            rendezvous_key: Some(rendezvous.public().to_rendezvous()),
            signature: None,
        };
        request.signature = Some(rendezvous.sign(&request.signing_payload()));
        request
    }

    #[tokio::test]
    async fn test_send_poll_ack_round() {
        let (app, env) = router();
        let rendezvous = Signer::new();
        let requestor = Signer::new().public();
        env.accounts
            .insert(AccountInfo::new(requestor, AccountType::Primary, Signer::new().public()));

        let kind = Kind::RequestToReceiveBill(RequestToReceiveBill {
            requestor_account: Some(requestor.to_account()),
            exchange_data: Some(request_to_receive_bill::ExchangeData::Exact(ExchangeData {
                currency: "kin".to_string(),
                exchange_rate: 1.0,
                native_amount: 5_000.0,
                quarks: 500_000_000,
            })),
            ..Default::default()
        });
        let (status, body) = post_proto(&app, "/v1/messages", &send_request(&rendezvous, kind)).await;
        assert_eq!(status, StatusCode::OK);
        let sent = SendMessageResponse::decode(body).unwrap();
        let id = MessageId::from_proto(sent.message_id.as_ref().unwrap()).unwrap();

        let poll = PollMessagesRequest {
            rendezvous_key: Some(rendezvous.public().to_rendezvous()),
        };
        let (status, body) = post_proto(&app, "/v1/messages/poll", &poll).await;
        assert_eq!(status, StatusCode::OK);
        let polled = PollMessagesResponse::decode(body).unwrap();
        assert_eq!(polled.messages.len(), 1);
        assert_eq!(polled.messages[0].id, Some(id.to_proto()));

        let mut ack = AckMessagesRequest {
            rendezvous_key: Some(rendezvous.public().to_rendezvous()),
            message_ids: vec![id.to_proto()],
            signature: None,
        };
        ack.signature = Some(rendezvous.sign(&ack.signing_payload()));
        let (status, _) = post_proto(&app, "/v1/messages/ack", &ack).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = post_proto(&app, "/v1/messages/poll", &poll).await;
        assert!(PollMessagesResponse::decode(body).unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn test_rejection_reason_in_json_body() {
        let (app, _env) = router();
        let rendezvous = Signer::new();
        let kind = Kind::RequestToGrabBill(RequestToGrabBill {
            requestor_account: Some(Signer::new().public().to_account()),
        });

        let (status, body) = post_proto(&app, "/v1/messages", &send_request(&rendezvous, kind)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error, "requestor account must be a temporary incoming account");
        assert_eq!(error.code, "invalid_message");
        assert_eq!(error.status, 400);
    }

    #[tokio::test]
    async fn test_unsigned_send_is_unauthorized() {
        let (app, _env) = router();
        let rendezvous = Signer::new();
        let kind = Kind::RequestToGrabBill(RequestToGrabBill::default());
        let mut request = send_request(&rendezvous, kind);
        request.signature = None;

        let (status, body) = post_proto(&app, "/v1/messages", &request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "unauthenticated");
    }

    #[tokio::test]
    async fn test_garbage_body_is_bad_request() {
        let (app, _env) = router();
        let (status, body) =
            crate::http::testing::post_bytes(&app, "/v1/messages/poll", vec![0xff, 0xff, 0xff]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(error.error.starts_with("Invalid protobuf body"));
    }
}
