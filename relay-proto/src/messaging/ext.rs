use prost::Message as _;

use super::{
    message, AckMessagesRequest, LoginAttempt, Message, RequestToLogin, RequestToReceiveBill,
    SendMessageRequest,
};

/// Implements `signing_payload` for messages that carry their own signature.
///
/// The payload is the protobuf encoding of the message with its `signature`
/// field cleared, which is what the signer is expected to have signed.
macro_rules! impl_signing_payload {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $ty {
                #[must_use]
                pub fn signing_payload(&self) -> Vec<u8> {
                    let mut unsigned = self.clone();
                    unsigned.signature = None;
                    unsigned.encode_to_vec()
                }
            }
        )*
    };
}

impl_signing_payload!(
    SendMessageRequest,
    AckMessagesRequest,
    RequestToReceiveBill,
    RequestToLogin,
    LoginAttempt,
);

impl message::Kind {
    /// Stable name used in logs and error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RequestToGrabBill(_) => "request_to_grab_bill",
            Self::CodeScanned(_) => "code_scanned",
            Self::RequestToReceiveBill(_) => "request_to_receive_bill",
            Self::RequestToLogin(_) => "request_to_login",
            Self::LoginAttempt(_) => "login_attempt",
        }
    }

    /// Kinds that only the relay itself may create.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::CodeScanned(_))
    }
}

impl Message {
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.kind.as_ref().map_or("unknown", message::Kind::name)
    }
}
