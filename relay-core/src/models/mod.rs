pub mod account;
pub mod key;
pub mod message;
pub mod payment;
pub mod presence;

pub use account::{AccountInfo, AccountType};
pub use key::{MessageId, PublicKey, RendezvousKey};
pub use message::MessageRecord;
pub use payment::{PaymentExchange, PaymentRequestRecord};
pub use presence::PresenceRecord;
