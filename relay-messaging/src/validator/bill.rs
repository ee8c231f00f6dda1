use chrono::Utc;
use relay_core::models::{AccountType, PaymentExchange, PaymentRequestRecord, PublicKey, RendezvousKey};
use relay_core::validation::{check_amount_bounds, quarks_match, validate_domain, BASE_CURRENCY};
use relay_core::{Error, Result};
use relay_proto::messaging::request_to_receive_bill::ExchangeData;
use relay_proto::messaging::{RequestToGrabBill, RequestToReceiveBill};

use super::MessageValidator;

impl MessageValidator {
    /// The requestor must be its owner's latest temporary incoming account.
    pub(super) async fn validate_grab_bill(&self, message: &RequestToGrabBill) -> Result<()> {
        let requestor =
            PublicKey::from_account(message.requestor_account.as_ref(), "requestor account")?;

        let info = self
            .accounts
            .resolve_account(&requestor)
            .await?
            .filter(|info| info.account_type == AccountType::TemporaryIncoming)
            .ok_or_else(|| Error::invalid("requestor account must be a temporary incoming account"))?;

        if !info.is_latest {
            return Err(Error::invalid(
                "requestor account must be latest temporary incoming account",
            ));
        }
        Ok(())
    }

    /// Returns the payment request record to persist on acceptance.
    pub(super) async fn validate_receive_bill(
        &self,
        rendezvous_key: &RendezvousKey,
        message: &RequestToReceiveBill,
    ) -> Result<PaymentRequestRecord> {
        let requestor =
            PublicKey::from_account(message.requestor_account.as_ref(), "requestor account")?;

        let verifier = message
            .verifier
            .as_ref()
            .map(|verifier| PublicKey::from_account(Some(verifier), "verifier"))
            .transpose()?;
        if verifier.is_some() {
            Self::check_rendezvous_echo(rendezvous_key, message.rendezvous_key.as_ref())?;
        }

        // Trial mode: no domain verifier, so the payee must use a primary account
        if verifier.is_none() {
            if message.signature.is_some() || message.rendezvous_key.is_some() {
                return Err(Error::invalid(
                    "signature and rendezvous key must not be set without a verifier",
                ));
            }
            let is_primary = self
                .accounts
                .resolve_account(&requestor)
                .await?
                .is_some_and(|info| info.account_type == AccountType::Primary);
            if !is_primary {
                return Err(Error::invalid(
                    "requestor account must be a primary account for trials using a code account",
                ));
            }
        }

        let exchange_data = message
            .exchange_data
            .as_ref()
            .ok_or_else(|| Error::invalid("exchange data is required"))?;
        self.check_exchange_data(exchange_data)?;

        let domain = match (&message.domain, &verifier) {
            (Some(domain), _) => Some(validate_domain(&domain.value)?),
            (None, Some(_)) => return Err(Error::invalid("domain is required with a verifier")),
            (None, None) => None,
        };

        if let (Some(verifier), Some(domain)) = (&verifier, &domain) {
            self.verify_payload_signature(
                verifier,
                &message.signing_payload(),
                message.signature.as_ref(),
                "verifier",
            )?;
            self.check_domain_ownership(verifier, domain).await?;
        }

        Ok(PaymentRequestRecord {
            rendezvous_key: *rendezvous_key,
            destination: requestor,
            exchange: PaymentExchange::from(exchange_data),
            domain,
            verified: verifier.is_some(),
            created_at: Utc::now(),
        })
    }

    fn check_exchange_data(&self, exchange_data: &ExchangeData) -> Result<()> {
        match exchange_data {
            ExchangeData::Exact(exact) => {
                let currency = exact.currency.to_lowercase();
                if currency != BASE_CURRENCY {
                    return Err(Error::invalid(
                        "exact exchange data only supports kin currency",
                    ));
                }
                if exact.exchange_rate != 1.0 {
                    return Err(Error::invalid("kin exchange rate must be 1"));
                }
                if !quarks_match(exact.native_amount, exact.quarks) {
                    return Err(Error::invalid(
                        "payment native amount and quark value mismatch",
                    ));
                }
                self.check_currency_bounds(&currency, exact.native_amount)
            }
            ExchangeData::Partial(partial) => {
                let currency = partial.currency.to_lowercase();
                if currency == BASE_CURRENCY {
                    return Err(Error::invalid(
                        "partial exchange data only supports fiat currencies",
                    ));
                }
                self.check_currency_bounds(&currency, partial.native_amount)
            }
        }
    }

    fn check_currency_bounds(&self, currency: &str, amount: f64) -> Result<()> {
        let limit = self
            .config
            .currency_limit(currency)
            .ok_or_else(|| Error::invalid(format!("{currency} currency is not supported")))?;
        check_amount_bounds(currency, amount, limit)
    }
}
