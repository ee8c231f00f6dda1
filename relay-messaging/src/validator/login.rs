use relay_core::models::{AccountType, PublicKey, RendezvousKey};
use relay_core::validation::{ascii_base_domain, validate_domain};
use relay_core::{Error, Result};
use relay_proto::messaging::{LoginAttempt, RequestToLogin};

use super::MessageValidator;

impl MessageValidator {
    /// A third party asks the user to log in to a domain it owns.
    pub(super) async fn validate_request_to_login(
        &self,
        rendezvous_key: &RendezvousKey,
        message: &RequestToLogin,
    ) -> Result<()> {
        Self::check_rendezvous_echo(rendezvous_key, message.rendezvous_key.as_ref())?;

        let domain = message
            .domain
            .as_ref()
            .ok_or_else(|| Error::invalid("domain is required"))?;
        let domain = validate_domain(&domain.value)?;

        let verifier = PublicKey::from_account(message.verifier.as_ref(), "verifier")?;
        if message.nonce.as_ref().is_none_or(|nonce| nonce.value.is_empty()) {
            return Err(Error::invalid("nonce is required"));
        }

        self.verify_payload_signature(
            &verifier,
            &message.signing_payload(),
            message.signature.as_ref(),
            "verifier",
        )?;
        self.check_domain_ownership(&verifier, &domain).await
    }

    /// The user answers a login request with its relationship account for
    /// that domain.
    pub(super) async fn validate_login_attempt(
        &self,
        rendezvous_key: &RendezvousKey,
        message: &LoginAttempt,
    ) -> Result<()> {
        Self::check_rendezvous_echo(rendezvous_key, message.rendezvous_key.as_ref())?;

        let domain = message
            .domain
            .as_ref()
            .ok_or_else(|| Error::invalid("domain is required"))?;
        let base_domain = ascii_base_domain(&validate_domain(&domain.value)?);

        let user_id = PublicKey::from_account(message.user_id.as_ref(), "user id")?;
        self.verify_payload_signature(
            &user_id,
            &message.signing_payload(),
            message.signature.as_ref(),
            "login attempt",
        )?;

        let info = self
            .accounts
            .resolve_account(&user_id)
            .await?
            .ok_or_else(|| Error::invalid("account doesn't exist"))?;
        if info.account_type != AccountType::Relationship {
            return Err(Error::invalid("account type must be RELATIONSHIP"));
        }

        let relationship_base = info
            .relationship_domain
            .as_deref()
            .and_then(|domain| validate_domain(domain).ok())
            .map(|domain| ascii_base_domain(&domain));
        if relationship_base.as_deref() != Some(base_domain.as_str()) {
            return Err(Error::invalid(format!(
                "account must have a relationship to {base_domain}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{Keypair, TestEnv};
    use relay_core::models::AccountType;
    use relay_core::Error;
    use relay_proto::messaging::message::Kind;

    async fn reject(env: &TestEnv, kind: Kind, rendezvous: &Keypair) -> Error {
        let request = env.signed_request(rendezvous, kind);
        env.validator().validate_send(&request).await.unwrap_err()
    }

    #[tokio::test]
    async fn test_request_to_login_accepted() {
        let env = TestEnv::new();
        let verifier = Keypair::new();
        env.domains.allow(verifier.public(), "getcode.com");
        let rendezvous = Keypair::new();

        let payload = TestEnv::login_request_payload(&rendezvous, &verifier, "app.getcode.com");
        let request = env.signed_request(&rendezvous, Kind::RequestToLogin(payload));
        assert!(env.validator().validate_send(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_request_to_login_rejections() {
        let env = TestEnv::new();
        let verifier = Keypair::new();
        let rendezvous = Keypair::new();

        let payload = TestEnv::login_request_payload(&rendezvous, &verifier, "getcode.com");
        let err = reject(&env, Kind::RequestToLogin(payload.clone()), &rendezvous).await;
        assert!(matches!(err, Error::PermissionDenied(_)));
        assert_eq!(
            err.reason(),
            format!("{} does not own domain getcode.com", verifier.public())
        );

        env.domains.allow(verifier.public(), "getcode.com");

        let mut mismatched = payload.clone();
        mismatched.rendezvous_key = Some(Keypair::new().public().to_rendezvous());
        mismatched.signature = Some(verifier.sign(&mismatched.signing_payload()));
        let err = reject(&env, Kind::RequestToLogin(mismatched), &rendezvous).await;
        assert_eq!(err.reason(), "rendezvous key mismatch");

        let bad_domain = TestEnv::login_request_payload(&rendezvous, &verifier, "not a domain");
        let err = reject(&env, Kind::RequestToLogin(bad_domain), &rendezvous).await;
        assert_eq!(err.reason(), "domain is invalid");

        let mut no_nonce = payload.clone();
        no_nonce.nonce = None;
        no_nonce.signature = Some(verifier.sign(&no_nonce.signing_payload()));
        let err = reject(&env, Kind::RequestToLogin(no_nonce), &rendezvous).await;
        assert_eq!(err.reason(), "nonce is required");

        let mut forged = payload;
        forged.signature = Some(Keypair::new().sign(&forged.signing_payload()));
        let err = reject(&env, Kind::RequestToLogin(forged), &rendezvous).await;
        assert!(matches!(err, Error::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_login_attempt_accepted() {
        let env = TestEnv::new();
        let owner = Keypair::new();
        let user = env.register_relationship(&owner, "getcode.com");
        let rendezvous = Keypair::new();

        let payload = TestEnv::login_attempt_payload(&rendezvous, &user, "app.getcode.com");
        let request = env.signed_request(&rendezvous, Kind::LoginAttempt(payload));
        assert!(env.validator().validate_send(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_login_attempt_account_rules() {
        let env = TestEnv::new();
        let owner = Keypair::new();
        let rendezvous = Keypair::new();

        let unknown = Keypair::new();
        let payload = TestEnv::login_attempt_payload(&rendezvous, &unknown, "getcode.com");
        let err = reject(&env, Kind::LoginAttempt(payload), &rendezvous).await;
        assert_eq!(err.reason(), "account doesn't exist");

        let primary = Keypair::new();
        env.register_keypair(&primary, &owner, AccountType::Primary);
        let payload = TestEnv::login_attempt_payload(&rendezvous, &primary, "getcode.com");
        let err = reject(&env, Kind::LoginAttempt(payload), &rendezvous).await;
        assert_eq!(err.reason(), "account type must be RELATIONSHIP");

        let user = env.register_relationship(&owner, "example.com");
        let payload = TestEnv::login_attempt_payload(&rendezvous, &user, "getcode.com");
        let err = reject(&env, Kind::LoginAttempt(payload), &rendezvous).await;
        assert_eq!(err.reason(), "account must have a relationship to getcode.com");
    }

    #[tokio::test]
    async fn test_login_attempt_signature_and_echo() {
        let env = TestEnv::new();
        let owner = Keypair::new();
        let user = env.register_relationship(&owner, "getcode.com");
        let rendezvous = Keypair::new();

        let mut payload = TestEnv::login_attempt_payload(&rendezvous, &user, "getcode.com");
        payload.signature = Some(owner.sign(&payload.signing_payload()));
        let err = reject(&env, Kind::LoginAttempt(payload), &rendezvous).await;
        assert!(matches!(err, Error::Unauthenticated(_)));

        let other = Keypair::new();
        let payload = TestEnv::login_attempt_payload(&other, &user, "getcode.com");
        let err = reject(&env, Kind::LoginAttempt(payload), &rendezvous).await;
        assert_eq!(err.reason(), "rendezvous key mismatch");

        let payload = TestEnv::login_attempt_payload(&rendezvous, &user, "getcode");
        let err = reject(&env, Kind::LoginAttempt(payload), &rendezvous).await;
        assert_eq!(err.reason(), "domain is invalid");
    }
}
