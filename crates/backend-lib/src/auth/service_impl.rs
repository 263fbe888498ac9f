use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use metrics::counter;
use smartfarm_common::{AccountId, LoginData};

use super::ledger::RedeemedTokens;
use super::password::PasswordHasher;
use super::service::{
    AuthError, AuthService, DeleteOutcome, LoginOutcome, ProfileOutcome, RegisterOutcome,
    ResetConfirmOutcome, ResetRequestOutcome, UpdateOutcome,
};
use super::token::{TokenError, TokenService};
use super::verification::{CodeCheck, VerificationCodes};
use crate::clock::Clock;
use crate::config::AuthSettings;
use crate::metrics::{
    AUTH_LOGIN_FAILURE, AUTH_LOGIN_SUCCESS, AUTH_REGISTER, AUTH_RESET_COMPLETED,
    AUTH_RESET_REQUESTED,
};
use crate::notify::{templates, Mailer};
use crate::storage::{CredentialStore, NewAccount, StoreError};
use crate::validation::normalize_email;

/// Auth service over a credential store, the token service and a mailer
pub struct DefaultAuth {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    hasher: PasswordHasher,
    redeemed: RedeemedTokens,
    codes: VerificationCodes,
    reset_url_base: String,
    /// Hash checked against when the account is unknown, set only when
    /// account existence is concealed
    decoy_hash: Option<String>,
}

impl DefaultAuth {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        settings: &AuthSettings,
    ) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(settings.hash_cost)?;
        let decoy_hash = if settings.conceal_account_existence {
            Some(hasher.hash(&uuid::Uuid::new_v4().to_string())?)
        } else {
            None
        };
        let codes = VerificationCodes::new(
            Duration::seconds(settings.verification_ttl_secs as i64),
            clock.clone(),
        );
        Ok(Self {
            store,
            tokens,
            mailer,
            clock,
            hasher,
            redeemed: RedeemedTokens::new(),
            codes,
            reset_url_base: settings.reset_url_base.clone(),
            decoy_hash,
        })
    }

    fn reset_link(&self, token: &str) -> String {
        let sep = if self.reset_url_base.contains('?') { '&' } else { '?' };
        format!("{}{sep}token={token}", self.reset_url_base)
    }
}

#[async_trait]
impl AuthService for DefaultAuth {
    async fn register(
        &self,
        email: &str,
        password: &str,
        birth_date: Option<NaiveDate>,
    ) -> Result<RegisterOutcome, AuthError> {
        let email = normalize_email(email);
        if self.store.find_by_email(&email).await?.is_some() {
            tracing::info!(%email, "registration rejected, email taken");
            return Ok(RegisterOutcome::AlreadyExists);
        }

        let password_hash = self.hasher.hash_blocking(password).await?;
        let account = NewAccount {
            email,
            password_hash,
            birth_date,
            created_at: self.clock.now(),
        };
        match self.store.insert(account).await {
            Ok(account) => {
                counter!(AUTH_REGISTER).increment(1);
                tracing::info!(account_id = account.id, email = %account.email, "account registered");
                Ok(RegisterOutcome::Created { account_id: account.id })
            }
            // lost a race with a concurrent registration
            Err(StoreError::DuplicateEmail(_)) => Ok(RegisterOutcome::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(email);
        let Some(account) = self.store.find_by_email(&email).await? else {
            if let Some(decoy) = &self.decoy_hash {
                // same scrypt cost as a wrong password
                self.hasher.verify_blocking(password, decoy).await?;
            }
            counter!(AUTH_LOGIN_FAILURE).increment(1);
            tracing::info!(%email, "login for unknown account");
            return Ok(LoginOutcome::NotFound);
        };

        if !self.hasher.verify_blocking(password, &account.password_hash).await? {
            counter!(AUTH_LOGIN_FAILURE).increment(1);
            tracing::info!(account_id = account.id, "login with wrong password");
            return Ok(LoginOutcome::InvalidCredentials);
        }

        let token = self.tokens.issue_session(account.id, &account.email)?;
        counter!(AUTH_LOGIN_SUCCESS).increment(1);
        tracing::info!(account_id = account.id, "login succeeded");
        Ok(LoginOutcome::Authenticated {
            token,
            account: LoginData {
                user_id: account.id,
                email: account.email,
            },
        })
    }

    async fn request_password_reset(&self, email: &str) -> Result<ResetRequestOutcome, AuthError> {
        let email = normalize_email(email);
        let Some(account) = self.store.find_by_email(&email).await? else {
            tracing::info!(%email, "password reset for unknown account");
            return Ok(ResetRequestOutcome::NotFound);
        };

        let token = self.tokens.issue_reset(account.id)?;
        let mail = templates::password_reset(
            &self.reset_link(&token),
            self.tokens.reset_ttl().num_minutes(),
        );
        counter!(AUTH_RESET_REQUESTED).increment(1);

        if self.decoy_hash.is_some() {
            // the response must not wait on SMTP
            let mailer = self.mailer.clone();
            let account_id = account.id;
            tokio::spawn(async move {
                match mailer.send(&account.email, &mail.subject, &mail.body).await {
                    Ok(()) => tracing::info!(account_id, "password reset mail sent"),
                    Err(e) => tracing::error!(account_id, error = %e, "password reset mail failed"),
                }
            });
            return Ok(ResetRequestOutcome::Sent);
        }

        // the token stays valid even if delivery fails
        self.mailer.send(&account.email, &mail.subject, &mail.body).await?;
        tracing::info!(account_id = account.id, "password reset mail sent");
        Ok(ResetRequestOutcome::Sent)
    }

    async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<ResetConfirmOutcome, AuthError> {
        let claims = match self.tokens.verify_reset(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::info!(error = %e, "password reset token rejected");
                return Ok(ResetConfirmOutcome::Unauthorized(e));
            }
        };

        let password_hash = self.hasher.hash_blocking(new_password).await?;
        if !self.redeemed.redeem(&claims.jti, claims.expires_at) {
            tracing::info!(account_id = claims.account_id, "password reset token reused");
            return Ok(ResetConfirmOutcome::Unauthorized(TokenError::Invalid));
        }

        match self.store.update_hash_by_id(claims.account_id, &password_hash).await {
            Ok(true) => {
                counter!(AUTH_RESET_COMPLETED).increment(1);
                tracing::info!(account_id = claims.account_id, "password reset completed");
                Ok(ResetConfirmOutcome::Updated)
            }
            Ok(false) => Ok(ResetConfirmOutcome::NotFound),
            Err(e) => {
                self.redeemed.release(&claims.jti);
                Err(e.into())
            }
        }
    }

    async fn update_password(&self, email: &str, new_password: &str) -> Result<UpdateOutcome, AuthError> {
        let email = normalize_email(email);
        let password_hash = self.hasher.hash_blocking(new_password).await?;
        if self.store.update_hash_by_email(&email, &password_hash).await? {
            tracing::info!(%email, "password updated");
            Ok(UpdateOutcome::Updated)
        } else {
            Ok(UpdateOutcome::NotFound)
        }
    }

    async fn delete_account(&self, account_id: AccountId) -> Result<DeleteOutcome, AuthError> {
        if self.store.delete_by_id(account_id).await? {
            tracing::info!(account_id, "account deleted");
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }

    async fn get_profile(&self, account_id: AccountId) -> Result<ProfileOutcome, AuthError> {
        Ok(match self.store.find_by_id(account_id).await? {
            Some(account) => ProfileOutcome::Found(account.profile()),
            None => ProfileOutcome::NotFound,
        })
    }

    async fn request_email_verification(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let code = self.codes.issue(&email);
        let mail = templates::verification_code(&code, self.codes.ttl().num_minutes());
        self.mailer.send(&email, &mail.subject, &mail.body).await?;
        tracing::info!(%email, "verification code sent");
        Ok(())
    }

    fn confirm_email_verification(&self, email: &str, code: &str) -> CodeCheck {
        self.codes.check(&normalize_email(email), code)
    }

    fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        self.redeemed.prune(now) + self.codes.prune(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::{MailError, RecordingMailer};
    use crate::storage::MemoryStore;

    const SECRET: &[u8] = b"unit-test-secret-unit-test-secret-!!";

    struct Harness {
        auth: DefaultAuth,
        store: Arc<MemoryStore>,
        mailer: Arc<RecordingMailer>,
        clock: Arc<ManualClock>,
    }

    fn settings() -> AuthSettings {
        AuthSettings {
            hash_cost: 4,
            ..AuthSettings::default()
        }
    }

    fn harness() -> Harness {
        harness_with(&settings())
    }

    fn concealing() -> AuthSettings {
        AuthSettings {
            conceal_account_existence: true,
            ..settings()
        }
    }

    fn harness_with(settings: &AuthSettings) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let clock = Arc::new(ManualClock::default());
        let tokens = Arc::new(TokenService::new(
            SECRET,
            Duration::hours(24),
            Duration::hours(1),
            clock.clone(),
        ));
        let auth = DefaultAuth::new(
            store.clone(),
            tokens,
            mailer.clone(),
            clock.clone(),
            settings,
        )
        .unwrap();
        Harness {
            auth,
            store,
            mailer,
            clock,
        }
    }

    fn token_from_mail(body: &str) -> String {
        let start = body.find("token=").expect("link in mail") + "token=".len();
        body[start..]
            .split_whitespace()
            .next()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn register_then_login() {
        let h = harness();
        let RegisterOutcome::Created { account_id } =
            h.auth.register("alice@example.com", "hunter2", None).await.unwrap()
        else {
            panic!("expected Created");
        };

        match h.auth.login("alice@example.com", "hunter2").await.unwrap() {
            LoginOutcome::Authenticated { token, account } => {
                assert_eq!(account.user_id, account_id);
                assert_eq!(account.email, "alice@example.com");
                assert!(!token.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn email_is_case_insensitive() {
        let h = harness();
        h.auth.register(" Alice@Example.com", "hunter2", None).await.unwrap();
        assert_eq!(
            h.auth.register("alice@example.com", "other-pw", None).await.unwrap(),
            RegisterOutcome::AlreadyExists
        );
        assert!(matches!(
            h.auth.login("ALICE@EXAMPLE.COM", "hunter2").await.unwrap(),
            LoginOutcome::Authenticated { .. }
        ));
    }

    #[tokio::test]
    async fn duplicate_register_keeps_first_hash() {
        let h = harness();
        h.auth.register("alice@example.com", "hunter2", None).await.unwrap();
        let before = h.store.find_by_email("alice@example.com").await.unwrap().unwrap();

        let second = h.auth.register("alice@example.com", "different", None).await.unwrap();
        assert_eq!(second, RegisterOutcome::AlreadyExists);

        let after = h.store.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(before.password_hash, after.password_hash);
    }

    #[tokio::test]
    async fn wrong_password_never_succeeds() {
        let h = harness();
        h.auth.register("alice@example.com", "hunter2", None).await.unwrap();
        for _ in 0..10 {
            assert_eq!(
                h.auth.login("alice@example.com", "wrongpw").await.unwrap(),
                LoginOutcome::InvalidCredentials
            );
        }
        assert_eq!(
            h.auth.login("bob@example.com", "hunter2").await.unwrap(),
            LoginOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn corrupt_stored_hash_is_an_error() {
        let h = harness();
        h.auth.register("alice@example.com", "hunter2", None).await.unwrap();
        h.store.update_hash_by_email("alice@example.com", "garbage").await.unwrap();

        assert!(matches!(
            h.auth.login("alice@example.com", "hunter2").await,
            Err(AuthError::Password(_))
        ));
    }

    #[tokio::test]
    async fn reset_flow_changes_password_once() {
        let h = harness();
        h.auth.register("alice@example.com", "hunter2", None).await.unwrap();

        assert_eq!(
            h.auth.request_password_reset("alice@example.com").await.unwrap(),
            ResetRequestOutcome::Sent
        );
        let mail = h.mailer.last_to("alice@example.com").unwrap();
        assert!(mail.body.contains("http://localhost:3000/resetpwd?token="));
        let token = token_from_mail(&mail.body);

        assert_eq!(
            h.auth.confirm_password_reset(&token, "newpw123").await.unwrap(),
            ResetConfirmOutcome::Updated
        );
        assert_eq!(
            h.auth.login("alice@example.com", "hunter2").await.unwrap(),
            LoginOutcome::InvalidCredentials
        );
        assert!(matches!(
            h.auth.login("alice@example.com", "newpw123").await.unwrap(),
            LoginOutcome::Authenticated { .. }
        ));

        // second redemption of the same token
        assert_eq!(
            h.auth.confirm_password_reset(&token, "again123").await.unwrap(),
            ResetConfirmOutcome::Unauthorized(TokenError::Invalid)
        );
    }

    #[tokio::test]
    async fn expired_reset_token_is_unauthorized() {
        let h = harness();
        h.auth.register("alice@example.com", "hunter2", None).await.unwrap();
        h.auth.request_password_reset("alice@example.com").await.unwrap();
        let token = token_from_mail(&h.mailer.last_to("alice@example.com").unwrap().body);

        h.clock.advance(Duration::minutes(61));
        assert_eq!(
            h.auth.confirm_password_reset(&token, "newpw123").await.unwrap(),
            ResetConfirmOutcome::Unauthorized(TokenError::Expired)
        );
    }

    #[tokio::test]
    async fn session_token_cannot_reset_password() {
        let h = harness();
        h.auth.register("alice@example.com", "hunter2", None).await.unwrap();
        let LoginOutcome::Authenticated { token, .. } =
            h.auth.login("alice@example.com", "hunter2").await.unwrap()
        else {
            panic!("expected login");
        };
        assert_eq!(
            h.auth.confirm_password_reset(&token, "newpw123").await.unwrap(),
            ResetConfirmOutcome::Unauthorized(TokenError::Invalid)
        );
    }

    #[tokio::test]
    async fn reset_for_unknown_email_sends_nothing() {
        let h = harness();
        assert_eq!(
            h.auth.request_password_reset("ghost@example.com").await.unwrap(),
            ResetRequestOutcome::NotFound
        );
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn reset_mail_failure_is_notification_error() {
        struct DownMailer;

        #[async_trait]
        impl Mailer for DownMailer {
            async fn send(&self, _: &str, _: &str, _: &str) -> Result<(), MailError> {
                Err(MailError::Transport("connection refused".into()))
            }
        }

        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let tokens = Arc::new(TokenService::new(
            SECRET,
            Duration::hours(24),
            Duration::hours(1),
            clock.clone(),
        ));
        let auth = DefaultAuth::new(store, tokens, Arc::new(DownMailer), clock, &settings()).unwrap();
        auth.register("alice@example.com", "hunter2", None).await.unwrap();

        assert!(matches!(
            auth.request_password_reset("alice@example.com").await,
            Err(AuthError::Notification(_))
        ));
        // credentials untouched
        assert!(matches!(
            auth.login("alice@example.com", "hunter2").await.unwrap(),
            LoginOutcome::Authenticated { .. }
        ));
    }

    #[tokio::test]
    async fn concealed_login_checks_a_hash_for_unknown_accounts() {
        let h = harness_with(&concealing());
        h.auth.register("alice@example.com", "hunter2", None).await.unwrap();
        let before = h.auth.hasher.verifications();

        assert_eq!(
            h.auth.login("ghost@example.com", "hunter2").await.unwrap(),
            LoginOutcome::NotFound
        );
        assert_eq!(h.auth.hasher.verifications(), before + 1);

        assert_eq!(
            h.auth.login("alice@example.com", "wrongpw").await.unwrap(),
            LoginOutcome::InvalidCredentials
        );
        assert_eq!(h.auth.hasher.verifications(), before + 2);
    }

    #[tokio::test]
    async fn unknown_login_skips_hash_when_not_concealing() {
        let h = harness();
        h.auth.login("ghost@example.com", "hunter2").await.unwrap();
        assert_eq!(h.auth.hasher.verifications(), 0);
    }

    #[tokio::test]
    async fn concealed_reset_does_not_wait_for_mail() {
        struct DownMailer;

        #[async_trait]
        impl Mailer for DownMailer {
            async fn send(&self, _: &str, _: &str, _: &str) -> Result<(), MailError> {
                Err(MailError::Transport("connection refused".into()))
            }
        }

        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let tokens = Arc::new(TokenService::new(
            SECRET,
            Duration::hours(24),
            Duration::hours(1),
            clock.clone(),
        ));
        let auth =
            DefaultAuth::new(store, tokens, Arc::new(DownMailer), clock, &concealing()).unwrap();
        auth.register("alice@example.com", "hunter2", None).await.unwrap();

        // delivery failure is logged, not returned
        assert_eq!(
            auth.request_password_reset("alice@example.com").await.unwrap(),
            ResetRequestOutcome::Sent
        );
    }

    #[tokio::test]
    async fn concealed_reset_mail_still_arrives() {
        let h = harness_with(&concealing());
        h.auth.register("alice@example.com", "hunter2", None).await.unwrap();
        assert_eq!(
            h.auth.request_password_reset("alice@example.com").await.unwrap(),
            ResetRequestOutcome::Sent
        );

        for _ in 0..50 {
            if h.mailer.last_to("alice@example.com").is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let token = token_from_mail(&h.mailer.last_to("alice@example.com").unwrap().body);
        assert_eq!(
            h.auth.confirm_password_reset(&token, "newpw123").await.unwrap(),
            ResetConfirmOutcome::Updated
        );
    }

    #[tokio::test]
    async fn reset_for_deleted_account_is_not_found() {
        let h = harness();
        let RegisterOutcome::Created { account_id } =
            h.auth.register("alice@example.com", "hunter2", None).await.unwrap()
        else {
            panic!("expected Created");
        };
        h.auth.request_password_reset("alice@example.com").await.unwrap();
        let token = token_from_mail(&h.mailer.last_to("alice@example.com").unwrap().body);

        assert_eq!(h.auth.delete_account(account_id).await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(
            h.auth.confirm_password_reset(&token, "newpw123").await.unwrap(),
            ResetConfirmOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn update_delete_and_profile() {
        let h = harness();
        let birth = NaiveDate::from_ymd_opt(1988, 3, 14);
        let RegisterOutcome::Created { account_id } =
            h.auth.register("alice@example.com", "hunter2", birth).await.unwrap()
        else {
            panic!("expected Created");
        };

        assert_eq!(
            h.auth.update_password("alice@example.com", "changed1").await.unwrap(),
            UpdateOutcome::Updated
        );
        assert_eq!(
            h.auth.update_password("ghost@example.com", "changed1").await.unwrap(),
            UpdateOutcome::NotFound
        );
        assert!(matches!(
            h.auth.login("alice@example.com", "changed1").await.unwrap(),
            LoginOutcome::Authenticated { .. }
        ));

        match h.auth.get_profile(account_id).await.unwrap() {
            ProfileOutcome::Found(profile) => {
                assert_eq!(profile.user_id, account_id);
                assert_eq!(profile.birth_date, birth);
                assert_eq!(profile.created_at, h.clock.now());
            }
            ProfileOutcome::NotFound => panic!("profile missing"),
        }

        assert_eq!(h.auth.delete_account(account_id).await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(h.auth.delete_account(account_id).await.unwrap(), DeleteOutcome::NotFound);
        assert_eq!(h.auth.get_profile(account_id).await.unwrap(), ProfileOutcome::NotFound);
    }

    #[tokio::test]
    async fn verification_code_round_trip() {
        let h = harness();
        h.auth.request_email_verification("Kim@Farm.kr").await.unwrap();
        let mail = h.mailer.last_to("kim@farm.kr").unwrap();
        let code: String = mail
            .body
            .chars()
            .filter(|c| c.is_ascii_digit())
            .take(6)
            .collect();

        assert_eq!(h.auth.confirm_email_verification("kim@farm.kr", &code), CodeCheck::Verified);
        assert_eq!(h.auth.confirm_email_verification("kim@farm.kr", &code), CodeCheck::Missing);
    }

    #[tokio::test]
    async fn prune_drops_expired_redemptions() {
        let h = harness();
        h.auth.register("alice@example.com", "hunter2", None).await.unwrap();
        h.auth.request_password_reset("alice@example.com").await.unwrap();
        let token = token_from_mail(&h.mailer.last_to("alice@example.com").unwrap().body);
        h.auth.confirm_password_reset(&token, "newpw123").await.unwrap();

        assert_eq!(h.auth.prune_expired(), 0);
        h.clock.advance(Duration::hours(2));
        assert_eq!(h.auth.prune_expired(), 1);
    }
}
