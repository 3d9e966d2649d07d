use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use zainmart_types::{Credentials, Record, RecordRequest, ResourceType, Submission};

use crate::{Client, ServiceError};

const OTP_FALLBACK: &str = "OTP request failed. Please try again.";
const CHECK_FALLBACK: &str = "Check existing failed. Please try again.";
const REGISTER_FALLBACK: &str = "Registration failed. Please try again.";
const CONTACT_FALLBACK: &str = "Sending message failed. Please try again.";
const SIGN_IN_FALLBACK: &str = "Sign in failed. Please try again.";

/// Identity of the signed-in caller. Created by [`Client::sign_in`] or
/// [`Client::login_by`], ended by [`Client::sign_out`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub shortname: String,
    pub displayname: Option<String>,
    pub roles: Vec<String>,
    pub locale: String,
    pub account: Record,
}

impl Session {
    fn from_account(account: Record, locale: &str) -> Self {
        Self {
            shortname: account.shortname.clone(),
            displayname: account
                .attributes
                .displayname
                .as_ref()
                .and_then(|d| d.resolve("en"))
                .map(str::to_string),
            roles: account.attributes.roles.clone(),
            locale: locale.to_string(),
            account,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn switch_locale(&mut self, locale: &str) {
        self.locale = locale.to_string();
    }
}

/// Input of [`Client::register`].
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub email: String,
    pub shortname: Option<String>,
    pub otp: String,
    pub password: String,
    pub confirm_password: String,
    pub role: String,
    /// Profile document stored as the user's payload.
    pub data: Value,
}

impl Client {
    pub async fn sign_in(&self, shortname: &str, password: &str) -> Result<Session, ServiceError> {
        self.open_session(Credentials::shortname(shortname, password)).await
    }

    pub async fn login_by(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        self.open_session(Credentials::email(email, password)).await
    }

    async fn open_session(&self, credentials: Credentials) -> Result<Session, ServiceError> {
        let resp = self
            .platform()
            .login(credentials)
            .await
            .map_err(|e| ServiceError::from_platform(e, SIGN_IN_FALLBACK))?;
        if !resp.is_success() {
            return Err(ServiceError::from_response(&resp, SIGN_IN_FALLBACK));
        }
        let account = resp
            .into_first()
            .ok_or_else(|| ServiceError::Rejected(SIGN_IN_FALLBACK.to_string()))?;
        let session = Session::from_account(account, self.locale());
        info!(user = %session.shortname, roles = ?session.roles, "Signed in");
        Ok(session)
    }

    /// Ends the session. The platform token is dropped even when the remote
    /// logout fails.
    pub async fn sign_out(&self, session: Session) {
        if let Err(e) = self.platform().logout().await {
            warn!(user = %session.shortname, "Logout failed: {}", e);
        }
    }

    /// Requests an e-mail OTP and returns its request id.
    pub async fn request_otp(&self, email: &str) -> Result<String, ServiceError> {
        let resp = self
            .platform()
            .otp_request(email.to_string())
            .await
            .map_err(|e| ServiceError::from_platform(e, OTP_FALLBACK))?;
        if !resp.is_success() {
            return Err(ServiceError::from_response(&resp, OTP_FALLBACK));
        }
        resp.records
            .first()
            .and_then(|r| r.attributes.extra_str("request_id"))
            .map(str::to_string)
            .ok_or_else(|| ServiceError::Rejected(OTP_FALLBACK.to_string()))
    }

    /// True when no user holds `value` for `prop` yet.
    pub async fn check_existing(&self, prop: &str, value: &str) -> Result<bool, ServiceError> {
        self.platform()
            .check_existing(prop.to_string(), value.to_string())
            .await
            .map_err(|e| ServiceError::from_platform(e, CHECK_FALLBACK))
    }

    /// Creates the account, then signs in with its e-mail.
    pub async fn register(&self, reg: Registration) -> Result<Session, ServiceError> {
        if reg.password != reg.confirm_password {
            return Err(ServiceError::Rejected("Passwords do not match".to_string()));
        }

        let description = reg.data.get("description").cloned().unwrap_or(Value::Null);
        let record = RecordRequest::new(
            ResourceType::User,
            reg.shortname.as_deref().unwrap_or("auto"),
            "/",
        )
        .attributes(json!({
            "email": reg.email,
            "email_otp": reg.otp,
            "password": reg.password,
            "roles": [reg.role],
            "description": { "en": description },
            "payload": { "content_type": "json", "body": reg.data },
        }));

        let resp = self
            .platform()
            .create_user(record)
            .await
            .map_err(|e| ServiceError::from_platform(e, REGISTER_FALLBACK))?;
        if !resp.is_success() {
            return Err(ServiceError::from_response(&resp, REGISTER_FALLBACK));
        }
        self.login_by(&reg.email, &reg.password).await
    }

    pub async fn contact_us(&self, name: &str, email: &str, message: &str, subject: &str) -> Result<(), ServiceError> {
        let submission = Submission {
            space_name: "applications".into(),
            resource_type: ResourceType::Content,
            schema_shortname: "contact".into(),
            subpath: "contacts".into(),
            body: json!({
                "full_name": name,
                "email": email,
                "message": message,
                "subject": subject,
            }),
        };
        let resp = self
            .platform()
            .submit(submission)
            .await
            .map_err(|e| ServiceError::from_platform(e, CONTACT_FALLBACK))?;
        if resp.is_success() {
            Ok(())
        } else {
            Err(ServiceError::from_response(&resp, CONTACT_FALLBACK))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SiteConfig;
    use crate::testing::client;
    use zainmart_platform::{MockPlatform, PlatformError};
    use zainmart_types::{ApiResponse, LoginId, ResponseAttributes, Text, Translation};

    fn account() -> Record {
        let mut account = Record::new(ResourceType::User, "alice", "users");
        account.attributes.roles = vec!["zm_seller".into()];
        account.attributes.displayname = Some(Text::from(Translation {
            en: Some("Alice".into()),
            ..Default::default()
        }));
        account.attributes.extra.insert("access_token".into(), json!("tok"));
        account
    }

    #[tokio::test]
    async fn test_sign_in_builds_session() {
        let mut mock = MockPlatform::new();
        mock.expect_login()
            .withf(|c| c.id == LoginId::Shortname("alice".into()) && c.password == "pw")
            .return_once(|_| Ok(ApiResponse::success(vec![account()])));

        let session = client(mock).sign_in("alice", "pw").await.unwrap();
        assert_eq!(session.shortname, "alice");
        assert_eq!(session.displayname.as_deref(), Some("Alice"));
        assert_eq!(session.locale, "ar");
        assert!(session.has_role("zm_seller"));
    }

    #[tokio::test]
    async fn test_session_takes_configured_locale() {
        let mut mock = MockPlatform::new();
        mock.expect_login().return_once(|_| Ok(ApiResponse::success(vec![account()])));

        let config = SiteConfig::from_lookup(|key| (key == "ZAINMART_LOCALE").then(|| "ku".to_string()));
        let client = client(mock).with_locale(config.default_language);
        let session = client.sign_in("alice", "pw").await.unwrap();
        assert_eq!(session.locale, "ku");
    }

    #[tokio::test]
    async fn test_failed_login_is_an_error() {
        let mut mock = MockPlatform::new();
        mock.expect_login()
            .return_once(|_| Err(PlatformError::Api { status: 401, message: "Invalid username or password".into() }));
        let err = client(mock).sign_in("alice", "bad").await.unwrap_err();
        assert_eq!(err.message(), "Invalid username or password");
    }

    #[tokio::test]
    async fn test_request_otp_returns_request_id() {
        let mut mock = MockPlatform::new();
        let mut record = Record::new(ResourceType::User, "otp", "/");
        record.attributes.extra.insert("request_id".into(), json!("req-1"));
        mock.expect_otp_request()
            .withf(|email| email == "a@b.cc")
            .return_once(move |_| Ok(ApiResponse::success(vec![record])));
        assert_eq!(client(mock).request_otp("a@b.cc").await.unwrap(), "req-1");
    }

    #[tokio::test]
    async fn test_request_otp_rejected_uses_server_message() {
        let mut mock = MockPlatform::new();
        mock.expect_otp_request().return_once(|_| Ok(ApiResponse::failed("Too many requests")));
        let err = client(mock).request_otp("a@b.cc").await.unwrap_err();
        assert_eq!(err.message(), "Too many requests");
    }

    #[tokio::test]
    async fn test_register_rejects_mismatched_passwords_without_calling() {
        let mock = MockPlatform::new();
        let reg = Registration {
            email: "a@b.cc".into(),
            shortname: None,
            otp: "123456".into(),
            password: "secret1".into(),
            confirm_password: "secret2".into(),
            role: "zm_seller".into(),
            data: json!({}),
        };
        let err = client(mock).register(reg).await.unwrap_err();
        assert_eq!(err.message(), "Passwords do not match");
    }

    #[tokio::test]
    async fn test_register_creates_user_then_logs_in_by_email() {
        let mut mock = MockPlatform::new();
        mock.expect_create_user()
            .withf(|r| {
                r.shortname == "auto"
                    && r.attributes["roles"] == json!(["zm_seller"])
                    && r.attributes["description"]["en"] == "shop"
                    && r.attributes["payload"]["body"]["description"] == "shop"
            })
            .return_once(|_| Ok(ApiResponse::success(Vec::new())));
        mock.expect_login()
            .withf(|c| c.id == LoginId::Email("a@b.cc".into()))
            .return_once(|_| Ok(ApiResponse::success(vec![account()])));

        let reg = Registration {
            email: "a@b.cc".into(),
            shortname: None,
            otp: "123456".into(),
            password: "secret".into(),
            confirm_password: "secret".into(),
            role: "zm_seller".into(),
            data: json!({"description": "shop"}),
        };
        let session = client(mock).register(reg).await.unwrap();
        assert_eq!(session.shortname, "alice");
    }

    #[tokio::test]
    async fn test_check_existing_passes_through() {
        let mut mock = MockPlatform::new();
        mock.expect_check_existing()
            .withf(|p, v| p == "email" && v == "a@b.cc")
            .return_once(|_, _| Ok(true));
        assert!(client(mock).check_existing("email", "a@b.cc").await.unwrap());
    }

    #[tokio::test]
    async fn test_contact_us_fallback_message() {
        let mut mock = MockPlatform::new();
        mock.expect_submit()
            .withf(|s| s.space_name == "applications" && s.subpath == "contacts" && s.body["full_name"] == "Ali")
            .return_once(|_| {
                Ok(ApiResponse {
                    attributes: Some(ResponseAttributes::default()),
                    ..ApiResponse::failed("")
                })
            });
        let err = client(mock).contact_us("Ali", "a@b.cc", "hello", "hi").await.unwrap_err();
        assert_eq!(err.message(), CONTACT_FALLBACK);
    }

    #[tokio::test]
    async fn test_sign_out_swallows_logout_failure() {
        let mut mock = MockPlatform::new();
        mock.expect_logout()
            .times(1)
            .return_once(|| Err(PlatformError::Api { status: 500, message: String::new() }));
        let session = Session::from_account(account(), "ar");
        client(mock).sign_out(session).await;
    }
}
