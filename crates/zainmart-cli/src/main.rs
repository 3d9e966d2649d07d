use std::sync::Arc;

use anyhow::{Context, bail};
use serde_json::{Value, json};
use tracing::error;

use zainmart_api::{Client, Session, SiteConfig};
use zainmart_nav::{authorize, default_menu, filter_menu_by_roles, to_sidebar_items};
use zainmart_platform::HttpPlatform;
use zainmart_types::models::OrderFilter;

const USAGE: &str = "usage: zainmart <menu | access <path> | partners | conversations | notifications | orders <seller>>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging (stdout is reserved for command output)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zainmart=info,zainmart_api=info,zainmart_platform=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        bail!(USAGE);
    };

    // Config
    let config = SiteConfig::from_env();
    let platform = HttpPlatform::new(&config.backend).context("invalid ZAINMART_BACKEND")?;
    let client = Client::new(Arc::new(platform)).with_locale(config.default_language.as_str());

    let session = sign_in_from_env(&client).await;

    let output = match (command, args.get(1)) {
        ("menu", _) => {
            let roles = session.as_ref().map(|s| s.roles.clone()).unwrap_or_default();
            let menu = filter_menu_by_roles(&default_menu(), &roles);
            serde_json::to_value(to_sidebar_items(&menu, |key| key.to_string()))?
        }
        ("access", Some(path)) => {
            let decision = match &session {
                Some(s) => authorize(Some(s.roles.as_slice()), path),
                None => authorize::<String>(None, path),
            };
            serde_json::to_value(decision)?
        }
        ("partners", _) => {
            let user = require(&session)?;
            json!(client.get_conversation_partners(&user.shortname).await)
        }
        ("conversations", _) => {
            let user = require(&session)?;
            serde_json::to_value(client.get_user_conversations(&user.shortname).await)?
        }
        ("notifications", _) => {
            let user = require(&session)?;
            serde_json::to_value(client.fetch_notifications(&user.shortname).await)?
        }
        ("orders", Some(seller)) => {
            require(&session)?;
            let orders = client
                .get_seller_orders(&config.main_space, seller, &OrderFilter::default(), 20, 0)
                .await;
            serde_json::to_value(orders)?
        }
        _ => bail!(USAGE),
    };

    print(&output)?;

    if let Some(session) = session {
        client.sign_out(session).await;
    }
    Ok(())
}

/// Signs in with `ZAINMART_USERNAME`/`ZAINMART_PASSWORD` when both are set.
async fn sign_in_from_env(client: &Client) -> Option<Session> {
    let user = std::env::var("ZAINMART_USERNAME").ok()?;
    let password = std::env::var("ZAINMART_PASSWORD").ok()?;
    sign_in(client, &user, &password).await
}

async fn sign_in(client: &Client, user: &str, password: &str) -> Option<Session> {
    client
        .sign_in(user, password)
        .await
        .inspect_err(|e| error!("Sign-in failed: {}", e))
        .ok()
}

fn require(session: &Option<Session>) -> anyhow::Result<&Session> {
    session
        .as_ref()
        .context("this command needs ZAINMART_USERNAME and ZAINMART_PASSWORD")
}

fn print(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer};
    use tracing_subscriber::prelude::*;
    use zainmart_nav::RouteDecision;
    use zainmart_platform::MockPlatform;
    use zainmart_types::{ApiResponse, Record, ResourceType};

    use super::*;

    /// Counts events whose message equals `message`.
    struct CountMessages {
        message: &'static str,
        seen: Arc<AtomicUsize>,
    }

    struct MessageField(String);

    impl Visit for MessageField {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{:?}", value);
            }
        }
    }

    impl<S: Subscriber> Layer<S> for CountMessages {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut field = MessageField(String::new());
            event.record(&mut field);
            if field.0 == self.message {
                self.seen.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_anonymous_access_goes_to_login() {
        let decision = authorize::<String>(None, "/dashboard/orders");
        assert_eq!(decision, RouteDecision::Login);
    }

    #[tokio::test]
    async fn test_sign_in_is_logged_once() {
        let seen = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(CountMessages {
            message: "Signed in",
            seen: seen.clone(),
        });
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut mock = MockPlatform::new();
        mock.expect_login()
            .return_once(|_| Ok(ApiResponse::success(vec![Record::new(ResourceType::User, "ali", "users")])));
        let client = Client::new(Arc::new(mock)).with_locale("en");

        let session = sign_in(&client, "ali", "pw").await.unwrap();
        assert_eq!(session.locale, "en");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
