use anyhow::{Context, Result};
use clap::Args;
use std::env;
use tracing::info;

use crate::constants::env as vars;
use crate::issuer::Issuer;
use crate::notify::{NotifyTarget, RocketChatNotifier};

#[derive(Debug, Clone, Args)]
pub struct NotifyCommand {
    #[arg(long, env = vars::CRON_IDENTIFIER, help = "Identifier to issue credentials for")]
    pub id: String,
}

impl NotifyCommand {
    pub async fn execute(self) -> Result<()> {
        info!("Issuing scheduled credentials for {}", self.id);

        let issuer = super::build_issuer().await?;
        run(&issuer, &self.id, |key| env::var(key).ok()).await
    }
}

/// Resolve the chat target, then issue and post. Nothing is issued when
/// the target is incomplete.
pub async fn run<F>(issuer: &Issuer, id: &str, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let title = issuer.registry().lookup(id)?.title.clone();
    let target = NotifyTarget::from_lookup(id, title.as_deref(), lookup)?;

    let creds = issuer
        .issue(id)
        .await
        .context("Failed to get STS credentials")?;

    RocketChatNotifier::new()?
        .send(&target, &creds)
        .await
        .context("Failed to send Rocket.Chat notification")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::{AssumeRole, AssumeRoleRequest, Credentials};
    use crate::config::Settings;
    use crate::registry::Registry;
    use async_trait::async_trait;
    use aws_smithy_types::DateTime;
    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    const S3_READ: &str = r#"{"Effect":"Allow","Action":["s3:GetObject"],"Resource":["*"]}"#;

    #[derive(Default)]
    struct FakeSts {
        calls: Mutex<Vec<AssumeRoleRequest>>,
    }

    #[async_trait]
    impl AssumeRole for FakeSts {
        async fn assume_role(&self, request: AssumeRoleRequest) -> anyhow::Result<Credentials> {
            self.calls.lock().unwrap().push(request);
            Ok(Credentials {
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: "token".to_string(),
                expiration: DateTime::from_secs(1_700_000_000),
            })
        }
    }

    type Captured = Arc<Mutex<Vec<serde_json::Value>>>;

    fn issuer(sts: Arc<FakeSts>) -> Issuer {
        let registry = Registry::from_entries([
            ("ARN_BACKUP", "arn:aws:iam::123456789012:role/backup"),
            ("TITLE_BACKUP", "Nightly backups"),
            ("POLICY_BACKUP_0", S3_READ),
            ("ARN_UNTITLED", "arn:aws:iam::123456789012:role/untitled"),
        ]);
        Issuer::new(Arc::new(registry), sts, &Settings::default())
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    async fn hook(
        State(captured): State<Captured>,
        Json(body): Json<serde_json::Value>,
    ) -> StatusCode {
        captured.lock().unwrap().push(body);
        StatusCode::OK
    }

    async fn spawn_webhook() -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route("/hook", post(hook))
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/hook"), captured)
    }

    #[tokio::test]
    async fn test_run_posts_credentials_with_registry_title() {
        let sts = Arc::new(FakeSts::default());
        let (url, captured) = spawn_webhook().await;

        run(
            &issuer(sts.clone()),
            "BACKUP",
            lookup(&[("RC_WEBHOOK", url.as_str()), ("RC_CHANNEL_BACKUP", "#ops")]),
        )
        .await
        .unwrap();

        assert_eq!(sts.calls.lock().unwrap().len(), 1);
        let bodies = captured.lock().unwrap().clone();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["channel"], "#ops");
        assert_eq!(
            bodies[0]["text"],
            ":key: S3 Credentials: Nightly backups\n:alarm_clock: Expires: ~2023-11-15 01:13:20"
        );
        assert!(
            bodies[0]["attachments"][0]["text"]
                .as_str()
                .unwrap()
                .contains("export AWS_ACCESS_KEY_ID=\"AKIDEXAMPLE\";")
        );
    }

    #[tokio::test]
    async fn test_run_missing_webhook_issues_nothing() {
        let sts = Arc::new(FakeSts::default());

        let err = run(&issuer(sts.clone()), "BACKUP", lookup(&[("RC_CHANNEL_BACKUP", "#ops")]))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("RC_WEBHOOK"));
        assert!(sts.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_missing_title_issues_nothing() {
        let sts = Arc::new(FakeSts::default());

        let err = run(
            &issuer(sts.clone()),
            "UNTITLED",
            lookup(&[
                ("RC_WEBHOOK", "http://127.0.0.1:9/hook"),
                ("RC_CHANNEL_UNTITLED", "#ops"),
            ]),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("title"));
        assert!(sts.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_unknown_identifier_fails() {
        let sts = Arc::new(FakeSts::default());

        let result = run(&issuer(sts.clone()), "NOPE", lookup(&[])).await;

        assert!(result.is_err());
        assert!(sts.calls.lock().unwrap().is_empty());
    }
}
