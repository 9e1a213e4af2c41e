use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::info;

/// Outbound notification seam. The reset flow only ever needs a
/// fire-and-forget send; failures are logged by the caller, never surfaced.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> anyhow::Result<()>;
}

/// Dev mailer: writes each message into tmp/emails as a plain-text file.
#[derive(Clone)]
pub struct FileMailer {
    dir: std::path::PathBuf,
}

impl FileMailer {
    pub fn new() -> Self {
        Self {
            dir: std::path::PathBuf::from("tmp/emails"),
        }
    }
}

#[async_trait]
impl Mailer for FileMailer {
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let stamp = OffsetDateTime::now_utc().unix_timestamp_nanos();
        let file = self.dir.join(format!("password-reset-{}.txt", stamp));

        let content = format!(
            "TO: {}\nSUBJECT: Reset your password\n\n\
             Click the link to reset your password:\n{}\n\n\
             If you did not request this, you can ignore this email.\n",
            to, reset_link
        );
        tokio::fs::write(&file, content).await?;

        info!(to = %to, file = %file.display(), "password reset email written");
        Ok(())
    }
}

#[cfg(test)]
pub struct NoopMailer;

#[cfg(test)]
#[async_trait]
impl Mailer for NoopMailer {
    async fn send_password_reset(&self, _to: &str, _reset_link: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_mailer_writes_message() {
        let dir = std::env::temp_dir().join(format!("pollwise-mailer-{}", uuid::Uuid::new_v4()));
        let mailer = FileMailer { dir: dir.clone() };

        mailer
            .send_password_reset("a@x.com", "https://app/reset-password?token=t")
            .await
            .expect("send should succeed");

        let mut entries = tokio::fs::read_dir(&dir).await.expect("dir exists");
        let entry = entries.next_entry().await.unwrap().expect("one file");
        let content = tokio::fs::read_to_string(entry.path()).await.unwrap();
        assert!(content.contains("TO: a@x.com"));
        assert!(content.contains("token=t"));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
