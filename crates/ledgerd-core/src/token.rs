//! Per-companion-app token lifecycle
//!
//! Each companion app listed in the workspace `apps.txt` gets a 32-character
//! shared secret, persisted in the `auth` table and mirrored into the app's
//! own data directory so the companion can pick it up without a pairing UI.
//! A login with a stale token triggers a republish of the stored one, so a
//! wiped companion directory heals itself on the next attempt.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;

use crate::db::{Database, Row};
use crate::logger::ServiceLog;
use crate::schema::AUTH;

/// Tokens are exactly this many characters from `[0-9A-Za-z]`.
pub const TOKEN_LEN: usize = 32;

/// Where companion apps keep their private data directories.
pub const DEFAULT_PUBLISH_ROOT: &str = "/sdcard/Android/data";

pub struct TokenManager {
    db: Arc<Database>,
    log: Arc<ServiceLog>,
    publish_root: PathBuf,
}

impl TokenManager {
    pub fn new(db: Arc<Database>, log: Arc<ServiceLog>, publish_root: PathBuf) -> Self {
        Self {
            db,
            log,
            publish_root,
        }
    }

    /// Read `apps.txt` (one app id per line, blanks skipped), ensure every
    /// listed app has a stored token, and publish it. Publish failures are
    /// logged and do not abort startup.
    pub fn bootstrap(&self, workspace: &Path) {
        let apps = match fs::read_to_string(workspace.join("apps.txt")) {
            Ok(s) => s,
            Err(e) => {
                self.log.error(&format!("cannot read apps.txt: {e}"));
                return;
            }
        };
        for line in apps.lines() {
            let app = line.trim();
            if app.is_empty() {
                continue;
            }
            let token = self.ensure_token(app);
            self.publish(app, &token);
        }
    }

    /// The stored token for `app`, if any.
    pub fn token_for(&self, app: &str) -> Option<String> {
        let rows = self
            .db
            .select_where(&AUTH, "\"app\" = ?", &[Value::from(app)]);
        rows.into_iter()
            .next()
            .and_then(|row| row.get("token").and_then(Value::as_str).map(String::from))
    }

    fn ensure_token(&self, app: &str) -> String {
        if let Some(token) = self.token_for(app) {
            return token;
        }
        let token = generate_token();
        let mut row = Row::new();
        row.insert("app".into(), Value::from(app));
        row.insert("token".into(), Value::from(token.as_str()));
        self.db.insert(&AUTH, &row);
        token
    }

    /// Write the token into the companion's data directory, readable by the
    /// companion. Failure is non-fatal and logged at ERROR.
    pub fn publish(&self, app: &str, token: &str) {
        if let Err(e) = self.write_token_file(app, token) {
            self.log
                .error(&format!("token publish failed for {app}: {e}"));
        }
    }

    fn write_token_file(&self, app: &str, token: &str) -> std::io::Result<()> {
        let dir = self.publish_root.join(app);
        fs::create_dir_all(&dir)?;
        let path = dir.join("token.txt");
        fs::write(&path, token)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o666))?;
        }
        Ok(())
    }

    /// Compare `(app, token)` against the `auth` table. On mismatch the
    /// stored token is republished so a stale companion file self-heals.
    pub fn verify(&self, app: &str, token: &str) -> bool {
        match self.token_for(app) {
            Some(stored) if stored == token => true,
            Some(stored) => {
                self.publish(app, &stored);
                false
            }
            None => false,
        }
    }
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(root: &Path) -> TokenManager {
        let db = Arc::new(Database::in_memory().unwrap());
        let log = Arc::new(ServiceLog::new(db.clone(), false));
        TokenManager::new(db, log, root.to_path_buf())
    }

    #[test]
    fn generated_tokens_are_32_alphanumeric() {
        for _ in 0..16 {
            let token = generate_token();
            assert_eq!(token.len(), TOKEN_LEN);
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn bootstrap_persists_and_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("ws");
        fs::create_dir_all(&workspace).unwrap();
        fs::write(
            workspace.join("apps.txt"),
            "net.ankio.auto.helper\n\n  \n",
        )
        .unwrap();

        let publish_root = dir.path().join("data");
        let tokens = setup(&publish_root);
        tokens.bootstrap(&workspace);

        let stored = tokens.token_for("net.ankio.auto.helper").unwrap();
        assert_eq!(stored.len(), TOKEN_LEN);
        let published =
            fs::read_to_string(publish_root.join("net.ankio.auto.helper/token.txt")).unwrap();
        assert_eq!(published, stored);

        // A second bootstrap reuses the stored token.
        tokens.bootstrap(&workspace);
        assert_eq!(tokens.token_for("net.ankio.auto.helper").unwrap(), stored);
    }

    #[test]
    fn mismatch_republishes_stored_token() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("ws");
        fs::create_dir_all(&workspace).unwrap();
        fs::write(workspace.join("apps.txt"), "com.example.pal\n").unwrap();

        let publish_root = dir.path().join("data");
        let tokens = setup(&publish_root);
        tokens.bootstrap(&workspace);
        let stored = tokens.token_for("com.example.pal").unwrap();

        // Simulate a stale companion file, then a failed login.
        let file = publish_root.join("com.example.pal/token.txt");
        fs::write(&file, "stale").unwrap();
        assert!(!tokens.verify("com.example.pal", "stale-token"));
        assert_eq!(fs::read_to_string(&file).unwrap(), stored);

        assert!(tokens.verify("com.example.pal", &stored));
        assert!(!tokens.verify("nobody", "anything"));
    }
}
