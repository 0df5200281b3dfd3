use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_REPLY: &str = "I'm sorry, Dave, I'm afraid I can't do that.";

/// Public beta key giphy hands out for experimentation.
const DEFAULT_GIPHY_KEY: &str = "dc6zaTOxFJmzC";
const DEFAULT_IMGUR_CLIENT_ID: &str = "7fd4f416717f07d";

/// Downtown Portland.
const DEFAULT_LATITUDE: f64 = 45.522005;
const DEFAULT_LONGITUDE: f64 = -122.680372;

/// GitHub issue tracker the bot files into.
#[derive(Clone, Debug)]
pub struct GithubConfig {
    pub url: String,
    pub owner: String,
    pub repo: String,
    pub token: Option<String>,
}

/// Typed configuration, loaded from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // Transport
    pub telegram_bot_token: String,
    pub bot_name: Option<String>,
    pub default_reply: String,

    // Storage
    pub database_path: PathBuf,
    pub db_timeout: Duration,

    // Timeouts
    pub http_timeout: Duration,
    pub handler_timeout: Duration,

    // Collaborators
    pub giphy_api_key: String,
    pub imgur_client_id: String,
    pub owm_api_key: Option<String>,
    pub github: Option<GithubConfig>,
    pub multco_token: Option<String>,
    pub iss_latitude: f64,
    pub iss_longitude: f64,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let mut cfg = Self::from_token(telegram_bot_token);

        cfg.bot_name = env_str("BOT_NAME").and_then(non_empty);
        if let Some(reply) = env_str("DEFAULT_REPLY").and_then(non_empty) {
            cfg.default_reply = reply;
        }

        if let Some(p) = env_str("DATABASE_PATH").and_then(non_empty) {
            cfg.database_path = PathBuf::from(p);
        }
        if let Some(ms) = env_u64("DB_TIMEOUT_MS") {
            cfg.db_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("HTTP_TIMEOUT_MS") {
            cfg.http_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("HANDLER_TIMEOUT_MS") {
            cfg.handler_timeout = Duration::from_millis(ms);
        }

        if let Some(k) = env_str("GIPHY_API_KEY").and_then(non_empty) {
            cfg.giphy_api_key = k;
        }
        if let Some(k) = env_str("IMGUR_CLIENT_ID").and_then(non_empty) {
            cfg.imgur_client_id = k;
        }
        cfg.owm_api_key = env_str("OWM_API_KEY").and_then(non_empty);
        cfg.multco_token = env_str("MULTCO_TOKEN").and_then(non_empty);

        let owner = env_str("GITHUB_OWNER").and_then(non_empty);
        let repo = env_str("GITHUB_REPO").and_then(non_empty);
        if let (Some(owner), Some(repo)) = (owner, repo) {
            cfg.github = Some(GithubConfig {
                url: env_str("GITHUB_URL")
                    .and_then(non_empty)
                    .unwrap_or_else(|| "https://api.github.com".to_string()),
                owner,
                repo,
                token: env_str("GITHUB_TOKEN").and_then(non_empty),
            });
        }

        if let Some(lat) = env_f64("ISS_LATITUDE") {
            cfg.iss_latitude = lat;
        }
        if let Some(lon) = env_f64("ISS_LONGITUDE") {
            cfg.iss_longitude = lon;
        }

        Ok(cfg)
    }

    /// Defaults for everything except the transport token.
    pub fn from_token(telegram_bot_token: impl Into<String>) -> Self {
        Self {
            telegram_bot_token: telegram_bot_token.into(),
            bot_name: None,
            default_reply: DEFAULT_REPLY.to_string(),
            database_path: PathBuf::from("slackbutt.db"),
            db_timeout: Duration::from_millis(5_000),
            http_timeout: Duration::from_millis(10_000),
            handler_timeout: Duration::from_millis(30_000),
            giphy_api_key: DEFAULT_GIPHY_KEY.to_string(),
            imgur_client_id: DEFAULT_IMGUR_CLIENT_ID.to_string(),
            owm_api_key: None,
            github: None,
            multco_token: None,
            iss_latitude: DEFAULT_LATITUDE,
            iss_longitude: DEFAULT_LONGITUDE,
        }
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    // Variables already in the environment win over the file.
    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_none() {
            env::set_var(key, val);
        }
    }
}

/// `KEY=value` lines; `#` comments, blank lines and an `export ` prefix are allowed.
fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (k, v) = line.split_once('=')?;
            let key = k.trim();
            (!key.is_empty()).then(|| (key.to_string(), unquote(v.trim()).to_string()))
        })
        .collect()
}

fn unquote(v: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|q| v.strip_prefix(*q)?.strip_suffix(*q))
        .unwrap_or(v)
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_f64(key: &str) -> Option<f64> {
    env_str(key).and_then(|s| s.trim().parse::<f64>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_strips_quotes_and_comments() {
        let parsed = parse_dotenv(
            "# comment\nTELEGRAM_BOT_TOKEN=\"abc:123\"\n\nexport OWM_API_KEY='k'\nnot a pair\n=empty\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "abc:123".to_string()),
                ("OWM_API_KEY".to_string(), "k".to_string()),
            ]
        );
    }

    #[test]
    fn defaults_point_at_portland() {
        let cfg = Config::from_token("t");
        assert_eq!(cfg.default_reply, DEFAULT_REPLY);
        assert!(cfg.github.is_none());
        assert!((cfg.iss_latitude - 45.522005).abs() < f64::EPSILON);
    }
}
