use secrecy::Secret;

/// Used when `PASS_SECRET` is unset. Anyone who knows it can forge passes.
pub const DEFAULT_PASS_SECRET: &str = "default-secret-key";

/// Where the student directory lives
#[derive(Debug, Clone)]
pub enum DirectorySettings {
    /// Direct Postgres connection (schema managed by our migrations)
    Postgres { database_url: Secret<String> },
    /// Hosted PostgREST API, e.g. a Supabase project
    Rest {
        url: String,
        service_key: Secret<String>,
    },
}

/// Admin account created or refreshed at startup (Postgres directory only)
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub base_url: String,

    // Endpoint embedded in pass QR codes; defaults to {base_url}/verify
    pub verify_url: String,

    pub directory: DirectorySettings,

    // Pass signing
    pub pass_secret: Secret<String>,

    // Shown on pass cards and verification pages
    pub event_name: String,
    pub event_date: String,

    pub admin_seed: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Self::from_source(&config)
    }

    pub fn from_source(config: &config::Config) -> Result<Self, config::ConfigError> {
        let base_url: String = config
            .get::<String>("base_url")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let verify_url = config
            .get::<String>("verify_url")
            .unwrap_or_else(|_| format!("{}/verify", base_url));

        let directory = if let Ok(database_url) = config.get::<String>("database_url") {
            DirectorySettings::Postgres {
                database_url: Secret::new(database_url),
            }
        } else if let (Ok(url), Ok(service_key)) = (
            config.get::<String>("supabase_url"),
            config.get::<String>("supabase_service_key"),
        ) {
            DirectorySettings::Rest {
                url,
                service_key: Secret::new(service_key),
            }
        } else {
            return Err(config::ConfigError::Message(
                "either DATABASE_URL or SUPABASE_URL and SUPABASE_SERVICE_KEY must be set"
                    .to_string(),
            ));
        };

        let pass_secret = match config.get::<String>("pass_secret") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("PASS_SECRET not set, falling back to the built-in default secret");
                DEFAULT_PASS_SECRET.to_string()
            }
        };

        let admin_seed = match (
            config.get::<String>("admin_email"),
            config.get::<String>("admin_password"),
        ) {
            (Ok(email), Ok(password)) => Some(AdminSeed {
                email,
                password: Secret::new(password),
            }),
            _ => None,
        };

        Ok(Self {
            host: config
                .get("host")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port").unwrap_or(3000),
            base_url,
            verify_url,
            directory,
            pass_secret: Secret::new(pass_secret),
            event_name: config
                .get("event_name")
                .unwrap_or_else(|_| "Annual Event 2025".to_string()),
            event_date: config
                .get("event_date")
                .unwrap_or_else(|_| "30 Sept 2025".to_string()),
            admin_seed,
        })
    }

    /// Session cookies are marked `Secure` only when served over HTTPS
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}
