use serde::Deserialize;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_PAGE_SIZE: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // School backend REST API
    pub api_base_url: String,

    // Public address of the dashboard itself
    pub base_url: String,
    pub host: String,
    pub port: u16,
    pub static_dir: String,

    // Attendance viewer rows per page
    pub page_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        let page_size = config
            .get::<usize>("page_size")
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .max(1);

        Ok(Self {
            api_base_url: config
                .get("api_base_url")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            base_url: config
                .get("base_url")
                .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string()),
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port").unwrap_or(3000),
            static_dir: config
                .get("static_dir")
                .unwrap_or_else(|_| "web/static".to_string()),

            page_size,
        })
    }

    /// Configuration pointing at the given backend, with every other key at
    /// its default. Used by tests and local tooling.
    pub fn for_backend(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            base_url: "http://127.0.0.1:3000".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            static_dir: "web/static".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Whether session cookies must carry the `Secure` flag
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}
