use std::env;
use std::time::Duration;

pub const DEFAULT_LEONARDO_BASE_URL: &str = "https://cloud.leonardo.ai/api/rest/v1";
/// Leonardo Vision XL
pub const DEFAULT_LEONARDO_MODEL_ID: &str = "ac614f96-1082-45bf-be9d-757f2d31c174";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_TIMEOUT_INTERVALS: u32 = 40;
/// Longest poll period honoured; anything above is clamped to it.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct LeonardoConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model_id: String,
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: u32,
    pub preset_style: String,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub leonardo: LeonardoConfig,
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub relay_url: String,
    pub poll_interval: Duration,
    /// Polling gives up after this many intervals have elapsed.
    pub timeout_intervals: u32,
}

impl Default for LeonardoConfig {
    fn default() -> Self {
        LeonardoConfig {
            api_key: None,
            base_url: DEFAULT_LEONARDO_BASE_URL.to_string(),
            model_id: DEFAULT_LEONARDO_MODEL_ID.to_string(),
            width: 1024,
            height: 1024,
            num_images: 1,
            num_inference_steps: 25,
            guidance_scale: 7,
            preset_style: "LEONARDO".to_string(),
        }
    }
}

impl LeonardoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        LeonardoConfig {
            api_key: env::var("LEONARDO_API_KEY").ok().filter(|key| !key.is_empty()),
            base_url: env::var("LEONARDO_BASE_URL").unwrap_or(defaults.base_url),
            model_id: env::var("LEONARDO_MODEL_ID").unwrap_or(defaults.model_id),
            ..defaults
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            path: "/ai".to_string(),
            leonardo: LeonardoConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        RelayConfig {
            host: env::var("RELAY_HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.port),
            path: env::var("RELAY_PATH").unwrap_or(defaults.path),
            leonardo: LeonardoConfig::from_env(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_leonardo(mut self, config: LeonardoConfig) -> Self {
        self.leonardo = config;
        self
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig {
            relay_url: "http://127.0.0.1:8080/ai".to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout_intervals: DEFAULT_TIMEOUT_INTERVALS,
        }
    }
}

impl PollerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        PollerConfig {
            relay_url: env::var("RELAY_URL").unwrap_or(defaults.relay_url),
            poll_interval: env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|ms| ms.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            timeout_intervals: env::var("POLL_TIMEOUT_INTERVALS")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.timeout_intervals),
        }
    }

    pub fn with_relay_url(mut self, relay_url: impl Into<String>) -> Self {
        self.relay_url = relay_url.into();
        self
    }

    /// A zero interval is ignored and the current one kept.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.poll_interval = interval;
        }
        self
    }

    pub fn with_timeout_intervals(mut self, intervals: u32) -> Self {
        self.timeout_intervals = intervals;
        self
    }

    /// Period the poller actually ticks at: never zero and never above
    /// [`MAX_POLL_INTERVAL`].
    pub fn period(&self) -> Duration {
        if self.poll_interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            self.poll_interval.min(MAX_POLL_INTERVAL)
        }
    }

    /// Total time a job may spend polling before it is declared timed out.
    pub fn timeout(&self) -> Duration {
        self.period()
            .checked_mul(self.timeout_intervals)
            .unwrap_or(DEFAULT_POLL_INTERVAL * DEFAULT_TIMEOUT_INTERVALS)
    }
}
