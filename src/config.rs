use std::env;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3030";

/// Presentation of the price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartStyle {
    #[default]
    Bar,
    Line,
}

impl ChartStyle {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bar" => Some(ChartStyle::Bar),
            "line" => Some(ChartStyle::Line),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartStyle::Bar => "bar",
            ChartStyle::Line => "line",
        }
    }
}

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Scheme and host of the explorer backend, e.g. `http://host:3030`
    pub endpoint_base: String,
    pub chart_style: ChartStyle,
    pub rust_log: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from the process environment
    ///
    /// - `CHAINPULSE_ENDPOINT` (default: http://127.0.0.1:3030)
    /// - `CHART_STYLE` (`bar` or `line`, default: bar)
    /// - `RUST_LOG` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint_base = lookup("CHAINPULSE_ENDPOINT")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        if !endpoint_base.starts_with("http://") && !endpoint_base.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "CHAINPULSE_ENDPOINT must start with http:// or https://".to_string(),
            ));
        }

        let chart_style = match lookup("CHART_STYLE") {
            None => ChartStyle::default(),
            Some(raw) => ChartStyle::from_str(&raw).unwrap_or_else(|| {
                log::warn!("Invalid CHART_STYLE '{}', defaulting to bar", raw);
                ChartStyle::default()
            }),
        };

        Ok(Self {
            endpoint_base,
            chart_style,
            rust_log: lookup("RUST_LOG"),
        })
    }

    /// Apply `--chart <bar|line>` from the command line, if present
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();

        if let Some(idx) = args.iter().position(|x| x == "--chart") {
            match args.get(idx + 1).and_then(|s| ChartStyle::from_str(s)) {
                Some(style) => self.chart_style = style,
                None => log::warn!("--chart expects 'bar' or 'line'; keeping {}", self.chart_style.as_str()),
            }
        }
    }

    /// `GET` endpoint for the initial snapshot
    pub fn snapshot_url(&self) -> String {
        format!("{}/latest_blocks", self.endpoint_base)
    }

    /// WebSocket endpoint for live updates
    pub fn stream_url(&self) -> String {
        let base = if let Some(rest) = self.endpoint_base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.endpoint_base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.endpoint_base.clone()
        };
        format!("{}/ws", base)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::collections::HashMap};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.endpoint_base, DEFAULT_ENDPOINT);
        assert_eq!(config.chart_style, ChartStyle::Bar);
        assert!(config.rust_log.is_none());
        assert_eq!(config.snapshot_url(), "http://127.0.0.1:3030/latest_blocks");
        assert_eq!(config.stream_url(), "ws://127.0.0.1:3030/ws");
    }

    #[test]
    fn test_custom_config() {
        let config = Config::from_lookup(lookup_from(&[
            ("CHAINPULSE_ENDPOINT", "https://explorer.example.com/"),
            ("CHART_STYLE", "Line"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint_base, "https://explorer.example.com");
        assert_eq!(config.chart_style, ChartStyle::Line);
        assert_eq!(config.rust_log.as_deref(), Some("debug"));
        assert_eq!(config.snapshot_url(), "https://explorer.example.com/latest_blocks");
        assert_eq!(config.stream_url(), "wss://explorer.example.com/ws");
    }

    #[test]
    fn test_invalid_endpoint_scheme() {
        let result = Config::from_lookup(lookup_from(&[("CHAINPULSE_ENDPOINT", "ftp://host")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_invalid_chart_style_falls_back_to_bar() {
        let config = Config::from_lookup(lookup_from(&[("CHART_STYLE", "pie")])).unwrap();
        assert_eq!(config.chart_style, ChartStyle::Bar);
    }

    #[test]
    fn test_chart_flag_overrides_env() {
        let mut config = Config::from_lookup(lookup_from(&[("CHART_STYLE", "bar")])).unwrap();
        config.apply_args(["chainpulse", "--chart", "line"].map(String::from));
        assert_eq!(config.chart_style, ChartStyle::Line);

        config.apply_args(["chainpulse", "--chart"].map(String::from));
        assert_eq!(config.chart_style, ChartStyle::Line);
    }
}
