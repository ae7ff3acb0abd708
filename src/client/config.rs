use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound for every HTTP call, refresh included.
    pub request_timeout: Duration,
    /// Refresh ahead of time once the access token has less than this left.
    pub refresh_threshold: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            refresh_threshold: Duration::from_secs(60),
        }
    }
}
