use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub consumer: String,
    /// Unset by default: `Logging` and `Statistics` streams stay open indefinitely.
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
}

impl ClientOptions {
    pub fn for_consumer(consumer: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            consumer: String::new(),
            timeout: None,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_options_defaults_are_sensible() {
        let opts = ClientOptions::default();

        assert!(opts.consumer.is_empty());
        assert!(opts.timeout.is_none());
        assert_eq!(opts.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn for_consumer_keeps_other_defaults() {
        let opts = ClientOptions::for_consumer("logger");

        assert_eq!(opts.consumer, "logger");
        assert_eq!(opts.connect_timeout, Duration::from_secs(5));
    }
}
