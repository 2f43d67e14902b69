use std::fmt;

pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEvent {
    pub timestamp: i64,
    pub consumer: String,
    pub method: String,
    pub host: String,
}

impl CallEvent {
    pub fn new(
        timestamp: i64,
        consumer: impl Into<String>,
        method: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            consumer: consumer.into(),
            method: method.into(),
            host: host.into(),
        }
    }

    pub fn now(
        consumer: impl Into<String>,
        method: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self::new(unix_now(), consumer, method, host)
    }

    pub fn key(&self) -> EventKey<'_> {
        EventKey {
            timestamp: self.timestamp,
            consumer: &self.consumer,
            method: &self.method,
            host: &self.host,
        }
    }
}

impl fmt::Display for CallEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} from '{}'",
            self.timestamp, self.consumer, self.method, self.host
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKey<'a> {
    pub timestamp: i64,
    pub consumer: &'a str,
    pub method: &'a str,
    pub host: &'a str,
}
