pub fn audit_call_admitted(consumer: &str, method: &str, host: &str) {
    tracing::info!(
        target: "audit",
        event = "call_admitted",
        consumer = consumer,
        method = method,
        host = host,
        "call admitted"
    );
}

pub fn audit_call_denied(reason: &str, consumer: Option<&str>, method: &str) {
    tracing::warn!(
        target: "audit",
        event = "call_denied",
        reason = reason,
        consumer = consumer.unwrap_or("unknown"),
        method = method,
        "call denied"
    );
}
