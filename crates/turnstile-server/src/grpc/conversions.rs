use turnstile_core::{CallEvent, StatSnapshot};

use crate::proto::main as v1;

pub(super) fn event_to_proto(event: CallEvent) -> v1::Event {
    v1::Event {
        timestamp: event.timestamp,
        consumer: event.consumer,
        method: event.method,
        host: event.host,
    }
}

pub(super) fn snapshot_to_proto(snapshot: StatSnapshot) -> v1::Stat {
    v1::Stat {
        timestamp: snapshot.timestamp,
        by_method: snapshot.by_method.into_iter().collect(),
        by_consumer: snapshot.by_consumer.into_iter().collect(),
    }
}
