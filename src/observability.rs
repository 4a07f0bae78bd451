use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("groqchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("groqchat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("groqchat.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("groqchat.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("groqchat.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("groqchat.stream.bytes");

pub(crate) static TURNS: Counter = Counter::new("groqchat.turn.submitted");
pub(crate) static TURN_INVALID_INPUT: Counter = Counter::new("groqchat.turn.invalid_input");
pub(crate) static TURN_PROVIDER_ERRORS: Counter = Counter::new("groqchat.turn.provider_errors");
pub(crate) static TURN_EMPTY_RESPONSES: Counter = Counter::new("groqchat.turn.empty_responses");
pub(crate) static TURN_DURATION: Moments = Moments::new("groqchat.turn.duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&TURNS);
    collector.register_counter(&TURN_INVALID_INPUT);
    collector.register_counter(&TURN_PROVIDER_ERRORS);
    collector.register_counter(&TURN_EMPTY_RESPONSES);
    collector.register_moments(&TURN_DURATION);
}
