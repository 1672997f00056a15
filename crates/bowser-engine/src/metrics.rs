//! Request counters per flow.
//!
//! Counters go through the `metrics` facade. Without an installed recorder
//! they are no-ops.

use metrics::counter;

use crate::sequence::Flow;

pub fn record_request(flow: Flow) {
    counter!("bowser_requests_total", "flow" => flow.as_str()).increment(1);
}

pub fn record_stale_response(flow: Flow) {
    counter!("bowser_stale_responses_total", "flow" => flow.as_str()).increment(1);
}

pub fn record_failure(flow: Flow) {
    counter!("bowser_request_failures_total", "flow" => flow.as_str()).increment(1);
}
