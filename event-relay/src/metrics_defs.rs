//! Metrics definitions for the event relay.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with route, status.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const VENDOR_CALLS: MetricDef = MetricDef {
    name: "vendor.calls",
    metric_type: MetricType::Counter,
    description: "Calls made to the analytics vendor. Tagged with operation, outcome.",
};

pub const EVENTS_TRACKED: MetricDef = MetricDef {
    name: "events.tracked",
    metric_type: MetricType::Counter,
    description: "Storefront events forwarded successfully. Tagged with kind.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    REQUESTS_INFLIGHT,
    VENDOR_CALLS,
    EVENTS_TRACKED,
];
