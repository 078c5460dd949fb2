//! Metrics definitions for outbound calls.

use shared::metrics_defs::{MetricDef, MetricType};

pub const DISPATCH_ENDPOINT_DURATION: MetricDef = MetricDef {
    name: "dispatch.endpoint.duration",
    metric_type: MetricType::Histogram,
    description: "Duration of a single fan-out endpoint call in seconds. Tagged with outcome.",
};

pub const DISPATCH_ENDPOINT_FAILED: MetricDef = MetricDef {
    name: "dispatch.endpoint.failed",
    metric_type: MetricType::Counter,
    description: "Fan-out endpoint calls that could not be completed",
};

pub const DISPATCH_URL_SKIPPED: MetricDef = MetricDef {
    name: "dispatch.url.skipped",
    metric_type: MetricType::Counter,
    description: "Blank URLs skipped while planning a fan-out",
};

pub const DISPATCH_PARAM_MISSING: MetricDef = MetricDef {
    name: "dispatch.param.missing",
    metric_type: MetricType::Counter,
    description: "Parameters (including the credential) absent from a fan-out call",
};

pub const DISPATCH_CREDENTIAL_FALLBACK: MetricDef = MetricDef {
    name: "dispatch.credential.fallback",
    metric_type: MetricType::Counter,
    description: "Endpoint calls that fell back to the first configured credential",
};

pub const AI_REQUEST: MetricDef = MetricDef {
    name: "ai.request",
    metric_type: MetricType::Counter,
    description: "Generative AI requests. Tagged with outcome.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    DISPATCH_ENDPOINT_DURATION,
    DISPATCH_ENDPOINT_FAILED,
    DISPATCH_URL_SKIPPED,
    DISPATCH_PARAM_MISSING,
    DISPATCH_CREDENTIAL_FALLBACK,
    AI_REQUEST,
];
