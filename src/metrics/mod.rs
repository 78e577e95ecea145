
use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

lazy_static! {
    pub static ref FILES_DELIVERED_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("files_delivered", "Annotation files pushed to devices"),
        &["device_id"]
    )
    .expect("metric can not be created");

    pub static ref CONNECTED_DEVICES_METRIC: IntGauge = IntGauge::new(
        "connected_devices",
        "Devices currently registered with a live connection"
    )
    .expect("metric can not be created");

    pub static ref STAGE_MATCH_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("stage_match", "Stage folder resolutions by outcome"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref REQUESTS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("client_requests", "Inbound client requests by kind"),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER_ONCE: Once = Once::new();

/// Registers the service collectors with [`REGISTRY`]; later calls are no-ops.
pub fn init_metrics() {
    REGISTER_ONCE.call_once(|| register_custom_metrics(&REGISTRY));
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(FILES_DELIVERED_METRIC.clone()),
        Box::new(CONNECTED_DEVICES_METRIC.clone()),
        Box::new(STAGE_MATCH_METRIC.clone()),
        Box::new(REQUESTS_METRIC.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            error!("collector can not be registered: {}", e);
        }
    }
}

/// `GET /metrics` in the Prometheus text format.
pub fn metrics_route() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("metrics").and(warp::get()).and_then(metrics_handler)
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    let mut body = encode_metrics(&REGISTRY.gather());
    body.push_str(&encode_metrics(&prometheus::gather()));
    Ok(body)
}

fn encode_metrics(families: &[prometheus::proto::MetricFamily]) -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(families, &mut buffer) {
        error!("could not encode metrics: {}", e);
        return String::default();
    }
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
