use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{trace as sdktrace, Resource};
use opentelemetry_semantic_conventions::resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// OTLP resource for one SafePass process. `SAFEPASS_SCHOOL_ID` tags spans with the
/// school a deployment serves; `SAFEPASS_ENV` names the deployment.
pub fn resource_attributes(
    service_name: &str,
    environment: Option<String>,
    school_id: Option<String>,
) -> Vec<KeyValue> {
    let mut attributes = vec![
        KeyValue::new(resource::SERVICE_NAME, service_name.to_string()),
        KeyValue::new(resource::SERVICE_NAMESPACE, "safepass"),
        KeyValue::new(resource::SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        KeyValue::new(
            resource::DEPLOYMENT_ENVIRONMENT,
            environment.unwrap_or_else(|| "development".to_string()),
        ),
    ];
    if let Some(school_id) = school_id.filter(|s| !s.trim().is_empty()) {
        attributes.push(KeyValue::new("safepass.school_id", school_id));
    }
    attributes
}

/// Installs the global subscriber: env filter, text or JSON output
/// (`RUST_LOG_FORMAT=json`), and OTLP export when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
pub fn init_telemetry(service_name: &str) {
    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

    // sqlx and sea_orm are chatty at info
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "info,safepass=info,sqlx=warn,sea_orm=warn".into()),
    );

    let registry = tracing_subscriber::registry().with(env_filter);

    let otel_layer = otlp_endpoint.and_then(|endpoint| {
        let resource = Resource::new(resource_attributes(
            service_name,
            std::env::var("SAFEPASS_ENV").ok(),
            std::env::var("SAFEPASS_SCHOOL_ID").ok(),
        ));

        let installed = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint),
            )
            .with_trace_config(
                sdktrace::config()
                    .with_resource(resource)
                    .with_sampler(sdktrace::Sampler::AlwaysOn),
            )
            .install_batch(opentelemetry_sdk::runtime::Tokio);

        match installed {
            Ok(tracer) => Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Err(e) => {
                // subscriber is not up yet
                eprintln!("OpenTelemetry exporter disabled: {}", e);
                None
            }
        }
    });

    if log_format == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .without_time();
        registry.with(otel_layer).with(fmt_layer).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer();
        registry.with(otel_layer).with(fmt_layer).init();
    };
}
