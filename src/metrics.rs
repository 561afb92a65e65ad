use crate::backend::Backend;
use crate::models::ScanAction;

pub async fn init_metrics(backend: &dyn Backend) {
    let student_count = backend.list_students().await.map(|s| s.len()).unwrap_or(0);
    set_students_total(student_count);

    let user_count = backend.list_users().await.map(|u| u.len()).unwrap_or(0);
    set_users_total(user_count);

    tracing::info!(
        "Initialized metrics: Students={}, Users={}",
        student_count,
        user_count
    );
}

pub fn set_students_total(count: usize) {
    metrics::gauge!("safepass_students_total").set(count as f64);
}

pub fn set_users_total(count: usize) {
    metrics::gauge!("safepass_users_total").set(count as f64);
}

pub fn increment_users_total() {
    metrics::gauge!("safepass_users_total").increment(1.0);
}

pub fn decrement_users_total() {
    metrics::gauge!("safepass_users_total").decrement(1.0);
}

pub fn increment_scans(action: ScanAction, location: &str) {
    metrics::counter!(
        "safepass_scans_total",
        "action" => action.as_str(),
        "location" => location.to_string()
    )
    .increment(1);
}

pub fn increment_allergy_alerts(location: &str) {
    metrics::counter!("safepass_allergy_alerts_total", "location" => location.to_string())
        .increment(1);
}

pub fn increment_notifications_sent(function: &str) {
    metrics::counter!("safepass_notifications_sent_total", "function" => function.to_string())
        .increment(1);
}

pub fn increment_notifications_failed(function: &str) {
    metrics::counter!("safepass_notifications_failed_total", "function" => function.to_string())
        .increment(1);
}
