pub async fn metrics() -> String {
    crate::services::metrics::get_metrics()
}
