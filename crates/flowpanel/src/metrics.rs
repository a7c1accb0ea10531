use metrics::describe_counter;

pub fn describe() {
    describe_counter!(
        "flowpanel_datasets_missing_total",
        "Dataset files that could not be loaded (absent, unreadable, unparseable or empty)."
    );
    describe_counter!(
        "flowpanel_rows_dropped_total",
        "Rows dropped because their MONTH cell failed to parse."
    );
    describe_counter!(
        "flowpanel_coercion_failures_total",
        "Non-missing cells that failed numeric coercion."
    );
    describe_counter!(
        "flowpanel_schema_issues_total",
        "Loaded datasets lacking expected canonical columns."
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_counters_render_after_describe() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        describe();

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("flowpanel_rows_dropped_total").increment(2);
        });

        let rendered = handle.render();
        assert!(rendered.contains("flowpanel_rows_dropped_total"));
    }
}
