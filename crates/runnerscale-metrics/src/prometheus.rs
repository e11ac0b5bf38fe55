//! Prometheus text exposition format.
//!
//! Renders the fleet gauges for scraping by a Prometheus server or
//! compatible agent. Metric names keep the `peertube_autoscale_` namespace
//! so existing dashboards keep working.

use std::fmt::Write;

use crate::gauges::GaugeSnapshot;

const NAMESPACE: &str = "peertube_autoscale";

/// Render a gauge snapshot into Prometheus text format.
///
/// Families are always declared, even before the first publish.
pub fn render_prometheus(snapshot: &GaugeSnapshot) -> String {
    let mut out = String::new();

    header(&mut out, "runners_total", "Total peertube runners");
    if let Some(total) = snapshot.runners_total {
        let _ = writeln!(out, "{NAMESPACE}_runners_total {total}");
    }

    header(&mut out, "runners_active", "Active peertube runners");
    for (name, value) in &snapshot.runners_active {
        let _ = writeln!(
            out,
            "{NAMESPACE}_runners_active{{name=\"{}\"}} {value}",
            escape_label_value(name)
        );
    }

    header(&mut out, "runners_jobs", "Runner jobs");
    for (state, value) in &snapshot.jobs {
        let _ = writeln!(
            out,
            "{NAMESPACE}_runners_jobs{{state=\"{}\"}} {value}",
            state.as_str()
        );
    }

    out
}

fn header(out: &mut String, name: &str, help: &str) {
    let _ = writeln!(out, "# HELP {NAMESPACE}_{name} {help}.");
    let _ = writeln!(out, "# TYPE {NAMESPACE}_{name} gauge");
}

/// Escape `\`, `"` and newlines in a label value.
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}
