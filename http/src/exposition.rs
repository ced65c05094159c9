//! Prometheus text exposition format, version 0.0.4.

use logstash_exporter_collector::{
    MetricFamily,
    MetricSample,
};
use std::{
    collections::HashMap,
    fmt::Write as _,
};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub const BUILD_INFO: MetricFamily = MetricFamily::gauge(
    "logstash_exporter_build_info",
    "A metric with a constant '1' value labeled by the version of logstash_exporter.",
);

/// Render samples grouped by family.
///
/// Each family gets one `# HELP` and one `# TYPE` line followed by all of its
/// samples. Families keep the order in which they first appear, samples keep
/// their relative order. A build info gauge is appended.
pub fn render(samples: &[MetricSample]) -> String {
    let build_info = BUILD_INFO.sample(1.0).label("version", env!("CARGO_PKG_VERSION"));

    let mut families: Vec<Vec<&MetricSample>> = Vec::new();
    let mut index = HashMap::<&str, usize>::new();
    for sample in samples.iter().chain(std::iter::once(&build_info)) {
        match index.get(sample.name()) {
            Some(&i) => families[i].push(sample),
            None => {
                index.insert(sample.name(), families.len());
                families.push(vec![sample]);
            }
        }
    }

    let mut out = String::new();
    for family in families {
        let first = family[0];
        let _ = writeln!(out, "# HELP {} {}", first.name(), escape_help(first.help()));
        let _ = writeln!(out, "# TYPE {} {}", first.name(), first.kind().as_str());
        for sample in family {
            out.push_str(sample.name());
            if !sample.labels().is_empty() {
                out.push('{');
                for (i, (name, value)) in sample.labels().iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{name}=\"{}\"", escape_label_value(value));
                }
                out.push('}');
            }
            let _ = writeln!(out, " {}", format_value(sample.value()));
        }
    }
    out
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const UPTIME: MetricFamily = MetricFamily::gauge("logstash_node_jvm_uptime_seconds", "Time since start.");
    const EVENTS: MetricFamily = MetricFamily::counter("logstash_node_pipeline_events_in_total", "Events received.");

    fn build_info_block() -> String {
        format!(
            "# HELP logstash_exporter_build_info A metric with a constant '1' value labeled by the version of logstash_exporter.\n\
             # TYPE logstash_exporter_build_info gauge\n\
             logstash_exporter_build_info{{version=\"{}\"}} 1\n",
            env!("CARGO_PKG_VERSION")
        )
    }

    #[test]
    fn empty_input_renders_build_info_only() {
        assert_eq!(render(&[]), build_info_block());
    }

    #[test]
    fn families_are_grouped_in_first_appearance_order() {
        let samples = vec![
            EVENTS.sample(10.0).label("pipeline", "main"),
            UPTIME.sample(12.345),
            EVENTS.sample(3.0).label("pipeline", "beats"),
        ];

        let expected = format!(
            "# HELP logstash_node_pipeline_events_in_total Events received.\n\
             # TYPE logstash_node_pipeline_events_in_total counter\n\
             logstash_node_pipeline_events_in_total{{pipeline=\"main\"}} 10\n\
             logstash_node_pipeline_events_in_total{{pipeline=\"beats\"}} 3\n\
             # HELP logstash_node_jvm_uptime_seconds Time since start.\n\
             # TYPE logstash_node_jvm_uptime_seconds gauge\n\
             logstash_node_jvm_uptime_seconds 12.345\n\
             {}",
            build_info_block()
        );
        assert_eq!(render(&samples), expected);
    }

    #[test]
    fn labels_are_sorted_and_escaped() {
        let sample = UPTIME
            .sample(1.0)
            .label("b", "say \"hi\"")
            .label("a", "C:\\logs\nnext");
        let output = render(&[sample]);
        assert!(output.contains(r#"logstash_node_jvm_uptime_seconds{a="C:\\logs\nnext",b="say \"hi\""} 1"#));
    }

    #[test]
    fn special_values_use_prometheus_spelling() {
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(-0.5), "-0.5");
        assert_eq!(format_value(1073741824.0), "1073741824");
    }

    #[test]
    fn every_family_has_one_help_and_type_line() {
        let samples: Vec<_> = (0..5)
            .map(|i| EVENTS.sample(i as f64).label("pipeline", format!("p{i}")))
            .collect();
        let output = render(&samples);
        assert_eq!(output.matches("# HELP logstash_node_pipeline_events_in_total").count(), 1);
        assert_eq!(output.matches("# TYPE logstash_node_pipeline_events_in_total").count(), 1);
        assert_eq!(output.lines().filter(|l| l.starts_with("logstash_node_pipeline")).count(), 5);
    }
}
