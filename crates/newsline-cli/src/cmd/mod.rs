pub mod classify;
pub mod schedule;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use newsline_core::Metadata;

use crate::config::Config;

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            header
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

/// Parse a `key=value` metadata argument
pub fn parse_meta(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {s:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty metadata key in {s:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Repeated keys accumulate values in argument order
pub fn metadata_from(pairs: &[(String, String)]) -> Metadata {
    let mut md = Metadata::new();
    for (key, value) in pairs {
        md.add_value(key.as_str(), value.as_str());
    }
    md
}

fn enabled(minutes: i64, unit: &str) -> String {
    if minutes < 0 {
        "disabled".to_string()
    } else {
        format!("{minutes}{unit}")
    }
}

pub fn show_config(config: &Config) {
    let mut table = table(&["Setting", "Value"]);
    let sm = &config.sitemap;
    let sc = &config.scheduler;
    let rot = &config.rotation;

    table.add_row(vec!["Sitemap sniffing", if sm.sniff_content { "on" } else { "off" }]);
    table.add_row(vec![
        "Sniff prefix",
        &format!(
            "sitemap {}B, feed {}B",
            sm.max_offset_guess, config.feed.max_offset_guess
        ),
    ]);
    table.add_row(vec![
        "Recency window",
        &enabled(sm.filter_hours_since_modified, "h"),
    ]);
    table.add_row(vec![
        "Sub-sitemap delay",
        &if sm.schedule_delay_minutes > 0 {
            format!("{}min", sm.schedule_delay_minutes)
        } else {
            "disabled".to_string()
        },
    ]);
    table.add_row(vec!["Partial sitemaps", if sm.allow_partial { "kept" } else { "rejected" }]);
    table.add_row(vec!["URL filters", &config.outlinks.url_filters.join(", ")]);
    table.add_row(vec!["Transferred keys", &config.outlinks.transfer.join(", ")]);
    table.add_row(vec!["Parse filters", &config.filters.parse.join(", ")]);
    table.add_row(vec![
        "Fetch interval",
        &format!(
            "{}min (adaptive {}..{}min)",
            sc.default_interval, sc.min_interval, sc.max_interval
        ),
    ]);
    table.add_row(vec![
        "Fetch error interval",
        &enabled(sc.fetch_error_interval, "min"),
    ]);
    table.add_row(vec!["Error interval", &enabled(sc.error_interval, "min")]);
    table.add_row(vec!["Custom intervals", &sc.custom.len().to_string()]);
    table.add_row(vec!["Set Last-Modified", &sc.set_last_modified.to_string()]);
    table.add_row(vec![
        "Segment rotation",
        &if rot.time_interval > 0.0 {
            format!(
                "{} {:?} or {} {:?}",
                rot.max_size, rot.size_unit, rot.time_interval, rot.time_unit
            )
        } else {
            format!("{} {:?}", rot.max_size, rot.size_unit)
        },
    ]);
    table.add_row(vec!["Workers", &config.workers.default.to_string()]);

    eprintln!("\n{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_argument() {
        assert_eq!(
            parse_meta("isSitemap=true"),
            Ok(("isSitemap".to_string(), "true".to_string()))
        );
        assert_eq!(
            parse_meta("url.path=https://a.example/?q=1"),
            Ok(("url.path".to_string(), "https://a.example/?q=1".to_string()))
        );
        assert!(parse_meta("isSitemap").is_err());
        assert!(parse_meta("=true").is_err());
    }

    #[test]
    fn repeated_keys_accumulate() {
        let md = metadata_from(&[
            ("k".to_string(), "a".to_string()),
            ("k".to_string(), "b".to_string()),
        ]);
        assert_eq!(md.values("k"), &["a".to_string(), "b".to_string()]);
    }
}
