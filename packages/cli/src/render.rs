//! Plain-text tables for terminal output.

use std::fmt::Write as _;

use disaster_feed_aggregator::{Snapshot, SourceReport};
use disaster_feed_risk_models::{Hazard, RegionRiskAssessment};
use disaster_feed_source_models::{DisasterRecord, SourceConfig};

pub fn sources(sources: &[SourceConfig]) -> String {
    let mut out = format!("{:<18} {:<11} {:<10} NAME\n", "ID", "CATEGORY", "TYPE");
    out.push_str(&"-".repeat(60));
    out.push('\n');
    for source in sources {
        let _ = writeln!(
            out,
            "{:<18} {:<11} {:<10} {}",
            source.id,
            source.category,
            source.source_type.as_ref(),
            source.name
        );
    }
    out
}

pub fn reports(reports: &[SourceReport]) -> String {
    let mut out = format!(
        "{:<18} {:>7} {:>5} {:>6} {:>9} {:>7}  STATUS\n",
        "SOURCE", "FETCHED", "KEPT", "HIDDEN", "NO COORDS", "MS"
    );
    out.push_str(&"-".repeat(72));
    out.push('\n');
    for report in reports {
        let _ = writeln!(
            out,
            "{:<18} {:>7} {:>5} {:>6} {:>9} {:>7}  {}",
            report.source_id,
            report.fetched,
            report.kept,
            report.hidden,
            report.missing_coordinates,
            report.elapsed_ms,
            report.error.as_deref().unwrap_or("ok")
        );
    }
    out
}

pub fn records(records: &[DisasterRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(
            out,
            "[{:>2} {:<6}] {:<11} {} ({}) at {:.4}, {:.4}",
            record.severity.value(),
            record.severity.marker_color().as_ref(),
            record.category,
            record.title,
            record.location_text,
            record.coordinates.latitude,
            record.coordinates.longitude
        );
    }
    out
}

/// One-line summary of a published snapshot.
pub fn snapshot_line(snapshot: &Snapshot) -> String {
    let failed = snapshot.sources.iter().filter(|s| !s.succeeded()).count();
    let refreshed = snapshot
        .refreshed_at
        .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
    format!(
        "cycle {} at {refreshed}: {} records, {failed}/{} sources failed{}",
        snapshot.cycle,
        snapshot.records.len(),
        snapshot.sources.len(),
        if snapshot.stale { " (stale)" } else { "" }
    )
}

pub fn assessment(assessment: &RegionRiskAssessment) -> String {
    let regions = if assessment.regions.is_empty() {
        "none".to_string()
    } else {
        assessment
            .regions
            .iter()
            .map(|r| r.label())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut out = format!(
        "Point:     {:.4}, {:.4}\nRegions:   {regions}\nElevation: {} m\n",
        assessment.coordinates.latitude,
        assessment.coordinates.longitude,
        assessment.elevation_meters
    );
    for hazard in [Hazard::Flood, Hazard::Cyclone, Hazard::Landslide] {
        let _ = writeln!(out, "{:<10} {:>2}/10", format!("{hazard}:"), assessment.score(hazard));
    }
    let _ = writeln!(
        out,
        "Overall:   {:>2}/10 ({})",
        assessment.overall_risk, assessment.risk_level
    );
    for line in &assessment.guidance {
        let _ = writeln!(out, "  - {line}");
    }
    out
}
