//! Safety guidance derived from an assessment.

use disaster_feed_risk_models::{Hazard, RegionRiskAssessment, RiskLevel};

/// Hazard scores at or above this are called out individually.
pub const ELEVATED_SCORE: u8 = 6;

/// Returns general advice for the risk level followed by advice for each
/// elevated hazard.
#[must_use]
pub fn guidance(assessment: &RegionRiskAssessment) -> Vec<String> {
    let mut lines: Vec<String> = level_advice(assessment.risk_level)
        .iter()
        .map(ToString::to_string)
        .collect();

    for hazard in [Hazard::Flood, Hazard::Cyclone, Hazard::Landslide] {
        if assessment.score(hazard) >= ELEVATED_SCORE {
            lines.extend(hazard_advice(hazard).iter().map(ToString::to_string));
        }
    }

    lines
}

const fn level_advice(level: RiskLevel) -> &'static [&'static str] {
    match level {
        RiskLevel::High => &[
            "High combined hazard risk: keep an emergency kit and documents ready to go.",
            "Know the route to your nearest shelter and follow evacuation orders without delay.",
        ],
        RiskLevel::Medium => &[
            "Moderate hazard risk: monitor official alerts during the monsoon and cyclone seasons.",
            "Keep a basic emergency kit with water, food and a torch.",
        ],
        RiskLevel::Low => &["Low hazard risk: stay informed through official alerts."],
    }
}

const fn hazard_advice(hazard: Hazard) -> &'static [&'static str] {
    match hazard {
        Hazard::Flood => &[
            "Flood-prone area: store valuables and supplies above the highest known water level.",
            "Never walk or drive through moving flood water.",
        ],
        Hazard::Cyclone => &[
            "Cyclone-prone area: move to a cyclone shelter when signal 8 or higher is raised.",
            "Secure loose objects and keep livestock on raised ground.",
        ],
        Hazard::Landslide => &[
            "Landslide-prone area: avoid hillside slopes during and after heavy rain.",
            "Watch for cracks, tilting trees or muddy water and leave immediately if they appear.",
        ],
    }
}
