//! Derived dashboard metrics.
//!
//! # Responsibility
//! - Turn a document snapshot into headcounts, water totals and the bounded
//!   resilience score.
//!
//! # Invariants
//! - Pure: no I/O, no clock, no mutation. Same document, same output.
//! - `resilience_score` is always within `0..=MAX_RESILIENCE_SCORE`.

use crate::model::document::Document;
use crate::model::resource::ResourceType;
use serde::Serialize;
use serde_json::Value;

/// Top-level field of pre-census documents listing available skills.
pub const LEGACY_SKILLS_FIELD: &str = "skills";

/// Score ceiling.
pub const MAX_RESILIENCE_SCORE: u32 = 100;
/// Points per resource in `Good` or `Adequate` status.
pub const POINTS_PER_ACTIVE_RESOURCE: u32 = 5;
/// Points per living resident.
pub const POINTS_PER_LIVING_PERSON: u32 = 10;

/// Red below 30, green above 70.
pub const CURRENT_RED_THRESHOLD: u32 = 30;
pub const CURRENT_GREEN_THRESHOLD: u32 = 70;
/// Red below 50, green from 80.
pub const LEGACY_RED_THRESHOLD: u32 = 50;
pub const LEGACY_GREEN_THRESHOLD: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorBand {
    Red,
    Yellow,
    Green,
}

/// How the green threshold compares against the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GreenBoundary {
    /// Green when `score > green_threshold`.
    Exclusive,
    /// Green when `score >= green_threshold`.
    Inclusive,
}

/// Thresholds for banding the resilience score.
///
/// Red always means `score < red_threshold`; the two shipped policies differ
/// in values and in whether the green threshold itself is green.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScorePolicy {
    pub red_threshold: u32,
    pub green_threshold: u32,
    pub green_boundary: GreenBoundary,
}

impl ScorePolicy {
    pub const CURRENT: Self = Self {
        red_threshold: CURRENT_RED_THRESHOLD,
        green_threshold: CURRENT_GREEN_THRESHOLD,
        green_boundary: GreenBoundary::Exclusive,
    };

    pub const LEGACY: Self = Self {
        red_threshold: LEGACY_RED_THRESHOLD,
        green_threshold: LEGACY_GREEN_THRESHOLD,
        green_boundary: GreenBoundary::Inclusive,
    };

    pub fn band(&self, score: u32) -> ColorBand {
        let green = match self.green_boundary {
            GreenBoundary::Exclusive => score > self.green_threshold,
            GreenBoundary::Inclusive => score >= self.green_threshold,
        };
        if green {
            ColorBand::Green
        } else if score < self.red_threshold {
            ColorBand::Red
        } else {
            ColorBand::Yellow
        }
    }
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Dashboard figures derived from one document snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Every census entry, deceased included.
    pub population: u32,
    pub living_count: u32,
    pub water_liters_total: f64,
    /// Living residents with a medical skill.
    pub medics_count: u32,
    pub active_resource_count: u32,
    /// Entries of a pre-census `skills` list, scored like living residents.
    /// Zero once anyone is in the census.
    pub legacy_skill_count: u32,
    pub resilience_score: u32,
    pub color_band: ColorBand,
}

/// Computes metrics under [`ScorePolicy::CURRENT`].
pub fn compute_metrics(doc: &Document) -> Metrics {
    compute_metrics_with(doc, &ScorePolicy::CURRENT)
}

/// Computes metrics, banding the score with `policy`.
pub fn compute_metrics_with(doc: &Document, policy: &ScorePolicy) -> Metrics {
    let population = saturating_count(doc.people.len());
    let living_count = saturating_count(doc.people.iter().filter(|p| p.is_living()).count());
    let medics_count = saturating_count(
        doc.people
            .iter()
            .filter(|p| p.is_living() && p.has_medical_skill())
            .count(),
    );

    // Unparseable quantities are skipped.
    let water_liters_total: f64 = doc
        .resources
        .iter()
        .filter(|r| r.kind == ResourceType::Water)
        .filter_map(|r| r.parsed_quantity())
        .map(|q| q.liters())
        .sum();

    let active_resource_count = saturating_count(
        doc.resources
            .iter()
            .filter(|r| r.status.is_active())
            .count(),
    );

    let legacy_skill_count = if doc.people.is_empty() {
        doc.extra
            .get(LEGACY_SKILLS_FIELD)
            .and_then(Value::as_array)
            .map_or(0, |skills| saturating_count(skills.len()))
    } else {
        0
    };

    let resilience_score = resilience_score(
        active_resource_count,
        living_count.saturating_add(legacy_skill_count),
    );

    Metrics {
        population,
        living_count,
        water_liters_total,
        medics_count,
        active_resource_count,
        legacy_skill_count,
        resilience_score,
        color_band: policy.band(resilience_score),
    }
}

/// `min(100, active * 5 + living * 10)`, saturating on overflow.
pub fn resilience_score(active_resource_count: u32, living_count: u32) -> u32 {
    active_resource_count
        .saturating_mul(POINTS_PER_ACTIVE_RESOURCE)
        .saturating_add(living_count.saturating_mul(POINTS_PER_LIVING_PERSON))
        .min(MAX_RESILIENCE_SCORE)
}

fn saturating_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{resilience_score, ColorBand, ScorePolicy};

    #[test]
    fn current_policy_boundaries_are_exclusive() {
        let policy = ScorePolicy::CURRENT;
        assert_eq!(policy.band(29), ColorBand::Red);
        assert_eq!(policy.band(30), ColorBand::Yellow);
        assert_eq!(policy.band(70), ColorBand::Yellow);
        assert_eq!(policy.band(71), ColorBand::Green);
    }

    #[test]
    fn legacy_policy_boundaries_are_inclusive() {
        let policy = ScorePolicy::LEGACY;
        assert_eq!(policy.band(49), ColorBand::Red);
        assert_eq!(policy.band(50), ColorBand::Yellow);
        assert_eq!(policy.band(79), ColorBand::Yellow);
        assert_eq!(policy.band(80), ColorBand::Green);
    }

    #[test]
    fn score_clamps_and_saturates() {
        assert_eq!(resilience_score(0, 0), 0);
        assert_eq!(resilience_score(1, 1), 15);
        assert_eq!(resilience_score(50, 50), 100);
        assert_eq!(resilience_score(u32::MAX, u32::MAX), 100);
    }
}
