//! Scoring, ranking and categorization of candidates

use super::geo::haversine_miles;
use super::keywords::{self, contains_any};
use crate::config::ScoringSettings;
use crate::results::{
    Candidate, CategorizedResults, ProviderKind, ScoreDistribution, ScoreFactors, ScoredResult,
    ScoringSummary,
};
use crate::search::SearchContext;
use std::cmp::Ordering;
use std::collections::HashSet;

const DEFAULT_DISTANCE_SCORE: f64 = 0.5;
const SOCIAL_FEED_BONUS: f64 = 0.1;
const MAX_UNDERGROUND_BONUS: f64 = 0.3;
const INTENT_SHARE: f64 = 0.6;
const LOCATION_SHARE: f64 = 0.4;
const MIN_WORD_LEN: usize = 3;

/// Pure scoring engine parameterised by [`ScoringSettings`]
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    settings: ScoringSettings,
}

impl ScoringEngine {
    pub fn new(settings: ScoringSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ScoringSettings {
        &self.settings
    }

    /// Score one candidate against the search context.
    ///
    /// When the candidate has no distance but both sides have coordinates, the
    /// great-circle distance is filled into the scored copy so categorization
    /// sees it too.
    pub fn score(&self, candidate: &Candidate, context: &SearchContext) -> ScoredResult {
        let mut candidate = candidate.clone();
        if candidate.distance_mi.is_none() {
            if let (Some(from), Some(to)) = (context.coordinates, candidate.coordinates) {
                candidate.distance_mi = Some(haversine_miles(from, to));
            }
        }

        let factors = ScoreFactors {
            relevance: relevance(&candidate, context),
            distance: distance_score(candidate.distance_mi),
            app_fit: app_fit(&candidate),
        };

        let raw = self.settings.relevance_weight * factors.relevance
            + self.settings.distance_weight * factors.distance
            + self.settings.app_fit_weight * factors.app_fit;
        let score = raw.clamp(0.0, 1.0);

        ScoredResult {
            candidate,
            score,
            star_rating: (score * 5.0 * 10.0).round() / 10.0,
            score_factors: factors,
        }
    }

    /// Deduplicate, score, drop non-positive scores and sort best first.
    ///
    /// The first candidate seen for a URL wins. Ties are broken by distance
    /// (unknown last) and then by URL, so the order never depends on which
    /// provider answered first.
    pub fn rank_and_filter(
        &self,
        candidates: Vec<Candidate>,
        context: &SearchContext,
    ) -> Vec<ScoredResult> {
        let mut seen = HashSet::new();
        let mut scored: Vec<ScoredResult> = candidates
            .into_iter()
            .filter(|c| seen.insert(c.dedup_key()))
            .map(|c| self.score(&c, context))
            .filter(|r| r.score > 0.0)
            .collect();

        scored.sort_by(compare_ranked);
        scored
    }

    /// Split ranked results into primary and nearby buckets
    pub fn categorize(&self, scored: Vec<ScoredResult>) -> CategorizedResults {
        let core_radius = self.settings.core_radius_mi;
        let mut primary = Vec::new();
        let mut nearby = Vec::new();

        for mut result in scored {
            let distance = result.candidate.distance_mi.unwrap_or(0.0);
            if distance <= core_radius {
                primary.push(result);
            } else {
                result.candidate.name =
                    format!("{} (≈{} mi)", result.candidate.name, distance.round() as i64);
                nearby.push(result);
            }
        }

        let min_primary = self.settings.min_primary;
        if primary.len() < min_primary && !nearby.is_empty() {
            let needed = (min_primary - primary.len()).min(nearby.len());
            primary.extend(nearby.drain(..needed));
        }

        primary.truncate(self.settings.max_primary);
        nearby.truncate(self.settings.max_nearby);

        CategorizedResults { primary, nearby }
    }

    /// Aggregate statistics over a ranked result set
    pub fn summarize(&self, results: &[ScoredResult]) -> ScoringSummary {
        if results.is_empty() {
            return ScoringSummary::default();
        }

        let n = results.len() as f64;
        let mut distribution = ScoreDistribution::default();
        let mut totals = ScoreFactors::default();
        let mut score_sum = 0.0;

        for result in results {
            score_sum += result.score;
            match result.score {
                s if s >= 0.8 => distribution.excellent += 1,
                s if s >= 0.6 => distribution.good += 1,
                s if s >= 0.4 => distribution.fair += 1,
                _ => distribution.poor += 1,
            }
            totals.relevance += result.score_factors.relevance;
            totals.distance += result.score_factors.distance;
            totals.app_fit += result.score_factors.app_fit;
        }

        ScoringSummary {
            total_results: results.len(),
            average_score: (score_sum / n * 100.0).round() / 100.0,
            score_distribution: distribution,
            average_factors: ScoreFactors {
                relevance: totals.relevance / n,
                distance: totals.distance / n,
                app_fit: totals.app_fit / n,
            },
        }
    }
}

fn compare_ranked(a: &ScoredResult, b: &ScoredResult) -> Ordering {
    let distance = |r: &ScoredResult| r.candidate.distance_mi.unwrap_or(f64::INFINITY);
    b.score
        .total_cmp(&a.score)
        .then_with(|| distance(a).total_cmp(&distance(b)))
        .then_with(|| a.candidate.dedup_key().cmp(&b.candidate.dedup_key()))
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .map(str::to_string)
        .collect()
}

fn overlap(query_words: &[String], text: &str) -> f64 {
    if query_words.is_empty() {
        return 0.0;
    }
    let matched = query_words.iter().filter(|w| text.contains(w.as_str())).count();
    matched as f64 / query_words.len() as f64
}

/// Relevance sub-score in [0, 1]
pub fn relevance(candidate: &Candidate, context: &SearchContext) -> f64 {
    let text = format!("{} {}", candidate.name, candidate.description).to_lowercase();

    let mut score = INTENT_SHARE * overlap(&words(&context.intent), &text)
        + LOCATION_SHARE * overlap(&words(&context.location), &text)
        + (candidate.features.underground_keyword_hits as f64 / 3.0).min(MAX_UNDERGROUND_BONUS);

    if candidate.source_kind == ProviderKind::SocialFeed {
        score += SOCIAL_FEED_BONUS;
    }

    score.min(1.0)
}

/// Distance sub-score from a bucketed distance in miles
pub fn distance_score(distance_mi: Option<f64>) -> f64 {
    match distance_mi {
        None => DEFAULT_DISTANCE_SCORE,
        Some(d) if d <= 5.0 => 1.0,
        Some(d) if d <= 15.0 => 0.7,
        Some(d) if d <= 35.0 => 0.4,
        Some(_) => 0.15,
    }
}

/// App-fit sub-score. The first matching rule wins and low-fit terms are
/// checked before everything else.
pub fn app_fit(candidate: &Candidate) -> f64 {
    let domain = candidate.domain.to_lowercase();
    let text = format!("{} {} {}", candidate.name, candidate.description, domain).to_lowercase();

    if contains_any(&text, keywords::LOW_FIT) {
        return 0.1;
    }
    if contains_any(&text, keywords::HIGH_FIT) {
        return 0.9;
    }
    if contains_any(&text, keywords::MEDIUM_FIT) {
        return if contains_any(&text, keywords::HISTORIC_MARKERS) {
            0.6
        } else {
            0.3
        };
    }
    if candidate.features.indie_domain == 1 {
        return 0.7;
    }
    if contains_any(&domain, keywords::SOCIAL_DOMAINS) {
        return 0.6;
    }
    if contains_any(&domain, keywords::EVENT_DOMAINS) || candidate.source_kind == ProviderKind::Events
    {
        return 0.8;
    }
    0.5
}
