use serde::{Deserialize, Serialize};

use crate::model::SeasonPhase;

/// `[low, baseline, high]` over `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    pub low: f64,
    pub baseline: f64,
    pub high: f64,
}

impl Bands {
    pub const fn new(low: f64, baseline: f64, high: f64) -> Self {
        Self {
            low,
            baseline,
            high,
        }
    }

    /// Pre-season compresses toward the bottom half, post-season toward the top.
    pub fn for_phase(&self, phase: SeasonPhase) -> Bands {
        let b = self.baseline;
        match phase {
            SeasonPhase::PreSeason => Bands::new(0.0, b / 2.0, b),
            SeasonPhase::RegularSeason => *self,
            SeasonPhase::PostSeason => Bands::new(b, (b + 1.0) / 2.0, 1.0),
        }
    }

    pub fn is_well_ordered(&self) -> bool {
        let Bands {
            low,
            baseline,
            high,
        } = *self;
        [low, baseline, high].iter().all(|v| v.is_finite())
            && 0.0 <= low
            && low < baseline
            && baseline < high
            && high <= 1.0
    }

    pub fn calibrate(&self, score: f64) -> f64 {
        baseline_slate_score(score, self.low, self.baseline, self.high)
    }
}

/// Piecewise-linear remap of an unbaselined score in `[0, 1]`:
/// `[0, baseline] -> [low, baseline]` and `[baseline, 1] -> [baseline, high]`.
pub fn baseline_slate_score(score: f64, low: f64, baseline: f64, high: f64) -> f64 {
    let score = score.clamp(0.0, 1.0);
    let out = if score < baseline {
        if baseline <= 0.0 {
            low
        } else {
            low + (score / baseline) * (baseline - low)
        }
    } else if baseline >= 1.0 {
        high
    } else {
        baseline + ((score - baseline) / (1.0 - baseline)) * (high - baseline)
    };
    out.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_maps_to_itself_in_every_phase() {
        let bands = Bands::new(0.1, 0.45, 0.9);
        assert_eq!(baseline_slate_score(0.45, 0.1, 0.45, 0.9), 0.45);
        for phase in [
            SeasonPhase::PreSeason,
            SeasonPhase::RegularSeason,
            SeasonPhase::PostSeason,
        ] {
            let shifted = bands.for_phase(phase);
            assert!((shifted.calibrate(shifted.baseline) - shifted.baseline).abs() < 1e-12);
        }
    }

    #[test]
    fn remap_is_strictly_increasing() {
        let bands = Bands::new(0.05, 0.4, 0.95);
        let mut prev = -1.0;
        for i in 0..=100 {
            let out = bands.calibrate(f64::from(i) / 100.0);
            assert!(out > prev, "not increasing at {i}");
            assert!((0.0..=1.0).contains(&out));
            prev = out;
        }
        assert!((bands.calibrate(0.0) - 0.05).abs() < 1e-12);
        assert!((bands.calibrate(1.0) - 0.95).abs() < 1e-12);
    }

    #[test]
    fn phase_shifts_match_fixed_heuristic() {
        let bands = Bands::new(0.1, 0.4, 0.9);
        assert_eq!(
            bands.for_phase(SeasonPhase::PreSeason),
            Bands::new(0.0, 0.2, 0.4)
        );
        assert_eq!(
            bands.for_phase(SeasonPhase::PostSeason),
            Bands::new(0.4, 0.7, 1.0)
        );
        assert_eq!(bands.for_phase(SeasonPhase::RegularSeason), bands);
    }

    #[test]
    fn ordering_check_rejects_degenerate_bands() {
        assert!(Bands::new(0.0, 0.5, 1.0).is_well_ordered());
        assert!(!Bands::new(0.5, 0.5, 1.0).is_well_ordered());
        assert!(!Bands::new(0.1, 0.9, 0.8).is_well_ordered());
        assert!(!Bands::new(0.0, f64::NAN, 1.0).is_well_ordered());
    }
}
