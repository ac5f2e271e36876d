//! Duel outcomes and aggregated evaluation statistics

use serde::Serialize;

/// Result of one engagement that ended in a kill.
///
/// Duels that run out of shots are represented as `None` by the simulator,
/// never as a `DuelOutcome`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DuelOutcome {
    /// Seconds from the first shot to the lethal one.
    pub ttk: f64,
    pub shots: u32,
    pub hits: u32,
    pub misses: u32,
}

/// Aggregate over all trials of one (weapon, distance, skill) evaluation.
///
/// Field names serialize to the short labels used by result tables.
/// An infinite `expected_ttk` serializes as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationResult {
    /// TTK at 100% accuracy.
    #[serde(rename = "TTK")]
    pub theoretical_ttk: f64,
    /// Mean TTK over trials that scored a kill; +inf if none did.
    #[serde(rename = "ETTK")]
    pub expected_ttk: f64,
    /// Fraction of all trials that killed within the window.
    #[serde(rename = "Kill@W")]
    pub kill_probability: f64,
    /// Normalized area under the cumulative kill curve over the window.
    #[serde(rename = "AUC@W")]
    pub auc: f64,
    #[serde(rename = "avgShots")]
    pub avg_shots: f64,
    #[serde(rename = "avgHits")]
    pub avg_hits: f64,
    #[serde(rename = "avgMisses")]
    pub avg_misses: f64,
    pub accuracy: f64,
    pub trials: u32,
    pub kills: u32,
}

impl EvaluationResult {
    /// Sentinel for an evaluation in which no trial scored a kill.
    pub fn no_kill(theoretical_ttk: f64, trials: u32) -> Self {
        Self {
            theoretical_ttk,
            expected_ttk: f64::INFINITY,
            kill_probability: 0.0,
            auc: 0.0,
            avg_shots: 0.0,
            avg_hits: 0.0,
            avg_misses: 0.0,
            accuracy: 0.0,
            trials,
            kills: 0,
        }
    }

    /// Aggregate raw trial outcomes.
    ///
    /// Averages and accuracy are taken over successful trials only. The kill
    /// curve is bucketed by shot index: a kill on shot `n` lands at `(n-1)*dt`.
    pub fn from_outcomes(
        outcomes: &[Option<DuelOutcome>],
        shot_interval: f64,
        kill_window: f64,
        theoretical_ttk: f64,
    ) -> Self {
        let trials = outcomes.len() as u32;
        let kills: Vec<&DuelOutcome> = outcomes.iter().flatten().collect();
        if kills.is_empty() || trials == 0 {
            return Self::no_kill(theoretical_ttk, trials);
        }

        let n = kills.len() as f64;
        let expected_ttk = kills.iter().map(|o| o.ttk).sum::<f64>() / n;
        let avg_shots = kills.iter().map(|o| o.shots as f64).sum::<f64>() / n;
        let avg_hits = kills.iter().map(|o| o.hits as f64).sum::<f64>() / n;
        let avg_misses = kills.iter().map(|o| o.misses as f64).sum::<f64>() / n;
        let accuracy = if avg_shots > 0.0 { avg_hits / avg_shots } else { 0.0 };

        let curve = KillCurve::build(&kills, trials, shot_interval, kill_window);

        Self {
            theoretical_ttk,
            expected_ttk,
            kill_probability: curve.final_probability(),
            auc: curve.normalized_area(),
            avg_shots,
            avg_hits,
            avg_misses,
            accuracy,
            trials,
            kills: kills.len() as u32,
        }
    }
}

/// Cumulative kill probability sampled at shot times `0, dt, 2dt, ...`
/// up to the last shot time inside the window or the latest kill,
/// whichever comes first.
struct KillCurve {
    cumulative: Vec<u32>,
    trials: u32,
    dt: f64,
    window: f64,
}

impl KillCurve {
    fn build(kills: &[&DuelOutcome], trials: u32, dt: f64, window: f64) -> Self {
        let bucket_of = |o: &DuelOutcome| o.shots.saturating_sub(1) as usize;
        let latest_kill = kills.iter().map(|o| bucket_of(*o)).max().unwrap_or(0);

        // Last shot time inside the window; the tolerance keeps 1.0/0.1
        // style ratios from flooring one bucket short. The curve is flat
        // after the latest kill, so the grid stops there and the tail term
        // covers the rest of the window.
        let in_window = (window / dt + 1e-9).floor().max(0.0);
        let last = if in_window >= latest_kill as f64 {
            latest_kill
        } else {
            in_window as usize
        };

        let mut cumulative = vec![0u32; last + 1];
        for outcome in kills {
            let bucket = bucket_of(*outcome);
            if bucket <= last {
                cumulative[bucket] += 1;
            }
        }
        for i in 1..cumulative.len() {
            cumulative[i] += cumulative[i - 1];
        }
        Self {
            cumulative,
            trials,
            dt,
            window,
        }
    }

    fn probability(&self, idx: usize) -> f64 {
        self.cumulative[idx] as f64 / self.trials as f64
    }

    fn final_probability(&self) -> f64 {
        self.probability(self.cumulative.len() - 1)
    }

    /// Trapezoid rule over the shot grid, plus the flat tail from the last
    /// shot time to the window edge, divided by the window.
    fn normalized_area(&self) -> f64 {
        let last = self.cumulative.len() - 1;
        let mut area = 0.0;
        for i in 1..=last {
            area += 0.5 * (self.probability(i - 1) + self.probability(i)) * self.dt;
        }
        let tail = (self.window - last as f64 * self.dt).max(0.0);
        area += self.probability(last) * tail;
        (area / self.window).min(self.final_probability())
    }
}

/// One row of a weapon report: the evaluation at one catalog distance.
#[derive(Debug, Clone, Serialize)]
pub struct DistanceRow {
    pub distance: f64,
    pub damage: f64,
    pub result: EvaluationResult,
}

/// Evaluations for every catalog distance of one weapon.
#[derive(Debug, Clone, Serialize)]
pub struct WeaponReport {
    pub name: String,
    pub category: String,
    pub rpm: f64,
    pub rows: Vec<DistanceRow>,
}

impl WeaponReport {
    pub fn row_at(&self, distance: f64) -> Option<&DistanceRow> {
        self.rows.iter().find(|r| r.distance == distance)
    }
}

/// Which time metric to compare across weapons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Metric {
    Ttk,
    Ettk,
}

impl Metric {
    pub fn of(&self, result: &EvaluationResult) -> f64 {
        match self {
            Metric::Ttk => result.theoretical_ttk,
            Metric::Ettk => result.expected_ttk,
        }
    }
}

/// Lowest (best) metric value at each distance across `reports`,
/// sorted by distance. Infinite values never count as best.
pub fn best_by_distance(reports: &[WeaponReport], metric: Metric) -> Vec<(f64, f64)> {
    let mut best: Vec<(f64, f64)> = Vec::new();
    for row in reports.iter().flat_map(|r| r.rows.iter()) {
        let value = metric.of(&row.result);
        if !value.is_finite() {
            continue;
        }
        match best.iter_mut().find(|(d, _)| *d == row.distance) {
            Some((_, v)) => *v = v.min(value),
            None => best.push((row.distance, value)),
        }
    }
    best.sort_by(|a, b| a.0.total_cmp(&b.0));
    best
}
