//! Per-instructor remark statistics over a day, month or year.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::models::{Relation, Remark, RemarkKind};
use crate::utils::{format_percent_display, format_percent_print};

const MONTHS_FR: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
    "octobre", "novembre", "décembre",
];

/// Time window a statistics run is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Period {
    Day(NaiveDate),
    Month { year: i32, month: u32 },
    Year(i32),
}

impl Period {
    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            Period::Day(day) => date == day,
            Period::Month { year, month } => date.year() == year && date.month() == month,
            Period::Year(year) => date.year() == year,
        }
    }

    /// Human label, e.g. "mars 2024"
    pub fn label(&self) -> String {
        match *self {
            Period::Day(day) => day.format("%d/%m/%Y").to_string(),
            Period::Month { year, month } => {
                let name = month
                    .checked_sub(1)
                    .and_then(|m| MONTHS_FR.get(m as usize))
                    .copied()
                    .unwrap_or("?");
                format!("{} {}", name, year)
            }
            Period::Year(year) => year.to_string(),
        }
    }

    /// Compact form for filenames, e.g. "2024-03"
    pub fn slug(&self) -> String {
        match *self {
            Period::Day(day) => day.format("%Y-%m-%d").to_string(),
            Period::Month { year, month } => format!("{:04}-{:02}", year, month),
            Period::Year(year) => format!("{:04}", year),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    /// Accepts `day:2024-03-15`, `month:2024-03`, `year:2024`, or the bare value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, value) = match s.split_once(':') {
            Some((k, v)) => (Some(k.trim().to_lowercase()), v.trim()),
            None => (None, s),
        };

        let parse_day = |v: &str| -> Result<Period, String> {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .map(Period::Day)
                .map_err(|_| format!("Invalid day: {}", v))
        };
        let parse_month = |v: &str| -> Result<Period, String> {
            let (y, m) = v
                .split_once('-')
                .ok_or_else(|| format!("Invalid month: {}", v))?;
            let year: i32 = y.parse().map_err(|_| format!("Invalid month: {}", v))?;
            let month: u32 = m.parse().map_err(|_| format!("Invalid month: {}", v))?;
            if !(1..=12).contains(&month) {
                return Err(format!("Invalid month: {}", v));
            }
            Ok(Period::Month { year, month })
        };
        let parse_year = |v: &str| -> Result<Period, String> {
            v.parse::<i32>()
                .map(Period::Year)
                .map_err(|_| format!("Invalid year: {}", v))
        };

        match kind.as_deref() {
            Some("day" | "jour") => parse_day(value),
            Some("month" | "mois") => parse_month(value),
            Some("year" | "annee" | "année") => parse_year(value),
            Some(other) => Err(format!("Unknown period type: {}", other)),
            None => match value.matches('-').count() {
                2 => parse_day(value),
                1 => parse_month(value),
                _ => parse_year(value),
            },
        }
    }
}

/// Aggregate for one instructor over the period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub instructor: Relation,
    pub positive: u32,
    pub negative: u32,
    pub total: u32,
}

impl StatisticsSnapshot {
    fn new(instructor: Relation) -> Self {
        Self {
            instructor,
            positive: 0,
            negative: 0,
            total: 0,
        }
    }

    /// positive / (positive + negative) * 100, or 0 without typed remarks
    pub fn score(&self) -> f64 {
        let typed = self.positive + self.negative;
        if typed == 0 {
            0.0
        } else {
            f64::from(self.positive) / f64::from(typed) * 100.0
        }
    }

    /// Share of negative remarks, same convention as `score`
    pub fn negative_rate(&self) -> f64 {
        let typed = self.positive + self.negative;
        if typed == 0 {
            0.0
        } else {
            f64::from(self.negative) / f64::from(typed) * 100.0
        }
    }

    /// One decimal, for screens
    pub fn score_display(&self) -> String {
        format_percent_display(self.score())
    }

    /// Two decimals, for printed reports
    pub fn score_print(&self) -> String {
        format_percent_print(self.score())
    }
}

/// Outcome of a statistics run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSummary {
    pub period: Period,
    /// Instructors in first-seen order, each with at least one typed remark
    pub snapshots: Vec<StatisticsSnapshot>,
    /// All remarks in the period, typed or not
    pub remark_count: usize,
    pub top_positive: Option<StatisticsSnapshot>,
    pub top_negative: Option<StatisticsSnapshot>,
}

impl StatisticsSummary {
    pub fn total_positive(&self) -> u32 {
        self.snapshots.iter().map(|s| s.positive).sum()
    }

    pub fn total_negative(&self) -> u32 {
        self.snapshots.iter().map(|s| s.negative).sum()
    }

    /// Snapshots sorted by score, best first; ties keep first-seen order
    pub fn ranked(&self) -> Vec<&StatisticsSnapshot> {
        let mut ranked: Vec<&StatisticsSnapshot> = self.snapshots.iter().collect();
        ranked.sort_by(|a, b| b.score().total_cmp(&a.score()));
        ranked
    }
}

/// Compute per-instructor statistics for remarks dated inside `period`.
///
/// Returns `None` when no remark falls in the period, so callers can show
/// an explicit "no data" state instead of an empty table.
pub fn compute_statistics(remarks: &[Remark], period: &Period) -> Option<StatisticsSummary> {
    let in_period: Vec<&Remark> = remarks
        .iter()
        .filter(|r| r.day().map(|d| period.contains(d)).unwrap_or(false))
        .collect();

    debug!(
        period = %period.label(),
        matched = in_period.len(),
        total = remarks.len(),
        "Computing remark statistics"
    );

    if in_period.is_empty() {
        return None;
    }

    let mut by_instructor: IndexMap<String, StatisticsSnapshot> = IndexMap::new();
    for remark in &in_period {
        let Some(instructor) = remark.instructor.as_ref() else {
            continue;
        };
        let Some(kind) = remark.kind else {
            continue;
        };
        let key = match instructor.id {
            Some(id) => format!("id:{}", id),
            None => format!("name:{}", instructor.name),
        };
        let entry = by_instructor
            .entry(key)
            .or_insert_with(|| StatisticsSnapshot::new(instructor.clone()));
        match kind {
            RemarkKind::Positive => entry.positive += 1,
            RemarkKind::Negative => entry.negative += 1,
        }
        entry.total += 1;
    }

    let snapshots: Vec<StatisticsSnapshot> = by_instructor.into_values().collect();
    let top_positive = top_by(&snapshots, |s| s.positive);
    let top_negative = top_by(&snapshots, |s| s.negative);

    Some(StatisticsSummary {
        period: *period,
        remark_count: in_period.len(),
        snapshots,
        top_positive,
        top_negative,
    })
}

/// Highest non-zero count; the first encountered wins ties.
fn top_by(
    snapshots: &[StatisticsSnapshot],
    count: impl Fn(&StatisticsSnapshot) -> u32,
) -> Option<StatisticsSnapshot> {
    let mut best: Option<&StatisticsSnapshot> = None;
    for snapshot in snapshots {
        let c = count(snapshot);
        if c == 0 {
            continue;
        }
        if best.map(|b| c > count(b)).unwrap_or(true) {
            best = Some(snapshot);
        }
    }
    best.cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalize;
    use serde_json::json;

    fn remark(id: i64, date: &str, kind: Option<&str>, instructor: (i64, &str)) -> Remark {
        let mut raw = json!({
            "id": id,
            "date": date,
            "contenu": "note",
            "instructeur": {"data": {"id": instructor.0, "attributes": {"name": instructor.1}}}
        });
        if let Some(k) = kind {
            raw["type"] = json!(k);
        }
        Remark::normalize(&raw)
    }

    #[test]
    fn test_empty_input_is_none() {
        let period: Period = "month:2024-03".parse().expect("period");
        assert_eq!(compute_statistics(&[], &period), None);
    }

    #[test]
    fn test_no_match_in_period_is_none() {
        let remarks = vec![remark(1, "2023-03-10", Some("positive"), (1, "A. Bennani"))];
        let period: Period = "2024-03".parse().expect("period");
        assert!(compute_statistics(&remarks, &period).is_none());
    }

    #[test]
    fn test_month_scenario() {
        let bennani = (1, "A. Bennani");
        let remarks = vec![
            remark(1, "2024-03-04", Some("positive"), bennani),
            remark(2, "2024-03-15", Some("negative"), bennani),
            remark(3, "2024-03-29", Some("positive"), bennani),
            remark(4, "2024-04-01", Some("negative"), bennani),
        ];
        let period = Period::Month { year: 2024, month: 3 };
        let summary = compute_statistics(&remarks, &period).expect("data");

        assert_eq!(summary.snapshots.len(), 1);
        let s = &summary.snapshots[0];
        assert_eq!(s.instructor.name, "A. Bennani");
        assert_eq!((s.positive, s.negative, s.total), (2, 1, 3));
        assert_eq!(s.score_display(), "66.7%");
        assert_eq!(s.score_print(), "66.67%");
    }

    #[test]
    fn test_snapshot_invariants_and_unspecified_type() {
        let remarks = vec![
            remark(1, "2024-05-01", Some("positive"), (1, "A")),
            remark(2, "2024-05-02", None, (1, "A")),
            remark(3, "2024-05-03", None, (2, "B")),
            remark(4, "2024-05-04", Some("negative"), (3, "C")),
        ];
        let summary = compute_statistics(&remarks, &Period::Year(2024)).expect("data");

        assert_eq!(summary.remark_count, 4);
        // B only has an unspecified remark and is absent
        let names: Vec<&str> = summary.snapshots.iter().map(|s| s.instructor.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        for s in &summary.snapshots {
            assert_eq!(s.positive + s.negative, s.total);
            assert!(s.total > 0);
        }
    }

    #[test]
    fn test_top_performers_ties_first_encountered() {
        let remarks = vec![
            remark(1, "2024-05-01", Some("positive"), (1, "A")),
            remark(2, "2024-05-01", Some("positive"), (2, "B")),
            remark(3, "2024-05-01", Some("negative"), (2, "B")),
            remark(4, "2024-05-01", Some("negative"), (3, "C")),
        ];
        let period: Period = "day:2024-05-01".parse().expect("period");
        let summary = compute_statistics(&remarks, &period).expect("data");

        assert_eq!(summary.top_positive.as_ref().map(|s| s.instructor.name.as_str()), Some("A"));
        assert_eq!(summary.top_negative.as_ref().map(|s| s.instructor.name.as_str()), Some("B"));
    }

    #[test]
    fn test_no_positive_means_no_top_positive() {
        let remarks = vec![remark(1, "2024-05-01", Some("negative"), (1, "A"))];
        let summary = compute_statistics(&remarks, &Period::Year(2024)).expect("data");
        assert!(summary.top_positive.is_none());
        assert_eq!(summary.snapshots[0].score(), 0.0);
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("2024".parse::<Period>(), Ok(Period::Year(2024)));
        assert_eq!("mois:2024-03".parse::<Period>(), Ok(Period::Month { year: 2024, month: 3 }));
        assert!("month:2024-13".parse::<Period>().is_err());
        assert!("week:2024-10".parse::<Period>().is_err());
        assert_eq!(
            "2024-03-15".parse::<Period>(),
            Ok(Period::Day(NaiveDate::from_ymd_opt(2024, 3, 15).expect("date")))
        );
    }

    #[test]
    fn test_period_label_and_slug() {
        let p = Period::Month { year: 2024, month: 3 };
        assert_eq!(p.label(), "mars 2024");
        assert_eq!(p.slug(), "2024-03");
        assert_eq!(Period::Year(2024).slug(), "2024");
    }

    #[test]
    fn test_ranked() {
        let remarks = vec![
            remark(1, "2024-05-01", Some("negative"), (1, "A")),
            remark(2, "2024-05-01", Some("positive"), (2, "B")),
        ];
        let summary = compute_statistics(&remarks, &Period::Year(2024)).expect("data");
        let ranked: Vec<&str> = summary.ranked().iter().map(|s| s.instructor.name.as_str()).collect();
        assert_eq!(ranked, vec!["B", "A"]);
        assert_eq!(summary.total_positive(), 1);
        assert_eq!(summary.total_negative(), 1);
    }
}
