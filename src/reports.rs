use crate::types::{
    Dashboard, DashboardSummary, DetailRow, GroupColorRow, GroupColors, Rank, RankLegendRow,
    SalesRecord, WeekPoint,
};
use crate::util::{format_number, format_pct, format_rub, format_signed_pct};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::info;

/// Sum revenue per (week, group), skipping records without a week.
/// Points come out in ascending week order.
pub fn aggregate_by_week(records: &[SalesRecord]) -> Vec<WeekPoint> {
    let mut map: BTreeMap<i32, BTreeMap<String, f64>> = BTreeMap::new();
    for r in records {
        let Some(week) = r.week else { continue };
        *map.entry(week)
            .or_default()
            .entry(r.group_name.clone())
            .or_insert(0.0) += r.revenue;
    }
    map.into_iter()
        .map(|(week, revenue_by_group)| WeekPoint {
            week_number: week,
            label: format!("Week {}", week),
            revenue_by_group,
        })
        .collect()
}

/// Evenly spaced hues for distinct groups in first-seen order.
pub fn assign_colors(records: &[SalesRecord]) -> GroupColors {
    let mut seen: HashSet<&str> = HashSet::new();
    let distinct: Vec<&str> = records
        .iter()
        .map(|r| r.group_name.as_str())
        .filter(|name| seen.insert(*name))
        .collect();
    if distinct.is_empty() {
        return GroupColors::default();
    }
    let count = distinct.len() as f64;
    let entries = distinct
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let hue = (360.0 * idx as f64 / count).round() as i64;
            (name.to_string(), format!("hsl({}, 70%, 50%)", hue))
        })
        .collect();
    GroupColors { entries }
}

pub fn filter_week(records: &[SalesRecord], week: Option<i32>) -> Vec<SalesRecord> {
    match week {
        Some(w) => records.iter().filter(|r| r.week == Some(w)).cloned().collect(),
        None => records.to_vec(),
    }
}

/// Revenue growth against the previous period, in percent.
/// `None` when there is no previous revenue to compare with.
pub fn revenue_growth_pct(r: &SalesRecord) -> Option<f64> {
    ratio_pct(r.revenue - r.prev_revenue, r.prev_revenue)
}

/// Advertising spend as a share of revenue, in percent.
pub fn drr_pct(r: &SalesRecord) -> Option<f64> {
    ratio_pct(r.drr, r.revenue)
}

fn ratio_pct(num: f64, denom: f64) -> Option<f64> {
    if denom == 0.0 {
        return None;
    }
    Some(num / denom * 100.0).filter(|v| v.is_finite())
}

pub fn detail_rows(records: &[SalesRecord], colors: &GroupColors) -> Vec<DetailRow> {
    records
        .iter()
        .map(|r| DetailRow {
            place: r.rank.status_label().to_string(),
            group: r.group_name.clone(),
            manager: r.manager.clone(),
            color: colors.get(&r.group_name).unwrap_or_default().to_string(),
            revenue: format_rub(r.revenue),
            growth: format_pct(revenue_growth_pct(r)),
            drr_pct: format_pct(drr_pct(r)),
            clean_margin: format!("{:.1}%", r.clean_margin),
            margin_growth: format_signed_pct(r.margin_growth),
            turnover: format!("{:.1}", r.turnover),
            turnover_change: format!("{:.1}%", r.turnover_change),
            cr: format!("{:.1}%", r.cr),
            ctr: format!("{:.1}%", r.ctr),
        })
        .collect()
}

pub fn color_rows(colors: &GroupColors) -> Vec<GroupColorRow> {
    colors
        .entries
        .iter()
        .map(|(group, color)| GroupColorRow {
            group: group.clone(),
            color: color.clone(),
        })
        .collect()
}

pub fn rank_legend() -> Vec<RankLegendRow> {
    [
        ("Бриллиантовый кубок", "Прирост маржи более 4%"),
        ("Золотой кубок", "Прирост маржи 3-4%"),
        ("Серебряный кубок", "Прирост маржи 2-3%"),
    ]
    .into_iter()
    .map(|(award, condition)| RankLegendRow {
        award: award.to_string(),
        condition: condition.to_string(),
    })
    .collect()
}

pub fn generate_summary(
    all: &[SalesRecord],
    in_view: &[SalesRecord],
    selected_week: Option<i32>,
    colors: &GroupColors,
) -> DashboardSummary {
    let weeks: BTreeSet<i32> = all.iter().filter_map(|r| r.week).collect();
    let mut rank_counts: BTreeMap<String, usize> = Rank::ALL
        .iter()
        .map(|rank| (rank.as_str().to_string(), 0))
        .collect();
    for r in in_view {
        *rank_counts.entry(r.rank.as_str().to_string()).or_default() += 1;
    }
    DashboardSummary {
        total_records: all.len(),
        records_in_view: in_view.len(),
        selected_week,
        distinct_groups: colors.len(),
        distinct_weeks: weeks.len(),
        revenue_in_view: in_view.iter().map(|r| r.revenue).sum(),
        rank_counts,
    }
}

/// Detail records follow the week filter; the chart series and colors always
/// cover the whole dataset.
pub fn build_dashboard(records: Vec<SalesRecord>, week: Option<i32>) -> Dashboard {
    let series = aggregate_by_week(&records);
    let colors = assign_colors(&records);
    let in_view = filter_week(&records, week);
    let summary = generate_summary(&records, &in_view, week, &colors);
    info!(
        records = records.len(),
        in_view = in_view.len(),
        weeks = series.len(),
        groups = colors.len(),
        revenue = %format_number(summary.revenue_in_view, 2),
        "dashboard built"
    );
    Dashboard {
        records: in_view,
        series,
        colors,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(group: &str, week: Option<i32>, revenue: f64) -> SalesRecord {
        SalesRecord {
            group_name: group.to_string(),
            manager: String::new(),
            revenue,
            prev_revenue: 0.0,
            clean_margin: 0.0,
            margin_growth: 0.0,
            drr: 0.0,
            turnover: 0.0,
            turnover_change: 0.0,
            cr: 0.0,
            ctr: 0.0,
            week,
            rank: Rank::None,
        }
    }

    #[test]
    fn aggregation_is_order_independent() {
        let a = vec![rec("A", Some(1), 10.0), rec("A", Some(1), 5.0)];
        let b = vec![rec("A", Some(1), 5.0), rec("A", Some(1), 10.0)];
        let sa = aggregate_by_week(&a);
        assert_eq!(sa, aggregate_by_week(&b));
        assert_eq!(sa.len(), 1);
        assert_eq!(sa[0].label, "Week 1");
        assert_eq!(sa[0].revenue_by_group.get("A"), Some(&15.0));
    }

    #[test]
    fn aggregation_skips_records_without_week() {
        assert!(aggregate_by_week(&[rec("A", None, 100.0)]).is_empty());
    }

    #[test]
    fn aggregation_sorts_weeks_numerically() {
        let s = aggregate_by_week(&[
            rec("A", Some(10), 1.0),
            rec("B", Some(2), 2.0),
            rec("A", Some(0), 3.0),
        ]);
        let weeks: Vec<i32> = s.iter().map(|p| p.week_number).collect();
        assert_eq!(weeks, vec![0, 2, 10]);
        assert_eq!(s[1].revenue_by_group.get("B"), Some(&2.0));
        assert_eq!(s[1].revenue_by_group.get("A"), None);
    }

    #[test]
    fn week_point_serializes_flat() {
        let s = aggregate_by_week(&[rec("A", Some(1), 15.0)]);
        let json = serde_json::to_value(&s[0]).unwrap();
        assert_eq!(json, serde_json::json!({"week": "Week 1", "A": 15.0}));
    }

    #[test]
    fn colors_follow_first_seen_order() {
        let colors = assign_colors(&[
            rec("B", None, 0.0),
            rec("A", None, 0.0),
            rec("B", None, 0.0),
        ]);
        assert_eq!(colors.len(), 2);
        assert_eq!(colors.get("B"), Some("hsl(0, 70%, 50%)"));
        assert_eq!(colors.get("A"), Some("hsl(180, 70%, 50%)"));
        assert_eq!(colors.groups().collect::<Vec<_>>(), vec!["B", "A"]);
    }

    #[test]
    fn colors_round_hues_and_handle_empty_input() {
        assert!(assign_colors(&[]).is_empty());
        let colors = assign_colors(&[rec("A", None, 0.0), rec("B", None, 0.0), rec("C", None, 0.0)]);
        assert_eq!(colors.get("B"), Some("hsl(120, 70%, 50%)"));
        let seven: Vec<SalesRecord> = (0..7).map(|i| rec(&i.to_string(), None, 0.0)).collect();
        // 360 / 7 = 51.43
        assert_eq!(assign_colors(&seven).get("1"), Some("hsl(51, 70%, 50%)"));
    }

    #[test]
    fn ratios_guard_zero_denominators() {
        let mut r = rec("A", Some(3), 1000.0);
        r.prev_revenue = 800.0;
        r.drr = 50.0;
        assert_eq!(revenue_growth_pct(&r), Some(25.0));
        assert_eq!(format_pct(revenue_growth_pct(&r)), "25.0%");
        assert_eq!(drr_pct(&r), Some(5.0));

        r.prev_revenue = 0.0;
        r.revenue = 0.0;
        assert_eq!(revenue_growth_pct(&r), None);
        assert_eq!(drr_pct(&r), None);
        let colors = assign_colors(std::slice::from_ref(&r));
        let row = &detail_rows(&[r], &colors)[0];
        assert_eq!(row.color, "hsl(0, 70%, 50%)");
        assert_eq!(row.growth, "—");
        assert_eq!(row.drr_pct, "—");
    }

    #[test]
    fn dashboard_filters_detail_but_not_series() {
        let records = vec![
            rec("A", Some(1), 10.0),
            rec("B", Some(2), 20.0),
            rec("A", Some(2), 5.0),
            rec("C", None, 7.0),
        ];
        let d = build_dashboard(records, Some(2));
        assert_eq!(d.records.len(), 2);
        assert_eq!(d.series.len(), 2);
        assert_eq!(d.colors.len(), 3);
        assert_eq!(d.summary.total_records, 4);
        assert_eq!(d.summary.records_in_view, 2);
        assert_eq!(d.summary.revenue_in_view, 25.0);
        assert_eq!(d.summary.distinct_weeks, 2);
        assert_eq!(d.summary.rank_counts.get("none"), Some(&2));
        assert_eq!(d.summary.rank_counts.get("diamond"), Some(&0));

        let all = build_dashboard(d.records.clone(), None);
        assert_eq!(all.records.len(), 2);
    }

    #[test]
    fn legend_lists_three_awards() {
        let legend = rank_legend();
        assert_eq!(legend.len(), 3);
        assert!(legend[0].condition.contains("4%"));
    }
}
