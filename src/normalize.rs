// Row normalization: bilingual column aliases to a canonical `SalesRecord`.
use crate::types::{CellValue, Rank, RawRow, SalesRecord};
use crate::util::{parse_f64_safe, parse_i32_safe};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Group,
    Manager,
    Revenue,
    PrevRevenue,
    CleanMargin,
    MarginGrowth,
    Drr,
    Turnover,
    TurnoverChange,
    Cr,
    Ctr,
    Week,
    Rank,
    Color,
}

/// Accepted column headers per field, in lookup order. Add a locale by
/// appending its header to the relevant list.
static ALIASES: Lazy<HashMap<Field, &'static [&'static str]>> = Lazy::new(|| {
    HashMap::from([
        (Field::Group, &["Group", "Группа"][..]),
        (Field::Manager, &["Manager", "Менеджер"][..]),
        (Field::Revenue, &["Revenue", "Оборот"][..]),
        (Field::PrevRevenue, &["PrevRevenue", "ПредыдущийОборот"][..]),
        (Field::CleanMargin, &["CleanMargin", "ОчищеннаяМаржа"][..]),
        (Field::MarginGrowth, &["MarginGrowth", "ПриростМаржи"][..]),
        (Field::Drr, &["DRR", "ДРР"][..]),
        (Field::Turnover, &["Turnover", "Оборачиваемость"][..]),
        (
            Field::TurnoverChange,
            &["TurnoverChange", "ИзменениеОборачиваемости"][..],
        ),
        (Field::Cr, &["CR"][..]),
        (Field::Ctr, &["CTR"][..]),
        (Field::Week, &["Week"][..]),
        (Field::Rank, &["Rank", "Ранг"][..]),
        (Field::Color, &["Color"][..]),
    ])
});

pub fn aliases(field: Field) -> &'static [&'static str] {
    ALIASES.get(&field).copied().unwrap_or(&[])
}

/// Whether a header maps to any canonical field. Other columns are ignored.
pub fn is_known_column(header: &str) -> bool {
    ALIASES.values().any(|list| list.contains(&header))
}

/// First non-empty cell among the field's aliases.
pub fn lookup(row: &RawRow, field: Field) -> Option<&CellValue> {
    aliases(field)
        .iter()
        .filter_map(|alias| row.get(*alias))
        .find(|cell| !cell.is_empty())
}

fn number(row: &RawRow, field: Field) -> f64 {
    match lookup(row, field) {
        Some(CellValue::Number(n)) if n.is_finite() => *n,
        Some(CellValue::Text(s)) => parse_f64_safe(Some(s)).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn text(row: &RawRow, field: Field) -> String {
    lookup(row, field)
        .and_then(CellValue::as_text)
        .unwrap_or_default()
}

fn week(row: &RawRow) -> Option<i32> {
    match lookup(row, Field::Week)? {
        CellValue::Number(n) if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 => Some(*n as i32),
        CellValue::Text(s) => parse_i32_safe(Some(s)),
        _ => None,
    }
}

/// Tier from margin growth; first matching threshold wins.
pub fn calculate_rank(margin_growth: f64) -> Rank {
    if margin_growth > 4.0 {
        Rank::Diamond
    } else if margin_growth > 3.0 {
        Rank::Gold
    } else if margin_growth > 2.0 {
        Rank::Silver
    } else {
        Rank::None
    }
}

/// Read an explicit rank cell. Accepts the English tier names and the Russian
/// status labels, ignoring case.
pub fn parse_rank(value: &str) -> Option<Rank> {
    match value.trim().to_lowercase().as_str() {
        "diamond" | "бриллиантовый" | "бриллиант" => Some(Rank::Diamond),
        "gold" | "золотой" | "золото" => Some(Rank::Gold),
        "silver" | "серебряный" | "серебро" => Some(Rank::Silver),
        "none" | "стандартный" | "" => Some(Rank::None),
        _ => None,
    }
}

pub fn normalize(row: &RawRow) -> SalesRecord {
    let group_name = text(row, Field::Group);
    let margin_growth = number(row, Field::MarginGrowth);

    let rank = match lookup(row, Field::Rank).and_then(CellValue::as_text) {
        Some(explicit) => parse_rank(&explicit).unwrap_or_else(|| {
            warn!(group = %group_name, value = %explicit, "unrecognized rank, computing from margin growth");
            calculate_rank(margin_growth)
        }),
        None => calculate_rank(margin_growth),
    };

    if group_name.is_empty() {
        warn!("row has no group name");
    }

    let record = SalesRecord {
        group_name,
        manager: text(row, Field::Manager),
        revenue: number(row, Field::Revenue),
        prev_revenue: number(row, Field::PrevRevenue),
        clean_margin: number(row, Field::CleanMargin),
        margin_growth,
        drr: number(row, Field::Drr),
        turnover: number(row, Field::Turnover),
        turnover_change: number(row, Field::TurnoverChange),
        cr: number(row, Field::Cr),
        ctr: number(row, Field::Ctr),
        week: week(row),
        rank,
    };
    debug!(group = %record.group_name, week = ?record.week, rank = %record.rank, "normalized row");
    record
}

pub fn normalize_all(rows: &[RawRow]) -> Vec<SalesRecord> {
    rows.iter().map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), CellValue::from(*v)))
            .collect()
    }

    #[test]
    fn missing_numbers_default_to_zero() {
        let r = normalize(&row(&[("Group", "A")]));
        for v in [
            r.revenue,
            r.prev_revenue,
            r.clean_margin,
            r.margin_growth,
            r.drr,
            r.turnover,
            r.turnover_change,
            r.cr,
            r.ctr,
        ] {
            assert_eq!(v, 0.0);
        }
        assert_eq!(r.rank, Rank::None);
    }

    #[test]
    fn garbage_numbers_never_become_nan() {
        let r = normalize(&row(&[("Revenue", "n/a"), ("CR", "NaN"), ("CTR", "")]));
        assert_eq!(r.revenue, 0.0);
        assert_eq!(r.cr, 0.0);
        assert_eq!(r.ctr, 0.0);

        let mut raw = RawRow::new();
        raw.insert("DRR".into(), CellValue::Number(f64::NAN));
        assert_eq!(normalize(&raw).drr, 0.0);
    }

    #[test]
    fn unparseable_week_is_none_not_zero() {
        assert_eq!(normalize(&row(&[("Week", "soon")])).week, None);
        assert_eq!(normalize(&row(&[])).week, None);
        assert_eq!(normalize(&row(&[("Week", "0")])).week, Some(0));

        let mut raw = RawRow::new();
        raw.insert("Week".into(), CellValue::Number(7.0));
        assert_eq!(normalize(&raw).week, Some(7));
    }

    #[test]
    fn rank_thresholds_are_exact() {
        assert_eq!(calculate_rank(4.0), Rank::Gold);
        assert_eq!(calculate_rank(4.0001), Rank::Diamond);
        assert_eq!(calculate_rank(3.0), Rank::Silver);
        assert_eq!(calculate_rank(3.0001), Rank::Gold);
        assert_eq!(calculate_rank(2.0), Rank::None);
        assert_eq!(calculate_rank(2.0001), Rank::Silver);
        assert_eq!(calculate_rank(-5.0), Rank::None);
    }

    #[test]
    fn explicit_rank_wins_over_computed() {
        let r = normalize(&row(&[("MarginGrowth", "5"), ("Rank", "silver")]));
        assert_eq!(r.rank, Rank::Silver);
        let r = normalize(&row(&[("ПриростМаржи", "1"), ("Ранг", "Золотой")]));
        assert_eq!(r.rank, Rank::Gold);
        // Unknown values fall back to the threshold table.
        let r = normalize(&row(&[("MarginGrowth", "3.5"), ("Rank", "platinum")]));
        assert_eq!(r.rank, Rank::Gold);
    }

    #[test]
    fn english_alias_is_read_first_and_blank_falls_through() {
        let r = normalize(&row(&[("Revenue", "10"), ("Оборот", "20")]));
        assert_eq!(r.revenue, 10.0);
        let r = normalize(&row(&[("Revenue", ""), ("Оборот", "20")]));
        assert_eq!(r.revenue, 20.0);
    }

    #[test]
    fn unknown_columns_are_ignored_and_group_may_be_missing() {
        let r = normalize(&row(&[("Comment", "hello"), ("Manager", "Petrov")]));
        assert_eq!(r.group_name, "");
        assert_eq!(r.manager, "Petrov");
    }

    #[test]
    fn russian_row_end_to_end() {
        let r = normalize(&row(&[
            ("Группа", "Север"),
            ("Менеджер", "Иванов"),
            ("Оборот", "1000"),
            ("ПредыдущийОборот", "800"),
            ("ПриростМаржи", "4.5"),
            ("Week", "3"),
        ]));
        assert_eq!(r.group_name, "Север");
        assert_eq!(r.manager, "Иванов");
        assert_eq!(r.revenue, 1000.0);
        assert_eq!(r.prev_revenue, 800.0);
        assert_eq!(r.margin_growth, 4.5);
        assert_eq!(r.week, Some(3));
        assert_eq!(r.rank, Rank::Diamond);
    }

    #[test]
    fn unit_suffixed_cells_keep_their_numbers() {
        let r = normalize(&row(&[
            ("Группа", "Север"),
            ("ПриростМаржи", "4.5%"),
            ("Оборот", "1000 ₽"),
        ]));
        assert_eq!(r.margin_growth, 4.5);
        assert_eq!(r.revenue, 1000.0);
        assert_eq!(r.rank, Rank::Diamond);
    }

    #[test]
    fn known_columns_are_case_sensitive() {
        assert!(is_known_column("Оборот"));
        assert!(is_known_column("Color"));
        assert!(!is_known_column("revenue"));
        assert!(!is_known_column("Comment"));
    }

    #[test]
    fn numeric_group_names_render_without_fraction() {
        let mut raw = RawRow::new();
        raw.insert("Group".into(), CellValue::Number(101.0));
        assert_eq!(normalize(&raw).group_name, "101");
    }
}
