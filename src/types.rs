use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tabled::Tabled;

/// A single cell as handed over by the spreadsheet reader.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text form of the cell, as it would appear in the sheet.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

/// One spreadsheet row keyed by column header.
pub type RawRow = HashMap<String, CellValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Diamond,
    Gold,
    Silver,
    None,
}

impl Rank {
    pub const ALL: [Rank; 4] = [Rank::Diamond, Rank::Gold, Rank::Silver, Rank::None];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Diamond => "diamond",
            Rank::Gold => "gold",
            Rank::Silver => "silver",
            Rank::None => "none",
        }
    }

    /// Status label shown next to a manager.
    pub fn status_label(&self) -> &'static str {
        match self {
            Rank::Diamond => "Бриллиантовый",
            Rank::Gold => "Золотой",
            Rank::Silver => "Серебряный",
            Rank::None => "Стандартный",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical record derived from one [`RawRow`]. Numeric fields are always finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesRecord {
    pub group_name: String,
    pub manager: String,
    pub revenue: f64,
    pub prev_revenue: f64,
    pub clean_margin: f64,
    pub margin_growth: f64,
    pub drr: f64,
    pub turnover: f64,
    pub turnover_change: f64,
    pub cr: f64,
    pub ctr: f64,
    pub week: Option<i32>,
    pub rank: Rank,
}

/// Revenue per group for one week of the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekPoint {
    #[serde(skip)]
    pub week_number: i32,
    #[serde(rename = "week")]
    pub label: String,
    #[serde(flatten)]
    pub revenue_by_group: BTreeMap<String, f64>,
}

/// Group name to CSS color, kept in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupColors {
    pub entries: Vec<(String, String)>,
}

impl GroupColors {
    pub fn get(&self, group: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == group)
            .map(|(_, color)| color.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for GroupColors {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, color) in &self.entries {
            map.serialize_entry(name, color)?;
        }
        map.end()
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DetailRow {
    #[serde(rename = "Place")]
    #[tabled(rename = "Place")]
    pub place: String,
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Manager")]
    #[tabled(rename = "Manager")]
    pub manager: String,
    #[serde(rename = "Color")]
    #[tabled(rename = "Color")]
    pub color: String,
    #[serde(rename = "Revenue")]
    #[tabled(rename = "Revenue")]
    pub revenue: String,
    #[serde(rename = "Growth")]
    #[tabled(rename = "Growth")]
    pub growth: String,
    #[serde(rename = "DRR%")]
    #[tabled(rename = "DRR%")]
    pub drr_pct: String,
    #[serde(rename = "CleanMargin%")]
    #[tabled(rename = "CleanMargin%")]
    pub clean_margin: String,
    #[serde(rename = "MarginGrowth")]
    #[tabled(rename = "MarginGrowth")]
    pub margin_growth: String,
    #[serde(rename = "Turnover")]
    #[tabled(rename = "Turnover")]
    pub turnover: String,
    #[serde(rename = "TurnoverChange")]
    #[tabled(rename = "TurnoverChange")]
    pub turnover_change: String,
    #[serde(rename = "CR")]
    #[tabled(rename = "CR")]
    pub cr: String,
    #[serde(rename = "CTR")]
    #[tabled(rename = "CTR")]
    pub ctr: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GroupColorRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Color")]
    #[tabled(rename = "Color")]
    pub color: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RankLegendRow {
    #[serde(rename = "Award")]
    #[tabled(rename = "Award")]
    pub award: String,
    #[serde(rename = "Condition")]
    #[tabled(rename = "Condition")]
    pub condition: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total_records: usize,
    pub records_in_view: usize,
    pub selected_week: Option<i32>,
    pub distinct_groups: usize,
    pub distinct_weeks: usize,
    pub revenue_in_view: f64,
    pub rank_counts: BTreeMap<String, usize>,
}

/// Everything the presentation layer consumes for one load.
#[derive(Debug, Serialize, Clone)]
pub struct Dashboard {
    pub records: Vec<SalesRecord>,
    pub series: Vec<WeekPoint>,
    pub colors: GroupColors,
    pub summary: DashboardSummary,
}
