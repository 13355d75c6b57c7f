use crate::types::{GroupColors, WeekPoint};
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Chart series as a wide CSV: `week` then one column per group, in color
/// order. Cells are blank where a group has no revenue that week.
pub fn write_series_csv(
    path: &Path,
    series: &[WeekPoint],
    colors: &GroupColors,
) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(series_header(colors))?;
    for point in series {
        wtr.write_record(series_record(point, colors))?;
    }
    wtr.flush()?;
    Ok(())
}

fn series_header(colors: &GroupColors) -> Vec<String> {
    std::iter::once("week".to_string())
        .chain(colors.groups().map(str::to_string))
        .collect()
}

fn series_record(point: &WeekPoint, colors: &GroupColors) -> Vec<String> {
    std::iter::once(point.label.clone())
        .chain(colors.groups().map(|g| {
            point
                .revenue_by_group
                .get(g)
                .map(|v| format!("{:.2}", v))
                .unwrap_or_default()
        }))
        .collect()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
