use average::Mean;
use comfy_table::{Attribute, Cell, CellAlignment, Table, modifiers, presets};

use crate::climate::{ClimateDataset, Column};

/// One row per named dataset: location, time span and column means.
pub fn build_climate_table<'a>(
    datasets: impl IntoIterator<Item = (&'a str, &'a ClimateDataset)>,
) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table.set_header(vec![
        "Node", "Lon", "Lat", "Alt", "Timezone", "First", "Hours", "GHI", "DNI", "DHI", "RH",
        "T", "WS10",
    ]);
    for (name, dataset) in datasets {
        let record = &dataset.climate_record;
        let mut row = vec![
            Cell::new(name),
            Cell::new(format!("{:.2}", dataset.longitude)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", dataset.latitude)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.0}", dataset.altitude))
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
            Cell::new(record.index().timezone().name()),
            Cell::new(
                record
                    .index()
                    .first()
                    .map_or_else(String::new, |first| first.format("%Y-%m-%d %H:%M").to_string()),
            )
            .add_attribute(Attribute::Dim),
            Cell::new(dataset.len()).set_alignment(CellAlignment::Right),
        ];
        row.extend(Column::ALL.map(|column| build_mean_cell(record.column(column))));
        row.push(build_mean_cell(dataset.wind_speed_by_height.nominal()));
        table.add_row(row);
    }
    table
}

fn build_mean_cell(values: &[f64]) -> Cell {
    let estimate: Mean = values.iter().copied().collect();
    let text = if estimate.is_empty() { "-".to_owned() } else { format!("{:.1}", estimate.mean()) };
    Cell::new(text).set_alignment(CellAlignment::Right)
}
