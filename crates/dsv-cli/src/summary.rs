use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use dsv_map::{
    CategorySummary, RebuildReport, Staleness, StoredMappingMetadata, summarize,
};
use dsv_model::{DataSetVersionMapping, MappingPlan, MappingType, PlanEntry};

pub fn print_mapping(mapping: &DataSetVersionMapping, unresolved_only: bool) {
    println!(
        "Mapping: {} -> {}",
        mapping.source_version, mapping.target_version
    );
    println!("Revision: {}", mapping.revision);
    println!("Updated: {}", mapping.updated_at.to_rfc3339());
    if let Some(at) = mapping.frozen_at {
        println!("Frozen: {}", at.to_rfc3339());
    }
    print_category_table(mapping);

    let entries = visible_entries(mapping.entries(), unresolved_only);
    if entries.is_empty() {
        if unresolved_only {
            println!("Nothing awaiting review.");
        }
        return;
    }
    print_entry_table(&entries);
}

/// Entries shown by `show`; with `unresolved_only`, just the ones a reviewer
/// still has to look at.
pub fn visible_entries(entries: Vec<PlanEntry<'_>>, unresolved_only: bool) -> Vec<PlanEntry<'_>> {
    if !unresolved_only {
        return entries;
    }
    entries
        .into_iter()
        .filter(|entry| {
            matches!(entry.mapping_type, MappingType::AutoNone | MappingType::None)
                || entry.needs_review
        })
        .collect()
}

fn print_category_table(mapping: &DataSetVersionMapping) {
    let summary = summarize(mapping);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Category"),
        header_cell("Total"),
        header_cell("Auto"),
        header_cell("Auto none"),
        header_cell("Manual"),
        header_cell("Manual none"),
        header_cell("Review"),
        header_cell("Candidates"),
        header_cell("Complete"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..8 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    align_column(&mut table, 8, CellAlignment::Center);

    for (category, counts) in &summary.categories {
        table.add_row(category_row(Cell::new(category), counts));
    }
    table.add_row(category_row(
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        &summary.total(),
    ));
    println!("{table}");
}

fn category_row(label: Cell, counts: &CategorySummary) -> Vec<Cell> {
    vec![
        label,
        Cell::new(counts.total).add_attribute(Attribute::Bold),
        Cell::new(counts.count(MappingType::AutoMapped)),
        count_cell(counts.count(MappingType::AutoNone), Color::Yellow),
        Cell::new(counts.count(MappingType::ManualMapped)),
        Cell::new(counts.count(MappingType::ManualNone)),
        count_cell(counts.needs_review, Color::Yellow),
        Cell::new(counts.candidates),
        complete_cell(counts.is_complete()),
    ]
}

fn print_entry_table(entries: &[PlanEntry<'_>]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Address"),
        header_cell("Label"),
        header_cell("Type"),
        header_cell("Candidate"),
        header_cell("Review"),
    ]);
    apply_entry_table_style(&mut table);
    align_column(&mut table, 4, CellAlignment::Center);
    for entry in entries {
        table.add_row(vec![
            Cell::new(&entry.address),
            Cell::new(entry.label),
            type_cell(entry.mapping_type),
            entry
                .candidate_key
                .map_or_else(|| dim_cell("-"), Cell::new),
            if entry.needs_review {
                Cell::new("!").fg(Color::Yellow).add_attribute(Attribute::Bold)
            } else {
                dim_cell("")
            },
        ]);
    }
    println!("{table}");
}

pub fn print_rebuild_report(report: &RebuildReport) {
    println!("Manual decisions kept: {}", report.retained_manual);
    if !report.downgraded.is_empty() {
        println!("Needs review (candidate removed):");
        for address in &report.downgraded {
            println!("  {address}");
        }
    }
    if !report.dropped_manual.is_empty() {
        println!("Dropped (source entity removed or replaced):");
        for address in &report.dropped_manual {
            println!("  {address}");
        }
    }
}

pub fn print_staleness(status: Staleness) {
    let describe = |changed: bool| if changed { "changed" } else { "unchanged" };
    println!("Source snapshot: {}", describe(status.source_changed));
    println!("Target snapshot: {}", describe(status.target_changed));
    if status.is_stale() {
        println!("Run `rebuild` to bring the mapping up to date.");
    }
}

pub fn print_store_listing(stored: &[StoredMappingMetadata]) {
    if stored.is_empty() {
        println!("No stored mappings.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Target"),
        header_cell("Revision"),
        header_cell("Entries"),
        header_cell("Complete"),
        header_cell("Frozen"),
        header_cell("Updated"),
    ]);
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    align_column(&mut table, 5, CellAlignment::Center);
    for meta in stored {
        table.add_row(vec![
            Cell::new(&meta.source_version),
            Cell::new(&meta.target_version).add_attribute(Attribute::Bold),
            Cell::new(meta.revision),
            Cell::new(meta.entry_count),
            complete_cell(meta.mappings_complete),
            if meta.frozen {
                Cell::new("✓").fg(Color::Cyan)
            } else {
                dim_cell("-")
            },
            Cell::new(meta.updated_at.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("{table}");
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).add_attribute(Attribute::Dim)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn complete_cell(complete: bool) -> Cell {
    if complete {
        Cell::new("✓").fg(Color::Green)
    } else {
        Cell::new("✗").fg(Color::Red).add_attribute(Attribute::Bold)
    }
}

fn type_cell(mapping_type: MappingType) -> Cell {
    let cell = Cell::new(mapping_type);
    match mapping_type {
        MappingType::AutoMapped => cell.fg(Color::Green),
        MappingType::ManualMapped => cell.fg(Color::Cyan),
        MappingType::ManualNone => cell.fg(Color::Magenta),
        MappingType::AutoNone | MappingType::None => {
            cell.fg(Color::Yellow).add_attribute(Attribute::Bold)
        }
    }
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn apply_entry_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
    table.set_constraints(vec![
        ColumnConstraint::UpperBoundary(Width::Percentage(40)),
        ColumnConstraint::UpperBoundary(Width::Percentage(25)),
        ColumnConstraint::LowerBoundary(Width::Fixed(12)),
        ColumnConstraint::UpperBoundary(Width::Percentage(25)),
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),
    ]);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsv_model::MappingAddress;

    fn entry(source_key: &str, mapping_type: MappingType, needs_review: bool) -> PlanEntry<'static> {
        PlanEntry {
            address: MappingAddress::indicator(source_key),
            label: "label",
            public_id: None,
            mapping_type,
            candidate_key: None,
            needs_review,
        }
    }

    #[test]
    fn unresolved_view_keeps_losses_and_review_items() {
        let entries = vec![
            entry("a", MappingType::AutoMapped, false),
            entry("b", MappingType::AutoNone, false),
            entry("c", MappingType::ManualNone, false),
            entry("d", MappingType::ManualMapped, true),
        ];
        let shown: Vec<_> = visible_entries(entries.clone(), true)
            .into_iter()
            .map(|entry| entry.address.source_key().to_string())
            .collect();
        assert_eq!(shown, ["b", "d"]);
        assert_eq!(visible_entries(entries, false).len(), 4);
    }
}
