use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use omero_import::{BatchOutcome, BatchState, JobReport};

/// Print one line per job of a bulk run, then the totals.
pub fn print_summary(outcome: &BatchOutcome) {
    println!("{}", summary_table(outcome));
    let failures = outcome.failures();
    match outcome.aborted_at {
        Some(job) => eprintln!(
            "Import stopped at job {job}: {} jobs run, {failures} failed",
            outcome.jobs.len()
        ),
        None => println!("{} jobs run, {failures} failed", outcome.jobs.len()),
    }
}

/// Build the per-job table.
#[must_use]
pub fn summary_table(outcome: &BatchOutcome) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Job"),
        header_cell("Row"),
        header_cell("Path"),
        header_cell("Exit"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for job in &outcome.jobs {
        table.add_row(vec![
            Cell::new(job.index),
            job.row.map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(job.paths.join(" ")),
            exit_cell(job),
            status_cell(job.state),
        ]);
    }
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn exit_cell(job: &JobReport) -> Cell {
    if job.succeeded() {
        dim_cell(job.exit_code)
    } else {
        Cell::new(job.exit_code)
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    }
}

fn status_cell(state: BatchState) -> Cell {
    match state {
        BatchState::Running | BatchState::Done => Cell::new("ok").fg(Color::Green),
        BatchState::ContinuedAfterFailure => Cell::new("failed, continued").fg(Color::Yellow),
        BatchState::AbortedOnFailure => Cell::new("failed, aborted")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(index: usize, exit_code: i32, state: BatchState) -> JobReport {
        JobReport {
            index,
            row: Some(index),
            paths: vec![format!("/data/{index}.tif")],
            exit_code,
            state,
        }
    }

    #[test]
    fn table_has_a_row_per_job() {
        let outcome = BatchOutcome {
            exit_code: 0,
            jobs: vec![
                report(1, 1, BatchState::ContinuedAfterFailure),
                report(2, 0, BatchState::Running),
            ],
            aborted_at: None,
            state: BatchState::Done,
        };
        let rendered = summary_table(&outcome).to_string();
        assert!(rendered.contains("/data/1.tif"));
        assert!(rendered.contains("failed, continued"));
        assert_eq!(summary_table(&outcome).row_count(), 2);
    }
}
