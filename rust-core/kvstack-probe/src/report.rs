// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rendering of collected statistics as a table, text report, or JSON.

use comfy_table::{Cell, ContentArrangement, Table};
use kvstack_storage::{LatencySummary, OperationType, StorageStats};

fn ms_cell(ms: Option<f64>) -> Cell {
    match ms {
        Some(ms) => Cell::new(format!("{ms:.3}")),
        None => Cell::new("-"),
    }
}

/// One row per operation type that was used.
pub fn operation_table(stats: &StorageStats) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Operation"),
        Cell::new("Requests"),
        Cell::new("Total ms"),
        Cell::new("Avg ms"),
        Cell::new("Recent avg ms"),
    ]);

    for op in OperationType::ALL {
        let per_type = stats.for_type(op);
        let summary: LatencySummary = per_type.summary();
        if summary.count == 0 {
            continue;
        }
        table.add_row(vec![
            Cell::new(op),
            Cell::new(summary.count),
            ms_cell(Some(summary.total_ms())),
            ms_cell(summary.average_ms()),
            ms_cell(per_type.recent_summary().average_ms()),
        ]);
    }
    table
}

/// Table followed by the full statistics report.
pub fn text(stats: &StorageStats) -> String {
    format!("{}\n\n{stats}", operation_table(stats))
}

pub fn json(stats: &StorageStats) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&stats.snapshot())
}
