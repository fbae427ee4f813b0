use serde::Serialize;

/// Widest a cell may render; longer text (descriptions, KPI lists) is cut.
const MAX_CELL: usize = 48;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print `rows` under `headers`, or the `empty` line when there are none.
pub fn print_table(headers: &[&str], rows: &[Vec<String>], empty: &str) {
    if rows.is_empty() {
        println!("{empty}");
        return;
    }
    print!("{}", render_table(headers, rows));
}

fn clip(cell: &str) -> String {
    if cell.chars().count() <= MAX_CELL {
        return cell.to_string();
    }
    let kept: String = cell.chars().take(MAX_CELL - 3).collect();
    format!("{kept}...")
}

fn line<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{:width$}", cell.as_ref(), width = w))
        .collect();
    format!("{}\n", padded.join("  ").trim_end())
}

/// Column-aligned text table. Cells past the last header are dropped.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|c| clip(c)).collect())
        .collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    let mut out = line(headers, &widths);
    out.push_str(&line(&sep, &widths));
    for row in &rows {
        out.push_str(&line(row, &widths));
    }
    out
}
