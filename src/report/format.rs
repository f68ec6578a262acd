//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::domain::{Domain, FitOutcome, SummaryRow};

/// Decimal places used for every numeric column of the summary table.
pub const SUMMARY_DECIMALS: usize = 4;

const HEADERS: [&str; 5] = ["File", "K", "Err(K)", "b", "Err(b)"];

/// Render the summary rows as an aligned text table.
///
/// Missing values print as `-`.
pub fn format_summary_table(rows: &[SummaryRow]) -> String {
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|r| {
            [
                r.id.clone(),
                fmt_opt(r.k),
                fmt_opt(r.k_err),
                fmt_opt(r.b),
                fmt_opt(r.b_err),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS.map(String::from), &widths);
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');
    for row in &cells {
        push_line(&mut out, row, &widths);
    }
    out
}

/// Short run header: reference, domain and per-curve notes.
pub fn format_run_summary(reference: &str, domain: &Domain, ids: &[String], outcomes: &[FitOutcome]) -> String {
    let mut out = String::new();
    out.push_str("=== superimpose: I_scaled(Q) = K*I(Q) - b ===\n");
    out.push_str(&format!("Reference: {reference}\n"));
    out.push_str(&format!(
        "Domain: [{:.prec$}, {:.prec$}]\n",
        domain.x_min,
        domain.x_max,
        prec = SUMMARY_DECIMALS
    ));
    out.push_str(&format!("Curves: {}\n", ids.len()));

    for (id, outcome) in ids.iter().zip(outcomes) {
        match outcome {
            FitOutcome::Reference(_) => {}
            FitOutcome::Fitted(fit) => {
                for w in &fit.warnings {
                    out.push_str(&format!("  warning ({id}): {w}\n"));
                }
            }
            FitOutcome::Failed(e) => out.push_str(&format!("  failed ({id}): {e}\n")),
        }
    }
    out
}

fn push_line(out: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let mut parts = Vec::with_capacity(5);
    // First column left-aligned, numbers right-aligned.
    parts.push(format!("{:<w$}", cells[0], w = widths[0]));
    for i in 1..5 {
        parts.push(format!("{:>w$}", cells[i], w = widths[i]));
    }
    out.push_str(parts.join("  ").trim_end());
    out.push('\n');
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_finite() => format!("{v:.prec$}", prec = SUMMARY_DECIMALS),
        _ => "-".to_string(),
    }
}
