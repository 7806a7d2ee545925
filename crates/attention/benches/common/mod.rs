//! Helpers for bench harnesses that publish markdown summaries.

use std::{fs, path::PathBuf};

pub fn format_markdown_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format!("| {} |", headers.join(" | ")));
    lines.push(format!("|{}", " --- |".repeat(headers.len())));
    lines.extend(rows.iter().map(|row| format!("| {} |", row.join(" | "))));
    lines.join("\n") + "\n"
}

/// Replaces (or appends) the `section` block of `benchmarks/RESULTS.md`.
pub fn update_results(section: &str, content: &str) -> std::io::Result<()> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("benchmarks/RESULTS.md");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let start = format!("<!-- {}_START -->", section.to_uppercase());
    let end = format!("<!-- {}_END -->", section.to_uppercase());
    let block = format!("{start}\n{content}\n{end}\n");

    let mut body = fs::read_to_string(&path).unwrap_or_else(|_| "# Attention Benchmarks\n\n".into());
    match (body.find(&start), body.find(&end)) {
        (Some(lo), Some(hi)) if lo < hi => {
            let stop = (hi + end.len() + 1).min(body.len());
            body.replace_range(lo..stop, &block);
        }
        _ => {
            if !body.ends_with('\n') {
                body.push('\n');
            }
            body.push_str(&block);
        }
    }
    fs::write(&path, body)
}
