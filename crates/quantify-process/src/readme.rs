//! Period README upsert.
//!
//! The README holds one section per source and one entry per narrative
//! fragment, each fenced by `<!-- {title} Start -->` / `<!-- {title} End -->`
//! comment lines. Upserting an entry that already exists replaces it in place.

use quantify_core::{NarrativeEntry, RunPeriod};

use crate::ProcessError;

fn start_marker(title: &str) -> String {
    format!("<!-- {title} Start -->")
}

fn end_marker(title: &str) -> String {
    format!("<!-- {title} End -->")
}

pub fn readme_title(period: RunPeriod) -> String {
    format!("# Quantifying the Commons {period}")
}

fn entry_lines(entry: &NarrativeEntry) -> Vec<String> {
    let mut lines = vec![
        start_marker(&entry.title),
        String::new(),
        format!("### {}", entry.title),
        String::new(),
        entry.text.clone(),
        String::new(),
    ];
    if let Some(figure) = &entry.figure {
        lines.push(format!("Data: [{figure}]({figure})"));
        lines.push(String::new());
    }
    lines.push(end_marker(&entry.title));
    lines.push(String::new());
    lines
}

/// Insert or replace `entry` in the `section` of `readme`, returning the new
/// text. An empty `readme` starts a fresh document.
pub fn upsert_entry(
    readme: &str,
    period: RunPeriod,
    section: &str,
    entry: &NarrativeEntry,
) -> Result<String, ProcessError> {
    let mut lines: Vec<String> = readme.lines().map(str::to_string).collect();
    let unterminated = |marker: String| ProcessError::Readme { period, marker };

    let title = readme_title(period);
    if lines.first().map(|l| l.trim()) != Some(title.as_str()) {
        lines.splice(0..0, [title, String::new()]);
    }

    let section_start = start_marker(section);
    let section_end = end_marker(section);
    if !lines.contains(&section_start) {
        lines.extend([
            section_start.clone(),
            String::new(),
            format!("## {section}"),
            String::new(),
            section_end.clone(),
            String::new(),
        ]);
    }
    let section_end_index = lines
        .iter()
        .position(|l| *l == section_end)
        .ok_or_else(|| unterminated(section_start.clone()))?;

    let entry_start = start_marker(&entry.title);
    let entry_end = end_marker(&entry.title);
    let replacement = entry_lines(entry);
    match lines.iter().position(|l| *l == entry_start) {
        Some(start) => {
            let mut end = lines[start..]
                .iter()
                .position(|l| *l == entry_end)
                .map(|offset| start + offset)
                .ok_or_else(|| unterminated(entry_start.clone()))?;
            while end + 1 < lines.len() && lines[end + 1].trim().is_empty() {
                end += 1;
            }
            lines.splice(start..=end, replacement);
        }
        None => {
            lines.splice(section_end_index..section_end_index, replacement);
        }
    }

    let mut text = lines.join("\n");
    text.push('\n');
    Ok(text)
}
