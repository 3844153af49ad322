//! Human-readable step tables

use crate::sequence::{Sequence, Step};
use crate::voice::voiced_intervals;
use log::info;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

struct Row {
    label: &'static str,
    values: Vec<String>,
}

fn rows(sequence: &Sequence) -> Vec<Row> {
    let steps = sequence.steps();
    let collect = |f: &dyn Fn(&Step) -> String| -> Vec<String> { steps.iter().map(f).collect() };
    vec![
        Row {
            label: "Type",
            values: collect(&|s| s.kind.to_string()),
        },
        Row {
            label: "Base Note",
            values: collect(&|s| s.pitch.to_string()),
        },
        Row {
            label: "Octave Mod",
            values: collect(&|s| s.octave.to_string()),
        },
        Row {
            label: "MIDI Note",
            values: collect(&|s| s.sounding_pitch().to_string()),
        },
        Row {
            label: "Accent",
            values: collect(&|s| if s.accent { "Yes" } else { "No" }.to_string()),
        },
        Row {
            label: "Voice",
            values: voice_numbers(sequence),
        },
        Row {
            label: "Source",
            values: collect(&|s| s.source.clone()),
        },
    ]
}

/// 1-based voiced interval each step belongs to, blank for rests.
fn voice_numbers(sequence: &Sequence) -> Vec<String> {
    let mut values = vec![String::new(); sequence.len()];
    for (number, interval) in voiced_intervals(sequence).iter().enumerate() {
        for value in &mut values[interval.start..interval.end()] {
            *value = (number + 1).to_string();
        }
    }
    values
}

/// Fixed-width text table, one column per step.
pub fn render_table(sequence: &Sequence) -> String {
    Table(sequence).to_string()
}

struct Table<'a>(&'a Sequence);

impl fmt::Display for Table<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = rows(self.0);
        let label_width = rows
            .iter()
            .map(|r| r.label.len())
            .chain(std::iter::once("Attribute".len()))
            .max()
            .unwrap_or(0);
        let widths: Vec<usize> = (0..self.0.len())
            .map(|i| {
                rows.iter()
                    .map(|r| r.values[i].chars().count())
                    .chain(std::iter::once((i + 1).to_string().len()))
                    .max()
                    .unwrap_or(1)
            })
            .collect();

        write!(f, "{:<label_width$}", "Attribute")?;
        for (i, width) in widths.iter().enumerate() {
            write!(f, " | {:<width$}", i + 1)?;
        }
        writeln!(f)?;
        write!(f, "{}", "-".repeat(label_width))?;
        for width in &widths {
            write!(f, "-+-{}", "-".repeat(*width))?;
        }
        writeln!(f)?;
        for row in &rows {
            write!(f, "{:<label_width$}", row.label)?;
            for (value, width) in row.values.iter().zip(&widths) {
                write!(f, " | {:<width$}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Standalone HTML page with the same table.
pub fn render_html(sequence: &Sequence, title: Option<&str>) -> String {
    HtmlPage { sequence, title }.to_string()
}

struct HtmlPage<'a> {
    sequence: &'a Sequence,
    title: Option<&'a str>,
}

impl fmt::Display for HtmlPage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = escape_html(self.title.unwrap_or(self.sequence.name()));
        let name = escape_html(self.sequence.name());
        let rows = rows(self.sequence);
        let label_width = rows.iter().map(|r| r.label.len()).max().unwrap_or(0) + 2;

        writeln!(f, "<!DOCTYPE html>")?;
        writeln!(f, "<html lang=\"en\">")?;
        writeln!(f, "<head>")?;
        writeln!(f, "    <meta charset=\"utf-8\">")?;
        writeln!(f, "    <title>{}</title>", title)?;
        writeln!(f, "    <style>")?;
        writeln!(f, "        body {{ font-family: monospace; }}")?;
        writeln!(f, "        table {{ border-collapse: collapse; }}")?;
        writeln!(f, "        th, td {{ border: 1px solid #444; padding: 0.2em 0.5em; text-align: center; }}")?;
        writeln!(f, "        th[scope=\"row\"] {{ min-width: {}ch; text-align: left; }}", label_width)?;
        writeln!(f, "        .source-row td {{ font-size: 0.8em; }}")?;
        writeln!(f, "    </style>")?;
        writeln!(f, "</head>")?;
        writeln!(f, "<body>")?;
        writeln!(f, "    <h1>{}</h1>", title)?;
        writeln!(f, "    <p>{} &middot; {} steps</p>", name, self.sequence.len())?;
        writeln!(f, "    <table>")?;
        write!(f, "        <tr><th scope=\"col\">Attribute</th>")?;
        for i in 1..=self.sequence.len() {
            write!(f, "<th scope=\"col\">{}</th>", i)?;
        }
        writeln!(f, "</tr>")?;
        for row in &rows {
            let class = if row.label == "Source" {
                " class=\"source-row\""
            } else {
                ""
            };
            write!(f, "        <tr{}><th scope=\"row\">{}</th>", class, row.label)?;
            for value in &row.values {
                if value.is_empty() {
                    write!(f, "<td>&nbsp;</td>")?;
                } else {
                    write!(f, "<td>{}</td>", escape_html(value))?;
                }
            }
            writeln!(f, "</tr>")?;
        }
        writeln!(f, "    </table>")?;
        writeln!(f, "</body>")?;
        writeln!(f, "</html>")
    }
}

pub fn save_html(sequence: &Sequence, title: Option<&str>, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_html(sequence, title))?;
    info!("Exported '{}' to {}", sequence.name(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::{Octave, StepKind};

    fn sample() -> Sequence {
        let mut seq = Sequence::new("Scan <1>", 2);
        seq.set(0, 36, Octave::Up, StepKind::Tie, true).unwrap();
        seq.set_source(0, "22:ssh").unwrap();
        seq.set(1, 0, Octave::Zero, StepKind::Rest, false).unwrap();
        seq
    }

    #[test]
    fn test_table_rows() {
        let table = render_table(&sample());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines[0].starts_with("Attribute"));
        assert!(lines[2].starts_with("Type") && lines[2].contains("tie") && lines[2].contains("rest"));
        assert!(lines[5].starts_with("MIDI Note") && lines[5].contains("48"));
        assert!(lines[6].contains("Yes") && lines[6].contains("No"));
        assert!(lines[7].starts_with("Voice") && lines[7].contains(" | 1 "));
        assert!(lines[8].contains("22:ssh"));
    }

    #[test]
    fn test_table_columns_line_up() {
        let table = render_table(&sample());
        let widths: Vec<usize> = table.lines().map(|l| l.trim_end().len()).collect();
        let header_pipes: Vec<usize> = table
            .lines()
            .next()
            .unwrap()
            .match_indices(" | ")
            .map(|(i, _)| i)
            .collect();
        for line in table.lines().skip(2) {
            let pipes: Vec<usize> = line.match_indices(" | ").map(|(i, _)| i).collect();
            assert_eq!(pipes, header_pipes);
        }
        assert!(widths.iter().all(|w| *w > 0));
    }

    #[test]
    fn test_html_escapes_and_fills_empty_sources() {
        let html = render_html(&sample(), None);
        assert!(html.contains("<title>Scan &lt;1&gt;</title>"));
        assert!(html.contains("<td>22:ssh</td>"));
        assert!(html.contains("<td>&nbsp;</td>"));
        assert!(html.contains("<th scope=\"col\">2</th>"));
        assert!(html.contains("class=\"source-row\""));
    }

    #[test]
    fn test_table_writes_into_any_formatter() {
        let seq = sample();
        let table = format!("{}", Table(&seq));
        assert_eq!(table, render_table(&seq));
        assert!(table.ends_with('\n'));
        assert_eq!(format!("{}", HtmlPage { sequence: &seq, title: None }), render_html(&seq, None));
    }

    #[test]
    fn test_html_custom_title() {
        let html = render_html(&sample(), Some("Export"));
        assert!(html.contains("<h1>Export</h1>"));
        assert!(html.contains("Scan &lt;1&gt; &middot; 2 steps"));
    }
}
