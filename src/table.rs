//! Plain-text table rendering for diagnostic output.

use std::borrow::Cow;

use log::info;

/// Renders `rows` under `headers` as aligned lines (header, rule, rows).
fn render_lines(headers: &[String], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(&flatten(cell)));
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_line(headers, &widths));
    let rule = widths
        .iter()
        .map(|w| "-".repeat((*w).max(3)))
        .collect::<Vec<_>>();
    let rule_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<_>>();
    lines.push(format_line(&rule, &rule_widths));
    lines.extend(rows.iter().map(|row| format_line(row, &widths)));
    lines
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut output = render_lines(headers, rows).join("\n");
    output.push('\n');
    output
}

/// Emits the rendered table through the logger, one line per record.
pub fn log_table(headers: &[String], rows: &[Vec<String>]) {
    for line in render_table(headers, rows).lines() {
        info!("  {line}");
    }
}

fn format_line(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cell = flatten(value);
            let padding = width.saturating_sub(display_width(&cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn flatten(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_table_pads_columns() {
        let headers = vec!["column".to_string(), "nulls".to_string()];
        let rows = vec![
            vec!["Age".to_string(), "0".to_string()],
            vec!["Billing Amount".to_string(), "12".to_string()],
        ];
        let rendered = render_table(&headers, &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "column          nulls");
        assert_eq!(lines[1], "--------------  -----");
        assert_eq!(lines[2], "Age             0");
        assert_eq!(lines[3], "Billing Amount  12");
    }

    #[test]
    fn control_characters_become_spaces() {
        let headers = vec!["note".to_string()];
        let rows = vec![vec!["a\nb\tc".to_string()]];
        let lines = render_lines(&headers, &rows);
        assert_eq!(lines[2], "a b c");
    }
}
