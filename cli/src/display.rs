use crossterm::style::{Color, Stylize};
use engine::{Model, image_model::ModelDescriptor};

/// A boxed block of text with an optional title in the top border.
pub fn panel(title: Option<&str>, lines: &[String], color: Color) -> String {
    let title = title.map(|t| format!(" {t} ")).unwrap_or_default();
    let width = lines
        .iter()
        .map(|l| l.chars().count())
        .chain([title.chars().count()])
        .max()
        .unwrap_or(0)
        + 2;

    let top = format!(
        "╭{title}{}╮",
        "─".repeat(width - title.chars().count())
    );
    let bottom = format!("╰{}╯", "─".repeat(width));

    let mut out = format!("{}\n", top.with(color));
    for line in lines {
        let pad = width - 1 - line.chars().count();
        out.push_str(&format!(
            "{} {line}{}{}\n",
            "│".with(color),
            " ".repeat(pad),
            "│".with(color)
        ));
    }
    out.push_str(&bottom.with(color).to_string());
    out
}

/// Left-aligned columns under a bold title and header row.
pub fn table(title: &str, headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let header = render_row(headers.iter().copied(), &widths);
    let mut out = format!("{}\n{}\n", title.bold(), header.as_str().cyan());
    out.push_str(&"─".repeat(header.chars().count()));
    for row in rows {
        out.push('\n');
        out.push_str(&render_row(row.iter().map(String::as_str), &widths));
    }
    out
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

pub fn models_table() -> String {
    let rows: Vec<Vec<String>> = Model::all()
        .map(|d| {
            let is_default = d.name == Model::default().descriptor().name;
            vec![
                d.name.to_string(),
                d.description.to_string(),
                if is_default { "✓" } else { "" }.to_string(),
            ]
        })
        .collect();
    table("Available Models", &["Name", "Description", "Default"], &rows)
}

pub fn banner(model: &ModelDescriptor) -> String {
    panel(
        None,
        &[
            "Whiteboard Processor".to_string(),
            "Transform whiteboard photos into clean, professional diagrams".to_string(),
            format!("Using: {} ({})", model.name, model.description),
        ],
        Color::Blue,
    )
}
