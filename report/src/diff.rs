use maud::html;
use similar::{capture_diff_slices, Algorithm, DiffTag};

/// Rendered in place of a diff when there is nothing to compare.
pub const NO_CHANGES: &str = "<p>No changes detected between these attempts.</p>";

/// Default number of characters shown per line before wrapping.
pub const DEFAULT_WRAP_COLUMN: usize = 80;

/// Render a side-by-side, line based diff of two texts as an HTML table.
///
/// If either text is empty or both are the same, [NO_CHANGES] is returned instead.
/// Lines longer than `wrap_column` characters continue on the next row. A `wrap_column` of
/// zero disables wrapping.
pub fn render_diff(
    old: &str,
    new: &str,
    from_desc: &str,
    to_desc: &str,
    wrap_column: usize,
) -> String {
    if old.is_empty() || new.is_empty() || old == new {
        return NO_CHANGES.to_string();
    }

    let old_lines = old.lines().collect::<Vec<_>>();
    let new_lines = new.lines().collect::<Vec<_>>();

    let mut rows = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, &old_lines, &new_lines) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        let (old_class, new_class) = match tag {
            DiffTag::Equal => ("", ""),
            DiffTag::Delete => ("diff_sub", ""),
            DiffTag::Insert => ("", "diff_add"),
            DiffTag::Replace => ("diff_chg", "diff_chg"),
        };

        let len = old_range.len().max(new_range.len());
        for offset in 0..len {
            let left = old_range.clone().nth(offset).map(|i| Line {
                number: i + 1,
                text: old_lines[i],
                class: if offset < new_range.len() {
                    old_class
                } else {
                    "diff_sub"
                },
            });
            let right = new_range.clone().nth(offset).map(|i| Line {
                number: i + 1,
                text: new_lines[i],
                class: if offset < old_range.len() {
                    new_class
                } else {
                    "diff_add"
                },
            });
            push_wrapped(&mut rows, left, right, wrap_column);
        }
    }

    html! {
        table.diff {
            thead {
                tr {
                    th.diff_header colspan="2" { (from_desc) }
                    th.diff_header colspan="2" { (to_desc) }
                }
            }
            tbody {
                @for row in &rows {
                    tr {
                        td.diff_header { (row.left.number) }
                        td class=(row.left.class) { (row.left.text) }
                        td.diff_header { (row.right.number) }
                        td class=(row.right.class) { (row.right.text) }
                    }
                }
            }
        }
    }
    .into_string()
}

struct Line<'a> {
    number: usize,
    text: &'a str,
    class: &'static str,
}

#[derive(Default)]
struct Cell {
    number: String,
    text: String,
    class: &'static str,
}

struct Row {
    left: Cell,
    right: Cell,
}

fn push_wrapped(rows: &mut Vec<Row>, left: Option<Line>, right: Option<Line>, wrap_column: usize) {
    let mut left = left
        .map(|line| wrap_line(line, wrap_column))
        .unwrap_or_default()
        .into_iter();
    let mut right = right
        .map(|line| wrap_line(line, wrap_column))
        .unwrap_or_default()
        .into_iter();

    loop {
        match (left.next(), right.next()) {
            (None, None) => break,
            (left, right) => rows.push(Row {
                left: left.unwrap_or_default(),
                right: right.unwrap_or_default(),
            }),
        }
    }
}

fn wrap_line(line: Line, wrap_column: usize) -> Vec<Cell> {
    let chars = line.text.chars().collect::<Vec<_>>();
    if wrap_column == 0 || chars.len() <= wrap_column {
        return vec![Cell {
            number: line.number.to_string(),
            text: line.text.to_string(),
            class: line.class,
        }];
    }

    chars
        .chunks(wrap_column)
        .enumerate()
        .map(|(i, chunk)| Cell {
            number: if i == 0 {
                line.number.to_string()
            } else {
                ">".to_string()
            },
            text: chunk.iter().collect(),
            class: line.class,
        })
        .collect()
}
