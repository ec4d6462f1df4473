//! Markdown snippets emitted into site pages

use std::path::Path;

/// Path of `target` as seen from `relative_to`, with `/` separators
///
/// Falls back to the full path when `target` is not below `relative_to`.
#[must_use]
pub fn relative_link(target: &Path, relative_to: &Path) -> String {
    match target.strip_prefix(relative_to) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => target.display().to_string(),
    }
}

/// `[text](link)` pointing at `target` relative to `relative_to`
#[must_use]
pub fn md_link(target: &Path, relative_to: &Path, text: &str) -> String {
    format!("[{text}]({})", relative_link(target, relative_to))
}

/// `![alt](source)` embedding `target` relative to `relative_to`
#[must_use]
pub fn md_image(target: &Path, relative_to: &Path, alt: &str) -> String {
    format!("![{alt}]({})", relative_link(target, relative_to))
}

/// Pipe table with a header row
///
/// Rows shorter than the header are padded with empty cells.
#[must_use]
pub fn table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    push_row(&mut out, headers.iter().map(String::as_str), headers.len());
    out.push('|');
    for _ in headers {
        out.push_str(":---|");
    }
    out.push('\n');
    for row in rows {
        push_row(&mut out, row.iter().map(String::as_str), headers.len());
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, width: usize) {
    out.push('|');
    let mut written = 0;
    for cell in cells.take(width) {
        out.push(' ');
        out.push_str(&escape_cell(cell));
        out.push_str(" |");
        written += 1;
    }
    for _ in written..width {
        out.push_str("  |");
    }
    out.push('\n');
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn link_relative_to_site_root() {
        let link = md_link(
            Path::new("/site/reports/push_1_a_0.html"),
            Path::new("/site"),
            "Profiling results",
        );
        assert_eq!(link, "[Profiling results](reports/push_1_a_0.html)");
    }

    #[test]
    fn link_outside_root_keeps_full_path() {
        let link = md_link(Path::new("/elsewhere/a.html"), Path::new("/site"), "x");
        assert_eq!(link, "[x](/elsewhere/a.html)");
    }

    #[test]
    fn image_embed() {
        let img = md_image(
            Path::new("/site/plots/runtime_figure.svg"),
            Path::new("/site"),
            "CPU Time",
        );
        assert_eq!(img, "![CPU Time](plots/runtime_figure.svg)");
    }

    #[test]
    fn table_layout() {
        let headers = vec!["Commit".to_string(), "Triggered by".to_string()];
        let rows = vec![
            vec!["abc".to_string(), "push".to_string()],
            vec!["a|b".to_string()],
        ];
        assert_eq!(
            table(&headers, &rows),
            "| Commit | Triggered by |\n|:---|:---|\n| abc | push |\n| a\\|b |  |\n"
        );
    }
}
