//! Plain-text block rendering for terminal output.

use notecase_core::{Block, BlockKind};

/// Renders blocks one per paragraph, separated by blank lines.
pub fn render_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    for (idx, block) in blocks.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(&render_block(block));
        out.push('\n');
    }
    out
}

fn render_block(block: &Block) -> String {
    match &block.kind {
        BlockKind::Heading { level, text } => {
            format!("{} {text}", "#".repeat(usize::from(*level)))
        }
        BlockKind::Paragraph { text } => text.clone(),
        BlockKind::BlockQuote { text } => text
            .lines()
            .map(|line| format!("| {line}"))
            .collect::<Vec<_>>()
            .join("\n"),
        BlockKind::Table { rows } => render_table(rows),
    }
}

fn render_table(rows: &[Vec<String>]) -> String {
    let columns = rows.first().map_or(0, Vec::len);
    let widths = (0..columns)
        .map(|col| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (idx, row) in rows.iter().enumerate() {
        let cells = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>();
        lines.push(cells.join("  ").trim_end().to_string());
        if idx == 0 {
            let rule = widths
                .iter()
                .map(|width| "-".repeat(*width))
                .collect::<Vec<_>>();
            lines.push(rule.join("  "));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::render_blocks;
    use notecase_core::parse;

    #[test]
    fn renders_each_block_kind() {
        let blocks = parse("# Title\n\n> quoted\n\n| a | bb |\n| ccc | d |\n\nplain text\n");
        assert_eq!(
            render_blocks(&blocks),
            "# Title\n\n| quoted\n\na    bb\n---  --\nccc  d\n\nplain text\n"
        );
    }

    #[test]
    fn empty_note_renders_nothing() {
        assert_eq!(render_blocks(&parse("\n\n")), "");
    }
}
