/// Pipe tables: a header row, a delimiter row fixing column count and
/// alignment, and zero or more body rows. The column count is set by the
/// header; short body rows are padded with empty cells and excess cells
/// are dropped.
use crate::ast::{Alignment, Node};
use crate::extension::{BlockMatch, SyntaxExtension};
use crate::parser::Parser;

pub struct TableExtension;

impl SyntaxExtension for TableExtension {
    fn name(&self) -> &'static str {
        "table"
    }

    fn node_types(&self) -> Vec<&'static str> {
        vec!["table", "table_row", "table_cell"]
    }

    fn try_open_block(&self, lines: &[&str], parser: &Parser) -> Option<BlockMatch> {
        if lines.len() < 2 {
            return None;
        }
        let header = split_row(lines[0])?;
        let alignments = parse_delimiter_row(lines[1])?;
        if header.len() != alignments.len() {
            return None;
        }

        let columns = alignments.len();
        let mut children = vec![make_row(&header, columns, true, parser)];
        let mut consumed = 2;
        while consumed < lines.len() {
            let line = lines[consumed];
            if line.trim().is_empty() {
                break;
            }
            let Some(cells) = split_row(line) else {
                break;
            };
            children.push(make_row(&cells, columns, false, parser));
            consumed += 1;
        }

        Some(BlockMatch {
            node: Node::Table {
                alignments,
                children,
            },
            lines_consumed: consumed,
        })
    }
}

fn make_row(cells: &[String], columns: usize, is_header: bool, parser: &Parser) -> Node {
    let mut row = Vec::with_capacity(columns);
    for i in 0..columns {
        let text = cells.get(i).map(String::as_str).unwrap_or("");
        row.push(Node::TableCell {
            is_header,
            children: parser.parse_inlines(text),
        });
    }
    Node::TableRow(row)
}

/// Split a line into trimmed cell texts. Returns `None` when the line has
/// no unescaped pipe at all, which ends the table. `\|` stays a literal
/// pipe inside its cell; every other escape is left for the inline parser.
fn split_row(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut saw_pipe = false;
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.peek() == Some(&'|') {
                    chars.next();
                    current.push('|');
                } else {
                    current.push('\\');
                    if let Some(&next) = chars.peek() {
                        chars.next();
                        current.push(next);
                    }
                }
            }
            '|' => {
                saw_pipe = true;
                cells.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());

    if !saw_pipe {
        return None;
    }
    // Outer pipes delimit rather than create cells
    if trimmed.starts_with('|') {
        cells.remove(0);
    }
    if trimmed.ends_with('|') && !trimmed.ends_with("\\|") && !cells.is_empty() {
        cells.pop();
    }
    Some(cells)
}

/// A delimiter cell is dashes with optional leading and trailing colons
/// marking the column alignment.
fn parse_delimiter_row(line: &str) -> Option<Vec<Alignment>> {
    let cells = split_row(line)?;
    let mut alignments = Vec::with_capacity(cells.len());
    for cell in &cells {
        alignments.push(parse_delimiter_cell(cell)?);
    }
    if alignments.is_empty() {
        return None;
    }
    Some(alignments)
}

fn parse_delimiter_cell(cell: &str) -> Option<Alignment> {
    let left = cell.starts_with(':');
    let right = cell.ends_with(':') && cell.len() > left as usize;
    let dashes = &cell[left as usize..cell.len() - right as usize];
    if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
        return None;
    }
    Some(match (left, right) {
        (true, true) => Alignment::Center,
        (true, false) => Alignment::Left,
        (false, true) => Alignment::Right,
        (false, false) => Alignment::None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;

    fn open(lines: &[&str]) -> Option<BlockMatch> {
        let parser = Parser::new(Options::NONE);
        TableExtension.try_open_block(lines, &parser)
    }

    #[test]
    fn test_split_row_handles_outer_pipes_and_escapes() {
        assert_eq!(
            split_row("| a | b |").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(
            split_row("a | b \\| c").unwrap(),
            vec!["a".to_string(), "b | c".to_string()]
        );
        assert!(split_row("no pipes here").is_none());
    }

    #[test]
    fn test_delimiter_row_alignments() {
        assert_eq!(
            parse_delimiter_row("| :-- | :-: | --: | --- |").unwrap(),
            vec![
                Alignment::Left,
                Alignment::Center,
                Alignment::Right,
                Alignment::None
            ]
        );
        assert!(parse_delimiter_row("| abc | --- |").is_none());
    }

    #[test]
    fn test_basic_table() {
        let m = open(&["| a | b |", "| - | - |", "| 1 | 2 |", "tail | row"]).unwrap();
        assert_eq!(m.lines_consumed, 4);
        let Node::Table {
            alignments,
            children,
        } = &m.node
        else {
            panic!("expected table");
        };
        assert_eq!(alignments.len(), 2);
        assert_eq!(children.len(), 3);
        let Node::TableRow(cells) = &children[0] else {
            panic!("expected row");
        };
        assert_eq!(
            cells[0],
            Node::TableCell {
                is_header: true,
                children: vec![Node::Text("a".to_string())],
            }
        );
    }

    #[test]
    fn test_column_count_mismatch_is_not_a_table() {
        assert!(open(&["| a | b |", "| - |"]).is_none());
    }

    #[test]
    fn test_short_rows_padded_and_long_rows_truncated() {
        let m = open(&["| a | b |", "| - | - |", "| only |", "| 1 | 2 | 3 |"]).unwrap();
        let Node::Table { children, .. } = &m.node else {
            panic!("expected table");
        };
        let Node::TableRow(short) = &children[1] else {
            panic!("expected row");
        };
        assert_eq!(short.len(), 2);
        assert_eq!(
            short[1],
            Node::TableCell {
                is_header: false,
                children: vec![],
            }
        );
        let Node::TableRow(long) = &children[2] else {
            panic!("expected row");
        };
        assert_eq!(long.len(), 2);
    }

    #[test]
    fn test_blank_line_ends_table() {
        let m = open(&["| a |", "| - |", "| 1 |", "", "| 2 |"]).unwrap();
        assert_eq!(m.lines_consumed, 3);
    }
}
