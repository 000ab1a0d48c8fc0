//! Quote-aware scanner for the idiom dataset.
//!
//! Rows cannot be found by splitting on newlines: definitions routinely quote
//! classical sources across several lines. The scanner walks the text one
//! character at a time and tracks whether it is inside a quoted field.

/// Parse delimited text into rows of trimmed fields.
///
/// - `,` separates fields and `\n` separates rows, except inside quotes.
/// - `""` inside a quoted field is a literal quote.
/// - `\r` is dropped everywhere.
/// - Rows whose fields are all empty are skipped.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                row.push(field.trim().to_string());
                field.clear();
            }
            '\n' if !in_quotes => {
                if !field.is_empty() || !row.is_empty() {
                    row.push(field.trim().to_string());
                    field.clear();
                    push_row(&mut rows, std::mem::take(&mut row));
                }
            }
            '\r' => {}
            other => field.push(other),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field.trim().to_string());
        push_row(&mut rows, row);
    }

    rows
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    if row.iter().any(|f| !f.is_empty()) {
        rows.push(row);
    }
}

/// Render rows as delimited text, quoting fields that need it.
pub fn write_csv<R, F>(rows: R) -> String
where
    R: IntoIterator,
    R::Item: IntoIterator<Item = F>,
    F: AsRef<str>,
{
    let mut out = String::new();
    for row in rows {
        let mut first = true;
        for field in row {
            if !first {
                out.push(',');
            }
            first = false;
            let field = field.as_ref();
            if field.contains([',', '"', '\n', '\r']) {
                out.push('"');
                out.push_str(&field.replace('"', "\"\""));
                out.push('"');
            } else {
                out.push_str(field);
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_rows() {
        let rows = parse_csv("a,b,c\n1,2,3\n");
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn quoted_comma_and_newline_stay_in_one_field() {
        let text = "id,idiom,definition\n1,一石二鳥,\"比喻做一件事，\n得到兩種收穫\"\n";
        let rows = parse_csv(text);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].len(), 3);
        assert_eq!(rows[1][2], "比喻做一件事，\n得到兩種收穫");
    }

    #[test]
    fn ascii_comma_inside_quotes() {
        let rows = parse_csv("1,\"one, two\",3");
        assert_eq!(rows, vec![vec!["1", "one, two", "3"]]);
    }

    #[test]
    fn doubled_quote_is_literal() {
        let rows = parse_csv("1,\"He said \"\"hi\"\"\",3\n");
        assert_eq!(rows[0][1], "He said \"hi\"");
    }

    #[test]
    fn carriage_returns_dropped() {
        let rows = parse_csv("a,b\r\nc,d\r\n");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn blank_rows_skipped() {
        let rows = parse_csv("a,b\n\n,\n c , d \n");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn last_row_without_newline() {
        let rows = parse_csv("a,b\nc,d");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["c", "d"]);
    }

    #[test]
    fn trailing_empty_field_kept() {
        let rows = parse_csv("a,b,\n");
        assert_eq!(rows, vec![vec!["a", "b", ""]]);
    }

    #[test]
    fn written_rows_parse_back() {
        let rows = vec![
            vec!["編號", "成語", "釋義"],
            vec!["1", "開門見山", "比喻說話、寫文章直截了當，\n談本題。"],
            vec!["2", "說\"好\"", "plain"],
        ];
        let text = write_csv(&rows);
        assert!(text.starts_with("編號,成語,釋義\n"));
        assert_eq!(parse_csv(&text), rows);
    }
}
