use crate::error::Result;
use regex::Regex;

/// One `<tr>`: the text of its `<td>` cells, in order. Header cells (`<th>`)
/// are not collected.
pub type HtmlRow = Vec<String>;

/// Extracts table cell text from an HTML page without building a DOM.
///
/// Nested tables are not supported; the knowledge-base pages have none.
pub struct TableParser {
    table: Regex,
    row: Regex,
    cell: Regex,
    tag: Regex,
    space: Regex,
}

impl TableParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            table: Regex::new(r"(?is)<table\b[^>]*>(.*?)</table\s*>")?,
            row: Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>")?,
            cell: Regex::new(r"(?is)<td\b[^>]*>(.*?)</td\s*>")?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
            space: Regex::new(r"\s+")?,
        })
    }

    /// Every table in document order, each as its rows in document order.
    pub fn tables(&self, html: &str) -> Vec<Vec<HtmlRow>> {
        self.table
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .map(|body| self.rows(body.as_str()))
            .collect()
    }

    fn rows(&self, table: &str) -> Vec<HtmlRow> {
        self.row
            .captures_iter(table)
            .filter_map(|caps| caps.get(1))
            .map(|row| {
                self.cell
                    .captures_iter(row.as_str())
                    .filter_map(|caps| caps.get(1))
                    .map(|cell| self.text(cell.as_str()))
                    .collect()
            })
            .collect()
    }

    fn text(&self, fragment: &str) -> String {
        let stripped = self.tag.replace_all(fragment, " ");
        let decoded = decode_entities(&stripped);
        self.space.replace_all(decoded.trim(), " ").into_owned()
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|ch| (ch, end)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" | "#160" => Some(' '),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}
