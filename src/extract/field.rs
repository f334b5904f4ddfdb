//! Field-level extraction helpers
//!
//! Every function here is pure and treats a missing fragment as absence rather
//! than an error. The one exception is [`rating_rank`], which rejects a label
//! it does not know instead of guessing a rank.

use super::ExtractError;
use crate::record::Location;
use crate::schema::CompiledCell;
use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;

/// Star labels in rank order; the rank is the position plus one
const RATING_LABELS: [&str; 4] = ["one", "two", "three", "four"];

/// Returns the first non-blank direct text node of `el`, whitespace-collapsed
pub fn first_text(el: ElementRef<'_>) -> Option<String> {
    direct_text(el).map(collapse).find(|s| !s.is_empty())
}

/// Returns the direct text nodes of `el` as lines
///
/// Text separated by `<br>` arrives as separate nodes. Runs of `\r`, `\n`,
/// `\t` and non-breaking spaces are collapsed and blank lines are dropped.
pub fn text_lines(el: ElementRef<'_>) -> Vec<String> {
    direct_text(el)
        .map(collapse)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Returns an attribute value of `el`
pub fn attr<'a>(el: ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value().attr(name)
}

/// Returns the rows of a table in document order
///
/// Looks through `thead`, `tbody` and `tfoot`; the HTML parser adds a `tbody`
/// even when the markup has none.
pub fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child_elements(child, "tr"));
            }
            _ => {}
        }
    }
    rows
}

/// Returns the `td` at a zero-based row and column
pub fn td(table: ElementRef<'_>, row: usize, column: usize) -> Option<ElementRef<'_>> {
    let tr = table_rows(table).into_iter().nth(row)?;
    child_elements(tr, "td").nth(column)
}

/// Locates a cell and, when the locator has one, the element inside it
pub fn cell<'a>(table: ElementRef<'a>, locator: &CompiledCell) -> Option<ElementRef<'a>> {
    let found = td(table, locator.row, locator.column)?;
    match &locator.inner {
        Some(inner) => found.select(inner).next(),
        None => Some(found),
    }
}

/// Parses a 0 to 100 score
pub fn parse_score(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Removes thousands separators and dollar signs
pub fn strip_currency(text: &str) -> String {
    text.replace(|c: char| c == ',' || c == '$', "").trim().to_string()
}

/// Parses a financial table cell
///
/// # Returns
///
/// * `Some(0)` - The cell is missing, empty, or a non-breaking-space placeholder
/// * `Some(n)` - The cell holds an amount such as `$12,345`, `-500` or `(500)`
/// * `None` - The cell holds text that is not an amount
pub fn parse_financial_cell(text: Option<&str>) -> Option<i64> {
    let Some(raw) = text else {
        return Some(0);
    };

    let cleaned = strip_currency(raw);
    if cleaned.is_empty() {
        return Some(0);
    }

    let (negative, digits) = if let Some(inner) = cleaned
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        (true, inner.trim())
    } else if let Some(rest) = cleaned.strip_prefix('-') {
        (true, rest.trim())
    } else {
        (false, cleaned.as_str())
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Maps a star label to its rank
///
/// The first word of the label is looked up case-insensitively, so
/// "Four stars" is 4. No label means the category is unrated and gives 0.
pub fn rating_rank(label: Option<&str>) -> Result<u8, ExtractError> {
    let Some(label) = label else {
        return Ok(0);
    };

    let word = label
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    RATING_LABELS
        .iter()
        .position(|known| *known == word)
        .map(|i| i as u8 + 1)
        .ok_or_else(|| ExtractError::UnknownRatingLabel(label.trim().to_string()))
}

static LOCATION_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z]+\s?,\s[A-Z]{2}\s\d{5}").expect("valid location pattern")
});

/// Returns true if the line contains the "City, ST 12345" shape
pub fn is_location_line(line: &str) -> bool {
    LOCATION_SHAPE.is_match(&collapse(line))
}

/// Parses a "City, ST ZIP" line
///
/// The line must contain the address shape somewhere, and must split into
/// exactly three tokens: everything before the single comma, then the state
/// and the zip.
pub fn parse_location(line: &str) -> Option<Location> {
    let line = collapse(line);
    if !LOCATION_SHAPE.is_match(&line) {
        return None;
    }

    let (city, rest) = line.split_once(',')?;
    if rest.contains(',') {
        return None;
    }

    let city = city.trim();
    let mut tokens = rest.split_whitespace();
    let (state, zip) = (tokens.next()?, tokens.next()?);
    if city.is_empty() || tokens.next().is_some() {
        return None;
    }

    Some(Location {
        city: city.to_string(),
        state: state.to_string(),
        zip: zip.to_string(),
    })
}

fn direct_text<'a>(el: ElementRef<'a>) -> impl Iterator<Item = &'a str> + 'a {
    el.children()
        .filter_map(|node| node.value().as_text())
        .map(|text| &**text)
}

fn child_elements<'a>(el: ElementRef<'a>, name: &'a str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == name)
}

/// Collapses `\r\n\t`, non-breaking spaces and repeated spaces into single spaces
fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first<'a>(doc: &'a Html, selector: &str) -> ElementRef<'a> {
        doc.select(&Selector::parse(selector).unwrap()).next().unwrap()
    }

    #[test]
    fn test_first_text_skips_blank_nodes() {
        let doc = Html::parse_fragment("<h1>\n  <span>x</span>  Red Cross\n</h1>");
        assert_eq!(first_text(first(&doc, "h1")), Some("Red Cross".to_string()));

        let doc = Html::parse_fragment("<h1><span>only nested</span></h1>");
        assert_eq!(first_text(first(&doc, "h1")), None);
    }

    #[test]
    fn test_text_lines_split_on_br() {
        let doc = Html::parse_fragment(
            "<p>\r\n\t123 Main St<br>\n\tSpringfield,\u{a0}IL 62701\r\n<br>\u{a0}<br></p>",
        );
        assert_eq!(
            text_lines(first(&doc, "p")),
            vec!["123 Main St", "Springfield, IL 62701"]
        );
    }

    #[test]
    fn test_table_rows_look_through_tbody() {
        let doc = Html::parse_fragment(
            "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>",
        );
        let table = first(&doc, "table");
        assert_eq!(table_rows(table).len(), 2);
        assert_eq!(first_text(td(table, 1, 1).unwrap()), Some("d".to_string()));
        assert!(td(table, 2, 0).is_none());
        assert!(td(table, 0, 5).is_none());
    }

    #[test]
    fn test_cell_with_inner_selector() {
        let doc = Html::parse_fragment(
            "<table><tr><th>h</th></tr><tr><td><span>$250,000</span></td></tr></table>",
        );
        let locator = CompiledCell {
            row: 1,
            column: 0,
            inner: Some(Selector::parse("span").unwrap()),
        };
        let span = cell(first(&doc, "table"), &locator).unwrap();
        assert_eq!(span.value().name(), "span");
        assert_eq!(strip_currency(&first_text(span).unwrap()), "250000");
    }

    #[test]
    fn test_attr() {
        let doc = Html::parse_fragment(r#"<img src="/img/checked.gif">"#);
        assert_eq!(attr(first(&doc, "img"), "src"), Some("/img/checked.gif"));
        assert_eq!(attr(first(&doc, "img"), "alt"), None);
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score(" 91.54 "), Some(91.54));
        assert_eq!(parse_score("100"), Some(100.0));
        assert_eq!(parse_score("n/a"), None);
        assert_eq!(parse_score("NaN"), None);
    }

    #[test]
    fn test_financial_placeholders_are_zero() {
        assert_eq!(parse_financial_cell(None), Some(0));
        assert_eq!(parse_financial_cell(Some("")), Some(0));
        assert_eq!(parse_financial_cell(Some("\u{a0}")), Some(0));
        assert_eq!(parse_financial_cell(Some("  ")), Some(0));
    }

    #[test]
    fn test_financial_amounts() {
        assert_eq!(parse_financial_cell(Some("$12,345")), Some(12_345));
        assert_eq!(parse_financial_cell(Some("1,234,567")), Some(1_234_567));
        assert_eq!(parse_financial_cell(Some("-$5,000")), Some(-5_000));
        assert_eq!(parse_financial_cell(Some("($5,000)")), Some(-5_000));
    }

    #[test]
    fn test_malformed_financial_is_absent() {
        assert_eq!(parse_financial_cell(Some("N/A")), None);
        assert_eq!(parse_financial_cell(Some("$12.5k")), None);
        assert_eq!(parse_financial_cell(Some("-")), None);
        assert_eq!(parse_financial_cell(Some("99999999999999999999")), None);
    }

    #[test]
    fn test_rating_labels() {
        assert_eq!(rating_rank(None).unwrap(), 0);
        assert_eq!(rating_rank(Some("one star")).unwrap(), 1);
        assert_eq!(rating_rank(Some("two stars")).unwrap(), 2);
        assert_eq!(rating_rank(Some(" three stars")).unwrap(), 3);
        assert_eq!(rating_rank(Some("Four")).unwrap(), 4);
    }

    #[test]
    fn test_unknown_rating_label_rejected() {
        assert!(matches!(
            rating_rank(Some("five stars")),
            Err(ExtractError::UnknownRatingLabel(label)) if label == "five stars"
        ));
        assert!(rating_rank(Some("")).is_err());
    }

    #[test]
    fn test_parse_location() {
        let loc = parse_location("Springfield, IL 62701").unwrap();
        assert_eq!(loc.city, "Springfield");
        assert_eq!(loc.state, "IL");
        assert_eq!(loc.zip, "62701");

        let loc = parse_location("New York,\u{a0}NY\u{a0}10001-2345").unwrap();
        assert_eq!(loc.city, "New York");
        assert_eq!(loc.zip, "10001-2345");
    }

    #[test]
    fn test_parse_location_rejects_other_shapes() {
        assert!(parse_location("c/o Registered Agent").is_none());
        assert!(parse_location("123 Main St").is_none());
        assert!(parse_location("Springfield, Illinois 62701").is_none());
        assert!(parse_location("Suite 4, Springfield, IL 62701").is_none());
        assert!(parse_location("Springfield, IL 62701 USA").is_none());
    }

    #[test]
    fn test_location_shape_is_separate_from_token_count() {
        assert!(is_location_line("Suite 4, Springfield, IL 62701"));
        assert!(is_location_line("Springfield, IL 62701 USA"));
        assert!(!is_location_line("c/o Registered Agent"));
        assert!(!is_location_line("123 Main St"));
    }
}
