//! Journal page extraction.
//!
//! This is the only place that knows the portal's markup. A layout change on
//! the portal should touch this file and nothing else.
//!
//! # Page Layout
//!
//! ```text
//! <input id="datum" value="2021-05-21">
//! <div class="notebookscroller">
//!   <h3>Algemeen</h3><div>sentence<br>sentence</div>
//!   <h3>Persoonlijk</h3><div>sentence</div>
//!   <table><tr><td>10:00</td><td>…</td><td>activity</td></tr></table>
//! </div>
//! <div class="gallery"><img src="foto.php?id=…"></div>
//! ```
//!
//! When nothing has been published yet the notebook holds a single
//! `<h3>Nog geen schriftje</h3>`.

use crate::models::{Activity, Journal};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use tracing::{debug, info, instrument};

const NO_JOURNAL_LABEL: &str = "Nog geen schriftje";
const GENERAL_LABEL: &str = "Algemeen";
const PERSONAL_LABEL: &str = "Persoonlijk";

const TIME_COLUMN: usize = 0;
const ACTIVITY_COLUMN: usize = 2;

static DATE: Lazy<Selector> = Lazy::new(|| selector("#datum"));
static NOTEBOOK: Lazy<Selector> = Lazy::new(|| selector("div.notebookscroller"));
static HEADER: Lazy<Selector> = Lazy::new(|| selector("h3"));
static TABLE: Lazy<Selector> = Lazy::new(|| selector("table"));
static ROW: Lazy<Selector> = Lazy::new(|| selector("tr"));
static CELL: Lazy<Selector> = Lazy::new(|| selector("td"));
static GALLERY: Lazy<Selector> = Lazy::new(|| selector("div.gallery"));
static IMAGE: Lazy<Selector> = Lazy::new(|| selector("img"));
static JOURNAL_CHOICE: Lazy<Selector> = Lazy::new(|| selector("#get-schriftje"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css}: {e}"))
}

/// A required part of the page is missing or malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("element `{0}` not found")]
    MissingElement(&'static str),
    #[error("element `{element}` has no `{attribute}` attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("activity row {row} has {cells} cells, expected at least {expected}")]
    MalformedActivityRow {
        row: usize,
        cells: usize,
        expected: usize,
    },
}

/// Result of looking at one journal page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The portal has not published anything for this date yet.
    NoJournalToday { date: String },
    Journal(Journal),
}

/// Parse one journal page into a [`Journal`].
///
/// # Errors
///
/// Returns an [`ExtractError`] when the date field, the notebook, a section
/// body, an image `src`, or an activity column is missing. Absent activity
/// tables and galleries are fine.
#[instrument(level = "info", skip_all, fields(bytes = html.len()))]
pub fn extract_journal(html: &str) -> Result<Extraction, ExtractError> {
    let document = Html::parse_document(html);

    let date = document
        .select(&DATE)
        .next()
        .ok_or(ExtractError::MissingElement("#datum"))?
        .value()
        .attr("value")
        .ok_or(ExtractError::MissingAttribute {
            element: "#datum",
            attribute: "value",
        })?
        .trim()
        .to_string();
    info!(%date, "Found journal date");

    let notebook = document
        .select(&NOTEBOOK)
        .next()
        .ok_or(ExtractError::MissingElement("div.notebookscroller"))?;

    let headers: Vec<ElementRef> = notebook.select(&HEADER).collect();
    if headers.iter().any(|h| label(h) == NO_JOURNAL_LABEL) {
        info!(%date, "No journal published yet");
        return Ok(Extraction::NoJournalToday { date });
    }

    let mut journal = Journal {
        date,
        ..Journal::default()
    };

    for header in &headers {
        let (target, name) = match label(header).as_str() {
            GENERAL_LABEL => (&mut journal.general, GENERAL_LABEL),
            PERSONAL_LABEL => (&mut journal.personal, PERSONAL_LABEL),
            _ => continue,
        };
        let lines = section_lines(header);
        debug!(section = name, lines = lines.len(), "Read section");
        target.extend(lines);
    }

    if let Some(table) = notebook.select(&TABLE).next() {
        journal.activities = activity_rows(table)?;
    } else {
        debug!("No activity table");
    }

    if let Some(gallery) = document.select(&GALLERY).next() {
        journal.photos = gallery
            .select(&IMAGE)
            .map(|img| {
                img.value()
                    .attr("src")
                    .map(str::to_string)
                    .ok_or(ExtractError::MissingAttribute {
                        element: "img",
                        attribute: "src",
                    })
            })
            .collect::<Result<_, _>>()?;
    } else {
        debug!("No gallery");
    }

    info!(
        general = journal.general.len(),
        personal = journal.personal.len(),
        activities = journal.activities.len(),
        photos = journal.photos.len(),
        "Extracted journal"
    );
    Ok(Extraction::Journal(journal))
}

/// Read the journal primary key from the journal choice page.
pub fn extract_journal_key(html: &str) -> Result<String, ExtractError> {
    let document = Html::parse_document(html);
    let element = document
        .select(&JOURNAL_CHOICE)
        .next()
        .ok_or(ExtractError::MissingElement("#get-schriftje"))?;
    element
        .value()
        .attr("data-pk")
        .map(str::to_string)
        .ok_or(ExtractError::MissingAttribute {
            element: "#get-schriftje",
            attribute: "data-pk",
        })
}

fn label(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Lines of the section under `header`.
///
/// The body is the next non-blank sibling node: bare text is one line, an
/// element yields its stripped strings. Running into another header or the
/// activity table first means the section is empty.
fn section_lines(header: &ElementRef) -> Vec<String> {
    for node in header.next_siblings() {
        match node.value() {
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    return vec![text.to_string()];
                }
            }
            Node::Element(element) => {
                if matches!(element.name(), "h3" | "table") {
                    return Vec::new();
                }
                return ElementRef::wrap(node)
                    .map(|body| stripped_strings(body).map(str::to_string).collect())
                    .unwrap_or_default();
            }
            _ => {}
        }
    }
    Vec::new()
}

/// Non-empty trimmed text nodes below `element`, in document order.
fn stripped_strings<'a>(element: ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    element.text().map(str::trim).filter(|s| !s.is_empty())
}

fn activity_rows(table: ElementRef) -> Result<Vec<Activity>, ExtractError> {
    table
        .select(&ROW)
        .enumerate()
        .map(|(row, tr)| {
            let cells: Vec<ElementRef> = tr.select(&CELL).collect();
            if cells.len() <= ACTIVITY_COLUMN {
                return Err(ExtractError::MalformedActivityRow {
                    row,
                    cells: cells.len(),
                    expected: ACTIVITY_COLUMN + 1,
                });
            }
            let activity = Activity {
                time: label(&cells[TIME_COLUMN]),
                label: label(&cells[ACTIVITY_COLUMN]),
            };
            debug!(time = %activity.time, activity = %activity.label, "Activity row");
            Ok(activity)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PAGE: &str = r#"
        <html><body>
        <input type="hidden" id="datum" value="2021-05-21">
        <div class="notebookscroller">
            <h3>Algemeen</h3>
            <div>We went outside. <br> It was sunny.<p>  </p><p>Lunch was pasta.</p></div>
            <h3>Persoonlijk</h3>
            <div><p>Slept for two hours.</p></div>
            <table>
                <tr><td>10:00</td><td><img src="icon.png"></td><td>Fruit</td></tr>
                <tr><td>12:30</td><td></td><td>Nap</td></tr>
            </table>
        </div>
        <div class="gallery">
            <img src="foto.php?id=1&t=abc">
            <img src="foto.php?id=2&t=def">
        </div>
        </body></html>
    "#;

    fn journal(html: &str) -> Journal {
        match extract_journal(html).unwrap() {
            Extraction::Journal(j) => j,
            other => panic!("expected journal, got {other:?}"),
        }
    }

    #[test]
    fn test_extracts_all_sections() {
        let j = journal(FULL_PAGE);
        assert_eq!(j.date, "2021-05-21");
        assert_eq!(
            j.general,
            vec!["We went outside.", "It was sunny.", "Lunch was pasta."]
        );
        assert_eq!(j.personal, vec!["Slept for two hours."]);
        assert_eq!(
            j.activities,
            vec![
                Activity {
                    time: "10:00".to_string(),
                    label: "Fruit".to_string()
                },
                Activity {
                    time: "12:30".to_string(),
                    label: "Nap".to_string()
                },
            ]
        );
        assert_eq!(j.photos, vec!["foto.php?id=1&t=abc", "foto.php?id=2&t=def"]);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        assert_eq!(
            extract_journal(FULL_PAGE).unwrap(),
            extract_journal(FULL_PAGE).unwrap()
        );
    }

    #[test]
    fn test_no_journal_today() {
        let html = r#"<input id="datum" value="2021-05-22">
            <div class="notebookscroller"><h3>Nog geen schriftje</h3></div>"#;
        assert_eq!(
            extract_journal(html).unwrap(),
            Extraction::NoJournalToday {
                date: "2021-05-22".to_string()
            }
        );
    }

    #[test]
    fn test_optional_sections_absent() {
        let html = r#"<input id="datum" value="D">
            <div class="notebookscroller"><h3>Algemeen</h3><div>A. </div></div>"#;
        let j = journal(html);
        assert_eq!(j.general, vec!["A."]);
        assert!(j.activities.is_empty());
        assert!(j.photos.is_empty());
    }

    #[test]
    fn test_repeated_header_continues_category() {
        let html = r#"<input id="datum" value="D">
            <div class="notebookscroller">
            <h3>Algemeen</h3><div>A.</div>
            <h3>Algemeen</h3><div>B.</div>
            </div>"#;
        assert_eq!(journal(html).general, vec!["A.", "B."]);
    }

    #[test]
    fn test_empty_section_before_next_header() {
        let html = r#"<input id="datum" value="D">
            <div class="notebookscroller">
            <h3>Algemeen</h3>
            <h3>Persoonlijk</h3><div>Slept.</div>
            </div>"#;
        let j = journal(html);
        assert!(j.general.is_empty());
        assert_eq!(j.personal, vec!["Slept."]);
    }

    #[test]
    fn test_bare_text_section_before_table() {
        let html = r#"<input id="datum" value="D">
            <div class="notebookscroller">
            <h3>Algemeen</h3>We went outside.
            <table><tr><td>10:00</td><td></td><td>Fruit</td></tr></table>
            </div>"#;
        let j = journal(html);
        assert_eq!(j.general, vec!["We went outside."]);
        assert_eq!(
            j.activities,
            vec![Activity {
                time: "10:00".to_string(),
                label: "Fruit".to_string()
            }]
        );
    }

    #[test]
    fn test_trailing_header_is_empty_section() {
        let html = r#"<input id="datum" value="D">
            <div class="notebookscroller"><h3>Algemeen</h3><div>A.</div><h3>Persoonlijk</h3></div>"#;
        let j = journal(html);
        assert_eq!(j.general, vec!["A."]);
        assert!(j.personal.is_empty());
    }

    #[test]
    fn test_unknown_headers_ignored() {
        let html = r#"<input id="datum" value="D">
            <div class="notebookscroller"><h3>Menu</h3><div>Soup</div></div>"#;
        let j = journal(html);
        assert!(j.general.is_empty());
        assert!(j.personal.is_empty());
    }

    #[test]
    fn test_short_activity_row_is_error() {
        let html = r#"<input id="datum" value="D">
            <div class="notebookscroller">
            <table><tr><td>10:00</td><td>x</td></tr></table>
            </div>"#;
        assert_eq!(
            extract_journal(html).unwrap_err(),
            ExtractError::MalformedActivityRow {
                row: 0,
                cells: 2,
                expected: 3
            }
        );
    }

    #[test]
    fn test_missing_date_is_error() {
        let html = r#"<div class="notebookscroller"></div>"#;
        assert_eq!(
            extract_journal(html).unwrap_err(),
            ExtractError::MissingElement("#datum")
        );
    }

    #[test]
    fn test_missing_notebook_is_error() {
        let html = r#"<input id="datum" value="D">"#;
        assert_eq!(
            extract_journal(html).unwrap_err(),
            ExtractError::MissingElement("div.notebookscroller")
        );
    }

    #[test]
    fn test_image_without_src_is_error() {
        let html = r#"<input id="datum" value="D">
            <div class="notebookscroller"></div>
            <div class="gallery"><img alt="x"></div>"#;
        assert!(matches!(
            extract_journal(html).unwrap_err(),
            ExtractError::MissingAttribute { element: "img", .. }
        ));
    }

    #[test]
    fn test_journal_key() {
        let html = r##"<a id="get-schriftje" data-pk="4711" href="#">Schrift</a>"##;
        assert_eq!(extract_journal_key(html).unwrap(), "4711");
        assert!(extract_journal_key("<a id='other'></a>").is_err());
    }
}
