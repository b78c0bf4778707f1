//! Document loaders: turn a file into plain text.
//!
//! PDF, Excel and XML parsing are delegated to `pdf-extract`, `calamine` and
//! `roxmltree`; Markdown and HTML are cleaned with small scanners.

use calamine::{open_workbook_auto, Data, Reader};
use docrag_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    Xml,
    Excel,
    Markdown,
    Html,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from the (case-insensitive) file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("xml") => Self::Xml,
            Some("xls") | Some("xlsx") | Some("xlsm") | Some("ods") => Self::Excel,
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("txt") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xml => "xml",
            Self::Excel => "excel",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Parse a source file and extract clean text.
pub fn parse_file(path: &Path) -> AppResult<String> {
    let content_type = ContentType::from_path(path);

    let text = match content_type {
        ContentType::Pdf => format_pages(&extract_pdf_pages(path)?),
        ContentType::Excel => excel_to_text(path)?,
        ContentType::Xml => xml_to_text(&read_text(path)?)?,
        ContentType::Markdown => clean_markdown(&read_text(path)?),
        ContentType::Html => clean_html(&read_text(path)?),
        ContentType::PlainText => read_text(path)?,
        ContentType::Unknown => {
            return Err(AppError::Knowledge(format!(
                "Unsupported file type: {:?}",
                path
            )))
        }
    };

    Ok(text)
}

fn read_text(path: &Path) -> AppResult<String> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    if bytes.contains(&0) {
        return Err(AppError::Knowledge(format!(
            "Binary content in text file: {:?}",
            path
        )));
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Extract the text of every page of a PDF.
///
/// `pdf-extract` panics on some malformed documents; the panic is caught
/// and reported as an error for this file only.
pub fn extract_pdf_pages(path: &Path) -> AppResult<Vec<String>> {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_by_pages(path)
    }));

    match result {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(AppError::Knowledge(format!(
            "Failed to extract PDF {:?}: {}",
            path, e
        ))),
        Err(panic_payload) => {
            let panic_msg = if let Some(s) = panic_payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            Err(AppError::Knowledge(format!(
                "PDF extractor panicked on {:?}: {}",
                path, panic_msg
            )))
        }
    }
}

/// Join page texts with `[PAGE n]` markers, skipping blank pages.
pub fn format_pages(pages: &[String]) -> String {
    pages
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| format!("[PAGE {}]\n{}", i + 1, text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render every worksheet as tab-separated rows under a `[SHEET name]` line.
pub fn excel_to_text(path: &Path) -> AppResult<String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open workbook {:?}: {}", path, e)))?;

    let mut sections = Vec::new();

    for sheet_name in workbook.sheet_names().to_vec() {
        let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
            AppError::Knowledge(format!("Failed to read worksheet '{}': {}", sheet_name, e))
        })?;

        let rows: Vec<String> = range
            .rows()
            .map(|row| {
                row.iter()
                    .map(excel_cell_to_string)
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .filter(|line| !line.trim().is_empty())
            .collect();

        if !rows.is_empty() {
            sections.push(format!("[SHEET {}]\n{}", sheet_name, rows.join("\n")));
        }
    }

    Ok(sections.join("\n\n"))
}

fn excel_cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{:?}", e),
    }
}

/// Flatten XML into its text nodes, one trimmed non-empty node per line.
///
/// Entity and character references are decoded; attribute values, comments
/// and processing instructions are dropped. Malformed XML is an error.
pub fn xml_to_text(xml: &str) -> AppResult<String> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(xml, options)
        .map_err(|e| AppError::Knowledge(format!("Invalid XML: {}", e)))?;

    let lines: Vec<&str> = doc
        .descendants()
        .filter(|node| node.is_text())
        .filter_map(|node| node.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect();

    Ok(lines.join("\n"))
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Clean markdown by removing heading markers, fences and rules.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Strip tags, scripts and styles from HTML and collapse whitespace.
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    for (i, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;
            let rest = &text[i..];

            if starts_with_ignore_case(rest, "<script") {
                in_script = true;
            } else if starts_with_ignore_case(rest, "</script") {
                in_script = false;
            } else if starts_with_ignore_case(rest, "<style") {
                in_style = true;
            } else if starts_with_ignore_case(rest, "</style") {
                in_style = false;
            }
        } else if ch == '>' {
            in_tag = false;
            result.push(' ');
        } else if !in_tag && !in_script && !in_style {
            result.push(ch);
        }
    }

    decode_entities(&result.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(ContentType::from_path(Path::new("a.PDF")), ContentType::Pdf);
        assert_eq!(ContentType::from_path(Path::new("a.xlsx")), ContentType::Excel);
        assert_eq!(ContentType::from_path(Path::new("a.xls")), ContentType::Excel);
        assert_eq!(ContentType::from_path(Path::new("a.xml")), ContentType::Xml);
        assert_eq!(ContentType::from_path(Path::new("a.md")), ContentType::Markdown);
        assert_eq!(ContentType::from_path(Path::new("a.txt")), ContentType::PlainText);
        assert_eq!(ContentType::from_path(Path::new("a.rs")), ContentType::Unknown);
        assert!(!ContentType::Unknown.is_supported());
    }

    #[test]
    fn test_xml_to_text() {
        let xml = r#"<?xml version="1.0"?>
<report>
  <!-- generated -->
  <title>Annual &amp; Quarterly</title>
  <item id="1">  Revenue  </item>
  <empty/>
  <note><![CDATA[a < b]]></note>
</report>"#;

        assert_eq!(
            xml_to_text(xml).unwrap(),
            "Annual & Quarterly\nRevenue\na < b"
        );
    }

    #[test]
    fn test_xml_to_text_decodes_character_references() {
        assert_eq!(
            xml_to_text("<a>caf&#233; &#x41;PI</a>").unwrap(),
            "café API"
        );
    }

    #[test]
    fn test_xml_to_text_ignores_attribute_values() {
        assert_eq!(
            xml_to_text(r#"<a title="x > y">body</a>"#).unwrap(),
            "body"
        );
    }

    #[test]
    fn test_xml_to_text_malformed_is_an_error() {
        assert!(matches!(
            xml_to_text("<a>open <b"),
            Err(AppError::Knowledge(_))
        ));
    }

    #[test]
    fn test_format_pages_skips_blank_pages() {
        let pages = vec!["first".to_string(), "   ".to_string(), "third\n".to_string()];
        assert_eq!(format_pages(&pages), "[PAGE 1]\nfirst\n\n[PAGE 3]\nthird");
    }

    #[test]
    fn test_clean_markdown() {
        let input = "# Header\n\nSome text\n\n```rust\ncode\n```\n\nMore text";
        let output = clean_markdown(input);
        assert!(output.contains("Header"));
        assert!(output.contains("More text"));
        assert!(!output.contains("```"));
    }

    #[test]
    fn test_clean_html() {
        let input = "<html><head><style>p{}</style></head><body><p>Hello <b>world</b></p><script>x()</script></body></html>";
        assert_eq!(clean_html(input), "Hello world");
    }

    #[test]
    fn test_clean_html_non_ascii() {
        assert_eq!(clean_html("<p>Şirket İstanbul</p>"), "Şirket İstanbul");
    }

    #[test]
    fn test_corrupt_pdf_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.pdf");
        fs::write(&path, b"this is not a pdf").unwrap();

        assert!(parse_file(&path).is_err());
    }

    #[test]
    fn test_corrupt_excel_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.xlsx");
        fs::write(&path, b"not a zip archive").unwrap();

        assert!(parse_file(&path).is_err());
    }

    #[test]
    fn test_parse_plain_and_xml_files() {
        let temp = TempDir::new().unwrap();
        let txt = temp.path().join("notes.txt");
        let xml = temp.path().join("data.xml");
        fs::write(&txt, "plain notes").unwrap();
        fs::write(&xml, "<a><b>one</b><c>two</c></a>").unwrap();

        assert_eq!(parse_file(&txt).unwrap(), "plain notes");
        assert_eq!(parse_file(&xml).unwrap(), "one\ntwo");
    }
}
