//! PDF object model: load the cover, append text pages, serialise.
//!
//! Built on `lopdf`. Appended pages are plain text pages: a Courier-Bold
//! running header at the top margin, a blank line, then the body in Courier
//! at a fixed line pitch. Both fonts are standard Type 1 fonts, so nothing
//! is embedded and text must be WinAnsi-encoded (see [`encode_win_ansi`]).
//!
//! Parsing and serialising a document is CPU-bound, so the async helpers run
//! it in `tokio::task::spawn_blocking` to keep runtime workers free.

use crate::config::PageGeometry;
use crate::error::Code2PdfError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Section label for source-code pages.
pub const CODE_LABEL: &str = "File";

/// Section label for program-output pages.
pub const OUTPUT_LABEL: &str = "Program Output";

const BODY_FONT: &str = "F1";
const HEADER_FONT: &str = "F2";

/// Running header for page `page` (1-based) of `total` in a section.
///
/// ```
/// use edgequake_code2pdf::pipeline::render::section_header;
///
/// assert_eq!(section_header("File", "main.py", 1, 2), "File: main.py (page 1 of 2)");
/// assert_eq!(
///     section_header("File", "main.py", 2, 2),
///     "File: main.py (page 2 of 2) (continued)"
/// );
/// ```
pub fn section_header(label: &str, file_name: &str, page: usize, total: usize) -> String {
    let mut header = format!("{label}: {file_name} (page {page} of {total})");
    if page > 1 {
        header.push_str(" (continued)");
    }
    header
}

/// [`section_header`], shortened to at most `max_chars` characters.
///
/// The middle of an overlong file name is replaced with `...` so both its
/// start and its extension stay visible. If even that does not fit, the
/// header is cut at `max_chars`.
///
/// ```
/// use edgequake_code2pdf::pipeline::render::fitted_section_header;
///
/// assert_eq!(
///     fitted_section_header("File", "a_really_long_module_name.py", 1, 1, 30),
///     "File: a_r...e.py (page 1 of 1)"
/// );
/// ```
pub fn fitted_section_header(
    label: &str,
    file_name: &str,
    page: usize,
    total: usize,
    max_chars: usize,
) -> String {
    let full = section_header(label, file_name, page, total);
    let full_len = full.chars().count();
    if full_len <= max_chars {
        return full;
    }

    const ELLIPSIS: &str = "...";
    let name_len = file_name.chars().count();
    let fixed = full_len - name_len;
    let room = max_chars.saturating_sub(fixed);
    if room > ELLIPSIS.len() + 1 {
        let keep = room - ELLIPSIS.len();
        let head = keep / 2;
        let tail = keep - head;
        let start: String = file_name.chars().take(head).collect();
        let end: String = file_name.chars().skip(name_len - tail).collect();
        return section_header(label, &format!("{start}{ELLIPSIS}{end}"), page, total);
    }
    full.chars().take(max_chars).collect()
}

/// Encode text for a simple font using WinAnsiEncoding.
///
/// Latin-1 maps to itself, the typographic characters WinAnsi places in
/// 0x80–0x9F are translated, anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u8,
            _ => win_ansi_extra(c).unwrap_or(b'?'),
        })
        .collect()
}

fn win_ansi_extra(c: char) -> Option<u8> {
    let byte = match c {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '•' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// An empty document with a catalog and an empty page tree.
pub fn new_document() -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Number of pages in the document's page tree.
pub fn page_count(doc: &Document) -> usize {
    doc.get_pages().len()
}

/// Parse a PDF from memory. `path` is only used in error messages.
pub fn load_document(bytes: &[u8], path: &Path) -> Result<Document, Code2PdfError> {
    let doc = Document::load_mem(bytes).map_err(|e| Code2PdfError::CorruptPdf {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    root_pages_id(&doc).map_err(|e| Code2PdfError::CorruptPdf {
        path: path.to_path_buf(),
        detail: format!("missing page tree: {e}"),
    })?;
    Ok(doc)
}

/// Read and parse `path` on the blocking pool.
pub async fn load_cover(path: &Path) -> Result<Document, Code2PdfError> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => Code2PdfError::PermissionDenied {
                path: path.clone(),
            },
            _ => Code2PdfError::CorruptPdf {
                path: path.clone(),
                detail: e.to_string(),
            },
        })?;
        let doc = load_document(&bytes, &path)?;
        debug!("Loaded cover {} ({} pages)", path.display(), page_count(&doc));
        Ok(doc)
    })
    .await
    .map_err(|e| Code2PdfError::Internal(format!("Cover load task panicked: {}", e)))?
}

/// Serialise the document on the blocking pool.
pub async fn serialize_document(mut doc: Document) -> Result<Vec<u8>, Code2PdfError> {
    tokio::task::spawn_blocking(move || {
        doc.compress();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| Code2PdfError::Internal(format!("Failed to serialise PDF: {}", e)))?;
        Ok(bytes)
    })
    .await
    .map_err(|e| Code2PdfError::Internal(format!("Serialise task panicked: {}", e)))?
}

fn root_pages_id(doc: &Document) -> Result<ObjectId, lopdf::Error> {
    let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
    doc.get_dictionary(catalog_id)?.get(b"Pages")?.as_reference()
}

/// Appends text pages to the end of a document's page tree.
///
/// The two fonts and the shared resource dictionary are created once per
/// writer; every page references them.
pub struct PageWriter<'a> {
    doc: &'a mut Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    geometry: PageGeometry,
}

impl<'a> PageWriter<'a> {
    pub fn attach(doc: &'a mut Document, geometry: &PageGeometry) -> Result<Self, Code2PdfError> {
        let pages_id = root_pages_id(doc)?;

        let body_font = doc.add_object(standard_font("Courier"));
        let header_font = doc.add_object(standard_font("Courier-Bold"));
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                BODY_FONT => body_font,
                HEADER_FONT => header_font,
            },
        });

        Ok(Self {
            doc,
            pages_id,
            resources_id,
            geometry: *geometry,
        })
    }

    /// Draw every block as one page of a section. An empty `blocks` slice
    /// still yields a single header-only page. Returns the pages written.
    pub fn write_section(
        &mut self,
        label: &str,
        file_name: &str,
        blocks: &[String],
    ) -> Result<usize, Code2PdfError> {
        let max_chars = self.geometry.header_chars_per_line();
        if blocks.is_empty() {
            let header = fitted_section_header(label, file_name, 1, 1, max_chars);
            self.write_page(&header, "")?;
            return Ok(1);
        }
        let total = blocks.len();
        for (i, block) in blocks.iter().enumerate() {
            let header = fitted_section_header(label, file_name, i + 1, total, max_chars);
            self.write_page(&header, block)?;
        }
        debug!("{} '{}': {} page(s)", label, file_name, total);
        Ok(total)
    }

    /// Append one page holding `header` and the `\n`-separated `body` lines.
    pub fn write_page(&mut self, header: &str, body: &str) -> Result<ObjectId, Code2PdfError> {
        let content = self.page_content(header, body);
        let encoded = content.encode()?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), encoded));

        let g = &self.geometry;
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), g.width.into(), g.height.into()],
            "Resources" => self.resources_id,
            "Contents" => content_id,
        });
        self.push_kid(page_id)?;
        Ok(page_id)
    }

    fn page_content(&self, header: &str, body: &str) -> Content {
        let g = &self.geometry;
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("TL", vec![g.line_height.into()]),
            Operation::new("Td", vec![g.margin.into(), (g.height - g.margin).into()]),
            Operation::new("Tf", vec![HEADER_FONT.into(), g.header_font_size.into()]),
            Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(header))]),
            // blank line under the header
            Operation::new("T*", vec![]),
            Operation::new("Tf", vec![BODY_FONT.into(), g.font_size.into()]),
        ];
        if !body.is_empty() {
            for line in body.split('\n') {
                ops.push(Operation::new("T*", vec![]));
                if !line.is_empty() {
                    ops.push(Operation::new(
                        "Tj",
                        vec![Object::string_literal(encode_win_ansi(line))],
                    ));
                }
            }
        }
        ops.push(Operation::new("ET", vec![]));
        Content { operations: ops }
    }

    fn push_kid(&mut self, page_id: ObjectId) -> Result<(), Code2PdfError> {
        let pages = self.doc.get_object_mut(self.pages_id)?.as_dict_mut()?;

        let kids_ref = match pages.get(b"Kids") {
            Ok(Object::Reference(id)) => Some(*id),
            Ok(_) => None,
            Err(_) => {
                pages.set("Kids", Vec::<Object>::new());
                None
            }
        };
        let count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        pages.set("Count", count + 1);

        let kids = match kids_ref {
            Some(id) => self.doc.get_object_mut(id)?.as_array_mut()?,
            None => self
                .doc
                .get_object_mut(self.pages_id)?
                .as_dict_mut()?
                .get_mut(b"Kids")?
                .as_array_mut()?,
        };
        kids.push(Object::Reference(page_id));
        Ok(())
    }
}

fn standard_font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}
