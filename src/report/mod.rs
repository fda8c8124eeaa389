//! Assembly of rendered pages into the final PDF report.

mod vector;

use printpdf::lopdf::{self, Object, StringFormat};
use printpdf::{
    BuiltinFont, CustomPdfConformance, Mm, OffsetDateTime, PdfConformance, PdfDocument,
    PdfDocumentReference,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ReportError, Result};
use crate::output::{RenderedPage, discover_pages};
use vector::{Fonts, SvgPage};

/// The written report and the pages it contains, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledReport {
    pub path: PathBuf,
    pub pages: Vec<RenderedPage>,
}

/// Discovers every page in `pages_dir` and assembles them into `dest`.
pub fn assemble_dir(pages_dir: &Path, title: &str, dest: &Path) -> Result<AssembledReport> {
    let pages = discover_pages(pages_dir)?;
    assemble(&pages, title, dest)
}

/// Writes `pages`, ordered by ordinal, as one PDF at `dest`.
///
/// The same pages and title always produce the same bytes. Any existing file
/// at `dest` is replaced only once the new document has been fully written.
/// Intermediate pages are left in place.
///
/// # Errors
///
/// `Assembly` when `pages` is empty, a page cannot be read or parsed, or the
/// document cannot be written.
#[tracing::instrument(skip(pages), fields(pages = pages.len(), dest = %dest.display()))]
pub fn assemble(pages: &[RenderedPage], title: &str, dest: &Path) -> Result<AssembledReport> {
    if pages.is_empty() {
        return Err(ReportError::Assembly("no pages to assemble".to_string()));
    }

    let mut ordered = pages.to_vec();
    ordered.sort_by_key(|p| p.ordinal);
    if let Some(dup) = ordered.windows(2).find(|w| w[0].ordinal == w[1].ordinal) {
        return Err(ReportError::Assembly(format!(
            "duplicate page ordinal {:02}",
            dup[0].ordinal
        )));
    }

    let bytes = build_pdf(&ordered, title)?;
    write_atomically(dest, &bytes)?;

    info!(pages = ordered.len(), bytes = bytes.len(), "Saved report");
    Ok(AssembledReport {
        path: dest.to_path_buf(),
        pages: ordered,
    })
}

/// A document with no clock-dependent metadata, no ICC profile and no XMP
/// packet, so nothing in it varies between runs except the trailer ID.
fn new_document(title: &str) -> PdfDocumentReference {
    PdfDocument::empty(title)
        .with_conformance(PdfConformance::Custom(CustomPdfConformance {
            identifier: "retail_report".to_string(),
            allows_default_fonts: true,
            requires_icc_profile: false,
            requires_xmp_metadata: false,
            ..Default::default()
        }))
        .with_creation_date(OffsetDateTime::UNIX_EPOCH)
        .with_mod_date(OffsetDateTime::UNIX_EPOCH)
        .with_metadata_date(OffsetDateTime::UNIX_EPOCH)
}

fn build_pdf(pages: &[RenderedPage], title: &str) -> Result<Vec<u8>> {
    let doc = new_document(title);
    let font = |face: BuiltinFont| {
        doc.add_builtin_font(face)
            .map_err(|e| ReportError::Assembly(format!("cannot add font: {e:?}")))
    };
    let fonts = Fonts {
        regular: font(BuiltinFont::Helvetica)?,
        bold: font(BuiltinFont::HelveticaBold)?,
    };

    for page in pages {
        let content = fs::read_to_string(&page.path).map_err(|e| {
            ReportError::Assembly(format!("cannot read {}: {e}", page.path.display()))
        })?;
        let svg = SvgPage::parse(&content).map_err(|e| {
            ReportError::Assembly(format!("cannot parse {}: {e}", page.path.display()))
        })?;

        let (width, height) = svg.size();
        let (page_index, layer_index) = doc.add_page(
            Mm::from(width),
            Mm::from(height),
            format!("page {:02}", page.ordinal),
        );
        let layer = doc.get_page(page_index).get_layer(layer_index);
        let elements = svg.draw(&layer, &fonts);
        debug!(ordinal = page.ordinal, elements, path = %page.path.display(), "Page appended");
    }

    let bytes = doc
        .save_to_bytes()
        .map_err(|e| ReportError::Assembly(format!("cannot encode PDF: {e:?}")))?;
    pin_document_id(&bytes)
}

/// Replaces the random trailer `/ID` with a digest of the document body.
fn pin_document_id(bytes: &[u8]) -> Result<Vec<u8>> {
    let encode_err = |e: lopdf::Error| ReportError::Assembly(format!("cannot encode PDF: {e}"));

    let mut doc = lopdf::Document::load_mem(bytes).map_err(encode_err)?;
    doc.trailer.remove(b"ID");
    let mut body = Vec::new();
    doc.save_to(&mut body)
        .map_err(|e| ReportError::Assembly(format!("cannot encode PDF: {e}")))?;

    let id = format!("{:016x}", fnv1a(&body)).into_bytes();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Literal),
            Object::String(id, StringFormat::Literal),
        ]),
    );
    let mut pinned = Vec::new();
    doc.save_to(&mut pinned)
        .map_err(|e| ReportError::Assembly(format!("cannot encode PDF: {e}")))?;
    Ok(pinned)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Writes to a sibling temporary file, then renames it over `dest`.
fn write_atomically(dest: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            ReportError::Assembly(format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    let mut partial = dest.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    fs::write(&partial, bytes).map_err(|e| {
        ReportError::Assembly(format!("cannot write {}: {e}", partial.display()))
    })?;
    fs::rename(&partial, dest).map_err(|e| {
        let _ = fs::remove_file(&partial);
        ReportError::Assembly(format!("cannot replace {}: {e}", dest.display()))
    })
}
