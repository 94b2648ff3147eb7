//! OCR block ordering and merging

use crate::models::OcrBlock;

/// Inserted between the text of consecutive pages
pub const PAGE_SEPARATOR: &str = "\n\n=== 페이지 구분 ===\n\n";

fn position(block: &OcrBlock) -> (u32, f64) {
    block.bbox.map_or((0, 0.0), |b| (b.page, b.y))
}

/// Blocks in reading order: by page, then by vertical position
///
/// Blocks without a bounding box sort as page 0 at the top. The sort is
/// stable, so blocks on the same line keep their input order.
pub(crate) fn reading_order(blocks: &[OcrBlock]) -> Vec<&OcrBlock> {
    let mut ordered: Vec<&OcrBlock> = blocks.iter().collect();
    ordered.sort_by(|a, b| {
        let (pa, ya) = position(a);
        let (pb, yb) = position(b);
        pa.cmp(&pb).then(ya.total_cmp(&yb))
    });
    ordered
}

/// Merge OCR blocks into one text
///
/// Blocks of a page are joined with single spaces; pages are joined with
/// [`PAGE_SEPARATOR`]. Empty blocks are skipped.
pub fn merge_ocr_blocks(blocks: &[OcrBlock]) -> String {
    let mut pages: Vec<(u32, Vec<&str>)> = Vec::new();

    for block in reading_order(blocks) {
        let text = block.text.trim();
        if text.is_empty() {
            continue;
        }
        let (page, _) = position(block);
        match pages.last_mut() {
            Some((last, texts)) if *last == page => texts.push(text),
            _ => pages.push((page, vec![text])),
        }
    }

    pages
        .iter()
        .map(|(_, texts)| texts.join(" "))
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}
