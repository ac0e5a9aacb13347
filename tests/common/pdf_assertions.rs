use lopdf::Document as LopdfDocument;

/// Concatenated, decoded content streams of one page (1-based).
pub fn page_content(doc: &LopdfDocument, page_number: u32) -> String {
    let pages = doc.get_pages();
    pages
        .get(&page_number)
        .and_then(|page_id| doc.get_page_content(*page_id).ok())
        .map(|content| String::from_utf8_lossy(&content).into_owned())
        .unwrap_or_default()
}

/// Every text string shown on a page, in drawing order.
pub fn shown_text(doc: &LopdfDocument, page_number: u32) -> Vec<String> {
    let content = page_content(doc, page_number);
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let start = line.find('(')?;
            let end = line.rfind(") Tj")?;
            (line.ends_with("Tj") && start < end).then(|| line[start + 1..end].to_string())
        })
        .collect()
}

/// Every text string shown anywhere in the document, page after page.
pub fn all_shown_text(doc: &LopdfDocument) -> Vec<String> {
    (1..=doc.get_pages().len() as u32).flat_map(|page| shown_text(doc, page)).collect()
}

pub fn assert_shows_text(doc: &LopdfDocument, page_number: u32, text: &str) {
    let shown = shown_text(doc, page_number);
    assert!(
        shown.iter().any(|s| s == text),
        "expected page {} to show {:?}, found {:?}",
        page_number,
        text,
        shown
    );
}

/// Reads a text entry of the trailer's Info dictionary.
pub fn info_entry(doc: &LopdfDocument, key: &str) -> Option<String> {
    let info_id = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = doc.get_object(info_id).ok()?.as_dict().ok()?;
    let value = info.get(key.as_bytes()).ok()?.as_str().ok()?;
    match value.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16.chunks(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
            String::from_utf16(&units).ok()
        }
        None => Some(String::from_utf8_lossy(value).into_owned()),
    }
}

/// Number of clipped subframe groups drawn on a page.
pub fn subframe_groups(doc: &LopdfDocument, page_number: u32) -> usize {
    page_content(doc, page_number).lines().filter(|line| line.trim() == "W").count()
}
