use crate::domain::model::PageContent;

/// Concatenates page text in page order, one trailing newline per page.
/// Pages without text add nothing.
pub fn extract_text(pages: &[PageContent]) -> String {
    let mut text = String::new();

    for page_text in pages
        .iter()
        .filter_map(|p| p.text.as_deref())
        .filter(|t| !t.is_empty())
    {
        text.push_str(page_text);
        text.push('\n');
    }

    text
}
