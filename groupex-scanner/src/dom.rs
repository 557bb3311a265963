//! Small helpers over parsed markup shared by the classifiers and resolvers.

use scraper::ElementRef;

/// Elements whose text never reaches the screen.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Rendered text of an element with whitespace runs collapsed and ends trimmed.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child)
            && !HIDDEN_TAGS.contains(&child_element.value().name())
        {
            collect_text(child_element, out);
        }
    }
}

/// Element ancestors of `element`, nearest first. The element itself is not included.
pub fn ancestor_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.ancestors().filter_map(ElementRef::wrap)
}

/// Trimmed value of an attribute, `None` when missing or blank.
pub fn non_empty_attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
