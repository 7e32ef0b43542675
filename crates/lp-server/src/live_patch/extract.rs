//! Extraction of the content region from rendered pages.

use std::sync::LazyLock;

use regex::Regex;

static MAIN_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<main(?:\s[^>]*)?>").expect("valid regex"));

static MAIN_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</main\s*>").expect("valid regex"));

/// Inner HTML of the `<main>` element of a page.
///
/// Runs from the first opening tag to the last closing tag, so a nested
/// `</main>` in the content stays inside.
pub(super) fn extract_main(html: &str) -> Option<&str> {
    let open = MAIN_OPEN.find(html)?;
    let close = MAIN_CLOSE.find_iter(&html[open.end()..]).last()?;
    Some(&html[open.end()..open.end() + close.start()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_main() {
        let html = "<html><body><nav>x</nav><main><p>Hello</p></main></body></html>";
        assert_eq!(extract_main(html), Some("<p>Hello</p>"));
    }

    #[test]
    fn test_extract_main_with_attributes() {
        let html = r#"<main id="content" class="page">
<h1>Title</h1>
</main>"#;
        assert_eq!(extract_main(html), Some("\n<h1>Title</h1>\n"));
    }

    #[test]
    fn test_extract_main_case_insensitive() {
        assert_eq!(extract_main("<MAIN><p>a</p></Main >"), Some("<p>a</p>"));
    }

    #[test]
    fn test_extract_main_ignores_similar_tags() {
        let html = "<mainframe>no</mainframe><main>yes</main>";
        assert_eq!(extract_main(html), Some("yes"));
    }

    #[test]
    fn test_extract_main_empty() {
        assert_eq!(extract_main("<main></main>"), Some(""));
    }

    #[test]
    fn test_extract_main_missing() {
        assert_eq!(extract_main("<body><p>no main</p></body>"), None);
        assert_eq!(extract_main("<main><p>unclosed</p>"), None);
    }
}
