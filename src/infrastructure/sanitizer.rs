//! HTML Sanitizer: a pure, total function over untrusted entry content.
//! Grounded on the teacher's use of `ammonia::clean`, generalized from the
//! default allow-list to the explicit tag/attribute/scheme sets below.

use ammonia::Builder;
use std::collections::HashSet;

fn builder() -> Builder<'static> {
    let tags: HashSet<&str> = [
        "a", "abbr", "acronym", "b", "blockquote", "code", "em", "i", "li", "ol", "ul", "strong",
        "p", "br", "pre", "h1", "h2", "h3", "h4", "h5", "h6", "img", "figure", "figcaption",
        "table", "thead", "tbody", "tr", "th", "td",
    ]
    .into_iter()
    .collect();

    let mut b = Builder::default();
    b.tags(tags);
    b.link_rel(None);

    b.add_tag_attributes("a", &["href", "title", "rel"]);
    b.add_tag_attributes("img", &["src", "alt", "title", "width", "height"]);

    b.url_schemes(["http", "https", "mailto"].into_iter().collect());

    b
}

/// Filters untrusted HTML down to the allow-listed tags/attributes/schemes.
/// Never fails: unknown elements, scripting vectors, and disallowed
/// attributes are stripped, not escaped or rejected.
pub fn sanitize(raw_html: &str) -> String {
    builder().clean(raw_html).to_string()
}
