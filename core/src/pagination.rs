//! `Link` header parsing.
//!
//! The server advertises neighbouring pages with a standard `Link` header:
//! `<url>; rel="next", <url>; rel="last"`. Only the `page` query parameter of
//! each URL matters. Segments that are malformed, lack a `page` parameter or
//! carry an unknown relation are skipped.

use url::form_urlencoded;

/// Page numbers advertised by a `Link` header. `None` means the relation was
/// absent. Pages are numbered from 1, so `page=0` counts as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub next: Option<u32>,
    pub prev: Option<u32>,
    pub first: Option<u32>,
    pub last: Option<u32>,
}

pub fn parse_link_header(value: &str) -> Pagination {
    let mut pagination = Pagination::default();

    for link in value.split(',') {
        let mut segments = link.trim().split(';');
        let Some(href) = segments.next().map(str::trim) else {
            continue;
        };
        let Some(href) = href.strip_prefix('<').and_then(|h| h.strip_suffix('>')) else {
            continue;
        };
        let Some(page) = page_param(href) else {
            continue;
        };

        for segment in segments {
            let Some(rels) = segment.trim().strip_prefix("rel=") else {
                continue;
            };
            for rel in rels.trim_matches('"').split_whitespace() {
                match rel {
                    "next" => pagination.next = Some(page),
                    "prev" => pagination.prev = Some(page),
                    "first" => pagination.first = Some(page),
                    "last" => pagination.last = Some(page),
                    _ => {}
                }
            }
        }
    }

    tracing::trace!(?pagination, "parsed link header");
    pagination
}

/// Extracts `page` from the query string of an absolute or relative URL.
fn page_param(href: &str) -> Option<u32> {
    let (_, query) = href.split_once('?')?;
    let query = query.split_once('#').map(|(q, _)| q).unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
        .filter(|page| *page > 0)
}
