use std::collections::HashSet;

use anyhow::anyhow;
use bizdir_crawler::{Listing, Url};
use scraper::{Html, Selector};

/// Extracts detail page links from a category listing page.
#[derive(Debug, Clone)]
pub struct ListingParser {
    links: Selector,
    end_marker: String,
}

impl ListingParser {
    pub fn new(link_selector: &str, end_marker: &str) -> anyhow::Result<Self> {
        let links = Selector::parse(link_selector)
            .map_err(|e| anyhow!("Invalid link selector {link_selector:?}: {e}"))?;
        Ok(Self {
            links,
            end_marker: end_marker.to_string(),
        })
    }

    pub fn is_end(&self, page: &str) -> bool {
        !self.end_marker.is_empty() && page.contains(&self.end_marker)
    }

    pub fn parse(&self, page: &str, url: &Url) -> Listing {
        if self.is_end(page) {
            return Listing::End;
        }

        let doc = Html::parse_document(page);
        let mut seen = HashSet::new();
        let links = doc
            .select(&self.links)
            .filter_map(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .filter_map(|href| match url.join(href) {
                Ok(link) if matches!(link.scheme(), "http" | "https") => Some(link),
                Ok(link) => {
                    log::debug!("Ignoring non HTTP link {link} on {url}");
                    None
                }
                Err(e) => {
                    log::warn!("Ignoring link {href:?} on {url} got: {e}");
                    None
                }
            })
            .filter(|link| seen.insert(link.clone()))
            .collect();

        Listing::Links(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const END: &str = "No businesses found in this category";

    fn parser() -> ListingParser {
        ListingParser::new("a.name", END).unwrap()
    }

    fn listing_url() -> Url {
        Url::parse("https://addisbiz.com/business-directory/shopping/furniture?page=1").unwrap()
    }

    #[test]
    fn links_are_resolved_in_page_order() {
        let page = r#"
            <div class="listing">
              <a class="name" href="/business-directory/b/zeta-furniture">Zeta</a>
              <a class="logo" href="/business-directory/b/zeta-furniture">logo</a>
              <a class="name" href="https://addisbiz.com/business-directory/b/alpha">Alpha</a>
              <a class="name" href="/business-directory/b/zeta-furniture">Zeta again</a>
              <a class="name">no href</a>
              <a class="name" href="  ">blank</a>
              <a class="name" href="mailto:info@example.com">mail</a>
            </div>"#;

        let Listing::Links(links) = parser().parse(page, &listing_url()) else {
            panic!("expected links");
        };
        let links = links.iter().map(Url::as_str).collect::<Vec<_>>();
        assert_eq!(
            links,
            vec![
                "https://addisbiz.com/business-directory/b/zeta-furniture",
                "https://addisbiz.com/business-directory/b/alpha",
            ]
        );
    }

    #[test]
    fn end_marker_wins() {
        let page = format!(r#"<p>{END}</p><a class="name" href="/b/x">x</a>"#);
        assert_eq!(parser().parse(&page, &listing_url()), Listing::End);
    }

    #[test]
    fn empty_page_has_no_links() {
        assert_eq!(
            parser().parse("<html></html>", &listing_url()),
            Listing::Links(vec![])
        );
    }

    #[test]
    fn empty_marker_never_ends() {
        let parser = ListingParser::new("a.name", "").unwrap();
        assert!(!parser.is_end("anything"));
    }

    #[test]
    fn bad_selector_is_an_error() {
        assert!(ListingParser::new("a..name", END).is_err());
    }
}
