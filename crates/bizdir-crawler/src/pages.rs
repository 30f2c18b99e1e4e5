use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Highest page number a selection may hold.
pub const MAX_PAGE: u32 = 10_000;

/// Sorted set of 1-based listing page numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageSelection(Vec<u32>);

impl PageSelection {
    /// Parses inputs such as `1,4,6`, `1-3` or `1-3, 7`.
    ///
    /// Malformed parts are skipped rather than rejected, a reversed range adds nothing.
    pub fn parse(input: &str) -> Self {
        let mut pages = BTreeSet::new();

        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('-') {
                Some((start, end)) => match (start.trim().parse::<u32>(), end.trim().parse::<u32>()) {
                    (Ok(start), Ok(end)) => {
                        if end > MAX_PAGE {
                            log::warn!("Clamping page range {part} to {MAX_PAGE}");
                        }
                        pages.extend(start..=end.min(MAX_PAGE));
                    }
                    _ => log::warn!("Skipping malformed page range: {part}"),
                },
                None => match part.parse::<u32>() {
                    Ok(page) if page > MAX_PAGE => {
                        log::warn!("Skipping page {page}, beyond page {MAX_PAGE}")
                    }
                    Ok(page) => {
                        pages.insert(page);
                    }
                    Err(_) => log::warn!("Skipping malformed page number: {part}"),
                },
            }
        }

        if pages.remove(&0) {
            log::warn!("Skipping page 0, pages start at 1");
        }

        Self(pages.into_iter().collect())
    }

    /// Pages `1..=max`, at most up to [`MAX_PAGE`].
    pub fn up_to(max: u32) -> Self {
        Self((1..=max.min(MAX_PAGE)).collect())
    }

    pub fn pages(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for PageSelection {
    fn default() -> Self {
        Self::up_to(1)
    }
}

impl FromStr for PageSelection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let selection = Self::parse(s);
        if selection.is_empty() {
            anyhow::bail!("No valid page in {s:?}");
        }
        Ok(selection)
    }
}

impl TryFrom<String> for PageSelection {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PageSelection> for String {
    fn from(selection: PageSelection) -> Self {
        selection.to_string()
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pages = self.0.iter().copied().peekable();
        let mut first = true;

        while let Some(start) = pages.next() {
            let mut end = start;
            while end.checked_add(1).is_some_and(|next| pages.peek() == Some(&next)) {
                end += 1;
                pages.next();
            }
            if !first {
                f.write_str(",")?;
            }
            first = false;
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}-{end}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lists_and_ranges() {
        assert_eq!(PageSelection::parse("1,4,6").pages(), &[1, 4, 6]);
        assert_eq!(PageSelection::parse("1-3").pages(), &[1, 2, 3]);
        assert_eq!(PageSelection::parse(" 6, 1-3 ,2").pages(), &[1, 2, 3, 6]);
    }

    #[test]
    fn parse_skips_garbage() {
        assert_eq!(PageSelection::parse("1,abc,3-x,5").pages(), &[1, 5]);
        assert_eq!(PageSelection::parse("5-3").pages(), &[] as &[u32]);
        assert_eq!(PageSelection::parse("0-2").pages(), &[1, 2]);
        assert!(PageSelection::parse("").is_empty());
    }

    #[test]
    fn from_str_rejects_empty_selection() {
        assert!("x,y".parse::<PageSelection>().is_err());
        assert_eq!("2".parse::<PageSelection>().unwrap().pages(), &[2]);
    }

    #[test]
    fn display_collapses_runs() {
        assert_eq!(PageSelection::parse("1,2,3,5,7-8").to_string(), "1-3,5,7-8");
        assert_eq!(PageSelection::up_to(1).to_string(), "1");
        assert_eq!(
            PageSelection(vec![u32::MAX - 1, u32::MAX]).to_string(),
            "4294967294-4294967295"
        );
        assert_eq!(PageSelection(vec![u32::MAX]).to_string(), "4294967295");
    }

    #[test]
    fn huge_ranges_are_clamped() {
        let pages = PageSelection::parse("1-4294967295");
        assert_eq!(pages.len(), MAX_PAGE as usize);
        assert_eq!(pages.pages().last(), Some(&MAX_PAGE));

        assert_eq!(PageSelection::parse("3,4294967295").pages(), &[3]);
        assert!("20000-30000".parse::<PageSelection>().is_err());
        assert_eq!(PageSelection::up_to(u32::MAX).len(), MAX_PAGE as usize);
    }
}
