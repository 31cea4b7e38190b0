//! Lazy, forward-only pagination over vendor listings.
//!
//! Vendors disagree on how the next page is addressed (page number, opaque
//! cursor, "start at record name"). A [`Paginator`] hides that behind one
//! iterator: it calls `fetch` with the previous page's token, buffers the
//! items that pass the filter, and stops for good once a page reports no
//! next token.

use std::collections::VecDeque;

use crate::error::Result;
use crate::types::Page;

/// Filter of an unfiltered [`Paginator`].
pub type AcceptAll<T> = fn(&T) -> bool;

fn accept_all<T>(_: &T) -> bool {
    true
}

/// Iterate every item of a paged listing.
///
/// `fetch` receives `None` for the first page and the previous page's
/// `next_token` afterwards.
pub fn paginate<T, K, F>(fetch: F) -> Paginator<T, K, F, AcceptAll<T>>
where
    F: FnMut(Option<K>) -> Result<Page<T, K>>,
{
    paginate_filtered(fetch, accept_all::<T>)
}

/// Iterate the items of a paged listing that satisfy `filter`.
///
/// Pages without a single matching item are skipped, however many of them
/// occur in a row.
pub fn paginate_filtered<T, K, F, P>(fetch: F, filter: P) -> Paginator<T, K, F, P>
where
    F: FnMut(Option<K>) -> Result<Page<T, K>>,
    P: FnMut(&T) -> bool,
{
    Paginator {
        fetch,
        filter,
        buffer: VecDeque::new(),
        next_token: None,
        exhausted: false,
        fetches: 0,
    }
}

/// Iterator over a paged listing. See [`paginate`].
///
/// Holds mutable cursor state; one consumer only.
pub struct Paginator<T, K, F, P> {
    fetch: F,
    filter: P,
    /// Matching items of the current page not yet handed out.
    buffer: VecDeque<T>,
    next_token: Option<K>,
    /// No further page will be fetched.
    exhausted: bool,
    fetches: usize,
}

impl<T, K, F, P> Paginator<T, K, F, P>
where
    F: FnMut(Option<K>) -> Result<Page<T, K>>,
    P: FnMut(&T) -> bool,
{
    /// Whether another matching item exists, fetching pages until one is
    /// found or the listing ends.
    ///
    /// A fetch error is returned once; afterwards the paginator is
    /// exhausted.
    pub fn has_next(&mut self) -> Result<bool> {
        loop {
            if !self.buffer.is_empty() {
                return Ok(true);
            }
            if self.exhausted {
                return Ok(false);
            }
            self.fetch_page()?;
        }
    }

    /// Number of pages fetched so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    fn fetch_page(&mut self) -> Result<()> {
        let token = self.next_token.take();
        self.fetches += 1;
        let page = match (self.fetch)(token) {
            Ok(page) => page,
            Err(err) => {
                self.exhausted = true;
                return Err(err);
            }
        };

        self.exhausted = page.next_token.is_none();
        self.next_token = page.next_token;
        let filter = &mut self.filter;
        self.buffer
            .extend(page.items.into_iter().filter(|item| filter(item)));
        Ok(())
    }
}

impl<T, K, F, P> Iterator for Paginator<T, K, F, P>
where
    F: FnMut(Option<K>) -> Result<Page<T, K>>,
    P: FnMut(&T) -> bool,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => self.buffer.pop_front().map(Ok),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassifiedError;
    use crate::merge::merge;
    use crate::types::RecordEntry;

    /// Pages addressed by index; the last one carries no token.
    fn pages<T: Clone>(pages: Vec<Vec<T>>) -> impl FnMut(Option<usize>) -> Result<Page<T, usize>> {
        move |token| {
            let index = token.unwrap_or(0);
            let next = (index + 1 < pages.len()).then_some(index + 1);
            Ok(Page::new(pages[index].clone(), next))
        }
    }

    #[test]
    fn yields_all_items_across_pages() {
        let mut it = paginate(pages(vec![vec!["a", "b"], vec!["c"]]));
        let items: Vec<_> = it.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(items, ["a", "b", "c"]);
        assert_eq!(it.fetch_count(), 2);
    }

    #[test]
    fn page_without_token_stops_fetching() {
        let mut calls = 0;
        let mut it = paginate(|token: Option<String>| {
            calls += 1;
            match token.as_deref() {
                None => Ok(Page::new(vec!["a", "b"], Some("p2".to_string()))),
                Some("p2") => Ok(Page::last(vec!["c"])),
                Some(other) => panic!("unexpected token {other}"),
            }
        });
        let items: Vec<_> = it.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(items, ["a", "b", "c"]);
        assert!(it.next().is_none());
        assert_eq!(it.fetch_count(), 2);
        drop(it);
        assert_eq!(calls, 2);
    }

    #[test]
    fn filter_skips_pages_without_matches() {
        let mut it = paginate_filtered(pages(vec![vec!["x"], vec!["y"], vec!["z"]]), |s: &&str| {
            *s == "z"
        });
        assert!(it.has_next().unwrap());
        assert_eq!(it.fetch_count(), 3);
        assert_eq!(it.next().unwrap().unwrap(), "z");
        assert!(!it.has_next().unwrap());
        assert_eq!(it.fetch_count(), 3);
    }

    #[test]
    fn has_next_is_idempotent() {
        let mut it = paginate(pages(vec![vec![1], vec![2]]));
        assert!(it.has_next().unwrap());
        assert!(it.has_next().unwrap());
        assert_eq!(it.fetch_count(), 1);
    }

    #[test]
    fn filtered_to_nothing() {
        let mut it = paginate_filtered(pages(vec![vec![1, 3], vec![5]]), |n: &i32| n % 2 == 0);
        assert!(!it.has_next().unwrap());
        assert!(it.next().is_none());
        assert_eq!(it.fetch_count(), 2);
    }

    #[test]
    fn fetch_error_is_yielded_once() {
        let mut it = paginate(|token: Option<u32>| match token {
            None => Ok(Page::new(vec![1], Some(2))),
            Some(_) => Err(ClassifiedError::permanent("vendor", "zone not found")),
        });
        assert_eq!(it.next().unwrap().unwrap(), 1);
        assert!(it.next().unwrap().is_err());
        assert!(it.next().is_none());
        assert_eq!(it.fetch_count(), 2);
    }

    #[test]
    fn merge_lookahead_crosses_page_boundary() {
        let row = |addr: &str| RecordEntry::new("www.io", 1, vec![addr.to_string()]).with_ttl(300);
        let source = paginate(pages(vec![
            vec![row("192.0.2.1"), row("192.0.2.2")],
            vec![row("192.0.2.3")],
        ]));
        let sets: Vec<_> = merge(source).collect::<Result<_>>().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].rdata.len(), 3);
    }
}
