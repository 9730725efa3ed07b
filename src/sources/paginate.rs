// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Shared pagination driver for list endpoints
//!
//! The explorer's list endpoints return at most `page_size` records per call.
//! [`Paginator`] turns a page-fetching closure into a finite lazy stream of
//! pages that stops at the first short page, and removes records a later page
//! repeats from an earlier one.
//!
//! # Examples
//!
//! ```rust
//! use txfinder::sources::{Paginator, RawTxRecord};
//! use txfinder::SourceFetchError;
//!
//! # tokio_test_block_on(async {
//! let paginator = Paginator::new(2, |page: u32| async move {
//!     let records: Vec<RawTxRecord> = match page {
//!         1 => vec![tx("0x01"), tx("0x02")],
//!         _ => vec![tx("0x03")],
//!     };
//!     Ok::<_, SourceFetchError>(records)
//! });
//!
//! let all = paginator.collect_all().await.unwrap();
//! assert_eq!(all.len(), 3);
//! # });
//! # fn tx(hash: &str) -> RawTxRecord {
//! #     RawTxRecord {
//! #         hash: hash.into(), from: String::new(), to: String::new(),
//! #         value: "0".into(), time_stamp: "0".into(), block_number: "0".into(),
//! #         is_error: String::new(),
//! #     }
//! # }
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;

use futures::stream::{self, Stream, StreamExt};
use tracing::debug;

use super::records::PageRecord;
use crate::errors::SourceFetchError;

/// Lazily fetches numbered pages (starting at 1) until the source runs dry
///
/// A page shorter than `page_size` ends the sequence. Records are only
/// compared against earlier pages: two identical-looking records within one
/// page are distinct events and both survive. A full page that only repeats
/// records from earlier pages also ends the sequence, so a misbehaving endpoint that
/// keeps returning the same page cannot loop forever. The first error is
/// yielded and ends the sequence.
pub struct Paginator<F> {
    page_size: usize,
    fetch_page: F,
}

struct PageState<F, K> {
    fetch_page: F,
    page_size: usize,
    next_page: u32,
    /// Key multiplicities accepted from earlier pages
    seen: HashMap<K, usize>,
    done: bool,
}

impl<F, Fut, R> Paginator<F>
where
    F: FnMut(u32) -> Fut + Send,
    Fut: Future<Output = Result<Vec<R>, SourceFetchError>> + Send,
    R: PageRecord + Send,
{
    pub fn new(page_size: usize, fetch_page: F) -> Self {
        Self {
            page_size: page_size.max(1),
            fetch_page,
        }
    }

    /// Stream of de-duplicated pages in fetch order
    pub fn pages(self) -> impl Stream<Item = Result<Vec<R>, SourceFetchError>> + Send {
        let state = PageState {
            fetch_page: self.fetch_page,
            page_size: self.page_size,
            next_page: 1,
            seen: HashMap::new(),
            done: false,
        };

        stream::unfold(state, |mut state| async move {
            if state.done {
                return None;
            }

            let page = state.next_page;
            let records = match (state.fetch_page)(page).await {
                Ok(records) => records,
                Err(e) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
            };

            let received = records.len();
            let fresh = fresh_records(records, &mut state.seen);

            debug!(
                page = page,
                received = received,
                fresh = fresh.len(),
                "Fetched page"
            );

            if received < state.page_size || fresh.is_empty() {
                state.done = true;
            }
            state.next_page = state.next_page.saturating_add(1);

            Some((Ok(fresh), state))
        })
    }

    /// Gathers every record from every page, preserving order
    pub async fn collect_all(self) -> Result<Vec<R>, SourceFetchError> {
        let pages = self.pages();
        futures::pin_mut!(pages);

        let mut records = Vec::new();
        while let Some(page) = pages.next().await {
            records.extend(page?);
        }
        Ok(records)
    }
}

/// Drops the records of `page` that repeat records from earlier pages.
///
/// The n-th occurrence (counting from one) of a key within the page is a
/// repeat when earlier pages accepted at least n records with that key.
fn fresh_records<R: PageRecord>(page: Vec<R>, seen: &mut HashMap<R::Key, usize>) -> Vec<R> {
    let mut occurrences: HashMap<R::Key, usize> = HashMap::new();
    let mut fresh = Vec::with_capacity(page.len());

    for record in page {
        let key = record.record_key();
        let earlier = seen.get(&key).copied().unwrap_or(0);
        let occurrence = occurrences.entry(key.clone()).or_insert(0);
        *occurrence += 1;
        if *occurrence > earlier {
            *seen.entry(key).or_insert(0) += 1;
            fresh.push(record);
        }
    }

    fresh
}
