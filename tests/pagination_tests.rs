//! Pagination through the shared page driver

mod helpers;

use alloy_primitives::Address;
use futures::StreamExt;
use helpers::TEST_TIMESTAMP;
use txfinder::sources::{Paginator, RawTxRecord};
use txfinder::SourceFetchError;

const PAGE_SIZE: usize = 10_000;

fn record(n: usize) -> RawTxRecord {
    RawTxRecord {
        hash: format!("0x{n:064x}"),
        from: format!("{:#x}", Address::ZERO),
        to: format!("{:#x}", Address::with_last_byte(1)),
        value: "1".to_string(),
        time_stamp: TEST_TIMESTAMP.to_string(),
        block_number: (1_000 + n).to_string(),
        is_error: "0".to_string(),
    }
}

fn ledger(len: usize) -> Vec<RawTxRecord> {
    (0..len).map(record).collect()
}

fn page_of(ledger: &[RawTxRecord], page: u32, page_size: usize) -> Vec<RawTxRecord> {
    let start = (page as usize - 1) * page_size;
    ledger.iter().skip(start).take(page_size).cloned().collect()
}

#[tokio::test]
async fn full_page_followed_by_partial_page() {
    let ledger = ledger(PAGE_SIZE + 123);
    let mut calls = 0;

    let records = Paginator::new(PAGE_SIZE, |page| {
        calls += 1;
        let records = page_of(&ledger, page, PAGE_SIZE);
        async move { Ok::<_, SourceFetchError>(records) }
    })
    .collect_all()
    .await
    .unwrap();

    assert_eq!(calls, 2);
    assert_eq!(records.len(), 10_123);
    assert_eq!(records, ledger);
}

#[tokio::test]
async fn exact_multiple_of_page_size_needs_one_empty_page() {
    let ledger = ledger(2 * PAGE_SIZE);
    let mut calls = 0;

    let records = Paginator::new(PAGE_SIZE, |page| {
        calls += 1;
        let records = page_of(&ledger, page, PAGE_SIZE);
        async move { Ok::<_, SourceFetchError>(records) }
    })
    .collect_all()
    .await
    .unwrap();

    assert_eq!(calls, 3);
    assert_eq!(records.len(), 2 * PAGE_SIZE);
}

#[tokio::test]
async fn overlapping_pages_yield_each_record_once() {
    // Each page after the first re-sends the last five records of the previous one
    let ledger = ledger(25);
    let page_size = 10;

    let records = Paginator::new(page_size, |page| {
        let start = match page {
            1 => 0,
            n => (n as usize - 1) * (page_size - 5),
        };
        let records: Vec<RawTxRecord> = ledger.iter().skip(start).take(page_size).cloned().collect();
        async move { Ok::<_, SourceFetchError>(records) }
    })
    .collect_all()
    .await
    .unwrap();

    assert_eq!(records, ledger);
}

#[tokio::test]
async fn endpoint_repeating_the_same_page_terminates() {
    let ledger = ledger(10);
    let mut calls = 0;

    let records = Paginator::new(10, |_page| {
        calls += 1;
        let records = ledger.clone();
        async move { Ok::<_, SourceFetchError>(records) }
    })
    .collect_all()
    .await
    .unwrap();

    assert_eq!(calls, 2);
    assert_eq!(records.len(), 10);
}

#[tokio::test]
async fn error_on_a_later_page_fails_the_collection() {
    let ledger = ledger(15);

    let result = Paginator::new(10, |page| {
        let outcome = if page == 1 {
            Ok(page_of(&ledger, page, 10))
        } else {
            Err(SourceFetchError::transient("txlist page 2", "connection reset"))
        };
        async move { outcome }
    })
    .collect_all()
    .await;

    assert!(matches!(result, Err(SourceFetchError::Transient { .. })));
}

#[tokio::test]
async fn pages_stream_yields_the_error_last() {
    let ledger = ledger(15);

    let pages: Vec<_> = Paginator::new(10, |page| {
        let outcome = if page == 1 {
            Ok(page_of(&ledger, page, 10))
        } else {
            Err(SourceFetchError::rejected("txlist page 2", "NOTOK"))
        };
        async move { outcome }
    })
    .pages()
    .collect()
    .await;

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].as_ref().unwrap().len(), 10);
    assert!(pages[1].is_err());
}
