//! Scripted in-memory catalog service

use async_trait::async_trait;
use multihol_core::catalog::{CatalogError, CatalogService, HoldingDisposition, Result};
use multihol_core::model::{Item, ItemPage};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// A call received by [`MockCatalogService`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    FetchHolding {
        bib_id: String,
        holding_id: String,
    },
    FetchItems {
        bib_id: String,
        offset: usize,
        limit: usize,
    },
    Delete {
        barcode: String,
        holdings: HoldingDisposition,
    },
    Update {
        barcode: String,
        po_line: String,
    },
    Create {
        bib_id: String,
        holding_id: String,
        barcode: String,
        po_line: String,
    },
}

/// Catalog service answering from scripted responses
///
/// Holding records and the item listing are served from fixed data. Delete,
/// update and create answers are taken from per-operation queues; an empty
/// queue answers with success. Every call is recorded.
///
/// # Examples
///
/// ```rust,no_run
/// use multihol_test_utils::{MockCatalogService, ItemBuilder, errors};
///
/// let mock = MockCatalogService::new()
///     .with_items(vec![ItemBuilder::new("A0001").build()]);
/// mock.push_create(Err(errors::barcode_conflict()));
/// ```
#[derive(Clone, Default)]
pub struct MockCatalogService {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    holdings: HashMap<(String, String), std::result::Result<String, CatalogError>>,
    items: Vec<Item>,
    reported_total: Option<usize>,
    page_errors: HashMap<usize, CatalogError>,
    deletes: VecDeque<Result<()>>,
    updates: VecDeque<Result<()>>,
    creates: VecDeque<Result<()>>,
    created: Vec<Item>,
    calls: Vec<MockCall>,
}

impl MockCatalogService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `xml` as the MARCXML of a holding
    pub fn with_holding(self, bib_id: &str, holding_id: &str, xml: impl Into<String>) -> Self {
        self.state.lock().unwrap().holdings.insert(
            (bib_id.to_string(), holding_id.to_string()),
            Ok(xml.into()),
        );
        self
    }

    /// Answer a holding fetch with an error
    pub fn with_holding_error(self, bib_id: &str, holding_id: &str, error: CatalogError) -> Self {
        self.state
            .lock()
            .unwrap()
            .holdings
            .insert((bib_id.to_string(), holding_id.to_string()), Err(error));
        self
    }

    /// Items listed for every bib id, in page order
    pub fn with_items(self, items: Vec<Item>) -> Self {
        self.state.lock().unwrap().items = items;
        self
    }

    /// Report a total that differs from the number of items served
    pub fn with_reported_total(self, total: usize) -> Self {
        self.state.lock().unwrap().reported_total = Some(total);
        self
    }

    /// Fail the page fetch at `offset`
    pub fn with_page_error(self, offset: usize, error: CatalogError) -> Self {
        self.state.lock().unwrap().page_errors.insert(offset, error);
        self
    }

    pub fn push_delete(&self, response: Result<()>) {
        self.state.lock().unwrap().deletes.push_back(response);
    }

    pub fn push_update(&self, response: Result<()>) {
        self.state.lock().unwrap().updates.push_back(response);
    }

    pub fn push_create(&self, response: Result<()>) {
        self.state.lock().unwrap().creates.push_back(response);
    }

    /// Queue the same create failure `times` times
    pub fn fail_creates(&self, times: usize, error: CatalogError) {
        let mut state = self.state.lock().unwrap();
        for _ in 0..times {
            state.creates.push_back(Err(error.clone()));
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Items accepted by successful creates, as sent
    pub fn created_items(&self) -> Vec<Item> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn fetch_offsets(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::FetchItems { offset, .. } => Some(offset),
                _ => None,
            })
            .collect()
    }

    pub fn delete_count(&self) -> usize {
        self.count(|call| matches!(call, MockCall::Delete { .. }))
    }

    pub fn update_count(&self) -> usize {
        self.count(|call| matches!(call, MockCall::Update { .. }))
    }

    pub fn create_count(&self) -> usize {
        self.count(|call| matches!(call, MockCall::Create { .. }))
    }

    fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    fn record(&self, call: MockCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl CatalogService for MockCatalogService {
    async fn fetch_holding(&self, bib_id: &str, holding_id: &str) -> Result<String> {
        self.record(MockCall::FetchHolding {
            bib_id: bib_id.to_string(),
            holding_id: holding_id.to_string(),
        });

        let state = self.state.lock().unwrap();
        match state
            .holdings
            .get(&(bib_id.to_string(), holding_id.to_string()))
        {
            Some(response) => response.clone(),
            None => Err(CatalogError::api(
                400,
                "402203",
                format!("Holding {holding_id} not found"),
            )),
        }
    }

    async fn fetch_items(&self, bib_id: &str, offset: usize, limit: usize) -> Result<ItemPage> {
        self.record(MockCall::FetchItems {
            bib_id: bib_id.to_string(),
            offset,
            limit,
        });

        let state = self.state.lock().unwrap();
        if let Some(error) = state.page_errors.get(&offset) {
            return Err(error.clone());
        }

        let start = offset.min(state.items.len());
        let end = offset.saturating_add(limit).min(state.items.len());
        Ok(ItemPage {
            items: state.items[start..end].to_vec(),
            total_record_count: state.reported_total.unwrap_or(state.items.len()),
        })
    }

    async fn delete_item(&self, item: &Item, holdings: HoldingDisposition) -> Result<()> {
        self.record(MockCall::Delete {
            barcode: item.barcode().to_string(),
            holdings,
        });
        self.state
            .lock()
            .unwrap()
            .deletes
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn update_item(&self, item: &Item) -> Result<Item> {
        self.record(MockCall::Update {
            barcode: item.barcode().to_string(),
            po_line: item.item_data.po_line.clone(),
        });
        let response = self
            .state
            .lock()
            .unwrap()
            .updates
            .pop_front()
            .unwrap_or(Ok(()));
        response.map(|()| item.clone())
    }

    async fn create_item(&self, bib_id: &str, holding_id: &str, item: &Item) -> Result<Item> {
        self.record(MockCall::Create {
            bib_id: bib_id.to_string(),
            holding_id: holding_id.to_string(),
            barcode: item.barcode().to_string(),
            po_line: item.item_data.po_line.clone(),
        });
        let mut state = self.state.lock().unwrap();
        let response = state.creates.pop_front().unwrap_or(Ok(()));

        response.map(|()| {
            state.created.push(item.clone());
            let mut created = item.clone();
            created.holding_data.holding_id = holding_id.to_string();
            created
        })
    }
}
