//! In-memory product store.
//!
//! An append-only, ordered sequence of received products shared by every
//! connection handler and by reporting consumers. Appends and snapshots go
//! through the same `RwLock`, so a reader never observes a half-written
//! record: it sees some prefix of the append order.

use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, trace};

/// Thread-safe, append-only product store
#[derive(Debug, Default)]
pub struct ProductStore {
    products: RwLock<Vec<Value>>,
}

impl ProductStore {
    /// Create an empty store
    pub fn new() -> Arc<Self> {
        info!("Initializing product store");
        Arc::new(Self::default())
    }

    /// Append a product and return its position in arrival order.
    pub fn append(&self, product: Value) -> usize {
        // A handler that panicked mid-append cannot leave a partial Vec entry
        let mut products = self
            .products
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        products.push(product);
        let index = products.len() - 1;
        trace!(index, "Product appended");
        index
    }

    /// Ordered copy of every product appended so far.
    pub fn snapshot(&self) -> Vec<Value> {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
