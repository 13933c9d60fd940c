//! Keyed laptop storage with predicate-filtered enumeration

use std::collections::HashMap;
use std::future::Future;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::debug;

use crate::catalog::v1::{memory, Filter, Laptop, Memory};
use crate::deadline;
use crate::error::StoreError;

/// In-memory laptop store keyed by UUID string.
///
/// An accepted id is never reassigned: a second save with the same id is
/// rejected, not overwritten.
#[derive(Default)]
pub struct LaptopStore {
    data: RwLock<HashMap<String, Laptop>>,
}

impl LaptopStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a laptop, rejecting duplicates.
    ///
    /// The duplicate check and the insert happen under one exclusive critical
    /// section, so two concurrent saves of the same id cannot both succeed.
    /// The caller's deadline is observed before the write.
    pub async fn save(
        &self,
        laptop: Laptop,
        deadline: Option<Instant>,
    ) -> Result<(), StoreError> {
        let mut data = self.data.write().await;

        if data.contains_key(&laptop.id) {
            return Err(StoreError::AlreadyExists);
        }

        if deadline::expired(deadline) {
            return Err(StoreError::DeadlineExceeded);
        }

        data.insert(laptop.id.clone(), laptop);
        Ok(())
    }

    pub async fn find(&self, id: &str) -> Result<Laptop, StoreError> {
        let data = self.data.read().await;
        data.get(id).cloned().ok_or(StoreError::NotFound)
    }

    /// Scan the store under the shared lock, invoking `visit` for every laptop
    /// matching the filter. Iteration order is map order and must not be
    /// relied upon. The first visitor error aborts the scan and propagates.
    pub async fn search<F, Fut, E>(&self, filter: &Filter, mut visit: F) -> Result<(), E>
    where
        F: FnMut(Laptop) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let data = self.data.read().await;

        for laptop in data.values() {
            if is_qualified(filter, laptop) {
                debug!(laptop_id = %laptop.id, "laptop matches filter");
                visit(laptop.clone()).await?;
            }
        }

        Ok(())
    }
}

/// Pure predicate over one laptop. All four conditions must hold; zero-valued
/// filter fields act as "no constraint".
fn is_qualified(filter: &Filter, laptop: &Laptop) -> bool {
    if laptop.price_usd > filter.max_price_usd && filter.max_price_usd > 0.0 {
        return false;
    }

    let cpu = laptop.cpu.as_ref();
    if cpu.map_or(0, |c| c.number_cores) < filter.min_cpu_cores {
        return false;
    }
    if cpu.map_or(0.0, |c| c.min_ghz) < filter.min_cpu_ghz {
        return false;
    }

    if to_bit(laptop.ram.as_ref()) < to_bit(filter.min_ram.as_ref()) {
        return false;
    }

    true
}

/// Normalize a memory quantity to bits via unit-aware left shifts.
fn to_bit(memory: Option<&Memory>) -> u64 {
    let Some(memory) = memory else {
        return 0;
    };

    let value = memory.value;
    match memory.unit() {
        memory::Unit::Bit => value,
        memory::Unit::Byte => value << 3,
        memory::Unit::Kilobyte => value << 13,
        memory::Unit::Megabyte => value << 23,
        memory::Unit::Gigabyte => value << 33,
        memory::Unit::Terabyte => value << 43,
        memory::Unit::Unspecified => 0,
    }
}
