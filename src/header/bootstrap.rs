use std::sync::atomic::{AtomicBool, Ordering};

use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::page::{ElementId, Page};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Everything scoped to one page load: its id, the one-shot start guards and
/// the unload signal that ends every loop the theme starts.
pub struct PageLoad {
    id: Uuid,
    boot_claimed: AtomicBool,
    header_claimed: AtomicBool,
    unload: CancellationToken,
}

/// Proof that the caller is the one composition allowed to start the header
/// loop for this page load. Not `Clone`: it is consumed by the start.
#[derive(Debug)]
pub struct InitToken {
    page_load: Uuid,
}

impl InitToken {
    pub fn page_load(&self) -> Uuid {
        self.page_load
    }
}

impl PageLoad {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            boot_claimed: AtomicBool::new(false),
            header_claimed: AtomicBool::new(false),
            unload: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Hands out the header start token exactly once; later calls, e.g. from
    /// a script injected twice, get `None`.
    pub fn claim_header_init(&self) -> Option<InitToken> {
        self.header_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InitToken { page_load: self.id })
    }

    /// Same guard for the tenant boot sequence.
    pub fn claim_boot(&self) -> bool {
        self.boot_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn unload_token(&self) -> CancellationToken {
        self.unload.clone()
    }

    /// Navigation away from the page. Stops every loop started for it.
    pub fn unload(&self) {
        self.unload.cancel();
    }

    pub fn is_unloaded(&self) -> bool {
        self.unload.is_cancelled()
    }
}

impl Default for PageLoad {
    fn default() -> Self {
        Self::new()
    }
}

/// Looks for `selector` up to `max_attempts` times, `interval` apart.
///
/// Returns at once when the element is already there. Exhausting the attempts
/// is logged and reported as `None`; the page carries on without the theme.
pub async fn wait_for(
    page: &dyn Page,
    selector: &str,
    max_attempts: u32,
    interval: Duration,
) -> Option<ElementId> {
    let max_attempts = max_attempts.max(1);
    for attempt in 1..=max_attempts {
        if let Some(element) = page.query_selector(selector) {
            if attempt > 1 {
                log_info!("{selector} found after {attempt} attempts");
            }
            return Some(element);
        }
        if attempt < max_attempts {
            time::sleep(interval).await;
        }
    }
    log_error!("{selector} not found after {max_attempts} attempts");
    None
}
