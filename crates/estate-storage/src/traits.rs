use estate_core::{Listing, NewListing, QueryPlan, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    pub total: usize, // matches before pagination
    pub items: Vec<Listing>,
}

/// Executes compiled plans against the listing store.
///
/// Predicates are applied as a conjunction, `Or` being the only disjunction,
/// and results follow the plan's ordering before `page` is cut.
#[async_trait::async_trait]
pub trait ListingStore: Send + Sync + 'static {
    async fn put(&self, req: NewListing) -> Result<Listing>;
    async fn get(&self, id: &str) -> Result<Listing>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn search(&self, plan: &QueryPlan, page: Page) -> Result<SearchPage>;

    // Export all listings (for snapshots)
    fn all_listings(&self) -> Vec<Listing> {
        Vec::new()
    }
}
