use crate::traits::{ListingStore, Page, SearchPage};
use estate_core::{
    Column, Direction, EstateError, Listing, ListingId, NewListing, Predicate, QueryPlan, Result,
    StoredType,
};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus::{register_histogram, Histogram};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

static PLAN_EXECUTE_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "listing_plan_execute_seconds",
        "In-memory plan execution latency"
    )
    .unwrap()
});

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    listings: HashMap<ListingId, Listing>,
    // secondary index on the stored type
    type_index: HashMap<StoredType, HashSet<ListingId>>,
}

impl Inner {
    fn insert(&mut self, listing: Listing) {
        if let Some(old) = self.listings.get(&listing.id) {
            if let Some(ids) = self.type_index.get_mut(&old.r#type) {
                ids.remove(&listing.id);
            }
        }
        self.type_index
            .entry(listing.r#type)
            .or_default()
            .insert(listing.id.clone());
        self.listings.insert(listing.id.clone(), listing);
    }

    fn remove(&mut self, id: &str) -> Option<Listing> {
        let old = self.listings.remove(id)?;
        if let Some(ids) = self.type_index.get_mut(&old.r#type) {
            ids.remove(id);
        }
        Some(old)
    }

    /// Ids allowed by every top-level `In(type, ..)` predicate, or `None`
    /// when the plan does not constrain the type.
    fn type_candidates(&self, plan: &QueryPlan) -> Option<HashSet<&ListingId>> {
        let mut candidates: Option<HashSet<&ListingId>> = None;
        for p in plan.predicates() {
            let Predicate::In {
                field: Column::Type,
                values,
            } = p
            else {
                continue;
            };
            let mut allowed = HashSet::new();
            for v in values {
                let Ok(t) = v.parse::<StoredType>() else {
                    continue;
                };
                if let Some(ids) = self.type_index.get(&t) {
                    allowed.extend(ids.iter());
                }
            }
            candidates = Some(match candidates.take() {
                None => allowed,
                Some(prev) => prev.intersection(&allowed).copied().collect(),
            });
        }
        candidates
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts already-materialized listings, e.g. from a snapshot.
    pub fn load(&self, listings: impl IntoIterator<Item = Listing>) -> usize {
        let mut inner = self.inner.write();
        let mut n = 0;
        for l in listings {
            inner.insert(l);
            n += 1;
        }
        n
    }

    pub fn len(&self) -> usize {
        self.inner.read().listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ListingStore for InMemoryStore {
    async fn put(&self, req: NewListing) -> Result<Listing> {
        let listing = Listing::new(req)?;
        self.inner.write().insert(listing.clone());
        Ok(listing)
    }

    async fn get(&self, id: &str) -> Result<Listing> {
        self.inner
            .read()
            .listings
            .get(id)
            .cloned()
            .ok_or(EstateError::NotFound)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.inner.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(EstateError::NotFound),
        }
    }

    async fn search(&self, plan: &QueryPlan, page: Page) -> Result<SearchPage> {
        let _timer = PLAN_EXECUTE_SECONDS.start_timer();
        let inner = self.inner.read();
        let candidates: Vec<&Listing> = match inner.type_candidates(plan) {
            Some(ids) => ids
                .into_iter()
                .filter_map(|id| inner.listings.get(id))
                .collect(),
            None => inner.listings.values().collect(),
        };
        let mut hits: Vec<&Listing> = candidates
            .into_iter()
            .filter(|l| plan.predicates().iter().all(|p| matches(p, l)))
            .collect();
        let order = plan.order();
        hits.sort_by(|a, b| {
            let ord = compare_on(order.field, a, b).then_with(|| a.id.cmp(&b.id));
            match order.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });
        let total = hits.len();
        let items = hits
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect();
        Ok(SearchPage { total, items })
    }

    fn all_listings(&self) -> Vec<Listing> {
        let inner = self.inner.read();
        let mut out: Vec<Listing> = inner.listings.values().cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }
}

fn value_of(listing: &Listing, column: Column) -> Option<Cow<'_, JsonValue>> {
    match column {
        Column::Type => Some(Cow::Owned(JsonValue::from(listing.r#type.as_str()))),
        Column::SaleOrRent => Some(Cow::Owned(JsonValue::from(listing.sale_or_rent.as_str()))),
        Column::CreatedAt => Some(Cow::Owned(JsonValue::from(listing.created_at.to_rfc3339()))),
        other => listing.attributes.get(other.as_str()).map(Cow::Borrowed),
    }
}

fn as_text(v: &JsonValue) -> Option<Cow<'_, str>> {
    match v {
        JsonValue::String(s) => Some(Cow::Borrowed(s.as_str())),
        JsonValue::Number(n) => Some(Cow::Owned(n.to_string())),
        JsonValue::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
        _ => None,
    }
}

fn as_number(v: &JsonValue) -> Option<f64> {
    match v {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn matches(p: &Predicate, listing: &Listing) -> bool {
    match p {
        Predicate::Equals { field, value } => value_of(listing, *field)
            .and_then(|v| as_text(&v).map(|t| t == value.as_str()))
            .unwrap_or(false),
        Predicate::In { field, values } => value_of(listing, *field)
            .and_then(|v| as_text(&v).map(|t| values.iter().any(|x| x.as_str() == t)))
            .unwrap_or(false),
        Predicate::Range { field, from, to } => {
            let Some(n) = value_of(listing, *field).and_then(|v| as_number(&v)) else {
                return false;
            };
            from.map_or(true, |f| n >= f) && to.map_or(true, |t| n <= t)
        }
        Predicate::ArrayContains { field, values } => {
            let Some(v) = value_of(listing, *field) else {
                return false;
            };
            let Some(arr) = v.as_array() else {
                return false;
            };
            values
                .iter()
                .all(|want| arr.iter().any(|x| as_text(x).is_some_and(|t| t == want.as_str())))
        }
        Predicate::IsNull { field } => {
            matches!(value_of(listing, *field).as_deref(), None | Some(JsonValue::Null))
        }
        Predicate::Or { clauses } => clauses.iter().any(|c| matches(c, listing)),
    }
}

fn compare_on(column: Column, a: &Listing, b: &Listing) -> Ordering {
    if column == Column::CreatedAt {
        return a.created_at.cmp(&b.created_at);
    }
    let (va, vb) = (value_of(a, column), value_of(b, column));
    match (
        va.as_deref().and_then(as_number),
        vb.as_deref().and_then(as_number),
    ) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => {
            let ta = va.as_deref().and_then(as_text).map(|t| t.into_owned());
            let tb = vb.as_deref().and_then(as_text).map(|t| t.into_owned());
            ta.cmp(&tb)
        }
    }
}
