use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, CounterVec, Histogram,
    HistogramVec,
};

pub static COMPILE_MICROS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "filter_compile_micros",
        "Filter compile time (µs)",
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0]
    )
    .unwrap()
});

pub static SEARCH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "listing_search_total",
        "Searches by property type group and deal",
        &["group", "deal"]
    )
    .unwrap()
});

pub static FILTERS_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "filters_skipped_total",
        "Filters left out of a plan, by reason",
        &["reason"]
    )
    .unwrap()
});

pub static OP_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!("op_duration_seconds", "HTTP op durations", &["op"]).unwrap()
});
