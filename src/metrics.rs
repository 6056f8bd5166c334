use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref DEPOSITS_CREATED: IntCounter = IntCounter::new(
        "deposits_created_total",
        "Total deposit requests created"
    ).expect("metric can be created");

    pub static ref WITHDRAWALS_CREATED: IntCounter = IntCounter::new(
        "withdrawals_created_total",
        "Total withdrawal requests created"
    ).expect("metric can be created");

    pub static ref TRANSACTIONS_APPROVED: IntCounter = IntCounter::new(
        "transactions_approved_total",
        "Total transactions approved and completed"
    ).expect("metric can be created");

    pub static ref TRANSACTIONS_REJECTED: IntCounter = IntCounter::new(
        "transactions_rejected_total",
        "Total transactions rejected"
    ).expect("metric can be created");

    pub static ref USERS_REGISTERED: IntCounter = IntCounter::new(
        "users_registered_total",
        "Total users registered"
    ).expect("metric can be created");
}

pub fn register_metrics() {
    REGISTRY
        .register(Box::new(DEPOSITS_CREATED.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(WITHDRAWALS_CREATED.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(TRANSACTIONS_APPROVED.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(TRANSACTIONS_REJECTED.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(USERS_REGISTERED.clone()))
        .expect("collector can be registered");
}

pub fn metrics_handler() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}
