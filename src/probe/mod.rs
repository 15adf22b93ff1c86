mod aggregator;
mod check;
mod checks;

pub use aggregator::{
    run_check, CheckResults, OverallStatus, ProbeAggregator, ProbeReport, StatusMapping,
};
pub use check::{
    check_fn, iso_timestamp, serialize_iso, Check, CheckError, CheckOutcome, CheckResult,
    CheckStatus, FnCheck,
};
pub use checks::{
    classify_latency, classify_memory, format_uptime, AllocationCheck, AzureCheck, MemoryCheck,
    ResponseTimeCheck, UptimeCheck,
};
