pub mod lock_handler;
pub mod metrics_notifier;
