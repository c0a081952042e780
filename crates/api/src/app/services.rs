//! Service wiring: in-memory stores, the event bus, and the loan service.

use std::sync::Arc;

use libristack_catalog::parse_legacy_catalog;
use libristack_events::{EventEnvelope, InMemoryEventBus, Subscription};
use libristack_infra::{InMemoryHoldQueue, InMemoryInventoryStore, InMemoryLoanLedger, LoanService};
use libristack_lending::LoanEvent;

use crate::config::{AppConfig, ConfigError, StartupError};

pub type LoanBus = InMemoryEventBus<EventEnvelope<LoanEvent>>;

pub type LibraryService =
    LoanService<InMemoryInventoryStore, InMemoryLoanLedger, InMemoryHoldQueue, Arc<LoanBus>>;

pub struct AppServices {
    loans: LibraryService,
}

impl AppServices {
    pub fn loans(&self) -> &LibraryService {
        &self.loans
    }
}

pub fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let bus = Arc::new(LoanBus::new());

    let loans = LoanService::new(
        InMemoryInventoryStore::new(),
        InMemoryLoanLedger::new(),
        InMemoryHoldQueue::new(),
        bus,
        config.policy,
    )
    .map_err(|e| StartupError::Config(ConfigError::Policy(e)))?;

    if let Some(path) = &config.catalog_seed_path {
        let raw = std::fs::read_to_string(path).map_err(|source| StartupError::SeedRead {
            path: path.clone(),
            source,
        })?;
        let books = parse_legacy_catalog(&raw).map_err(StartupError::Seed)?;
        let imported = loans.import_books(books).map_err(StartupError::Seed)?;
        tracing::info!("seeded {imported} book(s) from {}", path.display());
    }

    spawn_audit_log(loans.subscribe());

    Ok(AppServices { loans })
}

/// Background subscriber: every committed loan event becomes an audit log line.
///
/// Ends when the bus is dropped.
fn spawn_audit_log(sub: Subscription<EventEnvelope<LoanEvent>>) {
    tokio::task::spawn_blocking(move || {
        while let Ok(env) = sub.recv() {
            let event = env.payload();
            tracing::info!(
                event_type = env.event_type(),
                sequence = env.sequence_number(),
                stream_id = %env.stream_id(),
                book_id = %event.book_id(),
                borrower_id = %event.borrower_id(),
                "loan event"
            );
        }
        tracing::debug!("loan event bus closed; audit log stopped");
    });
}
