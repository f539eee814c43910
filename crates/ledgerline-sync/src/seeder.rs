//! Reconciliation of default datasets.
//!
//! Some collections (categories, typically) ship a baseline set of records
//! every user should have. After the first successful pull of a process, the
//! seeder inserts whichever defaults the remote is missing. It runs at most
//! once per controller, whatever the outcome.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tracing::{info, warn};

use ledgerline_core::{CollectionName, Record, RecordId};

use crate::error::{Deferred, RemoteError};
use crate::gate::Identity;
use crate::remote::RemoteStore;

/// Whether seeding has run for one collection in this process.
#[derive(Debug, Default)]
pub struct SeedingState {
    done: AtomicBool,
}

impl SeedingState {
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Mark as done; returns `true` only for the first caller.
    fn claim(&self) -> bool {
        !self.done.swap(true, Ordering::SeqCst)
    }
}

/// What a reconciliation pass did.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedOutcome {
    /// Seeding had already run in this process.
    AlreadyDone,
    /// Every default is already present remotely.
    NothingMissing,
    /// These records were inserted.
    Inserted(Vec<Record>),
    /// The insert failed; seeding will not be retried in this process.
    Failed(RemoteError),
    /// Skipped before running; the seeding state is unchanged.
    Deferred(Deferred),
}

impl SeedOutcome {
    pub fn inserted(&self) -> &[Record] {
        match self {
            SeedOutcome::Inserted(records) => records,
            _ => &[],
        }
    }
}

/// Inserts missing defaults once.
#[derive(Debug)]
pub struct Seeder {
    defaults: Vec<Record>,
    state: SeedingState,
}

impl Seeder {
    pub fn new(defaults: Vec<Record>) -> Self {
        Self {
            defaults,
            state: SeedingState::default(),
        }
    }

    pub fn state(&self) -> &SeedingState {
        &self.state
    }

    /// Defaults absent from `snapshot`, by id and by case-insensitive name.
    ///
    /// A default without a name is matched by id only.
    pub fn missing_defaults(&self, snapshot: &[Record]) -> Vec<Record> {
        let names: Vec<String> = snapshot
            .iter()
            .filter_map(Record::name)
            .map(str::to_lowercase)
            .collect();

        self.defaults
            .iter()
            .filter(|d| !snapshot.iter().any(|r| r.id == d.id))
            .filter(|d| match d.name() {
                Some(name) => !names.contains(&name.to_lowercase()),
                None => true,
            })
            .cloned()
            .collect()
    }

    /// Run the seeding pass against a freshly pulled snapshot.
    pub async fn reconcile<R: RemoteStore + ?Sized>(
        &self,
        collection: &CollectionName,
        remote: &R,
        identity: &Identity,
        snapshot: &[Record],
    ) -> SeedOutcome {
        if !self.state.claim() {
            return SeedOutcome::AlreadyDone;
        }

        let missing = self.missing_defaults(snapshot);
        if missing.is_empty() {
            return SeedOutcome::NothingMissing;
        }

        let now = Utc::now();
        let fresh: Vec<Record> = missing
            .into_iter()
            .map(|mut record| {
                record.id = RecordId::generate();
                record.owner_id = Some(identity.user_id.clone());
                record.created_at = Some(now);
                record
            })
            .collect();

        info!(collection = %collection, count = fresh.len(), "seeding default records");

        match remote.insert(collection, &fresh, None).await {
            Ok(()) => SeedOutcome::Inserted(fresh),
            Err(e) => {
                warn!(collection = %collection, error = %e, "seeding failed, not retrying this session");
                SeedOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::MemoryRemote;
    use serde_json::Map;

    fn category(id: &str, name: &str) -> Record {
        Record::with_id(id, Map::new()).set("name", name)
    }

    fn categories() -> CollectionName {
        CollectionName::new("categories").unwrap()
    }

    #[test]
    fn test_missing_defaults_by_id_and_name() {
        let seeder = Seeder::new(vec![
            category("c1", "Food"),
            category("c2", "Salary"),
            category("c3", "Rent"),
        ]);
        let remote = vec![category("c1", "Anything"), category("x9", "SALARY")];

        let missing = seeder.missing_defaults(&remote);
        let ids: Vec<_> = missing.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c3"]);
    }

    #[test]
    fn test_unnamed_default_matches_by_id_only() {
        let seeder = Seeder::new(vec![Record::with_id("c1", Map::new())]);
        assert_eq!(seeder.missing_defaults(&[]).len(), 1);
        assert!(seeder
            .missing_defaults(&[Record::with_id("c1", Map::new())])
            .is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_inserts_fresh_records_once() {
        let remote = MemoryRemote::new();
        let seeder = Seeder::new(vec![category("c1", "Food"), category("c2", "Salary")]);
        let identity = Identity::new("u1");

        let outcome = seeder
            .reconcile(&categories(), remote.as_ref(), &identity, &[])
            .await;
        let inserted = outcome.inserted();
        assert_eq!(inserted.len(), 2);
        for record in inserted {
            assert_ne!(record.id.as_str(), "c1");
            assert_ne!(record.id.as_str(), "c2");
            assert_eq!(record.owner_id.as_deref(), Some("u1"));
            assert!(record.created_at.is_some());
        }
        assert_eq!(remote.rows(&categories()).len(), 2);

        let again = seeder
            .reconcile(&categories(), remote.as_ref(), &identity, &[])
            .await;
        assert_eq!(again, SeedOutcome::AlreadyDone);
        assert_eq!(remote.insert_calls(&categories()), 1);
    }

    #[tokio::test]
    async fn test_failed_seed_is_not_retried() {
        let remote = MemoryRemote::new();
        let seeder = Seeder::new(vec![category("c1", "Food")]);
        let identity = Identity::new("u1");

        remote.fail_next(1);
        let outcome = seeder
            .reconcile(&categories(), remote.as_ref(), &identity, &[])
            .await;
        assert!(matches!(outcome, SeedOutcome::Failed(_)));
        assert!(seeder.state().is_done());

        let again = seeder
            .reconcile(&categories(), remote.as_ref(), &identity, &[])
            .await;
        assert_eq!(again, SeedOutcome::AlreadyDone);
        assert!(remote.rows(&categories()).is_empty());
    }

    #[tokio::test]
    async fn test_nothing_missing_still_marks_done() {
        let remote = MemoryRemote::new();
        let seeder = Seeder::new(vec![category("c1", "Food")]);

        let outcome = seeder
            .reconcile(
                &categories(),
                remote.as_ref(),
                &Identity::new("u1"),
                &[category("zz", "food")],
            )
            .await;
        assert_eq!(outcome, SeedOutcome::NothingMissing);
        assert!(seeder.state().is_done());
    }
}
