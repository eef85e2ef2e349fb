//! One-time database initialization
//!
//! [`Lifecycle`] guards the bootstrap (schema, bulk load, classification)
//! behind a mutex so it runs at most once per lifecycle, no matter how many
//! threads ask for it. The outcome is cached and handed back to every later
//! caller. [`Lifecycle::reset`] clears it so the next call runs again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::classify::{materialize_subclasses, ClassificationPolicy, ClassificationReport};
use super::db::ConnectionProvider;
use super::error::StoreError;
use super::loader::{load_all, DataSource, LoadReport};
use super::schema::ensure_schema;

/// What a bootstrap run did
#[derive(Debug, Clone, Default, Serialize)]
pub struct BootstrapReport {
    pub load: LoadReport,
    pub classification: ClassificationReport,
}

/// Run schema creation, bulk load and classification once, unguarded.
///
/// Prefer [`Lifecycle::ensure_initialized`]; this is the raw pipeline it
/// wraps.
pub fn bootstrap<P: ConnectionProvider>(
    provider: &P,
    sources: &dyn DataSource,
    policy: &mut dyn ClassificationPolicy,
) -> Result<BootstrapReport, StoreError> {
    provider.with_connection(|conn| {
        ensure_schema(conn)?;
        let load = load_all(conn, sources)?;
        let classification = materialize_subclasses(conn, policy)?;
        Ok(BootstrapReport {
            load,
            classification,
        })
    })
}

static GLOBAL: Lifecycle = Lifecycle::new();

/// Lock-guarded one-time initialization state
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: Mutex<Option<Arc<BootstrapReport>>>,
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    /// The process-wide lifecycle
    pub fn global() -> &'static Lifecycle {
        &GLOBAL
    }

    /// Bootstrap if not done yet and return the cached report.
    ///
    /// Concurrent callers block until the first one finishes. If the
    /// bootstrap fails the lifecycle stays uninitialized, the error is
    /// returned, and the next call tries again.
    pub fn ensure_initialized<P: ConnectionProvider>(
        &self,
        provider: &P,
        sources: &dyn DataSource,
        policy: &mut dyn ClassificationPolicy,
    ) -> Result<Arc<BootstrapReport>, StoreError> {
        let mut state = self.lock();
        if let Some(report) = state.as_ref() {
            tracing::debug!("already initialized");
            return Ok(Arc::clone(report));
        }

        tracing::info!("bootstrapping database");
        let report = Arc::new(bootstrap(provider, sources, policy)?);
        tracing::info!(
            rows = report.load.rows_inserted(),
            row_errors = report.load.error_count(),
            specialists = report.classification.specialists_created,
            insured_patients = report.classification.insured_patients_created,
            "bootstrap complete"
        );
        *state = Some(Arc::clone(&report));
        Ok(report)
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    /// Report of the completed bootstrap, if any
    pub fn report(&self) -> Option<Arc<BootstrapReport>> {
        self.lock().clone()
    }

    /// Forget the completed bootstrap. The database itself is untouched.
    pub fn reset(&self) {
        if self.lock().take().is_some() {
            tracing::info!("lifecycle reset");
        }
    }

    // A panic inside a bootstrap never stores a report, so the state is
    // still consistent after poisoning.
    fn lock(&self) -> MutexGuard<'_, Option<Arc<BootstrapReport>>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use crate::core::classify::RandomPolicy;
    use crate::core::db::{SharedConnection, SqliteFile};
    use crate::core::loader::{EmbeddedSource, MemorySource, SourceKind};
    use crate::core::schema::{existing_tables, table_counts, TABLES};
    use crate::core::store::{DoctorStore, RecordStore, SpecialistStore};
    use crate::entities::InsuranceType;

    const DOCTORS: &str = "id,firstName,surname,address,email,specialization
1,A,B,addr,a@x,Cardiology
2,C,D,addr2,c@x,
";

    /// Provider that counts connections handed out
    struct Counting {
        inner: SharedConnection,
        calls: AtomicUsize,
    }

    impl ConnectionProvider for Counting {
        fn with_connection<T, F>(&self, f: F) -> Result<T, StoreError>
        where
            F: FnOnce(&mut rusqlite::Connection) -> Result<T, StoreError>,
        {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.with_connection(f)
        }
    }

    /// Provider whose database can never be opened
    struct Broken;

    impl ConnectionProvider for Broken {
        fn with_connection<T, F>(&self, _f: F) -> Result<T, StoreError>
        where
            F: FnOnce(&mut rusqlite::Connection) -> Result<T, StoreError>,
        {
            Err(StoreError::Connection("unreachable".to_string()))
        }
    }

    #[test]
    fn test_doctor_scenario_yields_one_specialist() {
        let db = SharedConnection::in_memory().unwrap();
        let sources = MemorySource::new().with(SourceKind::Doctor, DOCTORS);
        let lifecycle = Lifecycle::new();

        let report = lifecycle
            .ensure_initialized(&db, &sources, &mut RandomPolicy::seeded(1))
            .unwrap();

        assert_eq!(report.classification.specialists_created, 1);
        let specialists = SpecialistStore::new(&db);
        let all = specialists.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id(), 1);
        assert!((1..=30).contains(&all[0].years_of_experience));
        assert_eq!(specialists.get_by_id(2).unwrap(), None);
    }

    #[test]
    fn test_missing_sources_are_not_fatal() {
        let db = SharedConnection::in_memory().unwrap();
        let sources = MemorySource::new().with(SourceKind::Doctor, DOCTORS);

        let report = bootstrap(&db, &sources, &mut RandomPolicy::seeded(1)).unwrap();

        assert!(report.load.source(SourceKind::Patient).unwrap().missing);
        assert!(!report.load.source(SourceKind::Doctor).unwrap().missing);
        assert_eq!(DoctorStore::new(&db).list_all().unwrap().len(), 2);
    }

    #[test]
    fn test_second_call_returns_cached_report() {
        let db = Counting {
            inner: SharedConnection::in_memory().unwrap(),
            calls: AtomicUsize::new(0),
        };
        let sources = MemorySource::new().with(SourceKind::Doctor, DOCTORS);
        let lifecycle = Lifecycle::new();
        let mut policy = RandomPolicy::seeded(3);

        let first = lifecycle
            .ensure_initialized(&db, &sources, &mut policy)
            .unwrap();
        let second = lifecycle
            .ensure_initialized(&db, &sources, &mut policy)
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(db.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_callers_bootstrap_once() {
        let db = Counting {
            inner: SharedConnection::in_memory().unwrap(),
            calls: AtomicUsize::new(0),
        };
        let lifecycle = Lifecycle::new();

        thread::scope(|scope| {
            for seed in 0..8 {
                let db = &db;
                let lifecycle = &lifecycle;
                scope.spawn(move || {
                    let sources = MemorySource::new().with(SourceKind::Doctor, DOCTORS);
                    lifecycle
                        .ensure_initialized(db, &sources, &mut RandomPolicy::seeded(seed))
                        .unwrap();
                });
            }
        });

        assert_eq!(db.calls.load(Ordering::SeqCst), 1);
        assert_eq!(SpecialistStore::new(&db.inner).list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_failure_leaves_lifecycle_uninitialized() {
        let lifecycle = Lifecycle::new();

        let err = lifecycle
            .ensure_initialized(&Broken, &EmbeddedSource, &mut RandomPolicy::seeded(1))
            .unwrap_err();

        assert!(matches!(err, StoreError::Connection(_)));
        assert!(!lifecycle.is_initialized());
        assert!(lifecycle.report().is_none());
    }

    #[test]
    fn test_reset_allows_rerun_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteFile::new(dir.path().join("nested").join("hospital.db"));
        let lifecycle = Lifecycle::new();

        lifecycle
            .ensure_initialized(&db, &EmbeddedSource, &mut RandomPolicy::seeded(1))
            .unwrap();
        let before = db.with_connection(|conn| table_counts(conn)).unwrap();

        lifecycle.reset();
        assert!(!lifecycle.is_initialized());
        let again = lifecycle
            .ensure_initialized(&db, &EmbeddedSource, &mut RandomPolicy::seeded(2))
            .unwrap();

        let after = db.with_connection(|conn| table_counts(conn)).unwrap();
        assert_eq!(before, after);
        assert_eq!(again.load.rows_inserted(), 0);
        assert_eq!(again.classification, ClassificationReport::default());
        let tables = db.with_connection(|conn| existing_tables(conn)).unwrap();
        assert_eq!(tables.len(), TABLES.len());
    }

    #[test]
    fn test_embedded_data_classification_bounds() {
        let db = SharedConnection::in_memory().unwrap();
        bootstrap(&db, &EmbeddedSource, &mut RandomPolicy::new()).unwrap();

        let insured = crate::core::store::InsuredPatientStore::new(&db)
            .list_all()
            .unwrap();
        assert!(!insured.is_empty());
        for row in insured {
            assert!((6..=29).contains(&row.duration_months));
            assert!(InsuranceType::ALL.contains(&row.insurance_type));
            assert_ne!(row.patient.insurance_id, None);
        }
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(Lifecycle::global(), Lifecycle::global()));
    }
}
