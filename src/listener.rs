//! Test lifecycle hook that seeds and cleans MongoDB around each test method.
//!
//! # Order of Operations
//!
//! For every test method, [`FixtureListener::before_test_method`] moves
//! through these phases strictly in sequence:
//!
//! 1. [`LifecyclePhase::BeforeCleanup`] - cleanup pass, only if the method
//!    opted in
//! 2. [`LifecyclePhase::ClassFixtures`] - class-level fixtures, inherited
//!    classes first, in declaration order
//! 3. [`LifecyclePhase::MethodFixtures`] - method-level fixtures, in
//!    declaration order
//! 4. [`LifecyclePhase::Ready`] - the test body may run
//!
//! Nothing is torn down after a test. Cleanup runs at the start of the next
//! method that asks for it, so a failed test's data can still be inspected.
//! A suite therefore needs a cleanup-marked method after any method that
//! leaves fixtures behind.
//!
//! # Concurrency
//!
//! One listener serves one test at a time. Every step is awaited before the
//! next starts and all entry points take `&mut self`, so the databases each
//! loader touched are tracked per listener rather than process-wide.

use crate::cleanup::{CleanupCoordinator, CleanupReport};
use crate::context::TestContext;
use crate::document::DocumentFixtureLoader;
use crate::error::FixtureError;
use crate::fixture::FixtureDeclaration;
use crate::gridfs::FileFixtureLoader;
use tracing::{debug, info, info_span, Instrument};

/// Where a listener is in preparing the current test method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecyclePhase {
    #[default]
    BeforeCleanup,
    ClassFixtures,
    MethodFixtures,
    Ready,
}

/// Totals for one [`FixtureListener::before_test_method`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparationReport {
    pub cleanup: Option<CleanupReport>,
    pub documents_inserted: u64,
    pub files_uploaded: usize,
    pub bytes_uploaded: u64,
}

#[derive(Debug, Default)]
pub struct FixtureListener {
    documents: DocumentFixtureLoader,
    files: FileFixtureLoader,
    cleanup: CleanupCoordinator,
    phase: LifecyclePhase,
}

impl FixtureListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase reached by the last preparation; stays put when one fails.
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn document_loader(&self) -> &DocumentFixtureLoader {
        &self.documents
    }

    pub fn file_loader(&self) -> &FileFixtureLoader {
        &self.files
    }

    /// Prepare the database for the test in `context`.
    ///
    /// Any error aborts the remaining steps. Fixtures loaded before the
    /// failure are left in place.
    pub async fn before_test_method(
        &mut self,
        context: &TestContext<'_>,
    ) -> Result<PreparationReport, FixtureError> {
        let method = context.test_method.map(|m| m.name.as_str()).unwrap_or("");
        let span = info_span!("before_test_method", class = %context.test_class.name, method);
        self.prepare(context).instrument(span).await
    }

    /// Run a cleanup pass regardless of the method's marker.
    pub async fn cleanup(
        &mut self,
        context: &TestContext<'_>,
    ) -> Result<CleanupReport, FixtureError> {
        self.cleanup
            .cleanup(
                context,
                self.documents.touched_mut(),
                self.files.touched_mut(),
            )
            .await
    }

    async fn prepare(
        &mut self,
        context: &TestContext<'_>,
    ) -> Result<PreparationReport, FixtureError> {
        let mut report = PreparationReport::default();

        self.phase = LifecyclePhase::BeforeCleanup;
        if context.wants_cleanup() {
            info!("Running cleanup before test method");
            report.cleanup = Some(self.cleanup(context).await?);
        } else {
            debug!("Test method did not request cleanup");
        }

        self.phase = LifecyclePhase::ClassFixtures;
        let class_fixtures = context.test_class.class_fixtures();
        debug!("Loading {} class-level fixtures", class_fixtures.len());
        self.load_all(&class_fixtures, context, &mut report).await?;

        self.phase = LifecyclePhase::MethodFixtures;
        if let Some(method) = context.test_method {
            let method_fixtures = method.method_fixtures();
            debug!("Loading {} method-level fixtures", method_fixtures.len());
            self.load_all(&method_fixtures, context, &mut report).await?;
        }

        self.phase = LifecyclePhase::Ready;
        info!(
            "Fixtures ready: {} documents, {} files",
            report.documents_inserted, report.files_uploaded
        );
        Ok(report)
    }

    async fn load_all(
        &mut self,
        fixtures: &[FixtureDeclaration],
        context: &TestContext<'_>,
        report: &mut PreparationReport,
    ) -> Result<(), FixtureError> {
        for fixture in fixtures {
            match fixture {
                FixtureDeclaration::Document(doc) => {
                    report.documents_inserted += self.documents.load(doc, context).await?;
                }
                FixtureDeclaration::File(file) => {
                    report.bytes_uploaded += self.files.load(file, context).await?;
                    report.files_uploaded += 1;
                }
            }
        }
        Ok(())
    }
}
