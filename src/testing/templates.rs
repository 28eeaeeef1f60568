//! The test lifecycle engine.
//!
//! Every conformance test, whatever its category, runs through the same
//! four-phase protocol: setup → execute → validate → teardown. Setup,
//! validate and teardown are optional — a test that does not implement
//! one reports [`HookOutcome::Skipped`] and the phase is simply absent,
//! never a failure. Execute is the test body; its failure aborts
//! validation but never teardown, which runs on every exit path.
//!
//! The four categories are tagged variants over that one protocol:
//! each contributes its own bound context and its own id format.
//!
//! | Category  | id format                          |
//! |-----------|------------------------------------|
//! | tap       | `tap__{name}`                      |
//! | stream    | `{stream}__{name}`                 |
//! | attribute | `{stream}__{attribute}__{name}`    |
//! | target    | `target__{name}`                   |

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::stream::Stream;
use crate::tap::Tap;
use crate::target::Target;
use crate::testing::config::SuiteConfig;
use crate::testing::runner::{TapTestRunner, TargetTestRunner};

/// Category of a conformance test, mirrored in its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Tap,
    Stream,
    Attribute,
    Target,
}

impl PluginKind {
    pub fn as_str(&self) -> &str {
        match self {
            PluginKind::Tap => "tap",
            PluginKind::Stream => "stream",
            PluginKind::Attribute => "attribute",
            PluginKind::Target => "target",
        }
    }
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an optional lifecycle phase reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// The hook ran to completion.
    Ran,
    /// The test does not implement this phase; nothing was done.
    Skipped,
}

/// Opaque external resource a suite may thread into every run
/// (a database handle, a scratch directory, ...).
pub type TestResource = Arc<dyn Any + Send + Sync>;

/// Identity shared by all test categories.
pub trait TestIdentity {
    /// Test name; must be non-empty before a run is attempted.
    fn name(&self) -> &str;

    fn kind(&self) -> PluginKind;
}

/// A run context that can drive a full sync of the plugin under test.
#[async_trait]
pub trait SyncContext: Send {
    async fn sync_all(&mut self) -> Result<()>;
}

/// The shared four-phase lifecycle, generic over the bound context.
///
/// `execute` defaults to a full sync through the runner; the optional
/// phases default to [`HookOutcome::Skipped`]. Returning an error from
/// any hook means "implemented, but failed" and is surfaced — except
/// that a teardown failure never hides an earlier one.
#[async_trait]
pub trait TestTemplate<Cx: SyncContext>: TestIdentity + Send {
    async fn setup(&mut self, cx: &mut Cx) -> Result<HookOutcome> {
        let _ = cx;
        Ok(HookOutcome::Skipped)
    }

    async fn execute(&mut self, cx: &mut Cx) -> Result<()> {
        cx.sync_all().await
    }

    async fn validate(&mut self, cx: &mut Cx) -> Result<HookOutcome> {
        let _ = cx;
        Ok(HookOutcome::Skipped)
    }

    async fn teardown(&mut self, cx: &mut Cx) -> Result<HookOutcome> {
        let _ = cx;
        Ok(HookOutcome::Skipped)
    }
}

/// Drive one test through setup → execute → validate → teardown.
///
/// Validation only runs after a successful execute. Teardown always
/// runs, even when execute or validate failed; in that case the
/// original failure is returned and a teardown failure is only logged.
/// A setup failure surfaces before any later phase is attempted.
pub async fn run_lifecycle<Cx, T>(case: &mut T, cx: &mut Cx) -> Result<()>
where
    Cx: SyncContext,
    T: TestTemplate<Cx> + ?Sized,
{
    if case.name().is_empty() {
        bail!("{} test must have a non-empty name", case.kind());
    }

    case.setup(cx).await?;

    let result = match case.execute(cx).await {
        Ok(()) => case.validate(cx).await.map(|_| ()),
        Err(err) => Err(err),
    };

    let teardown = case.teardown(cx).await;

    match (result, teardown) {
        (Err(err), Err(teardown_err)) => {
            tracing::warn!("teardown failed after an earlier error: {teardown_err:#}");
            Err(err)
        }
        (Err(err), Ok(_)) => Err(err),
        (Ok(()), Err(teardown_err)) => Err(teardown_err),
        (Ok(()), Ok(_)) => Ok(()),
    }
}

// ============================================================================
// Tap-level tests
// ============================================================================

/// Context bound for one tap-level run: a fresh tap instance plus the
/// shared runner whose captured output the test may inspect.
pub struct TapTestContext<'a> {
    pub suite: &'a SuiteConfig,
    pub resource: Option<TestResource>,
    pub runner: &'a mut TapTestRunner,
    pub tap: Tap,
}

#[async_trait]
impl SyncContext for TapTestContext<'_> {
    async fn sync_all(&mut self) -> Result<()> {
        self.runner.sync_all().await
    }
}

/// Tap-level conformance test.
#[async_trait]
pub trait TapTest: for<'a> TestTemplate<TapTestContext<'a>> {
    fn id(&self) -> String {
        format!("tap__{}", self.name())
    }

    /// Bind a fresh tap from the runner and drive the lifecycle.
    async fn run(
        &mut self,
        suite: &SuiteConfig,
        resource: Option<TestResource>,
        runner: &mut TapTestRunner,
    ) -> Result<()> {
        let tap = runner.new_tap().await?;
        let mut cx = TapTestContext {
            suite,
            resource,
            runner,
            tap,
        };
        run_lifecycle(self, &mut cx).await
    }
}

#[async_trait]
impl<T> TapTest for T where T: for<'a> TestTemplate<TapTestContext<'a>> {}

// ============================================================================
// Stream-level tests
// ============================================================================

/// Context bound for one stream-level run: the stream under test
/// (borrowed for the run's duration) and the records the runner
/// captured for it.
pub struct StreamTestContext<'a> {
    pub suite: &'a SuiteConfig,
    pub resource: Option<TestResource>,
    pub runner: &'a mut TapTestRunner,
    pub stream: &'a dyn Stream,
    pub records: Vec<Map<String, Value>>,
}

impl StreamTestContext<'_> {
    /// Whether an empty capture for this stream is acceptable.
    pub fn ignore_no_records(&self) -> bool {
        self.suite.ignores_no_records_for(self.stream.name())
    }
}

#[async_trait]
impl SyncContext for StreamTestContext<'_> {
    async fn sync_all(&mut self) -> Result<()> {
        self.runner.sync_all().await
    }
}

/// Stream-level conformance test.
#[async_trait]
pub trait StreamTest: for<'a> TestTemplate<StreamTestContext<'a>> {
    fn id(&self, stream_name: &str) -> String {
        format!("{stream_name}__{}", self.name())
    }

    /// Bind the stream and its captured records, then drive the
    /// lifecycle.
    async fn run(
        &mut self,
        suite: &SuiteConfig,
        resource: Option<TestResource>,
        runner: &mut TapTestRunner,
        stream: &dyn Stream,
    ) -> Result<()> {
        let records = runner.stream_records(stream.name());
        let mut cx = StreamTestContext {
            suite,
            resource,
            runner,
            stream,
            records,
        };
        run_lifecycle(self, &mut cx).await
    }
}

#[async_trait]
impl<T> StreamTest for T where T: for<'a> TestTemplate<StreamTestContext<'a>> {}

// ============================================================================
// Attribute-level tests
// ============================================================================

/// Context bound for one attribute-level run.
pub struct AttributeTestContext<'a> {
    pub suite: &'a SuiteConfig,
    pub resource: Option<TestResource>,
    pub runner: &'a mut TapTestRunner,
    pub stream: &'a dyn Stream,
    pub records: Vec<Map<String, Value>>,
    pub attribute_name: String,
    non_null_values: OnceLock<Vec<Value>>,
}

impl AttributeTestContext<'_> {
    /// Whether an empty capture for this stream is acceptable.
    pub fn ignore_no_records(&self) -> bool {
        self.suite.ignores_no_records_for(self.stream.name())
    }

    /// Values of the bound attribute across the captured records,
    /// nulls and absences dropped. Computed once per run; an empty
    /// result warns unless the suite accepts empty captures for this
    /// stream — deciding whether empty is a failure is the caller's
    /// business.
    pub fn non_null_attribute_values(&self) -> &[Value] {
        self.non_null_values.get_or_init(|| {
            let values: Vec<Value> = self
                .records
                .iter()
                .filter_map(|record| record.get(&self.attribute_name))
                .filter(|value| !value.is_null())
                .cloned()
                .collect();
            if values.is_empty() && !self.ignore_no_records() {
                tracing::warn!(
                    "no non-null '{}' values captured for stream '{}'",
                    self.attribute_name,
                    self.stream.name()
                );
            }
            values
        })
    }
}

#[async_trait]
impl SyncContext for AttributeTestContext<'_> {
    async fn sync_all(&mut self) -> Result<()> {
        self.runner.sync_all().await
    }
}

/// Attribute-level conformance test.
///
/// Unlike the lifecycle hooks, [`AttributeTest::evaluate`] has no
/// default: applicability must be decidable before a test is even
/// instantiated, so every attribute test supplies its classifier.
#[async_trait]
pub trait AttributeTest: for<'a> TestTemplate<AttributeTestContext<'a>> {
    fn id(&self, stream_name: &str, attribute_name: &str) -> String {
        format!("{stream_name}__{attribute_name}__{}", self.name())
    }

    /// Pure classifier: does this test apply to the given schema-typed
    /// property of the given stream?
    fn evaluate(stream: &dyn Stream, property_name: &str, property_schema: &Value) -> bool
    where
        Self: Sized;

    /// Bind the stream, its captured records and the attribute under
    /// test, then drive the lifecycle.
    async fn run(
        &mut self,
        suite: &SuiteConfig,
        resource: Option<TestResource>,
        runner: &mut TapTestRunner,
        stream: &dyn Stream,
        attribute_name: &str,
    ) -> Result<()> {
        let records = runner.stream_records(stream.name());
        let mut cx = AttributeTestContext {
            suite,
            resource,
            runner,
            stream,
            records,
            attribute_name: attribute_name.to_string(),
            non_null_values: OnceLock::new(),
        };
        run_lifecycle(self, &mut cx).await
    }
}

// ============================================================================
// Target-level tests
// ============================================================================

/// Context bound for one target-level run: a fresh target instance
/// plus the shared runner.
pub struct TargetTestContext<'a> {
    pub suite: &'a SuiteConfig,
    pub resource: Option<TestResource>,
    pub runner: &'a mut TargetTestRunner,
    pub target: Target,
}

#[async_trait]
impl SyncContext for TargetTestContext<'_> {
    async fn sync_all(&mut self) -> Result<()> {
        self.runner.sync_all().await
    }
}

/// Target-level conformance test.
///
/// File-driven target tests — "replay a fixed captured message stream
/// into a target and assert on side effects" — override
/// [`TargetTest::singer_filepath`]; the fixture then must exist before
/// any phase runs and is injected into the runner as the input source.
#[async_trait]
pub trait TargetTest: for<'a> TestTemplate<TargetTestContext<'a>> {
    fn id(&self) -> String {
        format!("target__{}", self.name())
    }

    /// Fixture file to replay through the target, for tests that
    /// source their input from a `.singer` file (conventionally
    /// [`singer_fixture_path`] under the runner's fixture directory).
    /// `None`, the default, leaves the runner's input untouched.
    fn singer_filepath(&self, fixture_dir: &Path) -> Option<PathBuf> {
        let _ = fixture_dir;
        None
    }

    /// Check any configured fixture, bind a fresh target from the
    /// runner and drive the lifecycle.
    async fn run(
        &mut self,
        suite: &SuiteConfig,
        resource: Option<TestResource>,
        runner: &mut TargetTestRunner,
    ) -> Result<()> {
        if let Some(path) = self.singer_filepath(runner.fixture_dir()) {
            if !path.is_file() {
                bail!("singer fixture {} does not exist", path.display());
            }
            runner.set_input_path(path);
        }

        let target = runner.new_target().await?;
        let mut cx = TargetTestContext {
            suite,
            resource,
            runner,
            target,
        };
        run_lifecycle(self, &mut cx).await
    }
}

/// Conventional fixture location for file-driven target tests:
/// `<fixture_dir>/<test name>.singer`.
pub fn singer_fixture_path(fixture_dir: &Path, test_name: &str) -> PathBuf {
    fixture_dir.join(format!("{test_name}.singer"))
}
