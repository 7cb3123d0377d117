//! # Arazzo Engine
//!
//! Executes Arazzo 1.0.x workflow descriptions: dependency-ordered
//! scheduling, stepwise execution through an injected operation executor,
//! runtime expression evaluation, criterion-gated success and control-flow
//! actions (end/goto/retry), and structural validation gating it all.
//!
//! ## Key pieces
//!
//! - **`expr`**: the `$…` runtime expression language (parser + evaluator)
//!   with embedded `{$…}` interpolation and JSON-Pointer body traversal
//! - **`validator`**: the static rule set over a document, collected
//!   non-fatally with paths
//! - **`executor`**: the injected transport seam; the engine builds
//!   requests and never touches HTTP itself
//! - **[`Engine`]**: the facade owning configuration, resolved sources,
//!   and the per-engine expression/regex/JSONPath caches
//!
//! ## Usage
//!
//! ```rust,ignore
//! let engine = Engine::new(document)
//!     .with_executor(executor)
//!     .with_sources(sources);
//! let report = engine.validate();
//! if !report.has_errors() {
//!     let result = engine.run_all(&cancel, &inputs).await?;
//! }
//! ```
//!
//! A single engine instance is single-threaded and cooperative: drive it
//! from one task, cancel it through the token it is handed. Separate
//! engines are fully independent.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use arazzo_types::{ArazzoDocument, Components, Value};

mod actions;
mod cache;
pub mod context;
mod criteria;
pub mod error;
pub mod executor;
pub mod expr;
pub mod result;
mod runner;
mod scheduler;
pub mod sources;
mod step;
pub mod validator;

pub use error::{EngineError, StepFailureError};
pub use executor::{ExecutionParameter, ExecutionRequest, ExecutionResponse, OperationExecutor, ParameterLocation};
pub use result::{RunResult, StepResult, WorkflowResult};
pub use sources::ResolvedSource;
pub use validator::{IssueCode, ValidationIssue, ValidationResult};

use cache::Caches;

/// Engine tunables.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Keep decoded response bodies on the context after step outputs are
    /// evaluated. Off by default to bound memory; the body is transient
    /// either way and cleared when the next step starts.
    pub retain_response_bodies: bool,
}

/// The workflow engine: one document, one executor, per-engine caches.
pub struct Engine {
    pub(crate) document: Arc<ArazzoDocument>,
    pub(crate) components: Arc<Components>,
    pub(crate) executor: Option<Arc<dyn OperationExecutor>>,
    pub(crate) sources: Vec<ResolvedSource>,
    pub(crate) config: EngineConfig,
    pub(crate) caches: Caches,
}

impl Engine {
    /// Creates an engine over a document, with no executor attached.
    pub fn new(document: ArazzoDocument) -> Self {
        let components = Arc::new(document.components.clone().unwrap_or_default());
        Engine {
            document: Arc::new(document),
            components,
            executor: None,
            sources: Vec::new(),
            config: EngineConfig::default(),
            caches: Caches::default(),
        }
    }

    /// Attaches the operation executor steps will run against.
    pub fn with_executor(mut self, executor: Arc<dyn OperationExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Attaches host-resolved source documents.
    pub fn with_sources(mut self, sources: Vec<ResolvedSource>) -> Self {
        self.sources = sources;
        self
    }

    /// Overrides the default configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The document this engine executes.
    pub fn document(&self) -> &ArazzoDocument {
        &self.document
    }

    /// Runs the structural rule set over the document and attached sources.
    ///
    /// Nothing is thrown; gate execution on
    /// [`ValidationResult::has_errors`].
    pub fn validate(&self) -> ValidationResult {
        validator::validate_document(&self.document, &self.sources)
    }

    /// Drops every cached parsed expression, compiled regex, and parsed
    /// JSONPath query.
    pub fn clear_caches(&self) {
        self.caches.clear();
    }

    /// Runs every workflow in dependency order.
    ///
    /// `inputs` maps workflow ids to their input values. Only a dependency
    /// cycle or cancellation observed between workflows returns `Err`;
    /// everything else, dependency failures included, is reported per
    /// workflow inside the [`RunResult`].
    pub async fn run_all(
        &self,
        cancel: &CancellationToken,
        inputs: &IndexMap<String, IndexMap<String, Value>>,
    ) -> Result<RunResult, EngineError> {
        scheduler::run_all(self, cancel, inputs).await
    }

    /// Runs a single workflow by id.
    ///
    /// `Err` covers conditions that prevent the workflow from starting
    /// (unknown id); failures inside the run are reported on the returned
    /// [`WorkflowResult`].
    pub async fn run_workflow(
        &self,
        cancel: &CancellationToken,
        workflow_id: &str,
        inputs: IndexMap<String, Value>,
    ) -> Result<WorkflowResult, EngineError> {
        let mut state = runner::RunState::default();
        runner::run_workflow_scoped(self, cancel, &mut state, workflow_id, inputs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use arazzo_types::{Criterion, FailureAction, Info, Parameter, SourceDescription, Step, SuccessAction, Workflow};

    /// Pops scripted responses in order; beyond the script every call gets
    /// an empty 200. Records each request for assertions.
    struct ScriptedExecutor {
        responses: Mutex<VecDeque<ExecutionResponse>>,
        requests: Mutex<Vec<ExecutionRequest>>,
    }

    impl ScriptedExecutor {
        fn new(responses: Vec<ExecutionResponse>) -> Arc<Self> {
            Arc::new(ScriptedExecutor {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn empty() -> Arc<Self> {
            Self::new(Vec::new())
        }

        fn observed_operation_ids(&self) -> Vec<String> {
            self.requests
                .lock()
                .expect("requests lock")
                .iter()
                .map(|request| request.operation_id.clone().unwrap_or_default())
                .collect()
        }

        fn call_count(&self) -> usize {
            self.requests.lock().expect("requests lock").len()
        }
    }

    fn response(status_code: u16, body: Value) -> ExecutionResponse {
        ExecutionResponse {
            status_code,
            body,
            url: "https://api.example.com/call".into(),
            method: "get".into(),
            ..ExecutionResponse::default()
        }
    }

    #[async_trait]
    impl OperationExecutor for ScriptedExecutor {
        async fn execute(&self, _cancel: &CancellationToken, request: ExecutionRequest) -> anyhow::Result<ExecutionResponse> {
            self.requests.lock().expect("requests lock").push(request);
            let next = self.responses.lock().expect("responses lock").pop_front();
            Ok(next.unwrap_or_else(|| response(200, Value::Null)))
        }
    }

    /// Always fails at the transport layer.
    struct FailingExecutor;

    #[async_trait]
    impl OperationExecutor for FailingExecutor {
        async fn execute(&self, _cancel: &CancellationToken, _request: ExecutionRequest) -> anyhow::Result<ExecutionResponse> {
            Err(anyhow!("connection refused"))
        }
    }

    fn operation_step(step_id: &str, operation_id: &str) -> Step {
        Step {
            step_id: step_id.into(),
            operation_id: Some(operation_id.into()),
            ..Step::default()
        }
    }

    fn single_step_workflow(workflow_id: &str, operation_id: &str) -> Workflow {
        Workflow {
            workflow_id: workflow_id.into(),
            steps: vec![operation_step("s1", operation_id)],
            ..Workflow::default()
        }
    }

    fn document(workflows: Vec<Workflow>) -> ArazzoDocument {
        ArazzoDocument {
            arazzo: "1.0.1".into(),
            info: Some(Info {
                title: "test".into(),
                version: "1.0.0".into(),
                ..Info::default()
            }),
            source_descriptions: vec![SourceDescription {
                name: "petstore".into(),
                url: "https://example.com/openapi.yaml".into(),
                kind: "openapi".into(),
            }],
            workflows,
            components: None,
        }
    }

    fn status_criterion(expected: u16) -> Criterion {
        Criterion {
            condition: format!("$statusCode == {expected}"),
            ..Criterion::default()
        }
    }

    async fn run_all_default(engine: &Engine) -> RunResult {
        engine
            .run_all(&CancellationToken::new(), &IndexMap::new())
            .await
            .expect("run all")
    }

    #[tokio::test]
    async fn independent_workflows_execute_in_declared_order() {
        let executor = ScriptedExecutor::empty();
        let engine = Engine::new(document(vec![
            single_step_workflow("wf3", "op3"),
            single_step_workflow("wf1", "op1"),
            single_step_workflow("wf2", "op2"),
        ]))
        .with_executor(executor.clone());

        let result = run_all_default(&engine).await;

        assert!(result.success);
        assert_eq!(executor.observed_operation_ids(), ["op3", "op1", "op2"]);
        let ordered: Vec<&str> = result.workflows.iter().map(|workflow| workflow.workflow_id.as_str()).collect();
        assert_eq!(ordered, ["wf3", "wf1", "wf2"]);
    }

    #[tokio::test]
    async fn missing_dependency_fails_that_workflow_only() {
        let executor = ScriptedExecutor::empty();
        let mut dependent = single_step_workflow("wf2", "op2");
        dependent.depends_on = vec!["missing".into()];
        let engine = Engine::new(document(vec![single_step_workflow("wf1", "op1"), dependent])).with_executor(executor.clone());

        let result = run_all_default(&engine).await;

        assert!(!result.success);
        assert_eq!(executor.observed_operation_ids(), ["op1"]);
        let failed = result.workflow("wf2").expect("wf2 result");
        match failed.error.as_ref().expect("wf2 error") {
            EngineError::UnresolvedWorkflowRef(name) => assert_eq!(name, "missing"),
            other => panic!("expected unresolved workflow ref, got {other:?}"),
        }
        assert!(result.workflow("wf1").expect("wf1 result").success);
    }

    #[tokio::test]
    async fn failed_dependency_propagates_as_dependency_failure() {
        let executor = ScriptedExecutor::new(vec![response(500, Value::Null)]);
        let mut first = single_step_workflow("wf1", "op1");
        first.steps[0].success_criteria = vec![status_criterion(200)];
        let mut second = single_step_workflow("wf2", "op2");
        second.depends_on = vec!["wf1".into()];
        let engine = Engine::new(document(vec![first, second])).with_executor(executor.clone());

        let result = run_all_default(&engine).await;

        assert!(!result.success);
        assert_eq!(executor.observed_operation_ids(), ["op1"]);
        assert!(matches!(
            result.workflow("wf2").expect("wf2").error,
            Some(EngineError::DependencyFailed { .. })
        ));
    }

    #[tokio::test]
    async fn retry_on_failure_reaches_success() {
        let executor = ScriptedExecutor::new(vec![response(500, Value::Null), response(200, Value::Null)]);
        let mut workflow = single_step_workflow("wf", "op");
        workflow.steps[0].success_criteria = vec![status_criterion(200)];
        workflow.steps[0].on_failure = vec![FailureAction {
            name: "retry-once".into(),
            kind: "retry".into(),
            retry_limit: Some(1),
            ..FailureAction::default()
        }];
        let engine = Engine::new(document(vec![workflow])).with_executor(executor.clone());

        let result = engine
            .run_workflow(&CancellationToken::new(), "wf", IndexMap::new())
            .await
            .expect("run workflow");

        assert!(result.success, "workflow should succeed on the retry: {:?}", result.error);
        assert_eq!(executor.call_count(), 2);
        let step = result.step("s1").expect("step result");
        assert!(step.success);
        assert_eq!(step.retries, 1);
    }

    #[tokio::test]
    async fn retry_limit_exhaustion_ends_with_the_step_error() {
        let executor = ScriptedExecutor::new(vec![response(500, Value::Null), response(500, Value::Null)]);
        let mut workflow = single_step_workflow("wf", "op");
        workflow.steps[0].success_criteria = vec![status_criterion(200)];
        workflow.steps[0].on_failure = vec![
            FailureAction {
                name: "retry-once".into(),
                kind: "retry".into(),
                retry_limit: Some(1),
                ..FailureAction::default()
            },
            FailureAction {
                name: "give-up".into(),
                kind: "end".into(),
                ..FailureAction::default()
            },
        ];
        let engine = Engine::new(document(vec![workflow])).with_executor(executor.clone());

        let result = engine
            .run_workflow(&CancellationToken::new(), "wf", IndexMap::new())
            .await
            .expect("run workflow");

        assert!(!result.success);
        assert_eq!(executor.call_count(), 2);
        assert!(matches!(result.error, Some(EngineError::StepFailure(_))));
    }

    #[tokio::test]
    async fn goto_step_skips_intermediate_steps() {
        let executor = ScriptedExecutor::empty();
        let mut workflow = Workflow {
            workflow_id: "wf".into(),
            steps: vec![
                operation_step("s1", "op1"),
                operation_step("s2", "op2"),
                operation_step("s3", "op3"),
            ],
            ..Workflow::default()
        };
        workflow.steps[0].on_success = vec![SuccessAction {
            name: "skip-ahead".into(),
            kind: "goto".into(),
            step_id: Some("s3".into()),
            ..SuccessAction::default()
        }];
        let engine = Engine::new(document(vec![workflow])).with_executor(executor.clone());

        let result = engine
            .run_workflow(&CancellationToken::new(), "wf", IndexMap::new())
            .await
            .expect("run workflow");

        assert!(result.success);
        assert_eq!(executor.observed_operation_ids(), ["op1", "op3"]);
    }

    #[tokio::test]
    async fn sub_workflow_receives_step_parameters_as_inputs() {
        let executor = ScriptedExecutor::empty();
        let main = Workflow {
            workflow_id: "main".into(),
            steps: vec![Step {
                step_id: "callSub".into(),
                workflow_id: Some("sub".into()),
                parameters: vec![Parameter {
                    name: "token".into(),
                    value: Some(Value::String("$inputs.token".into())),
                    ..Parameter::default()
                }],
                ..Step::default()
            }],
            ..Workflow::default()
        };
        let sub = Workflow {
            workflow_id: "sub".into(),
            steps: vec![Step {
                step_id: "authed".into(),
                operation_id: Some("authedOp".into()),
                parameters: vec![Parameter {
                    name: "token".into(),
                    location: "header".into(),
                    value: Some(Value::String("$inputs.token".into())),
                    ..Parameter::default()
                }],
                ..Step::default()
            }],
            ..Workflow::default()
        };
        let engine = Engine::new(document(vec![main, sub])).with_executor(executor.clone());

        let mut inputs = IndexMap::new();
        inputs.insert("token".to_string(), Value::String("secret".into()));
        let result = engine
            .run_workflow(&CancellationToken::new(), "main", inputs)
            .await
            .expect("run workflow");

        assert!(result.success, "main should succeed: {:?}", result.error);
        let requests = executor.requests.lock().expect("requests lock");
        let header = requests[0]
            .parameters
            .iter()
            .find(|parameter| parameter.location == ParameterLocation::Header)
            .expect("header parameter");
        assert_eq!(header.name, "token");
        assert_eq!(header.value, Value::String("secret".into()));
    }

    #[tokio::test]
    async fn outputs_flow_from_body_pointer_to_workflow_outputs() {
        let body: Value = serde_yaml::from_str("{id: pet-42}").expect("body");
        let executor = ScriptedExecutor::new(vec![response(201, body)]);
        let mut workflow = single_step_workflow("wf", "createPet");
        workflow.steps[0].outputs.insert("petId".into(), "$response.body#/id".into());
        workflow.outputs.insert("createdPetId".into(), "$steps.s1.outputs.petId".into());
        let engine = Engine::new(document(vec![workflow])).with_executor(executor);

        let result = engine
            .run_workflow(&CancellationToken::new(), "wf", IndexMap::new())
            .await
            .expect("run workflow");

        assert!(result.success);
        assert_eq!(result.outputs.get("createdPetId"), Some(&Value::String("pet-42".into())));
    }

    #[tokio::test]
    async fn identical_inputs_produce_identical_requests() {
        let mut workflow = single_step_workflow("wf", "op");
        workflow.steps[0].parameters = vec![
            Parameter {
                name: "petName".into(),
                location: "query".into(),
                value: Some(Value::String("{$inputs.name}-pet".into())),
                ..Parameter::default()
            },
            Parameter {
                name: "limit".into(),
                location: "query".into(),
                value: Some(Value::Int(5)),
                ..Parameter::default()
            },
        ];
        let doc = document(vec![workflow]);

        let mut observed = Vec::new();
        for _ in 0..2 {
            let executor = ScriptedExecutor::empty();
            let engine = Engine::new(doc.clone()).with_executor(executor.clone());
            let mut inputs = IndexMap::new();
            inputs.insert("name".to_string(), Value::String("Rex".into()));
            let result = engine
                .run_workflow(&CancellationToken::new(), "wf", inputs)
                .await
                .expect("run workflow");
            assert!(result.success);
            let requests = executor.requests.lock().expect("requests lock");
            observed.push(
                requests[0]
                    .parameters
                    .iter()
                    .map(|parameter| (parameter.name.clone(), parameter.value.to_string()))
                    .collect::<Vec<_>>(),
            );
        }
        assert_eq!(observed[0], observed[1]);
    }

    #[tokio::test]
    async fn executor_errors_propagate_unwrapped_into_the_step() {
        let workflow = single_step_workflow("wf", "op");
        let engine = Engine::new(document(vec![workflow])).with_executor(Arc::new(FailingExecutor));

        let result = engine
            .run_workflow(&CancellationToken::new(), "wf", IndexMap::new())
            .await
            .expect("run workflow");

        assert!(!result.success);
        let step = result.step("s1").expect("step result");
        match step.error.as_ref().expect("step error") {
            EngineError::Executor(error) => assert_eq!(error.to_string(), "connection refused"),
            other => panic!("expected executor error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_executor_is_a_step_failure() {
        let engine = Engine::new(document(vec![single_step_workflow("wf", "op")]));
        let result = engine
            .run_workflow(&CancellationToken::new(), "wf", IndexMap::new())
            .await
            .expect("run workflow");
        assert!(!result.success);
        assert!(matches!(
            result.step("s1").expect("step").error,
            Some(EngineError::ExecutorNotConfigured)
        ));
    }

    fn nested_chain(depth: usize) -> Vec<Workflow> {
        (0..depth)
            .map(|level| {
                let step = if level + 1 < depth {
                    Step {
                        step_id: "call".into(),
                        workflow_id: Some(format!("w{}", level + 1)),
                        ..Step::default()
                    }
                } else {
                    operation_step("leaf", "leafOp")
                };
                Workflow {
                    workflow_id: format!("w{level}"),
                    steps: vec![step],
                    ..Workflow::default()
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn workflow_nesting_is_bounded_at_depth_32() {
        let executor = ScriptedExecutor::empty();
        let engine = Engine::new(document(nested_chain(31))).with_executor(executor.clone());
        let result = engine
            .run_workflow(&CancellationToken::new(), "w0", IndexMap::new())
            .await
            .expect("run workflow");
        assert!(result.success, "31 levels should run: {:?}", result.error);

        let engine = Engine::new(document(nested_chain(32))).with_executor(executor);
        let result = engine
            .run_workflow(&CancellationToken::new(), "w0", IndexMap::new())
            .await
            .expect("run workflow");
        assert!(!result.success, "32 levels must trip the depth bound");
    }

    #[tokio::test]
    async fn recursive_workflow_invocation_is_a_cycle() {
        let workflow = Workflow {
            workflow_id: "loop".into(),
            steps: vec![Step {
                step_id: "again".into(),
                workflow_id: Some("loop".into()),
                ..Step::default()
            }],
            ..Workflow::default()
        };
        let engine = Engine::new(document(vec![workflow])).with_executor(ScriptedExecutor::empty());

        let result = engine
            .run_workflow(&CancellationToken::new(), "loop", IndexMap::new())
            .await
            .expect("run workflow");

        assert!(!result.success);
        assert!(matches!(
            result.step("again").expect("step").error,
            Some(EngineError::CircularDependency(_))
        ));
    }

    #[tokio::test]
    async fn goto_loops_trip_the_transition_counter() {
        let executor = ScriptedExecutor::empty();
        let mut workflow = single_step_workflow("wf", "op");
        workflow.steps[0].on_success = vec![SuccessAction {
            name: "again".into(),
            kind: "goto".into(),
            step_id: Some("s1".into()),
            ..SuccessAction::default()
        }];
        let engine = Engine::new(document(vec![workflow])).with_executor(executor.clone());

        let result = engine
            .run_workflow(&CancellationToken::new(), "wf", IndexMap::new())
            .await
            .expect("run workflow");

        assert!(!result.success);
        assert!(matches!(result.error, Some(EngineError::CircularDependency(_))));
        // The counter trips on the 1024th transition, before that step runs.
        assert_eq!(executor.call_count(), 1023);
    }

    #[tokio::test]
    async fn cancelled_retry_sleep_surfaces_cancellation() {
        let executor = ScriptedExecutor::new(vec![response(500, Value::Null)]);
        let mut workflow = single_step_workflow("wf", "op");
        workflow.steps[0].success_criteria = vec![status_criterion(200)];
        workflow.steps[0].on_failure = vec![FailureAction {
            name: "retry-slowly".into(),
            kind: "retry".into(),
            retry_after: Some(30.0),
            retry_limit: Some(1),
            ..FailureAction::default()
        }];
        let engine = Engine::new(document(vec![workflow])).with_executor(executor.clone());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = engine.run_workflow(&cancel, "wf", IndexMap::new()).await.expect("run workflow");

        assert!(!result.success);
        assert!(matches!(result.error, Some(EngineError::Cancelled)));
        assert_eq!(executor.call_count(), 1);
        assert_eq!(result.step("s1").expect("step").retries, 0);
    }

    #[tokio::test]
    async fn cancellation_before_the_run_is_a_top_level_error() {
        let engine = Engine::new(document(vec![single_step_workflow("wf", "op")])).with_executor(ScriptedExecutor::empty());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = engine.run_all(&cancel, &IndexMap::new()).await.expect_err("cancelled");
        assert!(matches!(error, EngineError::Cancelled));
    }

    #[tokio::test]
    async fn goto_workflow_success_ends_the_current_workflow_successfully() {
        let executor = ScriptedExecutor::empty();
        let mut main = Workflow {
            workflow_id: "main".into(),
            steps: vec![operation_step("s1", "op1"), operation_step("s2", "op2")],
            ..Workflow::default()
        };
        main.steps[0].on_success = vec![SuccessAction {
            name: "handoff".into(),
            kind: "goto".into(),
            workflow_id: Some("other".into()),
            ..SuccessAction::default()
        }];
        let other = single_step_workflow("other", "otherOp");
        let engine = Engine::new(document(vec![main, other])).with_executor(executor.clone());

        let result = engine
            .run_workflow(&CancellationToken::new(), "main", IndexMap::new())
            .await
            .expect("run workflow");

        assert!(result.success);
        // s2 never runs; the handoff workflow does.
        assert_eq!(executor.observed_operation_ids(), ["op1", "otherOp"]);
    }

    #[tokio::test]
    async fn unmatched_failure_falls_through_to_the_next_step() {
        let executor = ScriptedExecutor::new(vec![response(500, Value::Null)]);
        let mut workflow = Workflow {
            workflow_id: "wf".into(),
            steps: vec![operation_step("s1", "op1"), operation_step("s2", "op2")],
            ..Workflow::default()
        };
        workflow.steps[0].success_criteria = vec![status_criterion(200)];
        let engine = Engine::new(document(vec![workflow])).with_executor(executor.clone());

        let result = engine
            .run_workflow(&CancellationToken::new(), "wf", IndexMap::new())
            .await
            .expect("run workflow");

        // Both steps ran, but the failed first step marks the workflow.
        assert_eq!(executor.observed_operation_ids(), ["op1", "op2"]);
        assert!(!result.success);
        assert!(result.error.is_none());
        assert!(!result.step("s1").expect("s1").success);
        assert!(result.step("s2").expect("s2").success);
    }

    #[tokio::test]
    async fn later_workflows_see_sibling_outputs() {
        let body: Value = serde_yaml::from_str("{token: t-99}").expect("body");
        let executor = ScriptedExecutor::new(vec![response(200, body)]);
        let mut first = single_step_workflow("login", "loginOp");
        first.steps[0].outputs.insert("token".into(), "$response.body#/token".into());
        first.outputs.insert("token".into(), "$steps.s1.outputs.token".into());

        let mut second = single_step_workflow("list", "listOp");
        second.depends_on = vec!["login".into()];
        second.steps[0].parameters = vec![Parameter {
            name: "Authorization".into(),
            location: "header".into(),
            value: Some(Value::String("$workflows.login.outputs.token".into())),
            ..Parameter::default()
        }];
        let engine = Engine::new(document(vec![first, second])).with_executor(executor.clone());

        let result = run_all_default(&engine).await;

        assert!(result.success);
        let requests = executor.requests.lock().expect("requests lock");
        let header = requests[1].parameters.first().expect("header parameter");
        assert_eq!(header.value, Value::String("t-99".into()));
    }
}
