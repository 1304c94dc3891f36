//! The command iteration engine.
//!
//! One user request drives a loop: ask the model, detect a command in
//! the reply, dispatch it, feed the result back as a synthetic user
//! turn, repeat, until the model answers without a command or the
//! iteration cap is reached. Three delivery modes share the decision
//! core: blocking, event streaming, and a chunk generator.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use toolchat_config::{EngineConfig, PromptTemplates};
use toolchat_core::{
    CancelFlag, ChatRequest, DispatchOutcome, ExecutionStatusHandle, Provider, ProviderError,
    Role, ToolRegistry, Turn,
};

use crate::composer::PromptComposer;
use crate::dispatcher::Dispatcher;
use crate::events::EngineEvent;
use crate::parser::CommandSyntax;
use crate::policy::{KeywordSummaryPolicy, SummaryPolicy};

/// The canonical text returned when a run is cancelled.
pub const STOPPED_TEXT: &str = "**Execution stopped**\nProcessing was interrupted by user.";

// Pacing before letting the model retry an unknown tool in blocking mode
const RETRY_DELAY: Duration = Duration::from_millis(500);

pub struct Engine {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    dispatcher: Dispatcher,
    composer: PromptComposer,
    syntax: CommandSyntax,
    config: EngineConfig,
    model: String,
    system_prompt: Option<String>,
    cancel: CancelFlag,
    status: ExecutionStatusHandle,
    summary_policy: Arc<dyn SummaryPolicy>,
}

impl Engine {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
        config: EngineConfig,
        templates: PromptTemplates,
        model: impl Into<String>,
    ) -> Self {
        let cancel = CancelFlag::default();
        let status = ExecutionStatusHandle::new();
        let syntax = CommandSyntax::from_config(&config);
        let dispatcher = Dispatcher::new(Arc::clone(&registry), status.clone(), cancel.clone());
        let composer = PromptComposer::new(templates, syntax.clone());

        Self {
            provider,
            registry,
            dispatcher,
            composer,
            syntax,
            config,
            model: model.into(),
            system_prompt: None,
            cancel,
            status,
            summary_policy: Arc::new(KeywordSummaryPolicy::new()),
        }
    }

    /// Set the user's base system instructions.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Replace the summary heuristic.
    pub fn with_summary_policy(mut self, policy: Arc<dyn SummaryPolicy>) -> Self {
        self.summary_policy = policy;
        self
    }

    /// The shared cancellation flag. Trigger it from another task to
    /// stop the current run at the next suspension point.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// The execution status handle, for status displays.
    pub fn status(&self) -> ExecutionStatusHandle {
        self.status.clone()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The full composed system prompt: tool block, notices, and the
    /// user's base instructions.
    pub fn effective_system_prompt(&self) -> String {
        let descriptors = self
            .registry
            .descriptors(self.config.enabled_tools.as_ref());
        self.composer
            .compose(self.system_prompt.as_deref(), &descriptors)
    }

    /// Run one request in blocking mode: non-streaming round trips,
    /// final text returned in one piece.
    pub async fn run(&self, user_input: &str, history: &mut Vec<Turn>) -> String {
        self.run_loop(user_input, history, Sink::Silent).await
    }

    /// Run one request with streamed delivery: content chunks, command
    /// lines, and command results arrive as [`EngineEvent`]s, finishing
    /// with `Done`.
    pub async fn run_streaming(
        &self,
        user_input: &str,
        history: &mut Vec<Turn>,
        events: mpsc::Sender<EngineEvent>,
    ) -> String {
        let full_response = self.run_loop(user_input, history, Sink::Events(&events)).await;
        let _ = events
            .send(EngineEvent::Done {
                full_response: full_response.clone(),
            })
            .await;
        full_response
    }

    /// Run one request as a lazy stream of text chunks. The run is
    /// driven by a spawned task; dropping the stream abandons it. Not
    /// restartable.
    pub fn stream(
        self: &Arc<Self>,
        user_input: impl Into<String>,
        history: Arc<tokio::sync::Mutex<Vec<Turn>>>,
    ) -> ReceiverStream<String> {
        let (tx, rx) = mpsc::channel(64);
        let engine = Arc::clone(self);
        let user_input = user_input.into();
        tokio::spawn(async move {
            let mut history = history.lock().await;
            engine
                .run_loop(&user_input, &mut history, Sink::Chunks(&tx))
                .await;
        });
        ReceiverStream::new(rx)
    }

    /// The shared iteration loop behind all three delivery modes.
    async fn run_loop(&self, user_input: &str, history: &mut Vec<Turn>, sink: Sink<'_>) -> String {
        self.status.set_idle();
        self.refresh_system(history);
        history.push(Turn::user(user_input));

        let streaming = sink.is_streaming();
        let mut iterations: u32 = 0;
        let mut full_response = String::new();
        let mut summary_requested = false;

        while iterations < self.config.max_iterations {
            if self.cancel.is_set() {
                return self.stopped(&sink).await;
            }

            debug!(
                iteration = iterations + 1,
                messages = history.len(),
                model = %self.model,
                "Requesting completion"
            );

            let reply = if streaming {
                match self.stream_reply(history, &sink).await {
                    Ok(reply) => reply,
                    Err(e) => return self.transport_failure(&e, &sink).await,
                }
            } else {
                match self.provider.complete(self.build_request(history)).await {
                    Ok(response) => response.content,
                    Err(e) => return self.transport_failure(&e, &sink).await,
                }
            };

            full_response.push_str(&reply);

            // Cancelled mid-stream: keep the partial reply, stop cleanly
            if self.cancel.is_set() {
                history.push(Turn::assistant(reply));
                return self.stopped(&sink).await;
            }

            let parsed = self.syntax.parse(&reply);
            history.push(Turn::assistant(reply.clone()));

            match parsed {
                None => {
                    if streaming && iterations > 0 && !summary_requested {
                        if self.summary_policy.is_complete_answer(&reply) {
                            debug!("Reply reads like a complete answer");
                            break;
                        }
                        debug!("Requesting final summary");
                        history.push(Turn::synthetic_user(
                            &self.composer.templates().final_summary_prompt,
                        ));
                        summary_requested = true;
                        iterations += 1;
                        continue;
                    }
                    break;
                }
                Some(Err(_)) => {
                    let hint = self.syntax.usage_hint();
                    warn!("Malformed command line in reply");
                    sink.command_result(&hint).await;
                    history.push(Turn::synthetic_user(&hint));
                    iterations += 1;
                    continue;
                }
                Some(Ok(invocation)) => {
                    info!(tool = %invocation.name, "Command detected");
                    sink.command_line(reply.trim()).await;

                    let outcome = self.dispatcher.dispatch(&invocation).await;
                    let rendered = outcome.render();
                    sink.command_result(&rendered).await;

                    match outcome {
                        DispatchOutcome::Interrupted => {
                            return self.stopped(&sink).await;
                        }
                        DispatchOutcome::Unavailable { name } => {
                            history.push(Turn::synthetic_user(format!(
                                "Tool '{name}' is not available. Please use only available \
                                 tools from the list provided in the system prompt."
                            )));
                            if !streaming {
                                tokio::time::sleep(RETRY_DELAY).await;
                            }
                            iterations += 1;
                            continue;
                        }
                        DispatchOutcome::Failed { .. } => {
                            history.push(Turn::synthetic_user(
                                self.composer.templates().render_execution(&rendered),
                            ));
                            iterations += 1;

                            if self.config.prune_failed_commands && history.len() >= 2 {
                                // Drop the failed command and its result
                                // prompt so the retry starts clean
                                history.pop();
                                history.pop();
                                debug!(history_len = history.len(), "Pruned failed command");
                            }

                            history.push(Turn::synthetic_user(format!(
                                "**Error**: {rendered}\n\n{}",
                                self.composer.templates().render_retry(&rendered)
                            )));
                            continue;
                        }
                        DispatchOutcome::Success { .. } => {
                            history.push(Turn::synthetic_user(
                                self.composer.templates().render_execution(&rendered),
                            ));
                            iterations += 1;
                            continue;
                        }
                    }
                }
            }
        }

        if iterations >= self.config.max_iterations {
            let note = format!(
                "\n\n[Note: Reached maximum execution steps ({}), task may not be fully completed]",
                self.config.max_iterations
            );
            info!(max_iterations = self.config.max_iterations, "Iteration cap reached");
            sink.chunk(&note).await;
            full_response.push_str(&note);
        }

        self.status.set_idle();
        full_response
    }

    /// Stream one reply, forwarding raw chunks to the sink.
    async fn stream_reply(
        &self,
        history: &[Turn],
        sink: &Sink<'_>,
    ) -> Result<String, ProviderError> {
        let mut rx = self.provider.stream(self.build_request(history)).await?;
        let mut reply = String::new();

        while let Some(chunk) = rx.recv().await {
            if self.cancel.is_set() {
                break;
            }
            let chunk = chunk?;
            if let Some(content) = chunk.content {
                if !content.is_empty() {
                    sink.chunk(&content).await;
                    reply.push_str(&content);
                }
            }
            if chunk.done {
                break;
            }
        }

        Ok(reply)
    }

    async fn stopped(&self, sink: &Sink<'_>) -> String {
        self.cancel.reset();
        self.status.set_stopped();
        info!("Run stopped by user");
        sink.chunk(STOPPED_TEXT).await;
        STOPPED_TEXT.to_string()
    }

    async fn transport_failure(&self, error: &ProviderError, sink: &Sink<'_>) -> String {
        warn!(error = %error, "Provider transport failure");
        self.status.set_idle();
        let message = describe_provider_error(error);
        sink.error(&message).await;
        message
    }

    /// Keep the leading system turn in sync with the current registry
    /// and base instructions.
    fn refresh_system(&self, history: &mut Vec<Turn>) {
        let prompt = self.effective_system_prompt();
        match history.first_mut() {
            Some(first) if first.role == Role::System => first.content = prompt,
            _ => history.insert(0, Turn::system(prompt)),
        }
    }

    fn build_request(&self, history: &[Turn]) -> ChatRequest {
        let mut request = ChatRequest::new(&self.model, history.to_vec());
        request.temperature = self.config.temperature;
        request.max_tokens = self.config.max_tokens;
        request.top_p = self.config.top_p;
        request.stop = self.config.stop.clone();
        request.presence_penalty = self.config.presence_penalty;
        request.frequency_penalty = self.config.frequency_penalty;
        request
    }
}

/// Where run output goes: nowhere (blocking), an event channel, or a
/// plain chunk channel.
enum Sink<'a> {
    Silent,
    Events(&'a mpsc::Sender<EngineEvent>),
    Chunks(&'a mpsc::Sender<String>),
}

impl Sink<'_> {
    fn is_streaming(&self) -> bool {
        !matches!(self, Sink::Silent)
    }

    async fn chunk(&self, content: &str) {
        match self {
            Sink::Silent => {}
            Sink::Events(tx) => {
                let _ = tx
                    .send(EngineEvent::Chunk {
                        content: content.to_string(),
                    })
                    .await;
            }
            Sink::Chunks(tx) => {
                let _ = tx.send(content.to_string()).await;
            }
        }
    }

    async fn command_line(&self, line: &str) {
        if let Sink::Events(tx) = self {
            let _ = tx
                .send(EngineEvent::CommandLine {
                    line: line.to_string(),
                })
                .await;
        }
    }

    async fn command_result(&self, output: &str) {
        match self {
            Sink::Silent => {}
            Sink::Events(tx) => {
                let _ = tx
                    .send(EngineEvent::CommandResult {
                        output: output.to_string(),
                    })
                    .await;
            }
            Sink::Chunks(tx) => {
                let _ = tx
                    .send(format!("\n\n**Command Execution Result**\n```\n{output}\n```"))
                    .await;
            }
        }
    }

    async fn error(&self, message: &str) {
        match self {
            Sink::Silent => {}
            Sink::Events(tx) => {
                let _ = tx
                    .send(EngineEvent::Error {
                        message: message.to_string(),
                    })
                    .await;
            }
            Sink::Chunks(tx) => {
                let _ = tx.send(message.to_string()).await;
            }
        }
    }
}

/// One place where transport failures become user-visible text.
fn describe_provider_error(error: &ProviderError) -> String {
    let mut message = format!("**Connection Error**\n\n{error}\n\n");
    match error {
        ProviderError::Network(_) => {
            message.push_str(
                "Possible causes:\n\
                 - Network connection issue\n\
                 - API server is down or unreachable\n\
                 - Firewall or proxy blocking the connection",
            );
        }
        ProviderError::Timeout(_) => {
            message.push_str(
                "The request took too long. Try again, or lower max_tokens if replies are large.",
            );
        }
        ProviderError::AuthenticationFailed(_) => {
            message.push_str(
                "Check your API key (config file or DEEPSEEK_API_KEY / OPENAI_API_KEY / \
                 ANTHROPIC_API_KEY environment variables).",
            );
        }
        ProviderError::RateLimited { retry_after_secs } => {
            message.push_str(&format!(
                "The provider is rate limiting requests. Wait {retry_after_secs}s and try again."
            ));
        }
        _ => {
            message.push_str("Check the provider configuration and try again.");
        }
    }
    message
}
