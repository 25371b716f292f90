//! Streaming answer session of the ask surface.
//!
//! One session drives one question box: it loads the deployment named by the
//! route, streams answers, renders partial text at most every 100 ms, tracks
//! progress steps and keeps the host's URL and page metadata in sync.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use odds_client::{AnswerLookup, AskApi, ClientError};
use odds_schema::{AnswerEvent, AnswerPayload, AnswerStatus, Deployment, RelatedQuestion};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::cell::StateCell;
use crate::effect::AbortOnDrop;
use crate::host::{NavigationMode, PageMeta, ViewHost};
use crate::markdown::{ellipsize, render_content, text_direction, LinkTarget, RenderOptions, SafeHtml, TextDirection};
use crate::route::{AskRoute, Surface};
use crate::throttle::{sleep_until_opt, Throttle};

pub const PARTIAL_RENDER_WINDOW: Duration = Duration::from_millis(100);
pub const FOCUS_DELAY: Duration = Duration::from_millis(100);
const META_CHARS: usize = 100;
const SITE_NAME: &str = "Data Deep Search";

/// Progress messages shown while the agent works.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMessages {
    pub thinking: &'static str,
    pub getting_ready: &'static str,
    pub searching_data_sources: &'static str,
    pub fetching_data_source: &'static str,
    pub fetching_dataset_contents: &'static str,
    pub analyzing_dataset_data: &'static str,
    /// Any tool without a message of its own.
    pub working: &'static str,
}

impl StepMessages {
    pub const ENGLISH: Self = Self {
        thinking: "Thinking…",
        getting_ready: "Getting ready…",
        searching_data_sources: "Searching data sources…",
        fetching_data_source: "Fetching data source…",
        fetching_dataset_contents: "Fetching dataset contents…",
        analyzing_dataset_data: "Analyzing dataset data…",
        working: "Working…",
    };

    pub const HEBREW: Self = Self {
        thinking: "חושב…",
        getting_ready: "מתכונן…",
        searching_data_sources: "מחפש מאגרי מידע",
        fetching_data_source: "מושך מאגר המידע…",
        fetching_dataset_contents: "מושך תוכן מסד הנתונים…",
        analyzing_dataset_data: "מנתח נתוני מסד הנתונים…",
        working: "עובד…",
    };

    pub fn for_surface(surface: Surface) -> Self {
        match surface {
            Surface::Desktop => Self::ENGLISH,
            Surface::Mobile => Self::HEBREW,
        }
    }

    pub fn for_tool(&self, name: &str) -> Option<&'static str> {
        match name {
            "search_datasets" => Some(self.searching_data_sources),
            "fetch_dataset" => Some(self.fetching_data_source),
            "fetch_resource" => Some(self.fetching_dataset_contents),
            "query_resource_database" => Some(self.analyzing_dataset_data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnswerPhase {
    #[default]
    Idle,
    Asking,
    Answered,
    /// The error text is shown in place of the answer.
    Failed,
    /// The stream ended without a final answer; partial text stays visible.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Info,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub message: String,
}

impl Step {
    fn info(message: &str) -> Self {
        Self {
            kind: StepKind::Info,
            message: message.to_string(),
        }
    }

    fn tool(message: &str) -> Self {
        Self {
            kind: StepKind::Tool,
            message: message.to_string(),
        }
    }
}

/// Everything the question box renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerView {
    pub phase: AnswerPhase,
    pub deployment_id: Option<String>,
    pub deployment: Option<Deployment>,
    pub question: String,
    pub answer: Option<SafeHtml>,
    /// Markdown `answer` was rendered from.
    pub answer_markdown: String,
    pub loading: bool,
    pub full_answer: bool,
    pub steps: Vec<Step>,
    pub related: Option<Vec<RelatedQuestion>>,
    pub current_id: Option<String>,
}

impl AnswerView {
    pub fn examples(&self) -> &[String] {
        self.deployment
            .as_ref()
            .map(|d| d.examples.as_slice())
            .unwrap_or_default()
    }

    pub fn question_direction(&self) -> TextDirection {
        text_direction(&self.question)
    }
}

/// What the background tasks share with the session.
#[derive(Clone)]
struct Shared {
    api: Arc<dyn AskApi>,
    host: Arc<dyn ViewHost>,
    surface: Surface,
    messages: StepMessages,
    render: RenderOptions,
    view: StateCell<AnswerView>,
    /// Bumped whenever the question box starts over or starts asking.
    epoch: Arc<AtomicU64>,
}

impl Shared {
    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn supersede(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    fn route(&self) -> Option<AskRoute> {
        self.view
            .with(|v| v.deployment_id.clone())
            .map(|deployment| AskRoute::new(self.surface, deployment))
    }

    fn set_deployment(&self, deployment: Deployment) {
        self.host.set_page_meta(&PageMeta {
            title: format!("{SITE_NAME} - {}", deployment.agent_org_name),
            description: format!(
                "Ask Anything, and we'll try to locate the answer in {}",
                deployment.agent_catalog_descriptions
            ),
        });
        self.view.update(|v| {
            v.deployment = Some(deployment);
            true
        });
    }

    fn render_partial(&self, partial: &str) {
        let html = render_content(partial, &self.render);
        self.view.update(|v| {
            v.answer = Some(html);
            v.answer_markdown = partial.to_string();
            v.full_answer = false;
            true
        });
    }

    fn show_answer(&self, payload: &AnswerPayload) {
        let html = render_content(&payload.answer, &self.render);
        let org = self.view.with(|v| {
            v.deployment
                .as_ref()
                .map(|d| d.agent_org_name.clone())
                .unwrap_or_default()
        });
        self.view.update(|v| {
            v.phase = AnswerPhase::Answered;
            v.answer = Some(html);
            v.answer_markdown = payload.answer.clone();
            v.full_answer = true;
            v.loading = false;
            v.related = payload.related.clone();
            v.current_id = payload.id.clone();
            true
        });
        self.host.set_page_meta(&PageMeta {
            title: format!(
                "{} | {SITE_NAME} - {org}",
                ellipsize(&payload.question, META_CHARS)
            ),
            description: ellipsize(&payload.answer, META_CHARS),
        });
    }

    fn fail(&self, message: impl std::fmt::Display) {
        let text = format!("Error: {message}");
        let html = render_content(&text, &self.render);
        self.view.update(|v| {
            v.phase = AnswerPhase::Failed;
            v.answer = Some(html);
            v.answer_markdown = text;
            v.full_answer = true;
            v.loading = false;
            true
        });
    }

    fn on_status(&self, status: AnswerStatus) {
        let messages = self.messages;
        self.view.update(|v| match status {
            AnswerStatus::Preparing => {
                v.steps = vec![Step::info(messages.getting_ready)];
                true
            }
            AnswerStatus::Running => {
                v.steps = vec![Step::info(messages.thinking)];
                true
            }
            AnswerStatus::Complete => {
                v.full_answer = true;
                true
            }
            AnswerStatus::Other => false,
        });
    }

    fn on_tool(&self, name: &str) {
        let message = match self.messages.for_tool(name) {
            Some(message) => message,
            None => {
                tracing::warn!(tool = name, "no progress message for tool");
                self.messages.working
            }
        };
        self.view.update(|v| {
            v.steps.push(Step::tool(message));
            true
        });
    }

    async fn run_stream(self, question: String, deployment_id: String) {
        let mut stream = match self.api.stream_answer(&question, &deployment_id).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(deployment = %deployment_id, "failed to open answer stream: {e}");
                self.fail(e);
                return;
            }
        };

        let mut partial = String::new();
        let mut throttle = Throttle::new(PARTIAL_RENDER_WINDOW);
        loop {
            tokio::select! {
                event = stream.next() => match event {
                    Some(AnswerEvent::Text(delta)) => {
                        partial.push_str(&delta);
                        if throttle.offer(Instant::now()) {
                            self.render_partial(&partial);
                        }
                    }
                    Some(AnswerEvent::Status(status)) => self.on_status(status),
                    Some(AnswerEvent::Tool(tool)) => self.on_tool(&tool.name),
                    Some(AnswerEvent::Answer(payload)) => {
                        throttle.cancel();
                        self.finish(payload);
                        return;
                    }
                    None => {
                        if throttle.deadline().is_some() {
                            self.render_partial(&partial);
                        }
                        tracing::warn!(deployment = %deployment_id, "answer stream ended without an answer");
                        self.view.update(|v| {
                            v.phase = AnswerPhase::Interrupted;
                            v.loading = false;
                            true
                        });
                        return;
                    }
                },
                _ = sleep_until_opt(throttle.deadline()) => {
                    if throttle.fire(Instant::now()) {
                        self.render_partial(&partial);
                    }
                }
            }
        }
    }

    fn finish(&self, payload: AnswerPayload) {
        if let Some(error) = payload.error.as_deref() {
            tracing::warn!("answer failed: {error}");
            self.fail(error);
            return;
        }
        self.show_answer(&payload);
        match (payload.id.as_deref(), self.route()) {
            (Some(id), Some(route)) => {
                self.host
                    .navigate(&route.answer_path(id), NavigationMode::Replace);
            }
            _ => tracing::debug!("answer has no id, keeping the current URL"),
        }
    }

    async fn load(self, deployment_id: String, answer_id: Option<String>, epoch: u64) {
        match self.api.get_deployment(&deployment_id).await {
            Ok(deployment) => self.set_deployment(deployment),
            Err(e) => tracing::warn!(deployment = %deployment_id, "failed to load deployment: {e}"),
        }

        let Some(answer_id) = answer_id else {
            return;
        };
        let already_shown = self
            .view
            .with(|v| v.current_id.as_deref() == Some(answer_id.as_str()));
        if already_shown || self.epoch() != epoch {
            return;
        }

        self.view.update(|v| {
            v.loading = true;
            true
        });
        match self
            .api
            .get_answer(&AnswerLookup::Id(answer_id.clone()), &deployment_id)
            .await
        {
            _ if self.epoch() != epoch => {
                tracing::debug!(answer = %answer_id, "dropping stored answer, the question box moved on");
            }
            Ok(payload) => {
                self.view.update(|v| {
                    v.question = payload.question.clone();
                    v.steps.clear();
                    true
                });
                self.show_answer(&payload);
            }
            Err(e) => {
                tracing::warn!(answer = %answer_id, "failed to load answer: {e}");
                self.view.update(|v| {
                    v.loading = false;
                    true
                });
                if let Some(route) = self.route() {
                    self.host
                        .navigate(&route.base_path(), NavigationMode::Push);
                }
            }
        }
    }
}

/// The question box state machine. Dropping the session stops its tasks.
pub struct AnswerSession {
    shared: Shared,
    stream_task: Mutex<Option<AbortOnDrop>>,
    route_task: Mutex<Option<AbortOnDrop>>,
    focus_task: Mutex<Option<AbortOnDrop>>,
}

fn replace_task(slot: &Mutex<Option<AbortOnDrop>>, task: AbortOnDrop) {
    if let Ok(mut slot) = slot.lock() {
        *slot = Some(task);
    }
}

fn stop_task(slot: &Mutex<Option<AbortOnDrop>>) {
    if let Ok(mut slot) = slot.lock() {
        slot.take();
    }
}

impl AnswerSession {
    pub fn new(api: Arc<dyn AskApi>, host: Arc<dyn ViewHost>, surface: Surface) -> Self {
        Self::with_render_options(api, host, surface, RenderOptions::external(LinkTarget::Top))
    }

    pub fn with_render_options(
        api: Arc<dyn AskApi>,
        host: Arc<dyn ViewHost>,
        surface: Surface,
        render: RenderOptions,
    ) -> Self {
        Self {
            shared: Shared {
                api,
                host,
                surface,
                messages: StepMessages::for_surface(surface),
                render,
                view: StateCell::new(AnswerView::default()),
                epoch: Arc::new(AtomicU64::new(0)),
            },
            stream_task: Mutex::new(None),
            route_task: Mutex::new(None),
            focus_task: Mutex::new(None),
        }
    }

    pub fn surface(&self) -> Surface {
        self.shared.surface
    }

    pub fn view(&self) -> AnswerView {
        self.shared.view.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<AnswerView> {
        self.shared.view.subscribe()
    }

    pub fn view_cell(&self) -> &StateCell<AnswerView> {
        &self.shared.view
    }

    /// Reacts to a navigation on the ask surface.
    pub fn load_route(&self, route: &AskRoute) {
        self.shared.view.update(|v| {
            let changed = v.deployment_id.as_deref() != Some(route.deployment.as_str());
            v.deployment_id = Some(route.deployment.clone());
            changed
        });
        if route.answer_id.is_none() {
            self.reset();
            self.schedule_focus();
        }
        let task = tokio::spawn(self.shared.clone().load(
            route.deployment.clone(),
            route.answer_id.clone(),
            self.shared.epoch(),
        ));
        replace_task(&self.route_task, AbortOnDrop::new(task));
    }

    pub fn set_question(&self, question: impl Into<String>) {
        let question = question.into();
        self.shared.view.update(|v| {
            if v.question == question {
                return false;
            }
            v.question = question;
            true
        });
    }

    /// Streams an answer for `example`, or for the typed question. Returns
    /// `false` when there is nothing to ask or no deployment yet.
    pub fn ask(&self, example: Option<&str>) -> bool {
        let Some((question, deployment_id)) = self.begin(example) else {
            return false;
        };
        tracing::info!(deployment = %deployment_id, "asking");
        let task = tokio::spawn(self.shared.clone().run_stream(question, deployment_id));
        replace_task(&self.stream_task, AbortOnDrop::new(task));
        true
    }

    /// Asks without streaming and waits for the whole answer.
    pub async fn ask_once(&self, example: Option<&str>) -> Option<Result<AnswerPayload, ClientError>> {
        let (question, deployment_id) = self.begin(example)?;
        stop_task(&self.stream_task);
        let result = self
            .shared
            .api
            .get_answer(&AnswerLookup::Question(question), &deployment_id)
            .await;
        match &result {
            Ok(payload) => self.shared.finish(payload.clone()),
            Err(e) => self.shared.fail(e),
        }
        Some(result)
    }

    fn begin(&self, example: Option<&str>) -> Option<(String, String)> {
        let (typed, deployment_id) = self
            .shared
            .view
            .with(|v| (v.question.clone(), v.deployment_id.clone()));
        let question = example.map(str::to_string).unwrap_or(typed);
        if question.trim().is_empty() {
            return None;
        }
        let Some(deployment_id) = deployment_id else {
            tracing::warn!("cannot ask before a deployment is selected");
            return None;
        };
        self.shared.supersede();
        self.shared.view.update(|v| {
            v.question = question.clone();
            v.phase = AnswerPhase::Asking;
            v.loading = true;
            v.full_answer = false;
            true
        });
        Some((question, deployment_id))
    }

    /// Back to an empty question box at the deployment's base URL.
    pub fn clear(&self) {
        if let Some(route) = self.shared.route() {
            self.shared
                .host
                .navigate(&route.base_path(), NavigationMode::Push);
        }
        self.reset();
        self.schedule_focus();
    }

    fn reset(&self) {
        stop_task(&self.stream_task);
        self.shared.supersede();
        self.shared.view.update(|v| {
            v.phase = AnswerPhase::Idle;
            v.loading = false;
            v.question.clear();
            v.answer = None;
            v.answer_markdown.clear();
            v.full_answer = false;
            v.related = None;
            v.steps.clear();
            v.current_id = None;
            true
        });
    }

    fn schedule_focus(&self) {
        let host = Arc::clone(&self.shared.host);
        let task = tokio::spawn(async move {
            tokio::time::sleep(FOCUS_DELAY).await;
            host.focus_question();
        });
        replace_task(&self.focus_task, AbortOnDrop::new(task));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_table() {
        let en = StepMessages::ENGLISH;
        assert_eq!(en.for_tool("search_datasets"), Some("Searching data sources…"));
        assert_eq!(en.for_tool("query_resource_database"), Some("Analyzing dataset data…"));
        assert_eq!(en.for_tool("summon_dragons"), None);
        assert_eq!(
            StepMessages::for_surface(Surface::Mobile).for_tool("fetch_dataset"),
            Some("מושך מאגר המידע…")
        );
    }

    #[test]
    fn examples_come_from_deployment() {
        let mut view = AnswerView::default();
        assert!(view.examples().is_empty());
        view.deployment = Some(Deployment {
            id: "gov".into(),
            examples: vec!["How many schools?".into()],
            ..Default::default()
        });
        assert_eq!(view.examples(), ["How many schools?".to_string()]);
    }

    #[test]
    fn question_direction_follows_text() {
        let view = AnswerView {
            question: "כמה בתי ספר יש?".into(),
            ..Default::default()
        };
        assert_eq!(view.question_direction(), TextDirection::Rtl);
    }
}
