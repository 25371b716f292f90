//! View state of the open-data admin dashboard and the ask widget.
//!
//! State lives in observable [`StateCell`]s. Effects follow those cells,
//! fetch through the `odds-client` traits, and commit only results that
//! still match what they were started for.

pub mod cell;
pub mod config;
pub mod directory;
pub mod effect;
pub mod error;
pub mod host;
pub mod markdown;
pub mod page;
pub mod retry;
pub mod route;
pub mod session;
pub mod store;
pub mod text_filter;
pub mod throttle;
pub mod views;

pub use cell::StateCell;
pub use config::{load_config, OddsConfig, ResolvedConfig};
pub use directory::{DeploymentDirectory, DirectoryEffects};
pub use effect::{follow, AbortOnDrop, Changes};
pub use error::{RouteError, StateError};
pub use host::{HostEvent, NavigationMode, PageMeta, RecordingHost, ViewHost};
pub use markdown::{render_content, render_markdown, LinkTarget, RenderOptions, SafeHtml, TextDirection};
pub use page::{PageState, SortDirection, SortFieldMap, SortState};
pub use retry::RetryPolicy;
pub use route::{AdminRoute, AskRoute, RouteParams, Surface};
pub use session::{AnswerPhase, AnswerSession, AnswerView, Step, StepKind, StepMessages};
pub use store::{StateStore, StoreEffects};
pub use text_filter::TextFilter;
pub use views::{DatasetListView, ListView, QuestionListView};
