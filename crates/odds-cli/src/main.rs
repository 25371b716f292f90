use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod host;
mod render;

use host::TerminalHost;
use odds_auth::{AuthSession, Credential, CredentialManager, CredentialStatus};
use odds_client::{AdminApi, AdminClient, AskClient};
use odds_core::config::{config_path, load_config, ResolvedConfig};
use odds_core::directory::count_datasets;
use odds_core::markdown::{render_content, LinkTarget, RenderOptions};
use odds_core::{
    AdminRoute, AnswerPhase, AnswerSession, AnswerView, AskRoute, DeploymentDirectory, PageState,
    SortDirection, SortFieldMap, SortState, StateStore, Surface,
};

const DEFAULT_PROFILE: &str = "default";

#[derive(Parser)]
#[command(name = "odds", version, about = "Open data deep search: admin and ask client")]
struct Cli {
    #[arg(
        long,
        default_value = "~/.config/odds",
        help = "Config root directory (contains config.yaml, credentials.json and logs/)"
    )]
    config_root: PathBuf,

    #[arg(long, help = "Environment from config.yaml (defaults to default_env)")]
    env: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Validate config.yaml and show the resolved environment")]
    Validate,
    #[command(subcommand, about = "Admin credential management")]
    Auth(AuthCommands),
    #[command(about = "List deployments visible to the signed-in admin")]
    Deployments,
    #[command(about = "List data catalogs and websites of a deployment")]
    Catalogs {
        #[arg(help = "Deployment ID")]
        deployment: String,
    },
    #[command(about = "List datasets of a catalog")]
    Datasets {
        #[arg(help = "Deployment ID")]
        deployment: String,
        #[arg(help = "Catalog ID")]
        catalog: String,
        #[command(flatten)]
        list: ListArgs,
    },
    #[command(about = "List crawled pages of a website catalog")]
    Webpages {
        #[arg(help = "Deployment ID")]
        deployment: String,
        #[arg(help = "Catalog ID")]
        catalog: String,
        #[command(flatten)]
        list: ListArgs,
    },
    #[command(about = "Show a dataset, or one of its resources")]
    Dataset {
        #[arg(help = "Deployment ID")]
        deployment: String,
        #[arg(help = "Catalog ID")]
        catalog: String,
        #[arg(help = "Dataset ID")]
        dataset: String,
        #[arg(long, help = "Resource index to show")]
        resource: Option<String>,
    },
    #[command(about = "List questions asked against a deployment")]
    Questions {
        #[arg(help = "Deployment ID")]
        deployment: String,
        #[command(flatten)]
        list: ListArgs,
    },
    #[command(about = "Ask a question and stream the answer")]
    Ask {
        #[arg(help = "Deployment ID")]
        deployment: String,
        #[arg(required = true, help = "Question text")]
        question: Vec<String>,
        #[arg(long, help = "Use the mobile (Hebrew) surface")]
        mobile: bool,
        #[arg(long, help = "Wait for the full answer instead of streaming")]
        no_stream: bool,
    },
    #[command(about = "Show a stored answer")]
    Answer {
        #[arg(help = "Deployment ID")]
        deployment: String,
        #[arg(help = "Answer ID")]
        id: String,
        #[arg(long, help = "Use the mobile (Hebrew) surface")]
        mobile: bool,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    #[command(about = "Store an ID token for admin requests")]
    Login {
        #[arg(long, help = "ID token issued by the identity provider")]
        token: String,
        #[arg(long, help = "Email of the signed-in admin")]
        email: Option<String>,
        #[arg(long, help = "Token expiry as unix seconds")]
        expires_at: Option<i64>,
        #[arg(long, default_value = DEFAULT_PROFILE, help = "Profile name")]
        profile: String,
    },
    #[command(about = "Forget the active credential")]
    Logout,
    #[command(about = "Show the active credential")]
    Status,
}

#[derive(Args, Debug, Clone)]
struct ListArgs {
    #[arg(long, default_value_t = 1, help = "Page number, starting at 1")]
    page: u32,
    #[arg(long, help = "Column to sort by")]
    sort: Option<String>,
    #[arg(long, default_value = "desc", value_parser = ["asc", "desc", ""], help = "Sort direction")]
    direction: String,
    #[arg(long, help = "Full text filter")]
    filter: Option<String>,
}

impl ListArgs {
    /// Applies the arguments the way the table controls would.
    fn apply(&self, page: &PageState) -> Result<()> {
        page.set_page(self.page);
        if let Some(column) = &self.sort {
            page.on_sort(SortState::new(column.clone(), SortDirection::parse(&self.direction)))
                .map_err(|e| {
                    let columns: Vec<_> = page.sort_fields().columns().collect();
                    anyhow!("{e} (sortable: {})", columns.join(", "))
                })?;
        }
        page.text_filter.set(self.filter.clone());
        Ok(())
    }
}

fn expand_home(path: PathBuf) -> PathBuf {
    if !path.starts_with("~") {
        return path;
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(path.strip_prefix("~").unwrap_or(&path)),
        None => path,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    cli.config_root = expand_home(cli.config_root);

    let log_dir = cli.config_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "odds.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = load_config(&cli.config_root)?.resolve(cli.env.as_deref())?;
    let credentials = CredentialManager::from_config_dir(&cli.config_root);

    match command {
        Commands::Validate => {
            println!(
                "Config valid ({}). environment: {}",
                config_path(&cli.config_root).display(),
                config.env
            );
            println!(
                "admin endpoint: {}",
                config.admin_endpoint.as_deref().unwrap_or("-")
            );
            println!("ask endpoint: {}", config.ask_endpoint.as_deref().unwrap_or("-"));
            println!(
                "request timeout: {}s, attempts: {}",
                config.request_timeout.as_secs(),
                config.retry.max_attempts
            );
        }
        Commands::Auth(command) => handle_auth_command(&credentials, command)?,
        Commands::Deployments => {
            let admin = admin_client(&config, &credentials)?;
            let deployments = config
                .retry
                .run("deployments", || admin.list_deployments())
                .await?;
            render::print_deployments(&deployments);
        }
        Commands::Catalogs { deployment } => {
            let admin = admin_client(&config, &credentials)?;
            let catalogs = config
                .retry
                .run("catalogs", || admin.list_catalogs(&deployment))
                .await?;
            let directory = DeploymentDirectory::new();
            directory.data_catalogs.set(catalogs.clone());
            let pairs: Vec<_> = catalogs
                .iter()
                .map(|c| (deployment.clone(), c.id.clone()))
                .collect();
            let counts = count_datasets(&admin, &pairs).await;
            render::print_catalogs("Data catalogs", &directory.catalogs(), &counts);
            println!();
            render::print_catalogs("Websites", &directory.websites(), &counts);
        }
        Commands::Datasets {
            deployment,
            catalog,
            list,
        } => {
            let admin = admin_client(&config, &credentials)?;
            list_datasets(&config, &admin, &deployment, &catalog, &list, SortFieldMap::DATASETS).await?;
        }
        Commands::Webpages {
            deployment,
            catalog,
            list,
        } => {
            let admin = admin_client(&config, &credentials)?;
            list_datasets(&config, &admin, &deployment, &catalog, &list, SortFieldMap::WEBPAGES).await?;
        }
        Commands::Questions { deployment, list } => {
            let admin = admin_client(&config, &credentials)?;
            let page = PageState::new(SortFieldMap::QUESTIONS);
            list.apply(&page)?;
            let query = page.query();
            let result = config
                .retry
                .run("questions", || admin.list_questions(&deployment, &query))
                .await?;
            render::print_questions(&result.questions, result.total, query.page);
        }
        Commands::Dataset {
            deployment,
            catalog,
            dataset,
            resource,
        } => {
            let admin = admin_client(&config, &credentials)?;
            show_dataset(&config, &admin, deployment, catalog, dataset, resource).await?;
        }
        Commands::Ask {
            deployment,
            question,
            mobile,
            no_stream,
        } => {
            let question = question.join(" ");
            run_ask(&config, &deployment, &question, surface(mobile), no_stream).await?;
        }
        Commands::Answer {
            deployment,
            id,
            mobile,
        } => {
            show_answer(&config, &deployment, &id, surface(mobile)).await?;
        }
    }

    Ok(())
}

fn surface(mobile: bool) -> Surface {
    if mobile {
        Surface::Mobile
    } else {
        Surface::Desktop
    }
}

fn handle_auth_command(credentials: &CredentialManager, command: AuthCommands) -> Result<()> {
    match command {
        AuthCommands::Login {
            token,
            email,
            expires_at,
            profile,
        } => {
            let mut credential = Credential::new(token);
            if let Some(email) = email {
                credential = credential.with_email(email);
            }
            if let Some(expires_at) = expires_at {
                credential = credential.with_expiry(expires_at);
            }
            credentials.save_credential(&profile, credential)?;
            println!(
                "Signed in as profile `{profile}` ({}).",
                credentials.store_path().display()
            );
        }
        AuthCommands::Logout => {
            if credentials.remove_active()? {
                println!("Signed out.");
            } else {
                println!("No active credential.");
            }
        }
        AuthCommands::Status => match credentials.status()? {
            CredentialStatus::Active(credential) | CredentialStatus::Expired(credential) => {
                let state = if credential.is_expired() { "expired" } else { "active" };
                println!(
                    "Signed in as {} ({state})",
                    credential.email.as_deref().unwrap_or("unknown email")
                );
                if let Some(expires_at) = credential.expires_at {
                    if let Some(at) = chrono::DateTime::from_timestamp(expires_at, 0) {
                        println!("Expires: {}", at.with_timezone(&chrono::Local).format("%d/%m/%Y %H:%M"));
                    }
                }
            }
            CredentialStatus::SignedOut => println!("Not signed in."),
        },
    }
    Ok(())
}

fn admin_client(config: &ResolvedConfig, credentials: &CredentialManager) -> Result<AdminClient> {
    let session = match credentials.status()? {
        CredentialStatus::Active(credential) => AuthSession::with_credential(credential),
        CredentialStatus::Expired(_) => bail!("stored credential has expired; run `odds auth login --token <id token>`"),
        CredentialStatus::SignedOut => bail!("not signed in; run `odds auth login --token <id token>`"),
    };
    Ok(AdminClient::with_timeout(
        config.admin_endpoint()?,
        session,
        config.request_timeout,
    ))
}

fn ask_client(config: &ResolvedConfig) -> Result<Arc<AskClient>> {
    Ok(Arc::new(AskClient::with_timeout(
        config.ask_endpoint()?,
        config.request_timeout,
    )))
}

async fn list_datasets(
    config: &ResolvedConfig,
    admin: &AdminClient,
    deployment: &str,
    catalog: &str,
    list: &ListArgs,
    sort_fields: SortFieldMap,
) -> Result<()> {
    let page = PageState::new(sort_fields);
    list.apply(&page)?;
    let query = page.query();
    let result = config
        .retry
        .run(page.view(), || admin.list_datasets(deployment, catalog, &query))
        .await?;
    render::print_datasets(&result.datasets, result.total, query.page);
    Ok(())
}

async fn show_dataset(
    config: &ResolvedConfig,
    admin: &AdminClient,
    deployment: String,
    catalog: String,
    dataset: String,
    resource: Option<String>,
) -> Result<()> {
    let route = match resource {
        Some(index) => AdminRoute::Resource {
            deployment,
            catalog,
            dataset,
            index,
        },
        None => AdminRoute::Dataset {
            deployment,
            catalog,
            dataset,
        },
    };
    let store = StateStore::new().with_retry(config.retry);
    store.navigate(&route.to_string())?;
    let params = route.params();
    let (Some(d), Some(c), Some(ds)) = (params.deployment_id, params.catalog_id, params.dataset_id)
    else {
        bail!("route {route} does not name a dataset");
    };

    let found = store
        .retry()
        .run("dataset", || admin.get_dataset(&d, &c, &ds))
        .await?
        .ok_or_else(|| anyhow!("dataset `{ds}` not found in catalog `{c}`"))?;
    store.dataset.set(Some(found.clone()));

    if params.resource_idx.is_none() {
        render::print_dataset(&found);
        return Ok(());
    }
    let resource = store.resource().with_context(|| {
        format!(
            "no resource at index `{}` ({} resources)",
            params.resource_idx.as_deref().unwrap_or_default(),
            found.resources.len()
        )
    })?;
    render::print_resource(&resource);
    if let Some(content) = resource.content.as_deref().filter(|c| !c.is_empty()) {
        println!();
        println!("{}", render_content(content, &RenderOptions::external(LinkTarget::Blank)));
    }
    Ok(())
}

async fn wait_for_deployment(session: &AnswerSession, timeout: Duration) {
    let mut rx = session.subscribe();
    let loaded = tokio::time::timeout(timeout, rx.wait_for(|v| v.deployment.is_some())).await;
    if !matches!(loaded, Ok(Ok(_))) {
        tracing::warn!("deployment details did not load, asking anyway");
    }
}

fn print_answer(view: &AnswerView, location: Option<&str>) {
    println!();
    println!("{}", render::directional(&view.answer_markdown));
    if let Some(related) = view.related.as_ref().filter(|r| !r.is_empty()) {
        println!();
        println!("Related questions:");
        for question in related {
            println!("  - {} ({})", render::directional(&question.question), question.id);
        }
    }
    if let Some(location) = location {
        println!();
        println!("Permalink: {location}");
    }
}

async fn run_ask(
    config: &ResolvedConfig,
    deployment: &str,
    question: &str,
    surface: Surface,
    no_stream: bool,
) -> Result<()> {
    let host = TerminalHost::new();
    let session = AnswerSession::new(ask_client(config)?, Arc::new(host.clone()), surface);
    session.load_route(&AskRoute::new(surface, deployment));
    wait_for_deployment(&session, config.request_timeout).await;

    if no_stream {
        let payload = session
            .ask_once(Some(question))
            .await
            .ok_or_else(|| anyhow!("nothing to ask"))??;
        if let Some(error) = payload.error {
            bail!("answer failed: {error}");
        }
        print_answer(&session.view(), host.location.get().as_deref());
        return Ok(());
    }

    let mut rx = session.subscribe();
    if !session.ask(Some(question)) {
        bail!("nothing to ask");
    }
    let mut shown_steps = 0;
    loop {
        if rx.changed().await.is_err() {
            bail!("answer session closed");
        }
        let view = rx.borrow_and_update().clone();
        if view.steps.len() < shown_steps {
            shown_steps = 0;
        }
        for step in &view.steps[shown_steps..] {
            eprintln!("… {}", step.message);
        }
        shown_steps = view.steps.len();

        match view.phase {
            AnswerPhase::Answered => {
                print_answer(&view, host.location.get().as_deref());
                return Ok(());
            }
            AnswerPhase::Failed => bail!("{}", view.answer_markdown),
            AnswerPhase::Interrupted => {
                print_answer(&view, None);
                bail!("answer stream ended before the answer was complete");
            }
            AnswerPhase::Idle | AnswerPhase::Asking => {}
        }
    }
}

async fn show_answer(config: &ResolvedConfig, deployment: &str, id: &str, surface: Surface) -> Result<()> {
    let host = TerminalHost::new();
    let session = AnswerSession::new(ask_client(config)?, Arc::new(host.clone()), surface);
    let route = AskRoute::new(surface, deployment).with_answer(id);
    let base = route.base_path();

    let mut view_rx = session.subscribe();
    let mut location_rx = host.location.subscribe();
    session.load_route(&route);

    tokio::select! {
        loaded = view_rx.wait_for(|v| v.current_id.is_some()) => {
            let view = loaded.context("answer session closed")?.clone();
            println!("Q: {}", render::directional(&view.question));
            print_answer(&view, Some(&route.to_string()));
            Ok(())
        }
        _ = location_rx.wait_for(|location| location.as_deref() == Some(base.as_str())) => {
            bail!("answer `{id}` could not be loaded")
        }
    }
}
