use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use taskdesk::config::{ClientConfig, ConfigError, Environment, resolve_api_url};
use taskdesk::error::ApiError;
use taskdesk::net::client::ApiClient;
use taskdesk::net::tasks::{TaskListParams, TasksApi};
use taskdesk::net::types::{Role, Task, TaskCreate, TaskPatch, TaskStatus, User, UserCreate, UserPatch};
use taskdesk::net::users::{UserListParams, UsersApi};
use taskdesk::routes::guards::{GuardDecision, LOGIN_PATH, post_login_target, return_to_from_href};
use taskdesk::routes::{Access, RouteTable};
use taskdesk::services::auth::AuthGateway;
use taskdesk::state::session::SessionStore;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{} [{}]", .0.user_message(), .0.error_code())]
    Api(#[from] ApiError),
    #[error("not allowed here; the app would redirect to {to}")]
    Redirected { to: String },
    #[error("--username and --password must be given together")]
    PartialCredentials,
    #[error("nothing to update")]
    EmptyPatch,
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "taskdesk", about = "Task management API client")]
struct Cli {
    #[arg(long, env = "TASKDESK_API_URL")]
    api_url: Option<String>,

    #[arg(long = "env", env = "TASKDESK_ENV")]
    environment: Option<Environment>,

    #[arg(long, env = "TASKDESK_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "TASKDESK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the user the server associates with this session.
    Whoami,
    Logout,
    /// Evaluate the route guard for an application path.
    Route { href: String },
    Tasks(TasksCommand),
    Users(UsersCommand),
}

#[derive(Args, Debug)]
struct TasksCommand {
    #[command(subcommand)]
    command: TasksSubcommand,
}

#[derive(Subcommand, Debug)]
enum TasksSubcommand {
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        assignee: Option<i64>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        ordering: Option<String>,
    },
    Get {
        id: i64,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long, value_parser = parse_deadline, help = "RFC 3339 timestamp")]
        deadline: Option<OffsetDateTime>,
        #[arg(long)]
        assignee: Option<i64>,
    },
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long, value_parser = parse_deadline, conflicts_with = "clear_deadline")]
        deadline: Option<OffsetDateTime>,
        #[arg(long, default_value_t = false)]
        clear_deadline: bool,
        #[arg(long, conflicts_with = "unassign")]
        assignee: Option<i64>,
        #[arg(long, default_value_t = false)]
        unassign: bool,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct UsersCommand {
    #[command(subcommand)]
    command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
enum UsersSubcommand {
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        ordering: Option<String>,
    },
    Get {
        id: i64,
    },
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value_t = false)]
        inactive: bool,
    },
    Update {
        id: i64,
        #[arg(long)]
        username: Option<String>,
        #[arg(long, conflicts_with = "clear_email")]
        email: Option<String>,
        #[arg(long, default_value_t = false)]
        clear_email: bool,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        active: Option<bool>,
    },
    Delete {
        id: i64,
    },
    /// Users a task can be assigned to.
    Choices,
}

struct CliContext {
    auth: AuthGateway,
    client: Arc<ApiClient>,
    routes: RouteTable,
}

/// Task as printed by the CLI, with flags derived for the signed-in user.
#[derive(Serialize)]
struct TaskView<'a> {
    #[serde(flatten)]
    task: &'a Task,
    overdue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    editable: Option<bool>,
}

impl<'a> TaskView<'a> {
    fn new(task: &'a Task, viewer: Option<&User>, now: OffsetDateTime) -> Self {
        Self { task, overdue: task.is_overdue(now), editable: viewer.map(|user| user.can_edit_task(task)) }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    // stdout carries JSON output.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

fn report(error: &CliError) {
    if let CliError::Api(api) = error {
        if api.retryable() {
            tracing::warn!(code = api.error_code(), "request failed; it may succeed if retried");
        }
        if let ApiError::Validation(fields) = api {
            if let Ok(details) = serde_json::to_string_pretty(fields.as_json()) {
                eprintln!("{details}");
            }
        }
    }
    eprintln!("error: {error}");
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let credentials = match (cli.username, cli.password) {
        (Some(username), Some(password)) => Some((username, password)),
        (None, None) => None,
        _ => return Err(CliError::PartialCredentials),
    };

    let mut config = ClientConfig::from_env()?;
    if let Some(environment) = cli.environment {
        config.environment = environment;
    }
    config.api_url = resolve_api_url(config.environment, cli.api_url.as_deref())?;

    let client = Arc::new(ApiClient::new(&config)?);
    let auth = AuthGateway::new(Arc::clone(&client), SessionStore::new());
    let ctx = CliContext { auth, client, routes: RouteTable::default() };
    watch_session(&ctx.auth);

    let session = ctx.auth.bootstrap().await;
    if let Some((username, password)) = credentials {
        if !session.is_authenticated() {
            ctx.auth.login(&username, &password).await?;
        }
    }

    match cli.command {
        Command::Whoami => run_whoami(&ctx),
        Command::Logout => run_logout(&ctx).await,
        Command::Route { href } => run_route(&ctx, &href),
        Command::Tasks(tasks) => run_tasks(&ctx, tasks).await,
        Command::Users(users) => run_users(&ctx, users).await,
    }
}

fn watch_session(auth: &AuthGateway) {
    let mut watcher = auth.session().subscribe();
    tracing::debug!(state = ?watcher.current(), "session watcher started");
    tokio::spawn(async move {
        while let Some(state) = watcher.changed().await {
            tracing::debug!(authenticated = state.is_authenticated(), role = ?state.role(), "session changed");
        }
    });
}

fn run_whoami(ctx: &CliContext) -> Result<(), CliError> {
    let session = ctx.auth.session().snapshot();
    print_json(&json!({
        "resolved": session.is_resolved(),
        "user": session.user(),
        "capabilities": session.role().map(capabilities),
    }))
}

fn capabilities(role: Role) -> serde_json::Value {
    json!({
        "create_tasks": role.can_create_tasks(),
        "see_all_tasks": role.sees_all_tasks(),
        "delete_tasks": role.can_delete_tasks(),
        "manage_users": role.can_manage_users(),
    })
}

async fn run_logout(ctx: &CliContext) -> Result<(), CliError> {
    let response = ctx.auth.logout().await?;
    print_json(&response)
}

fn run_route(ctx: &CliContext, href: &str) -> Result<(), CliError> {
    let session = ctx.auth.session().snapshot();
    let access = ctx.routes.access_for(href);
    let (decision, after_login) = match ctx.routes.check(&session, href) {
        GuardDecision::Allow => {
            let after_login =
                (access == Access::GuestOnly).then(|| post_login_target(return_to_from_href(href).as_deref()));
            (json!({ "allow": true }), after_login)
        }
        GuardDecision::Redirect(redirect) => {
            let after_login = (redirect.to == LOGIN_PATH).then(|| post_login_target(redirect.return_to.as_deref()));
            (json!({ "allow": false, "redirect": redirect.href() }), after_login)
        }
    };
    print_json(&json!({
        "href": href,
        "access": format!("{access:?}"),
        "decision": decision,
        "after_login": after_login,
    }))
}

async fn run_tasks(ctx: &CliContext, tasks: TasksCommand) -> Result<(), CliError> {
    let api = TasksApi::new(Arc::clone(&ctx.client));
    match tasks.command {
        TasksSubcommand::List { status, assignee, search, ordering } => {
            guard(ctx, "/tasks")?;
            let params = TaskListParams { status, assignee, search, ordering };
            let tasks = api.list(&params).await?;
            let (viewer, now) = (ctx.auth.session().user(), OffsetDateTime::now_utc());
            let views: Vec<_> = tasks.iter().map(|task| TaskView::new(task, viewer.as_ref(), now)).collect();
            print_json(&views)
        }
        TasksSubcommand::Get { id } => {
            guard(ctx, &format!("/tasks/{id}"))?;
            let task = api.get(id).await?;
            let viewer = ctx.auth.session().user();
            print_json(&TaskView::new(&task, viewer.as_ref(), OffsetDateTime::now_utc()))
        }
        TasksSubcommand::Create { title, description, status, deadline, assignee } => {
            guard(ctx, "/tasks")?;
            let task = TaskCreate { description, status, deadline, assignee, ..TaskCreate::new(title) };
            print_json(&api.create(&task).await?)
        }
        TasksSubcommand::Update {
            id,
            title,
            description,
            status,
            deadline,
            clear_deadline,
            assignee,
            unassign,
        } => {
            guard(ctx, &format!("/tasks/{id}"))?;
            let patch = TaskPatch {
                title,
                description,
                status,
                deadline: if clear_deadline { Some(None) } else { deadline.map(Some) },
                assignee: if unassign { Some(None) } else { assignee.map(Some) },
            };
            if patch.is_empty() {
                return Err(CliError::EmptyPatch);
            }
            print_json(&api.update(id, &patch).await?)
        }
        TasksSubcommand::Delete { id } => {
            guard(ctx, "/tasks")?;
            api.delete(id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}

async fn run_users(ctx: &CliContext, users: UsersCommand) -> Result<(), CliError> {
    let api = UsersApi::new(Arc::clone(&ctx.client));
    // Assignable users feed the task form, so any signed-in user may list them.
    let page = if matches!(users.command, UsersSubcommand::Choices) { "/tasks" } else { "/users" };
    guard(ctx, page)?;

    match users.command {
        UsersSubcommand::List { page, page_size, search, ordering } => {
            let params = UserListParams { page, page_size, search, ordering };
            let users = api.list(&params).await?;
            print_json(&json!({ "has_next": users.has_next(), "page": users }))
        }
        UsersSubcommand::Get { id } => print_json(&api.get(id).await?),
        UsersSubcommand::Create { username, password, role, email, inactive } => {
            let user = UserCreate { username, email, password, role, is_active: inactive.then_some(false) };
            print_json(&api.create(&user).await?)
        }
        UsersSubcommand::Update { id, username, email, clear_email, password, role, active } => {
            let patch = UserPatch {
                username,
                email: if clear_email { Some(None) } else { email.map(Some) },
                password,
                role,
                is_active: active,
            };
            print_json(&api.update(id, &patch).await?)
        }
        UsersSubcommand::Delete { id } => {
            api.delete(id).await?;
            print_json(&json!({ "deleted": id }))
        }
        UsersSubcommand::Choices => print_json(&api.choices().await?),
    }
}

fn guard(ctx: &CliContext, href: &str) -> Result<(), CliError> {
    match ctx.routes.check(&ctx.auth.session().snapshot(), href) {
        GuardDecision::Allow => Ok(()),
        GuardDecision::Redirect(redirect) => Err(CliError::Redirected { to: redirect.href() }),
    }
}

fn parse_deadline(raw: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|error| format!("expected RFC 3339 timestamp: {error}"))
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
