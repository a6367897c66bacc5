use gloo_timers::callback::Timeout;
use leptos::ev::SubmitEvent;
use leptos::logging::log;
use leptos::prelude::*;
use leptos::server_fn::error::NoCustomError;
use leptos::task::spawn_local;
use leptos_meta::{provide_meta_context, MetaTags, Stylesheet, Title};
use leptos_router::{
    components::{Route, Router, Routes},
    hooks::{use_navigate, use_params_map},
    path, NavigateOptions,
};

use crate::engine::{fill_grid, player_squares, randomize_labels, total_requested};
use crate::engine::resolve_winners;
use crate::is_valid_pool_key;
use crate::model::{
    Grid, Participant, PoolKind, PoolRecord, PoolSnapshot, PoolSummary, Quarter, WinnerRecord,
    GRID_SIZE, GRID_WIDTH,
};
#[cfg(feature = "ssr")]
use crate::{
    config::AppConfig, create_admin_session, create_week_from_template, delete_admin_session,
    delete_pool, error::StoreError, list_pools, load_pool, save_pool, validate_admin_token,
    AdminCapability, ADMIN_SESSION_SECS,
};

#[cfg(feature = "ssr")]
use diesel::r2d2::{ConnectionManager, Pool};
#[cfg(feature = "ssr")]
use diesel::SqliteConnection;
#[cfg(feature = "ssr")]
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

const ADMIN_COOKIE: &str = "admin_token";
const SAVE_DEBOUNCE_MS: u32 = 800;

#[cfg(feature = "ssr")]
fn server_error(e: impl std::fmt::Display) -> ServerFnError<NoCustomError> {
    ServerFnError::ServerError(e.to_string())
}

// Runs a blocking store call on a pooled connection.
#[cfg(feature = "ssr")]
async fn with_conn<T, F>(f: F) -> Result<T, ServerFnError<NoCustomError>>
where
    T: Send + 'static,
    F: FnOnce(&mut SqliteConnection) -> Result<T, StoreError> + Send + 'static,
{
    let pool: DbPool = expect_context();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(server_error)?;
        f(&mut conn).map_err(server_error)
    })
    .await
    .map_err(server_error)?
}

/// Pulls a single cookie value out of a `Cookie` header.
#[cfg_attr(not(feature = "ssr"), allow(dead_code))]
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|cookie| {
        cookie
            .trim()
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('='))
            .map(str::to_string)
    })
}

#[cfg(feature = "ssr")]
async fn read_cookie(name: &'static str) -> Result<Option<String>, ServerFnError<NoCustomError>> {
    use axum::http::HeaderMap;
    use leptos_axum::extract;

    let headers: HeaderMap = extract().await.map_err(server_error)?;
    Ok(headers
        .get(axum::http::header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| cookie_value(cookies, name)))
}

#[cfg(feature = "ssr")]
fn set_cookie(cookie: &str) -> Result<(), ServerFnError<NoCustomError>> {
    use leptos_axum::ResponseOptions;
    let resp: ResponseOptions = expect_context();
    resp.insert_header(
        axum::http::header::SET_COOKIE,
        axum::http::HeaderValue::from_str(cookie).map_err(server_error)?,
    );
    Ok(())
}

// Runs `f` with an admin capability, or fails with "Unauthorized" if the request doesn't carry a
// live admin session.
#[cfg(feature = "ssr")]
async fn with_admin<T, F>(f: F) -> Result<T, ServerFnError<NoCustomError>>
where
    T: Send + 'static,
    F: FnOnce(&mut SqliteConnection, &AdminCapability) -> Result<T, StoreError> + Send + 'static,
{
    let unauthorized = || ServerFnError::<NoCustomError>::ServerError("Unauthorized".to_string());
    let token = read_cookie(ADMIN_COOKIE).await?.ok_or_else(unauthorized)?;
    with_conn(move |conn| match validate_admin_token(conn, &token)? {
        Some(admin) => f(conn, &admin).map(Some),
        None => Ok(None),
    })
    .await?
    .ok_or_else(unauthorized)
}

#[server(GetPool)]
pub async fn get_pool(key: String) -> Result<Option<PoolSnapshot>, ServerFnError<NoCustomError>> {
    with_conn(move |conn| load_pool(conn, &key)).await
}

#[server(ListPools)]
pub async fn list_pools_handler() -> Result<Vec<PoolSummary>, ServerFnError<NoCustomError>> {
    with_conn(list_pools).await
}

// Checks if the current request is from an admin. Returns true if it is, false otherwise.
#[server(IsAdmin)]
pub async fn is_admin() -> Result<bool, ServerFnError<NoCustomError>> {
    let token = match read_cookie(ADMIN_COOKIE).await? {
        Some(t) => t,
        None => return Ok(false),
    };
    with_conn(move |conn| Ok(validate_admin_token(conn, &token)?.is_some())).await
}

#[server(AdminLogin)]
pub async fn admin_login(key: String) -> Result<(), ServerFnError<NoCustomError>> {
    let config: AppConfig = expect_context();
    if key != config.admin_key {
        log!("Rejected admin login");
        return Err(ServerFnError::ServerError("Incorrect admin key".to_string()));
    }

    let token = with_conn(create_admin_session).await?;
    set_cookie(&format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Strict",
        ADMIN_COOKIE, token, ADMIN_SESSION_SECS
    ))?;
    log!("Admin session started");
    Ok(())
}

#[server(AdminLogout)]
pub async fn admin_logout() -> Result<(), ServerFnError<NoCustomError>> {
    if let Some(token) = read_cookie(ADMIN_COOKIE).await? {
        with_conn(move |conn| delete_admin_session(conn, &token)).await?;
    }
    set_cookie(&format!(
        "{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Strict",
        ADMIN_COOKIE
    ))
}

/// Stores a full pool record. The record travels as its JSON encoding.
#[server(SavePool)]
pub async fn save_pool_handler(
    key: String,
    record: String,
) -> Result<(), ServerFnError<NoCustomError>> {
    let snapshot = PoolRecord::decode(&record).map_err(server_error)?;
    with_admin(move |conn, admin| save_pool(conn, admin, &key, &snapshot)).await
}

#[server(CreateTemplate)]
pub async fn create_template(key: String) -> Result<(), ServerFnError<NoCustomError>> {
    with_admin(move |conn, admin| {
        if load_pool(conn, &key)?.is_some() {
            return Err(StoreError::AlreadyExists(key));
        }
        save_pool(conn, admin, &key, &PoolSnapshot::template())
    })
    .await
}

/// Creates a week from `source_key`, or from the configured default template when it's empty.
#[server(CreateWeek)]
pub async fn create_week(
    week_key: String,
    source_key: String,
) -> Result<(), ServerFnError<NoCustomError>> {
    let config: AppConfig = expect_context();
    let source_key = if source_key.trim().is_empty() {
        config.default_template
    } else {
        source_key
    };
    with_admin(move |conn, admin| {
        create_week_from_template(conn, admin, &source_key, &week_key).map(|_| ())
    })
    .await
}

#[server(DeletePool)]
pub async fn delete_pool_handler(key: String) -> Result<(), ServerFnError<NoCustomError>> {
    with_admin(move |conn, admin| delete_pool(conn, admin, &key).map(|_| ())).await
}

pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <meta name="viewport" content="width=device-width, initial-scale=1" />
                <AutoReload options=options.clone() />
                <HydrationScripts options />
                <MetaTags />
            </head>
            <body>
                <App />
            </body>
        </html>
    }
}

#[component]
pub fn App() -> impl IntoView {
    // Provides context that manages stylesheets, titles, meta tags, etc.
    provide_meta_context();

    view! {
        // id=leptos means cargo-leptos will hot-reload this stylesheet
        <Stylesheet id="leptos" href="/pkg/mnf-squares.css" />
        <Title text="Football Squares" />

        <Router>
            <main>
                <Routes fallback=|| "Page not found.".into_view()>
                    <Route path=path!("/") view=Home />
                    <Route path=path!("/pool/:key") view=PoolPage />
                    <Route path=path!("/admin/login") view=AdminLogin />
                </Routes>
            </main>
        </Router>
    }
}

#[component]
fn Home() -> impl IntoView {
    let pools_fetcher = Resource::new(|| (), |_| list_pools_handler());
    let is_admin_fetcher = Resource::new(|| (), |_| is_admin());
    let navigate = use_navigate();

    // Signals related to creating a season template.
    let template_key = RwSignal::new(String::new());
    let template_error = RwSignal::new(String::new());

    let template_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let key = template_key.get();
        if !is_valid_pool_key(&key) {
            template_error.set("Use letters, digits, '-' or '_' for the key.".to_string());
            return;
        }
        spawn_local(async move {
            match create_template(key).await {
                Ok(_) => {
                    template_error.set(String::new());
                    template_key.set(String::new());
                    pools_fetcher.refetch();
                }
                Err(e) => template_error.set(e.to_string()),
            }
        });
    };

    // Signals related to creating a weekly pool.
    let week_key = RwSignal::new(String::new());
    let week_source = RwSignal::new(String::new());
    let week_error = RwSignal::new(String::new());

    let week_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let key = week_key.get();
        let source = week_source.get();
        if !is_valid_pool_key(&key) {
            week_error.set("Use letters, digits, '-' or '_' for the key.".to_string());
            return;
        }
        let navigate = navigate.clone();
        spawn_local(async move {
            match create_week(key.clone(), source).await {
                Ok(_) => {
                    week_error.set(String::new());
                    navigate(&format!("/pool/{}", key), NavigateOptions::default());
                }
                Err(e) => week_error.set(e.to_string()),
            }
        });
    };

    let logout = move |_| {
        spawn_local(async move {
            match admin_logout().await {
                Ok(_) => is_admin_fetcher.refetch(),
                Err(e) => log!("Logout failed: {}", e),
            }
        });
    };

    view! {
        <div class="home">
            <h1>"Football Squares"</h1>
            <Suspense fallback=|| {
                view! { "Loading..." }
            }>
                {move || {
                    pools_fetcher
                        .with(|p_res| match p_res {
                            Some(Ok(pools)) if pools.is_empty() => {
                                view! { <p class="muted">"No pools yet."</p> }.into_any()
                            }
                            Some(Ok(pools)) => {
                                view! {
                                    <table class="pool-list">
                                        <thead>
                                            <tr>
                                                <th>"Pool"</th>
                                                <th>"Kind"</th>
                                                <th>"Assigned"</th>
                                                <th>"Status"</th>
                                            </tr>
                                        </thead>
                                        <tbody>
                                            {pools
                                                .iter()
                                                .map(|pool| {
                                                    let href = format!("/pool/{}", pool.key);
                                                    let kind = match pool.kind {
                                                        PoolKind::Template => "Template",
                                                        PoolKind::Week => "Week",
                                                    };
                                                    view! {
                                                        <tr>
                                                            <td>
                                                                <a href=href>{pool.title.clone()}</a>
                                                                " (" {pool.key.clone()} ")"
                                                            </td>
                                                            <td>{kind}</td>
                                                            <td>{format!("{} / {}", pool.assigned, GRID_SIZE)}</td>
                                                            <td>{if pool.completed { "Final" } else { "Open" }}</td>
                                                        </tr>
                                                    }
                                                })
                                                .collect_view()}
                                        </tbody>
                                    </table>
                                }
                                    .into_any()
                            }
                            Some(Err(e)) => {
                                view! { <p class="error">"Error loading pools: " {e.to_string()}</p> }
                                    .into_any()
                            }
                            None => view! { "Loading..." }.into_any(),
                        })
                }}
            </Suspense>
            <Suspense>
                {move || {
                    is_admin_fetcher
                        .with(|admin| match admin {
                            Some(Ok(true)) => {
                                view! {
                                    <section class="admin-section">
                                        <h2>"New Season Template"</h2>
                                        <form class="admin-form" on:submit=template_submit>
                                            <input
                                                class="form-input"
                                                type="text"
                                                placeholder="template"
                                                prop:value=move || template_key.get()
                                                on:input=move |ev| template_key.set(event_target_value(&ev))
                                            />
                                            <button type="submit" class="btn-primary">
                                                "Create Template"
                                            </button>
                                        </form>
                                        {move || {
                                            (!template_error.get().is_empty())
                                                .then(|| view! { <p class="error">{template_error.get()}</p> })
                                        }}
                                    </section>
                                    <section class="admin-section">
                                        <h2>"New Week"</h2>
                                        <form class="admin-form" on:submit=week_submit.clone()>
                                            <input
                                                class="form-input"
                                                type="text"
                                                placeholder="week-1"
                                                prop:value=move || week_key.get()
                                                on:input=move |ev| week_key.set(event_target_value(&ev))
                                            />
                                            <select
                                                class="form-select"
                                                on:change=move |ev| week_source.set(event_target_value(&ev))
                                            >
                                                <option value="">"Default template"</option>
                                                {move || {
                                                    pools_fetcher
                                                        .with(|p_res| match p_res {
                                                            Some(Ok(pools)) => {
                                                                pools
                                                                    .iter()
                                                                    .map(|pool| {
                                                                        let key = pool.key.clone();
                                                                        let label = key.clone();
                                                                        view! { <option value=key>{label}</option> }
                                                                    })
                                                                    .collect_view()
                                                                    .into_any()
                                                            }
                                                            _ => view! {}.into_any(),
                                                        })
                                                }}
                                            </select>
                                            <button type="submit" class="btn-primary">
                                                "Create Week"
                                            </button>
                                        </form>
                                        {move || {
                                            (!week_error.get().is_empty())
                                                .then(|| view! { <p class="error">{week_error.get()}</p> })
                                        }}
                                    </section>
                                    <p>
                                        <button class="btn-secondary" on:click=logout>
                                            "Log out"
                                        </button>
                                    </p>
                                }
                                    .into_any()
                            }
                            _ => {
                                view! {
                                    <p>
                                        <a href="/admin/login">"Admin"</a>
                                    </p>
                                }
                                    .into_any()
                            }
                        })
                }}
            </Suspense>
        </div>
    }
}

#[component]
fn AdminLogin() -> impl IntoView {
    let key = RwSignal::new(String::new());
    let error = RwSignal::new(String::new());
    let navigate = use_navigate();

    let submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let k = key.get();
        if k.is_empty() {
            error.set("Please enter the admin key.".to_string());
            return;
        }
        let navigate = navigate.clone();
        spawn_local(async move {
            match admin_login(k).await {
                Ok(_) => {
                    error.set(String::new());
                    navigate("/", NavigateOptions::default());
                }
                Err(e) => {
                    key.set(String::new());
                    error.set(e.to_string());
                }
            }
        });
    };

    view! {
        <div class="admin-login">
            <h1>"Enter Admin Key"</h1>
            <form on:submit=submit>
                <input
                    class="form-input"
                    type="password"
                    placeholder="Admin key"
                    prop:value=move || key.get()
                    on:input=move |ev| key.set(event_target_value(&ev))
                />
                <button type="submit" class="btn-primary">
                    "Login"
                </button>
            </form>
            {move || {
                if !error.get().is_empty() {
                    view! { <p class="error">{error.get()}</p> }.into_any()
                } else {
                    view! {}.into_any()
                }
            }}
        </div>
    }
}

#[component]
fn PoolPage() -> impl IntoView {
    let params = use_params_map();
    let pool_key = move || params.read().get("key").unwrap_or_default();
    let pool_fetcher = Resource::new(pool_key, get_pool);
    let is_admin_fetcher = Resource::new(|| (), |_| is_admin());

    view! {
        <div class="pool-page">
            <p>
                <a href="/">"All pools"</a>
            </p>
            <Suspense fallback=|| {
                view! { "Loading..." }
            }>
                {move || {
                    let admin = is_admin_fetcher
                        .with(|res| matches!(res, Some(Ok(true))));
                    pool_fetcher
                        .with(|p_res| match p_res {
                            Some(Ok(Some(snapshot))) => {
                                view! {
                                    <PoolBoard
                                        pool_key=pool_key()
                                        snapshot=snapshot.clone()
                                        admin=admin
                                    />
                                }
                                    .into_any()
                            }
                            Some(Ok(None)) => {
                                view! { <p class="error">"No pool named " {pool_key()}</p> }
                                    .into_any()
                            }
                            Some(Err(e)) => {
                                view! { <p class="error">"Error loading pool: " {e.to_string()}</p> }
                                    .into_any()
                            }
                            None => view! { "Loading..." }.into_any(),
                        })
                }}
            </Suspense>
        </div>
    }
}

/// CSS classes for one square of the board.
fn square_class(name: Option<&str>, highlighted: Option<&str>, winning: bool) -> String {
    let mut class = match name {
        Some(n) if Some(n) == highlighted => "square highlighted".to_string(),
        Some(_) => "square assigned".to_string(),
        None => "square".to_string(),
    };
    if winning {
        class.push_str(" winner");
    }
    class
}

/// Parses a score box. Blank or non-numeric input means the score isn't set.
fn parse_score(input: &str) -> Option<u32> {
    input.trim().parse::<u32>().ok()
}

fn winner_label(record: &WinnerRecord) -> String {
    record
        .winner
        .clone()
        .unwrap_or_else(|| "No participant".to_string())
}

/// Runs `flush` when the current owner is cleaned up while `pending` still holds a debounced
/// action. The pending action itself is dropped.
fn flush_on_cleanup<T: 'static>(
    pending: StoredValue<Option<T>, LocalStorage>,
    flush: impl FnOnce() + Send + Sync + 'static,
) {
    on_cleanup(move || {
        if pending.try_update_value(Option::take).flatten().is_some() {
            flush();
        }
    });
}

fn confirm(message: &str) -> bool {
    #[cfg(feature = "hydrate")]
    {
        web_sys::window()
            .and_then(|w| w.confirm_with_message(message).ok())
            .unwrap_or(false)
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = message;
        true
    }
}

#[component]
fn PoolBoard(pool_key: String, snapshot: PoolSnapshot, admin: bool) -> impl IntoView {
    let pool_key = StoredValue::new(pool_key);
    let pool = RwSignal::new(snapshot);
    let highlighted = RwSignal::new(None::<String>);
    let selected = RwSignal::new(None::<String>);
    let message = RwSignal::new(String::new());
    let save_status = RwSignal::new(String::new());
    // Replacing the stored timeout drops (and so cancels) the previous one.
    let pending_save = StoredValue::new_local(None::<Timeout>);

    let winners = Memo::new(move |_| {
        pool.with(|p| resolve_winners(&p.row_labels, &p.column_labels, &p.grid, &p.quarters))
    });
    let roster = Memo::new(move |_| pool.with(|p| p.roster.clone()));
    let requested = Memo::new(move |_| roster.with(|r| total_requested(r)));
    let assigned = Memo::new(move |_| pool.with(|p| p.grid.assigned_count()));
    let completed = Memo::new(move |_| pool.with(|p| p.completed));

    // Saves the current snapshot once edits have settled.
    let schedule_save = move || {
        if !admin {
            return;
        }
        save_status.set("Unsaved changes".to_string());
        let timeout = Timeout::new(SAVE_DEBOUNCE_MS, move || {
            let record = match PoolRecord::encode(&pool.get_untracked()) {
                Ok(record) => record,
                Err(e) => {
                    save_status.set(format!("Save failed: {}", e));
                    return;
                }
            };
            let key = pool_key.get_value();
            spawn_local(async move {
                match save_pool_handler(key, record).await {
                    Ok(_) => save_status.set("Saved".to_string()),
                    Err(e) => {
                        log!("Save failed: {}", e);
                        save_status.set(format!("Save failed: {}", e));
                    }
                }
            });
        });
        pending_save.set_value(Some(timeout));
    };

    // Leaving the page drops the timeout, so send an unsaved edit right away.
    flush_on_cleanup(pending_save, move || {
        let (Some(snapshot), Some(key)) = (pool.try_get_untracked(), pool_key.try_get_value())
        else {
            return;
        };
        match PoolRecord::encode(&snapshot) {
            Ok(record) => spawn_local(async move {
                if let Err(e) = save_pool_handler(key, record).await {
                    log!("Save on leave failed: {}", e);
                }
            }),
            Err(e) => log!("Save on leave failed: {}", e),
        }
    });

    let fill_squares = move |_| {
        let players = roster.get_untracked();
        match fill_grid(&players, &mut rand::rng()) {
            Ok(grid) => {
                pool.update(|p| p.grid = grid);
                message.set(String::new());
                schedule_save();
            }
            Err(e) => {
                log!("Fill failed: {}", e);
                message.set(e.to_string());
            }
        }
    };

    let clear_squares = move |_| {
        if !confirm("Clear every square?") {
            return;
        }
        pool.update(|p| p.grid = Grid::empty());
        highlighted.set(None);
        selected.set(None);
        schedule_save();
    };

    let randomize_numbers = move |_| {
        let (rows, columns) = randomize_labels(&mut rand::rng());
        pool.update(|p| {
            p.row_labels = rows;
            p.column_labels = columns;
        });
        schedule_save();
    };

    let navigate = use_navigate();
    let delete_error = RwSignal::new(String::new());

    let add_player = move |_| {
        pool.update(|p| p.roster.push(Participant::new("", 1)));
        schedule_save();
    };

    let board = view! {
        <div class="board">
            <div class="board-header">
                <span>"Assigned: " {move || assigned.get()} " / " {GRID_SIZE}</span>
                {move || {
                    (admin && !completed.get())
                        .then(|| {
                            view! {
                                <button class="btn-primary" on:click=randomize_numbers>
                                    "Randomize Numbers"
                                </button>
                            }
                        })
                }}
            </div>
            <div class="column-team">{move || pool.with(|p| p.teams.column.clone())}</div>
            <div class="board-body">
                <div class="row-team">{move || pool.with(|p| p.teams.row.clone())}</div>
                <table class="grid">
                    <thead>
                        <tr>
                            <th></th>
                            {(0..GRID_WIDTH)
                                .map(|col| {
                                    view! {
                                        <th class="label">
                                            {move || pool.with(|p| p.column_labels.digits()[col])}
                                        </th>
                                    }
                                })
                                .collect_view()}
                        </tr>
                    </thead>
                    <tbody>
                        {(0..GRID_WIDTH)
                            .map(|row| {
                                view! {
                                    <tr>
                                        <th class="label">
                                            {move || pool.with(|p| p.row_labels.digits()[row])}
                                        </th>
                                        {(0..GRID_WIDTH)
                                            .map(|col| {
                                                let index = row * GRID_WIDTH + col;
                                                let name = move || {
                                                    pool.with(|p| p.grid.get(index).map(str::to_string))
                                                };
                                                let class = move || {
                                                    let winning = winners
                                                        .with(|ws| ws.iter().any(|w| w.cell_index == index));
                                                    highlighted
                                                        .with(|h| square_class(name().as_deref(), h.as_deref(), winning))
                                                };
                                                view! {
                                                    <td
                                                        class=class
                                                        on:click=move |_| {
                                                            if let Some(n) = name() {
                                                                highlighted.set(Some(n.clone()));
                                                                selected.set(Some(n));
                                                            }
                                                        }
                                                    >
                                                        {move || name().unwrap_or_default()}
                                                    </td>
                                                }
                                            })
                                            .collect_view()}
                                    </tr>
                                }
                            })
                            .collect_view()}
                    </tbody>
                </table>
            </div>
        </div>
    };

    let winners_view = view! {
        <section class="winners">
            <h2>"Quarter Winners"</h2>
            {move || {
                let (column_team, row_team) = pool
                    .with(|p| (p.teams.column.clone(), p.teams.row.clone()));
                let records = winners.get();
                if records.is_empty() {
                    view! { <p class="muted">"No quarter scores yet."</p> }.into_any()
                } else {
                    view! {
                        <table>
                            <tbody>
                                {records
                                    .iter()
                                    .map(|w| {
                                        view! {
                                            <tr>
                                                <td>{w.quarter.label()}</td>
                                                <td>
                                                    {format!(
                                                        "{} {} - {} {}",
                                                        column_team,
                                                        w.column_score,
                                                        row_team,
                                                        w.row_score,
                                                    )}
                                                </td>
                                                <td>{winner_label(w)}</td>
                                            </tr>
                                        }
                                    })
                                    .collect_view()}
                            </tbody>
                        </table>
                    }
                        .into_any()
                }
            }}
        </section>
    };

    let lookup_view = move || {
        (assigned.get() > 0)
            .then(|| {
                view! {
                    <section class="player-lookup">
                        <h2>"Player Squares"</h2>
                        <div class="lookup-body">
                            <div class="player-list">
                                {move || {
                                    pool.with(|p| p.grid.unique_players())
                                        .into_iter()
                                        .map(|name| {
                                            let count = pool.with(|p| p.grid.count_for(&name));
                                            let is_selected = {
                                                let name = name.clone();
                                                move || selected.with(|s| s.as_deref() == Some(name.as_str()))
                                            };
                                            let label = format!("{} ({})", name, count);
                                            view! {
                                                <button
                                                    class:selected=is_selected
                                                    on:click=move |_| {
                                                        selected.set(Some(name.clone()));
                                                        highlighted.set(Some(name.clone()));
                                                    }
                                                >
                                                    {label}
                                                </button>
                                            }
                                        })
                                        .collect_view()
                                }}
                            </div>
                            <div class="player-detail">
                                {move || match selected.get() {
                                    Some(name) => {
                                        let (column_team, row_team, squares) = pool
                                            .with(|p| {
                                                (
                                                    p.teams.column.clone(),
                                                    p.teams.row.clone(),
                                                    player_squares(&p.grid, &p.row_labels, &p.column_labels, &name),
                                                )
                                            });
                                        view! {
                                            <h3>{format!("{}'s Squares", name)}</h3>
                                            <ul>
                                                {squares
                                                    .into_iter()
                                                    .map(|sq| {
                                                        view! {
                                                            <li>
                                                                {format!(
                                                                    "{} {} - {} {}",
                                                                    column_team,
                                                                    sq.column_digit,
                                                                    row_team,
                                                                    sq.row_digit,
                                                                )}
                                                            </li>
                                                        }
                                                    })
                                                    .collect_view()}
                                            </ul>
                                        }
                                            .into_any()
                                    }
                                    None => {
                                        view! {
                                            <p class="muted">"Select a player to view their squares"</p>
                                        }
                                            .into_any()
                                    }
                                }}
                            </div>
                        </div>
                    </section>
                }
            })
    };

    let admin_view = move || {
        let navigate = navigate.clone();
        let delete_this_pool = move |_| {
            let key = pool_key.get_value();
            if !confirm(&format!("Delete pool '{}'?", key)) {
                return;
            }
            // Drop any pending save so it can't recreate the pool.
            pending_save.set_value(None);
            let navigate = navigate.clone();
            spawn_local(async move {
                match delete_pool_handler(key).await {
                    Ok(_) => navigate("/", NavigateOptions::default()),
                    Err(e) => delete_error.set(e.to_string()),
                }
            });
        };
        admin
            .then(|| {
                view! {
                    <aside class="admin-panel">
                        <section class="admin-section">
                            <h2>"Pool"</h2>
                            <label>
                                "Title: "
                                <input
                                    class="form-input"
                                    type="text"
                                    prop:value=move || pool.with(|p| p.title.clone())
                                    on:change=move |ev| {
                                        let value = event_target_value(&ev);
                                        pool.update(|p| p.title = value);
                                        schedule_save();
                                    }
                                />
                            </label>
                            <label>
                                "Columns: "
                                <input
                                    class="form-input"
                                    type="text"
                                    prop:value=move || pool.with(|p| p.teams.column.clone())
                                    on:change=move |ev| {
                                        let value = event_target_value(&ev);
                                        pool.update(|p| p.teams.column = value);
                                        schedule_save();
                                    }
                                />
                            </label>
                            <label>
                                "Rows: "
                                <input
                                    class="form-input"
                                    type="text"
                                    prop:value=move || pool.with(|p| p.teams.row.clone())
                                    on:change=move |ev| {
                                        let value = event_target_value(&ev);
                                        pool.update(|p| p.teams.row = value);
                                        schedule_save();
                                    }
                                />
                            </label>
                            <label>
                                <input
                                    type="checkbox"
                                    prop:checked=move || completed.get()
                                    on:change=move |ev| {
                                        let value = event_target_checked(&ev);
                                        pool.update(|p| p.completed = value);
                                        schedule_save();
                                    }
                                />
                                " Final"
                            </label>
                        </section>

                        <section class="admin-section">
                            <h2>"Players"</h2>
                            <div class="player-rows">
                                {move || {
                                    roster
                                        .get()
                                        .into_iter()
                                        .enumerate()
                                        .map(|(i, player)| {
                                            view! {
                                                <div class="player-row">
                                                    <input
                                                        class="form-input"
                                                        type="text"
                                                        placeholder="Player name"
                                                        prop:value=player.name.clone()
                                                        on:change=move |ev| {
                                                            let value = event_target_value(&ev);
                                                            pool.update(|p| {
                                                                if let Some(entry) = p.roster.get_mut(i) {
                                                                    entry.name = value;
                                                                }
                                                            });
                                                            schedule_save();
                                                        }
                                                    />
                                                    <input
                                                        class="form-input squares-input"
                                                        type="number"
                                                        min="1"
                                                        max=GRID_SIZE.to_string()
                                                        prop:value=player.squares.to_string()
                                                        on:change=move |ev| {
                                                            let value = Participant::parse_squares(
                                                                &event_target_value(&ev),
                                                            );
                                                            pool.update(|p| {
                                                                if let Some(entry) = p.roster.get_mut(i) {
                                                                    entry.squares = value;
                                                                }
                                                            });
                                                            schedule_save();
                                                        }
                                                    />
                                                    <button
                                                        class="btn-danger"
                                                        on:click=move |_| {
                                                            pool.update(|p| {
                                                                if i < p.roster.len() {
                                                                    p.roster.remove(i);
                                                                }
                                                            });
                                                            schedule_save();
                                                        }
                                                    >
                                                        "Remove"
                                                    </button>
                                                </div>
                                            }
                                        })
                                        .collect_view()
                                }}
                            </div>
                            <button class="btn-secondary" on:click=add_player>
                                "Add Player"
                            </button>
                            <div class="summary">
                                "Total squares: " {move || requested.get()} " / " {GRID_SIZE}
                                {move || {
                                    (requested.get() > GRID_SIZE as u64)
                                        .then(|| view! { <p class="error">"Too many squares!"</p> })
                                }}
                            </div>
                            <button
                                class="btn-primary"
                                disabled=move || completed.get()
                                on:click=fill_squares
                            >
                                "Fill Squares Randomly"
                            </button>
                            <button
                                class="btn-danger"
                                disabled=move || completed.get()
                                on:click=clear_squares
                            >
                                "Clear All Squares"
                            </button>
                            {move || {
                                (!message.get().is_empty())
                                    .then(|| view! { <p class="error">{message.get()}</p> })
                            }}
                        </section>

                        <section class="admin-section">
                            <h2>"Scores"</h2>
                            <table class="score-entry">
                                <thead>
                                    <tr>
                                        <th></th>
                                        <th>{move || pool.with(|p| p.teams.column.clone())}</th>
                                        <th>{move || pool.with(|p| p.teams.row.clone())}</th>
                                    </tr>
                                </thead>
                                <tbody>
                                    {Quarter::ALL
                                        .iter()
                                        .map(|&quarter| {
                                            let q = quarter.index();
                                            view! {
                                                <tr>
                                                    <td>{quarter.label()}</td>
                                                    <td>
                                                        <input
                                                            class="form-input score-input"
                                                            type="number"
                                                            min="0"
                                                            prop:value=move || {
                                                                pool.with(|p| {
                                                                    p.quarters[q].column.map(|s| s.to_string()).unwrap_or_default()
                                                                })
                                                            }
                                                            on:change=move |ev| {
                                                                let value = parse_score(&event_target_value(&ev));
                                                                pool.update(|p| p.quarters[q].column = value);
                                                                schedule_save();
                                                            }
                                                        />
                                                    </td>
                                                    <td>
                                                        <input
                                                            class="form-input score-input"
                                                            type="number"
                                                            min="0"
                                                            prop:value=move || {
                                                                pool.with(|p| {
                                                                    p.quarters[q].row.map(|s| s.to_string()).unwrap_or_default()
                                                                })
                                                            }
                                                            on:change=move |ev| {
                                                                let value = parse_score(&event_target_value(&ev));
                                                                pool.update(|p| p.quarters[q].row = value);
                                                                schedule_save();
                                                            }
                                                        />
                                                    </td>
                                                </tr>
                                            }
                                        })
                                        .collect_view()}
                                </tbody>
                            </table>
                        </section>
                        <p class="muted">{move || save_status.get()}</p>
                        <button class="btn-danger" on:click=delete_this_pool>
                            "Delete Pool"
                        </button>
                        {move || {
                            (!delete_error.get().is_empty())
                                .then(|| view! { <p class="error">{delete_error.get()}</p> })
                        }}
                    </aside>
                }
            })
    };

    view! {
        <Title text=move || pool.with(|p| p.title.clone()) />
        <h1>{move || pool.with(|p| p.title.clone())}</h1>
        <p class="matchup">
            {move || pool.with(|p| format!("{} vs {}", p.teams.column, p.teams.row))}
            {move || completed.get().then(|| view! { <span class="badge">" Final"</span> })}
        </p>
        <div class="pool-layout">{board} {admin_view}</div>
        {winners_view}
        {lookup_view}
    }
}
