#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() {
    use axum::Router;
    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::SqliteConnection;
    use leptos::logging::log;
    use leptos::prelude::*;
    use leptos_axum::{generate_route_list, LeptosRoutes};
    use mnf_squares::app::*;
    use mnf_squares::config::AppConfig;
    use mnf_squares::{init_schema, SqlitePragmas};

    let config = AppConfig::from_env().expect("Failed to load configuration");

    let manager = ConnectionManager::<SqliteConnection>::new(&config.database_url);
    let pool: DbPool = Pool::builder()
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
        .expect("Failed to create pool.");

    {
        let mut conn = pool.get().expect("Failed to get a connection from the pool.");
        init_schema(&mut conn).expect("Failed to initialize the database schema.");
    }

    let conf = get_configuration(None).unwrap();
    let addr = conf.leptos_options.site_addr;
    let leptos_options = conf.leptos_options;
    // Generate the list of routes in your Leptos App
    let routes = generate_route_list(App);

    let leptos_options_clone = leptos_options.clone();
    let app = Router::new()
        .leptos_routes_with_context(
            &leptos_options,
            routes,
            // Provide pool and config for server functions.
            move || {
                provide_context(pool.clone());
                provide_context(config.clone());
            },
            // Use App for main routes.
            move || shell(leptos_options_clone.clone()),
        )
        // Use shell for fallback.
        .fallback(leptos_axum::file_and_error_handler(shell))
        .with_state(leptos_options.clone());

    log!("listening on http://{}", &addr);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app.into_make_service())
        .await
        .unwrap();
}

#[cfg(not(feature = "ssr"))]
pub fn main() {
    // no client-side main function
    // see lib.rs for hydration function instead
}
