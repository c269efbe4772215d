//! Demo API: accounts, a product catalog and file uploads, all in memory.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use dashmap::{mapref::entry::Entry, DashMap};
use http::StatusCode;
use routeway::{
    config::{AppConfig, SecretsConfig},
    constants::data_keys::IDENTITY,
    features::auth::{clear_session_cookie, set_session_cookie, Identity, JwtValidator, SessionStore},
    middleware::{
        auth as auth_mw, cors::cors, logger::logger, recover::recover, request_id::request_id,
        upload,
    },
    AppError, Context, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

const TOKEN_TTL: Duration = Duration::from_secs(24 * 3600);
const UPLOAD_DIR: &str = "uploads";

pub struct Demo {
    pub router: Router,
    pub sessions: Arc<SessionStore>,
}

struct User {
    email: String,
    password: String,
    roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Product {
    id: u64,
    name: String,
    price: f64,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ProductInput {
    name: String,
    price: f64,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Default)]
struct Store {
    users: DashMap<String, User>,
    products: DashMap<u64, Product>,
    next_product_id: AtomicU64,
}

impl Store {
    fn seeded(admin_password: Option<String>) -> Self {
        let store = Store::default();
        if let Some(password) = admin_password {
            store.users.insert(
                "admin".to_string(),
                User {
                    email: "admin@localhost".to_string(),
                    password,
                    roles: vec!["user".to_string(), "admin".to_string()],
                },
            );
        }
        store
    }
}

pub fn build(config: &AppConfig, secrets: &SecretsConfig) -> anyhow::Result<Demo> {
    let jwt = Arc::new(JwtValidator::from_secrets(secrets));
    let sessions = Arc::new(SessionStore::new(config.auth.session_ttl()?));
    let store = Arc::new(Store::seeded(std::env::var("ADMIN_PASSWORD").ok()));
    let cookie_name = config.auth.cookie_name.clone();

    let mut router = Router::new();
    router
        .use_middleware(recover())
        .use_middleware(request_id())
        .use_middleware(logger())
        .use_middleware(cors(config.cors.clone()));

    router
        .not_found(|ctx| ctx.error_not_found("Page not found"))
        .method_not_allowed(|ctx| ctx.error_method_not_allowed("Method not allowed"));

    router
        .get("/", |ctx| ctx.respond_ok(&json!({"message": "Hello from routeway"})))
        .get("/health", |ctx| ctx.respond_ok(&json!({"status": "ok"})))
        .get("/panic", |_ctx| panic!("panic route hit"));

    // Accounts
    {
        let mut auth = router.group("/auth");

        let users = Arc::clone(&store);
        auth.post("/register", move |ctx| register(ctx, &users));

        let users = Arc::clone(&store);
        let (issuer, store_sessions, cookie) =
            (Arc::clone(&jwt), Arc::clone(&sessions), cookie_name.clone());
        auth.post("/login", move |ctx| login(ctx, &users, &issuer, &store_sessions, &cookie));

        let mut session = auth.group("");
        session.use_middleware(auth_mw::cookie(Arc::clone(&sessions), &cookie_name, IDENTITY));
        let (store_sessions, cookie) = (Arc::clone(&sessions), cookie_name.clone());
        session.post("/logout", move |ctx| logout(ctx, &store_sessions, &cookie));
    }

    // Protected API
    {
        let mut api = router.group("/api");
        api.use_middleware(auth_mw::bearer(Arc::clone(&jwt), IDENTITY));

        let users = Arc::clone(&store);
        api.get("/profile", move |ctx| profile(ctx, &users));

        let mut products = api.group("/products");
        let catalog = Arc::clone(&store);
        products.get("", move |ctx| list_products(ctx, &catalog));
        let catalog = Arc::clone(&store);
        products.get("/:id", move |ctx| get_product(ctx, &catalog));

        let mut admin = products.group("");
        admin.use_middleware(auth_mw::require_roles(IDENTITY, &["admin"]));
        let catalog = Arc::clone(&store);
        admin.post("", move |ctx| create_product(ctx, &catalog));
        let catalog = Arc::clone(&store);
        admin.put("/:id", move |ctx| update_product(ctx, &catalog));
        let catalog = Arc::clone(&store);
        admin.delete("/:id", move |ctx| delete_product(ctx, &catalog));
    }

    // Uploads
    {
        let mut uploads = router.group("/upload");
        uploads
            .use_middleware(auth_mw::bearer(Arc::clone(&jwt), IDENTITY))
            .use_middleware(upload::logger())
            .use_middleware(upload::validator(config.upload.clone()));
        let dir = PathBuf::from(UPLOAD_DIR);
        uploads.post("", move |ctx| save_uploads(ctx, &dir));
    }
    router.serve_static("/uploads", UPLOAD_DIR);

    info!(routes = router.routes().len(), "demo routes registered");
    Ok(Demo { router, sessions })
}

fn register(ctx: &mut Context, store: &Store) {
    let Ok(req) = ctx.bind_json::<RegisterRequest>() else {
        ctx.error_bad_request("Invalid request body");
        return;
    };
    if req.username.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        ctx.error_bad_request("Missing required fields");
        return;
    }
    if !is_valid_email(&req.email) {
        ctx.error_bad_request("Invalid email format");
        return;
    }
    if !is_valid_password(&req.password) {
        ctx.error_bad_request(
            "Password must be between 8 and 128 characters, and contain uppercase, lowercase, digit, and special character",
        );
        return;
    }
    if store.users.iter().any(|user| user.email == req.email) {
        ctx.error_conflict("User already exists");
        return;
    }

    // the scan above must release its shard guards before `entry` locks one
    match store.users.entry(req.username) {
        Entry::Occupied(_) => ctx.error_conflict("User already exists"),
        Entry::Vacant(slot) => {
            slot.insert(User {
                email: req.email,
                password: req.password,
                roles: vec!["user".to_string()],
            });
            ctx.respond_created(&json!({"message": "User registered successfully"}));
        }
    }
}

fn login(ctx: &mut Context, store: &Store, jwt: &JwtValidator, sessions: &SessionStore, cookie_name: &str) {
    let Ok(req) = ctx.bind_json::<LoginRequest>() else {
        ctx.error_bad_request("Invalid request body");
        return;
    };
    if req.username.trim().is_empty() || req.password.is_empty() {
        ctx.error_bad_request("Username and password are required");
        return;
    }

    let roles = match store.users.get(&req.username) {
        Some(user) if user.password == req.password => user.roles.clone(),
        _ => {
            ctx.error_unauthorized("Invalid credentials");
            return;
        }
    };

    let token = match jwt.issue(&req.username, &roles, TOKEN_TTL) {
        Ok(token) => token,
        Err(err) => {
            ctx.abort_with_error(StatusCode::INTERNAL_SERVER_ERROR, err);
            return;
        }
    };
    let session = sessions.create(Identity::new(&req.username, roles));
    set_session_cookie(ctx, cookie_name, &session, sessions.ttl());
    ctx.respond_ok(&json!({"message": "Login successful", "token": token}));
}

fn logout(ctx: &mut Context, sessions: &SessionStore, cookie_name: &str) {
    if let Some(token) = ctx.cookie(cookie_name).map(str::to_owned) {
        sessions.revoke(&token);
    }
    clear_session_cookie(ctx, cookie_name);
    ctx.respond_ok(&json!({"message": "Logged out"}));
}

fn profile(ctx: &mut Context, store: &Store) {
    let Some(identity) = ctx.get::<Identity>(IDENTITY).cloned() else {
        ctx.abort(AppError::MissingAuthToken);
        return;
    };
    let email = store.users.get(&identity.user_id).map(|user| user.email.clone());
    ctx.respond_ok(&json!({
        "user_id": identity.user_id,
        "roles": identity.roles,
        "email": email,
    }));
}

fn list_products(ctx: &mut Context, store: &Store) {
    let mut products: Vec<Product> = store.products.iter().map(|p| p.value().clone()).collect();
    products.sort_by_key(|p| p.id);
    ctx.respond_ok(&products);
}

fn get_product(ctx: &mut Context, store: &Store) {
    let Some(id) = product_id(ctx) else { return };
    match store.products.get(&id).map(|p| p.value().clone()) {
        Some(product) => ctx.respond_ok(&product),
        None => ctx.error_not_found("Product not found"),
    }
}

fn create_product(ctx: &mut Context, store: &Store) {
    let Some(input) = product_input(ctx) else { return };
    let id = store.next_product_id.fetch_add(1, Ordering::Relaxed) + 1;
    let product = Product {
        id,
        name: input.name,
        price: input.price,
        description: input.description,
    };
    store.products.insert(id, product.clone());
    ctx.respond_created(&product);
}

fn update_product(ctx: &mut Context, store: &Store) {
    let Some(id) = product_id(ctx) else { return };
    let Some(input) = product_input(ctx) else { return };

    let updated = store.products.get_mut(&id).map(|mut product| {
        product.name = input.name;
        product.price = input.price;
        product.description = input.description;
        product.clone()
    });
    match updated {
        Some(product) => ctx.respond_ok(&product),
        None => ctx.error_not_found("Product not found"),
    }
}

fn delete_product(ctx: &mut Context, store: &Store) {
    let Some(id) = product_id(ctx) else { return };
    match store.products.remove(&id) {
        Some(_) => ctx.respond_no_content(&()),
        None => ctx.error_not_found("Product not found"),
    }
}

/// Parses `:id`; answers 400 and returns `None` when it is not a number.
fn product_id(ctx: &mut Context) -> Option<u64> {
    let id = ctx.param("id").and_then(|raw| raw.parse().ok());
    if id.is_none() {
        ctx.error_bad_request("Invalid product id");
    }
    id
}

fn product_input(ctx: &mut Context) -> Option<ProductInput> {
    let input = match ctx.bind_json::<ProductInput>() {
        Ok(input) => input,
        Err(err) => {
            ctx.abort(err);
            return None;
        }
    };
    if input.name.trim().is_empty() || !input.price.is_finite() || input.price < 0.0 {
        ctx.error_unprocessable_entity("Product needs a name and a non-negative price");
        return None;
    }
    Some(input)
}

fn save_uploads(ctx: &mut Context, dir: &Path) {
    let files = ctx.uploaded_files().to_vec();
    let mut saved = Vec::with_capacity(files.len());
    for file in &files {
        let stored = stored_name(&file.filename);
        if let Err(err) = ctx.save_file(file, dir.join(&stored)) {
            ctx.abort_with_error(StatusCode::INTERNAL_SERVER_ERROR, err);
            return;
        }
        saved.push(json!({
            "filename": file.filename,
            "url": format!("/uploads/{stored}"),
            "size": file.size(),
            "content_type": file.content_type,
        }));
    }
    ctx.respond_created(&json!({"files": saved}));
}

/// Unique on-disk name keeping only the final component of the client name.
fn stored_name(original: &str) -> String {
    let base = Path::new(original)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("upload");
    format!("{}-{}", Uuid::new_v4().simple(), base)
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

fn is_valid_password(password: &str) -> bool {
    let len = password.chars().count();
    (8..=128).contains(&len)
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric())
}
