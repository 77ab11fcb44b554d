use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use patchdesk_types::{Role, Settings, User};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    email: String,
    role: Role,
}

#[derive(Debug, Deserialize)]
struct AgentRequest {
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct CreatePatchRequest {
    file: String,
    code: String,
}

#[derive(Debug, Serialize)]
struct ApplyResponse {
    message: String,
    backup: Option<String>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(healthz))
        .route("/healthz", get(healthz))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/settings", get(get_settings).post(update_settings))
        .route("/agent", post(agent))
        .route("/patches", get(list_patches).post(create_patch))
        .route("/patches/:name", get(show_patch))
        .route("/patches/apply/:name", post(apply_patch))
        .route("/backups", get(list_backups))
        .route("/backups/rollback/:name", post(rollback_backup))
        .with_state(state)
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Backend is running" }))
}

async fn signup(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> ApiResult<Json<Value>> {
    state.users.insert(User {
        email: req.email.clone(),
        password: req.password,
        role: Role::User,
    })?;
    tracing::info!(email = %req.email, "user signed up");
    Ok(Json(json!({ "message": "User created" })))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state.users.authenticate(&req.email, &req.password)?;
    Ok(Json(LoginResponse {
        email: user.email,
        role: user.role,
    }))
}

async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<Settings>> {
    Ok(Json(state.settings.masked()?))
}

async fn update_settings(
    State(state): State<AppState>,
    Json(updates): Json<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    state.settings.merge(updates)?;
    Ok(Json(json!({ "message": "Settings updated" })))
}

async fn agent(
    State(state): State<AppState>,
    Json(req): Json<AgentRequest>,
) -> ApiResult<Json<Map<String, Value>>> {
    Ok(Json(state.agent.ask(&req.prompt).await?))
}

async fn list_patches(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.engine.patches().list()?))
}

async fn create_patch(
    State(state): State<AppState>,
    Json(req): Json<CreatePatchRequest>,
) -> ApiResult<Json<Value>> {
    let name = state.engine.create_patch(&req.file, req.code.as_bytes())?;
    Ok(Json(json!({ "name": name })))
}

async fn show_patch(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let content = state.engine.patches().get(&name)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        String::from_utf8_lossy(&content).into_owned(),
    ))
}

async fn apply_patch(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ApplyResponse>> {
    let outcome = state.engine.apply(&name)?;
    Ok(Json(ApplyResponse {
        message: format!("Patch {} applied to {}", outcome.patch, outcome.target),
        backup: outcome.backup,
    }))
}

async fn list_backups(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.engine.backups().list()?))
}

async fn rollback_backup(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    let outcome = state.engine.rollback(&name)?;
    Ok(Json(json!({
        "message": format!("Rolled back {} from {}", outcome.target, outcome.backup)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use patchdesk_infer::{CompletionEngine, StubEngine};
    use patchdesk_types::API_KEY_MASK;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    struct TestApp {
        _dir: TempDir,
        root: PathBuf,
        state: AppState,
    }

    fn test_app(llm: Arc<dyn CompletionEngine>, env_key: Option<&str>) -> TestApp {
        let dir = tempdir().unwrap();
        let root = dir.path().join("project");
        fs::create_dir_all(&root).unwrap();
        let cfg = ServerConfig {
            data_dir: dir.path().join("data"),
            project_root: root.clone(),
            openai_api_key: env_key.map(str::to_string),
            ..ServerConfig::default()
        };
        let state = AppState::build(&cfg, llm).unwrap();
        TestApp {
            _dir: dir,
            root,
            state,
        }
    }

    fn plain_app() -> TestApp {
        test_app(Arc::new(StubEngine::default()), None)
    }

    impl TestApp {
        async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> Response {
            let mut req = Request::builder().method(method).uri(uri);
            let body = match body {
                Some(v) => {
                    req = req.header("content-type", "application/json");
                    Body::from(v.to_string())
                }
                None => Body::empty(),
            };
            app(self.state.clone())
                .oneshot(req.body(body).unwrap())
                .await
                .unwrap()
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    #[tokio::test]
    async fn health_endpoints_report_ok() {
        let t = plain_app();
        for uri in ["/", "/healthz"] {
            let res = t.send("GET", uri, None).await;
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(body_json(res).await["status"], "ok");
        }
    }

    #[tokio::test]
    async fn signup_then_login_returns_role() {
        let t = plain_app();
        let creds = json!({"email": "a@example.com", "password": "pw"});

        let res = t.send("POST", "/signup", Some(creds.clone())).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = t.send("POST", "/login", Some(creds)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            body_json(res).await,
            json!({"email": "a@example.com", "role": "user"})
        );
    }

    #[tokio::test]
    async fn default_admin_can_log_in() {
        let t = plain_app();
        let res = t
            .send(
                "POST",
                "/login",
                Some(json!({"email": "admin@example.com", "password": "admin"})),
            )
            .await;
        assert_eq!(body_json(res).await["role"], "admin");
    }

    #[tokio::test]
    async fn duplicate_signup_is_rejected() {
        let t = plain_app();
        t.send("POST", "/signup", Some(json!({"email": "a@example.com", "password": "pw"})))
            .await;

        let res = t
            .send("POST", "/signup", Some(json!({"email": "a@example.com", "password": "other"})))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_login_is_unauthorized() {
        let t = plain_app();
        let res = t
            .send("POST", "/login", Some(json!({"email": "admin@example.com", "password": "x"})))
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn settings_never_expose_the_key() {
        let t = plain_app();
        let res = t
            .send("POST", "/settings", Some(json!({"api_key": "sk-real", "model": "gpt-x"})))
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        // echoing the masked form back must not overwrite the real key
        t.send("POST", "/settings", Some(json!({"api_key": API_KEY_MASK, "theme": "dark"})))
            .await;

        let shown = body_json(t.send("GET", "/settings", None).await).await;
        assert_eq!(shown["api_key"], API_KEY_MASK);
        assert_eq!(shown["model"], "gpt-x");
        assert_eq!(shown["theme"], "dark");
        assert_eq!(t.state.settings.load().unwrap().api_key.as_deref(), Some("sk-real"));
    }

    #[tokio::test]
    async fn agent_without_key_fails_and_saves_nothing() {
        let reply = json!({"file": "a.txt", "code": "x"}).to_string();
        let t = test_app(Arc::new(StubEngine::new(reply)), None);

        let res = t.send("POST", "/agent", Some(json!({"prompt": "hi"}))).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body_json(res).await["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("configuration"), "{detail}");
        assert!(t.state.engine.patches().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn agent_proposal_becomes_a_patch() {
        let reply = json!({"file": "notes.txt", "code": "hello"}).to_string();
        let t = test_app(Arc::new(StubEngine::new(reply)), Some("sk-env"));

        let res = t.send("POST", "/agent", Some(json!({"prompt": "write notes"}))).await;
        assert_eq!(res.status(), StatusCode::OK);
        let name = body_json(res).await["patch_saved"].as_str().unwrap().to_string();

        let listed = body_json(t.send("GET", "/patches", None).await).await;
        assert_eq!(listed, json!([name.clone()]));

        let res = t.send("GET", &format!("/patches/{name}"), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_text(res).await, "hello");
    }

    #[tokio::test]
    async fn agent_plain_reply_is_wrapped() {
        let t = test_app(Arc::new(StubEngine::new("not json")), Some("sk-env"));
        let res = t.send("POST", "/agent", Some(json!({"prompt": "hi"}))).await;
        assert_eq!(body_json(res).await, json!({"message": "not json"}));
    }

    #[tokio::test]
    async fn apply_and_rollback_over_http() {
        let t = plain_app();
        fs::write(t.root.join("config.json"), "old").unwrap();

        let res = t
            .send("POST", "/patches", Some(json!({"file": "config.json", "code": "{}"})))
            .await;
        let name = body_json(res).await["name"].as_str().unwrap().to_string();

        let res = t.send("POST", &format!("/patches/apply/{name}"), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let applied = body_json(res).await;
        let backup = applied["backup"].as_str().unwrap().to_string();
        assert!(backup.starts_with("config.json.bak_"));
        assert_eq!(fs::read_to_string(t.root.join("config.json")).unwrap(), "{}");

        let listed = body_json(t.send("GET", "/backups", None).await).await;
        assert_eq!(listed, json!([backup.clone()]));

        let res = t.send("POST", &format!("/backups/rollback/{backup}"), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(fs::read_to_string(t.root.join("config.json")).unwrap(), "old");
    }

    #[tokio::test]
    async fn apply_to_new_file_reports_no_backup() {
        let t = plain_app();
        let res = t
            .send("POST", "/patches", Some(json!({"file": "new.txt", "code": "x"})))
            .await;
        let name = body_json(res).await["name"].as_str().unwrap().to_string();

        let res = t.send("POST", &format!("/patches/apply/{name}"), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["backup"], Value::Null);
    }

    #[tokio::test]
    async fn unknown_names_are_404() {
        let t = plain_app();
        for (method, uri) in [
            ("GET", "/patches/20240101_120000_nope.txt"),
            ("POST", "/patches/apply/20240101_120000_nope.txt"),
            ("POST", "/backups/rollback/nope.txt.bak_20240101_120000"),
        ] {
            let res = t.send(method, uri, None).await;
            assert_eq!(res.status(), StatusCode::NOT_FOUND, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn write_failure_is_500() {
        let t = plain_app();
        let res = t
            .send("POST", "/patches", Some(json!({"file": "missing/dir.txt", "code": "x"})))
            .await;
        let name = body_json(res).await["name"].as_str().unwrap().to_string();

        let res = t.send("POST", &format!("/patches/apply/{name}"), None).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unencodable_target_is_bad_request() {
        let t = plain_app();
        let res = t
            .send("POST", "/patches", Some(json!({"file": "snake_case.rs", "code": "x"})))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn second_patch_in_the_same_second_is_bad_request() {
        let t = plain_app();
        for attempt in 0..5 {
            let file = format!("page{attempt}.html");
            let first = t
                .send("POST", "/patches", Some(json!({"file": file, "code": "one"})))
                .await;
            assert_eq!(first.status(), StatusCode::OK);
            let second = t
                .send("POST", "/patches", Some(json!({"file": file, "code": "two"})))
                .await;
            if second.status() == StatusCode::OK {
                // crossed a second boundary, try again
                continue;
            }
            assert_eq!(second.status(), StatusCode::BAD_REQUEST);
            assert!(body_json(second).await["detail"].is_string());
            let stored = t.state.engine.patches().list().unwrap();
            let name = stored.iter().find(|n| n.ends_with(&file)).unwrap();
            assert_eq!(t.state.engine.patches().get(name).unwrap(), b"one");
            return;
        }
        panic!("no two requests landed in the same second");
    }

    #[tokio::test]
    async fn blank_or_masked_key_post_keeps_the_stored_key() {
        let t = plain_app();
        t.send("POST", "/settings", Some(json!({"api_key": "sk-real"}))).await;
        for key in ["", "   ", API_KEY_MASK] {
            let res = t.send("POST", "/settings", Some(json!({"api_key": key}))).await;
            assert_eq!(res.status(), StatusCode::OK);
        }
        assert_eq!(t.state.settings.load().unwrap().api_key.as_deref(), Some("sk-real"));
    }

    #[tokio::test]
    async fn non_string_model_is_bad_request() {
        let t = plain_app();
        t.send("POST", "/settings", Some(json!({"model": "gpt-x"}))).await;
        let res = t.send("POST", "/settings", Some(json!({"model": 5}))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(t.send("GET", "/settings", None).await).await;
        assert_eq!(body["model"], "gpt-x");
    }
}
