//! HTTP endpoints for the task list.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::{Task, TaskError, TaskService};
use crate::context::Context;
use crate::http::{Response, StatusCode};
use crate::router::Router;

const INDEX_PAGE: &str = "\
<h1>Simple Task Manager API</h1>
<p>Use the following endpoints:</p>
<ul>
  <li>GET /api/tasks</li>
  <li>POST /api/tasks</li>
  <li>PUT /api/tasks/&lt;id&gt;</li>
  <li>DELETE /api/tasks/&lt;id&gt;</li>
</ul>
";

/// Builds the router for the task API.
///
/// | Method | Path             | Success                      |
/// |--------|------------------|------------------------------|
/// | GET    | `/`              | `200` HTML usage page        |
/// | GET    | `/api/tasks`     | `200` array of tasks         |
/// | POST   | `/api/tasks`     | `201` created task           |
/// | PUT    | `/api/tasks/:id` | `200` updated task           |
/// | DELETE | `/api/tasks/:id` | `200` removed task           |
///
/// Anything else falls through to the router's JSON `404`.
pub fn routes(service: Arc<TaskService>) -> Router {
    let mut router = Router::new();

    router.get("/", |_ctx: Context| async { Response::html(StatusCode::Ok, INDEX_PAGE) });

    let svc = Arc::clone(&service);
    router.get("/api/tasks", move |_ctx: Context| {
        let svc = Arc::clone(&svc);
        async move { respond(StatusCode::Ok, svc.list().await) }
    });

    let svc = Arc::clone(&service);
    router.post("/api/tasks", move |ctx: Context| {
        let svc = Arc::clone(&svc);
        async move { respond(StatusCode::Created, create(&svc, &ctx).await) }
    });

    let svc = Arc::clone(&service);
    router.put("/api/tasks/:id", move |ctx: Context| {
        let svc = Arc::clone(&svc);
        async move { respond(StatusCode::Ok, update(&svc, &ctx).await) }
    });

    router.delete("/api/tasks/:id", move |ctx: Context| {
        let svc = Arc::clone(&service);
        async move { respond(StatusCode::Ok, remove(&svc, &ctx).await) }
    });

    router
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, TaskError>) -> Response {
    match result {
        Ok(body) => Response::json(status, &body),
        Err(e) => e.into_response(),
    }
}

async fn create(service: &TaskService, ctx: &Context) -> Result<Task, TaskError> {
    let body: Value = ctx.json().map_err(|_| TaskError::InvalidJson)?;
    let title = body
        .get("title")
        .filter(|v| !v.is_null())
        .or_else(|| body.get("description"))
        .and_then(Value::as_str)
        .ok_or(TaskError::TitleRequired)?;
    service.create(title).await
}

async fn update(service: &TaskService, ctx: &Context) -> Result<Task, TaskError> {
    let id = task_id(ctx)?;
    let completed = requested_completion(ctx)?;
    service.set_completed(id, completed).await
}

async fn remove(service: &TaskService, ctx: &Context) -> Result<Task, TaskError> {
    service.delete(task_id(ctx)?).await
}

/// Parses the `:id` capture. Only plain ASCII digits are accepted.
fn task_id(ctx: &Context) -> Result<u64, TaskError> {
    let raw = ctx.params().get("id").unwrap_or_default();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TaskError::InvalidId);
    }
    raw.parse().map_err(|_| TaskError::InvalidId)
}

/// The `completed` value a `PUT` asks for.
///
/// The body is only read when it is declared as JSON; a JSON body without a
/// boolean `completed` field, or no body at all, means `true`.
fn requested_completion(ctx: &Context) -> Result<bool, TaskError> {
    if !ctx.request().has_json_body() {
        return Ok(true);
    }
    let body: Value = ctx.json().map_err(|_| TaskError::InvalidJson)?;
    Ok(body.get("completed").and_then(Value::as_bool).unwrap_or(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Request;
    use crate::store::MemoryStore;
    use serde_json::json;

    struct Harness {
        store: Arc<MemoryStore>,
        router: Router,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_tasks(Vec::new())
        }

        fn with_tasks(tasks: Vec<Task>) -> Self {
            let store = Arc::new(MemoryStore::with_tasks(tasks));
            let router = routes(Arc::new(TaskService::new(store.clone())));
            Self { store, router }
        }

        async fn send(&self, method: &str, path: &str, body: Option<&str>) -> (StatusCode, Value) {
            let raw = match body {
                Some(body) => format!(
                    "{method} {path} HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
                    body.len()
                ),
                None => format!("{method} {path} HTTP/1.1\r\n\r\n"),
            };
            let (request, _) = Request::parse(raw.as_bytes()).unwrap();
            let response = self.router.dispatch(Context::new(request)).await;
            let value = if response.body_bytes().is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(response.body_bytes()).unwrap_or(Value::Null)
            };
            (response.status(), value)
        }
    }

    #[tokio::test]
    async fn create_on_empty_store() {
        let h = Harness::new();
        let (status, body) = h.send("POST", "/api/tasks", Some(r#"{"title":"buy milk"}"#)).await;
        assert_eq!(status, StatusCode::Created);
        assert_eq!(body, json!({ "id": 1, "title": "buy milk", "completed": false }));
        assert_eq!(h.store.snapshot().await, vec![Task::new(1, "buy milk")]);
    }

    #[tokio::test]
    async fn create_accepts_description() {
        let h = Harness::new();
        let (status, body) = h
            .send("POST", "/api/tasks", Some(r#"{"description":"walk dog"}"#))
            .await;
        assert_eq!(status, StatusCode::Created);
        assert_eq!(body["title"], "walk dog");
    }

    #[tokio::test]
    async fn create_rejects_blank_or_missing_titles() {
        let h = Harness::new();
        for body in [r#"{"title":""}"#, r#"{"title":"   "}"#, "{}", r#"{"title":42}"#, "[]"] {
            let (status, value) = h.send("POST", "/api/tasks", Some(body)).await;
            assert_eq!(status, StatusCode::BadRequest, "body {body}");
            assert_eq!(value, json!({ "error": "Task title is required." }));
        }
        let (status, _) = h.send("POST", "/api/tasks", None).await;
        assert_eq!(status, StatusCode::BadRequest);
        assert!(h.store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_malformed_json() {
        let h = Harness::new();
        let (status, value) = h.send("POST", "/api/tasks", Some(r#"{"title": "#)).await;
        assert_eq!(status, StatusCode::BadRequest);
        assert_eq!(value, json!({ "error": "Invalid JSON" }));
        assert!(h.store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn list_returns_everything_in_order() {
        let h = Harness::with_tasks(vec![Task::new(5, "e"), Task::new(2, "b")]);
        let (status, body) = h.send("GET", "/api/tasks", None).await;
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(
            body,
            json!([
                { "id": 5, "title": "e", "completed": false },
                { "id": 2, "title": "b", "completed": false }
            ])
        );
    }

    #[tokio::test]
    async fn put_without_body_marks_complete() {
        let h = Harness::with_tasks(vec![Task::new(1, "buy milk")]);
        let (status, body) = h.send("PUT", "/api/tasks/1", None).await;
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(body, json!({ "id": 1, "title": "buy milk", "completed": true }));
    }

    #[tokio::test]
    async fn put_honours_boolean_completed() {
        let mut done = Task::new(1, "x");
        done.completed = true;
        let h = Harness::with_tasks(vec![done]);

        let (_, body) = h.send("PUT", "/api/tasks/1", Some(r#"{"completed":false}"#)).await;
        assert_eq!(body["completed"], false);

        let (_, body) = h.send("PUT", "/api/tasks/1", Some(r#"{"completed":"no"}"#)).await;
        assert_eq!(body["completed"], true);
    }

    #[tokio::test]
    async fn put_with_malformed_json_is_rejected() {
        let h = Harness::with_tasks(vec![Task::new(1, "x")]);
        let (status, _) = h.send("PUT", "/api/tasks/1", Some("{oops")).await;
        assert_eq!(status, StatusCode::BadRequest);
        assert!(!h.store.snapshot().await[0].completed);
    }

    #[tokio::test]
    async fn put_with_whitespace_json_body_is_rejected() {
        let h = Harness::with_tasks(vec![Task::new(1, "x")]);
        let (status, body) = h.send("PUT", "/api/tasks/1", Some("  ")).await;
        assert_eq!(status, StatusCode::BadRequest);
        assert_eq!(body, json!({ "error": "Invalid JSON" }));
        assert!(!h.store.snapshot().await[0].completed);
    }

    #[tokio::test]
    async fn malformed_ids_are_bad_requests() {
        let h = Harness::with_tasks(vec![Task::new(1, "x")]);
        for path in ["/api/tasks/abc", "/api/tasks/-1", "/api/tasks/+1", "/api/tasks/1.5"] {
            let (status, body) = h.send("PUT", path, None).await;
            assert_eq!(status, StatusCode::BadRequest, "PUT {path}");
            assert_eq!(body, json!({ "error": "Invalid task id." }));

            let (status, _) = h.send("DELETE", path, None).await;
            assert_eq!(status, StatusCode::BadRequest, "DELETE {path}");
        }
        let (status, _) = h.send("DELETE", "/api/tasks/99999999999999999999999", None).await;
        assert_eq!(status, StatusCode::BadRequest);
        assert_eq!(h.store.snapshot().await, vec![Task::new(1, "x")]);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let h = Harness::with_tasks(vec![Task::new(1, "x")]);
        let (status, body) = h.send("PUT", "/api/tasks/2", None).await;
        assert_eq!(status, StatusCode::NotFound);
        assert_eq!(body, json!({ "error": "Task not found." }));

        let (status, _) = h.send("DELETE", "/api/tasks/2", None).await;
        assert_eq!(status, StatusCode::NotFound);
        assert_eq!(h.store.snapshot().await, vec![Task::new(1, "x")]);
    }

    #[tokio::test]
    async fn delete_returns_removed_task() {
        let h = Harness::with_tasks(vec![Task::new(1, "buy milk")]);
        let (status, body) = h.send("DELETE", "/api/tasks/1", None).await;
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(body, json!({ "id": 1, "title": "buy milk", "completed": false }));

        let (_, body) = h.send("GET", "/api/tasks", None).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn index_page_lists_endpoints() {
        let h = Harness::new();
        let raw = "GET / HTTP/1.1\r\n\r\n";
        let (request, _) = Request::parse(raw.as_bytes()).unwrap();
        let response = h.router.dispatch(Context::new(request)).await;
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(
            response.headers().get("content-type"),
            Some("text/html; charset=utf-8")
        );
        let page = std::str::from_utf8(response.body_bytes()).unwrap();
        assert!(page.contains("DELETE /api/tasks/&lt;id&gt;"));
    }

    #[tokio::test]
    async fn other_paths_are_json_404s() {
        let h = Harness::new();
        let (status, body) = h.send("GET", "/api/tasks/1", None).await;
        assert_eq!(status, StatusCode::NotFound);
        assert_eq!(body, json!({ "error": "Endpoint not found." }));

        let (status, _) = h.send("POST", "/api/tasks/1", None).await;
        assert_eq!(status, StatusCode::NotFound);

        for path in ["/api/tasks/", "/api/tasks//1"] {
            let (status, body) = h.send("DELETE", path, None).await;
            assert_eq!(status, StatusCode::NotFound, "DELETE {path}");
            assert_eq!(body, json!({ "error": "Endpoint not found." }));
        }
        let (status, _) = h.send("GET", "/api/tasks/", None).await;
        assert_eq!(status, StatusCode::NotFound);
    }
}
