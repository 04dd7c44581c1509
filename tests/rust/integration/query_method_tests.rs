use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use gremgraph::config::ClientConfig;
use gremgraph::connection::memory::MemoryPool;
use gremgraph::connection::{QueryOptions, QueryRequest};
use gremgraph::gremlin::{Call, FileSourceLoader, QueryMethod, QuerySourceLoader, SourceFile};
use gremgraph::models::{ElementType, GraphValue, Vertex};
use gremgraph::{BindingReason, GraphApp, OgmError};
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

const USER_QUERIES: &str = r#"
import java.util.UUID

// Lookups
def get_by_id(id) {
    g.V(id)
}

def friends(id, limit) {
    g.V(id).out('follows').limit(limit)
}

def count_all() {
    g.V().count()
}

def summary(id) {
    g.V(id).project('name', 'age').by('name').by('age').fold()
}
"#;

struct CountingLoader {
    parses: AtomicUsize,
}

impl QuerySourceLoader for CountingLoader {
    fn parse(&self, path: &Path) -> gremgraph::Result<SourceFile> {
        self.parses.fetch_add(1, Ordering::SeqCst);
        FileSourceLoader.parse(path)
    }
}

fn query_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("user.groovy"), USER_QUERIES).unwrap();
    dir
}

fn user_type(dir: &TempDir) -> Arc<ElementType> {
    ElementType::vertex("User")
        .source_dir(dir.path())
        .method("get_by_id", QueryMethod::new())
        .method("friends", QueryMethod::new().default("limit", 10))
        .method("count_all", QueryMethod::new().classmethod(true))
        .method("summary", QueryMethod::new())
        .build()
}

fn app(pool: &MemoryPool) -> GraphApp {
    GraphApp::new(ClientConfig::default(), Arc::new(pool.clone())).unwrap()
}

fn answer(request: &QueryRequest) -> gremgraph::Result<Vec<Value>> {
    let script = request.script.as_str();
    if script.ends_with("g.V().count()") {
        Ok(vec![json!([3])])
    } else if script.contains(".fold()") {
        Ok(vec![json!([[
            {"name": "ann", "age": 31},
            {"name": "bob", "age": 27}
        ]])])
    } else {
        Ok(vec![json!([
            {"id": 42, "label": "user", "type": "vertex",
             "properties": {"name": [{"id": "p1", "value": "ann"}]}}
        ])])
    }
}

#[tokio::test]
async fn test_instance_method_binds_owner_id() {
    let dir = query_dir();
    let pool = MemoryPool::replying(answer);
    let app = app(&pool);
    let user = app.register(user_type(&dir));

    let ann = Vertex::new(42, "user");
    let result = user
        .method("get_by_id")
        .unwrap()
        .on(&ann)
        .elements(app.dispatcher(), Call::new())
        .unwrap()
        .await
        .unwrap();

    let requests = pool.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(pool.acquire_count(), 1);
    assert_eq!(requests[0].bindings.as_map(), json!({"id": 42}).as_object().unwrap());
    assert_eq!(requests[0].script, "import java.util.UUID;\ng.V(id)");
    assert_eq!(requests[0].aliases["graph"], "graph");
    assert_eq!(requests[0].aliases["g"], "g");

    let GraphValue::List(items) = result else {
        panic!("expected a list, got {:?}", result);
    };
    let vertex = items[0].as_element().cloned().unwrap().into_vertex().unwrap();
    assert_eq!(vertex.id, json!(42));
    assert_eq!(vertex.properties["name"], json!("ann"));
}

#[tokio::test]
async fn test_defaults_and_keywords() {
    let dir = query_dir();
    let pool = MemoryPool::replying(answer);
    let app = app(&pool);
    let user = app.register(user_type(&dir));
    let friends = user.method("friends").unwrap().on(&Vertex::new("u1", "user"));

    friends
        .elements(app.dispatcher(), Call::new())
        .unwrap()
        .await
        .unwrap();
    friends
        .elements(app.dispatcher(), Call::new().kwarg("limit", 3))
        .unwrap()
        .await
        .unwrap();

    let requests = pool.requests();
    assert_eq!(requests[0].bindings.get("limit"), Some(&json!(10)));
    assert_eq!(requests[1].bindings.get("limit"), Some(&json!(3)));
    assert_eq!(requests[1].bindings.get("id"), Some(&json!("u1")));
}

#[tokio::test]
async fn test_reserved_keywords_become_options() {
    let dir = query_dir();
    let pool = MemoryPool::replying(answer);
    let app = app(&pool);
    let user = app.register(user_type(&dir));
    let request_id = Uuid::new_v4();

    user.method("get_by_id")
        .unwrap()
        .on(&Vertex::new(7, "user"))
        .elements(
            app.dispatcher(),
            Call::new()
                .kwarg("graph_name", "social")
                .kwarg("request_id", request_id.to_string()),
        )
        .unwrap()
        .await
        .unwrap();

    let request = &pool.requests()[0];
    assert_eq!(request.aliases["graph"], "social");
    assert_eq!(request.request_id, request_id);
    assert_eq!(request.bindings.names().collect::<Vec<_>>(), vec!["id"]);
}

#[tokio::test]
async fn test_typed_options_win_over_keywords() {
    let dir = query_dir();
    let pool = MemoryPool::replying(answer);
    let app = app(&pool);
    let user = app.register(user_type(&dir));

    user.method("count_all")
        .unwrap()
        .scalar(
            app.dispatcher(),
            Call::new()
                .kwarg("traversal_source", "g_kw")
                .options(QueryOptions::default().traversal_source("g_typed")),
        )
        .unwrap()
        .await
        .unwrap();

    assert_eq!(pool.requests()[0].aliases["g"], "g_typed");
}

#[tokio::test]
async fn test_classmethod_scalar() {
    let dir = query_dir();
    let pool = MemoryPool::replying(answer);
    let app = app(&pool);
    let user = app.register(user_type(&dir));

    let count = user
        .method("count_all")
        .unwrap()
        .scalar(app.dispatcher(), Call::new())
        .unwrap()
        .await
        .unwrap();

    assert_eq!(count, Some(GraphValue::Scalar(json!(3))));
    assert!(pool.requests()[0].bindings.is_empty());
}

#[tokio::test]
async fn test_scalar_rejects_several_values() {
    let dir = query_dir();
    let pool = MemoryPool::replying(|_| Ok(vec![json!([1, 2])]));
    let app = app(&pool);
    let user = app.register(user_type(&dir));

    let err = user
        .method("count_all")
        .unwrap()
        .scalar(app.dispatcher(), Call::new())
        .unwrap()
        .await
        .unwrap_err();

    assert_eq!(err, OgmError::Cardinality { count: 2 });
}

#[tokio::test]
async fn test_tabular_result() {
    let dir = query_dir();
    let pool = MemoryPool::replying(answer);
    let app = app(&pool);
    let user = app.register(user_type(&dir));

    let table = user
        .method("summary")
        .unwrap()
        .on(&Vertex::new(1, "user"))
        .tabular(app.dispatcher(), Call::new())
        .unwrap()
        .await
        .unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.columns(), vec!["age", "name"]);
    assert_eq!(
        table.get(1).and_then(|row| row.get("name")),
        Some(&GraphValue::Scalar(json!("bob")))
    );
}

#[tokio::test]
async fn test_tabular_without_a_row_is_a_shape_error() {
    let dir = query_dir();
    let pool = MemoryPool::replying(|_| Ok(vec![json!([])]));
    let app = app(&pool);
    let user = app.register(user_type(&dir));

    let err = user
        .method("summary")
        .unwrap()
        .on(&Vertex::new(1, "user"))
        .tabular(app.dispatcher(), Call::new())
        .unwrap()
        .await
        .unwrap_err();

    assert!(matches!(err, OgmError::Shape(_)));
}

#[test]
fn test_too_many_args_fails_before_dispatch() {
    let dir = query_dir();
    let pool = MemoryPool::replying(answer);
    let app = app(&pool);
    let user = app.register(user_type(&dir));

    let err = user
        .method("get_by_id")
        .unwrap()
        .on(&Vertex::new(42, "user"))
        .raw(app.dispatcher(), Call::new().arg(1))
        .err()
        .unwrap();

    assert_eq!(
        err.binding_reason(),
        Some(&BindingReason::TooMany {
            expected: 1,
            given: 2
        })
    );
    assert_eq!(pool.acquire_count(), 0);
}

#[test]
fn test_instance_method_without_instance() {
    let dir = query_dir();
    let pool = MemoryPool::replying(answer);
    let app = app(&pool);
    let user = app.register(user_type(&dir));

    let err = user
        .method("get_by_id")
        .unwrap()
        .raw(app.dispatcher(), Call::new())
        .err()
        .unwrap();

    assert_eq!(
        err.binding_reason(),
        Some(&BindingReason::Missing("id".to_string()))
    );
}

#[test]
fn test_unknown_function_is_a_lookup_error() {
    let dir = query_dir();
    let pool = MemoryPool::replying(answer);
    let app = app(&pool);
    let user = app.register(
        ElementType::vertex("User")
            .source_dir(dir.path())
            .method("unfollow", QueryMethod::new())
            .build(),
    );

    let err = user
        .method("unfollow")
        .unwrap()
        .raw(app.dispatcher(), Call::new())
        .err()
        .unwrap();
    assert!(matches!(err, OgmError::Lookup { name, .. } if name == "unfollow"));
}

#[test]
fn test_concurrent_first_resolution_parses_once() {
    let dir = query_dir();
    let loader = Arc::new(CountingLoader {
        parses: AtomicUsize::new(0),
    });
    let user = ElementType::vertex("User")
        .source_dir(dir.path())
        .method(
            "friends",
            QueryMethod::new().loader(Arc::clone(&loader) as Arc<dyn QuerySourceLoader>),
        )
        .build();
    let method = user.method("friends").unwrap();
    let descriptor = method.descriptor();

    let resolved: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    descriptor
                        .resolve()
                        .map(|r| r as *const _ as usize)
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(loader.parses.load(Ordering::SeqCst), 1);
    assert!(resolved.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(descriptor.resolve().unwrap().args, vec!["id", "limit"]);
}
