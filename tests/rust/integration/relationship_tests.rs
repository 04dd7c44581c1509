use std::sync::Arc;

use gremgraph::config::ClientConfig;
use gremgraph::connection::memory::MemoryPool;
use gremgraph::connection::QueryRequest;
use gremgraph::models::{ElementType, Vertex};
use gremgraph::relationships::{CreateRequest, Direction};
use gremgraph::{GraphApp, OgmError};
use serde_json::{json, Value};

fn graph_server(request: &QueryRequest) -> gremgraph::Result<Vec<Value>> {
    let bindings = &request.bindings;
    if request.script.starts_with("g.addV(vlabel)") {
        return Ok(vec![json!([{
            "id": "v9",
            "label": bindings.get("vlabel").cloned().unwrap_or(Value::Null),
            "type": "vertex",
            "properties": {"name": [{"id": "p9", "value": "bob"}]}
        }])]);
    }
    if request.script.contains("addE(elabel)") {
        return Ok(vec![json!([{
            "id": "e1",
            "label": bindings.get("elabel").cloned().unwrap_or(Value::Null),
            "type": "edge",
            "outV": bindings.get("src").cloned().unwrap_or(Value::Null),
            "inV": bindings.get("dst").cloned().unwrap_or(Value::Null),
            "properties": {"since": 2020}
        }])]);
    }
    Ok(vec![json!([
        {"id": "v2", "label": "user", "type": "vertex"},
        {"id": "v3", "label": "user", "type": "vertex"}
    ])])
}

fn social_app(pool: &MemoryPool) -> GraphApp {
    let app = GraphApp::new(ClientConfig::default(), Arc::new(pool.clone())).unwrap();
    app.register(ElementType::vertex("User").build());
    app.register(ElementType::edge("Follows").build());
    app.register(ElementType::edge("Likes").build());
    app
}

#[tokio::test]
async fn test_create_outgoing() {
    let pool = MemoryPool::replying(graph_server);
    let app = social_app(&pool);
    let follows = app
        .relationship(Direction::Out, ["Follows"], ["User"])
        .for_vertex(Vertex::new("u1", "user"));

    let (edge, vertex) = follows
        .create(
            CreateRequest::new()
                .vertex_param("name", "bob")
                .edge_param("since", 2020),
        )
        .unwrap()
        .await
        .unwrap();

    assert_eq!(vertex.id, json!("v9"));
    assert_eq!(vertex.properties["name"], json!("bob"));
    assert_eq!(edge.label, "follows");
    assert_eq!(edge.out_v, json!("u1"));
    assert_eq!(edge.in_v, json!("v9"));

    let requests = pool.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].script, "g.addV(vlabel).property(k0, v0)");
    assert_eq!(
        requests[0].bindings.as_map(),
        json!({"vlabel": "user", "k0": "name", "v0": "bob"})
            .as_object()
            .unwrap()
    );
    assert!(requests[1].script.ends_with(".property(k0, v0)"));
    assert_eq!(requests[1].bindings.get("src"), Some(&json!("u1")));
    assert_eq!(requests[1].bindings.get("dst"), Some(&json!("v9")));
    assert_eq!(requests[1].bindings.get("v0"), Some(&json!(2020)));
}

#[tokio::test]
async fn test_create_incoming_points_edge_at_owner() {
    let pool = MemoryPool::replying(graph_server);
    let app = social_app(&pool);
    let followers = app
        .relationship(Direction::In, ["Follows"], ["User"])
        .for_vertex(Vertex::new("u1", "user"));

    let (edge, _) = followers
        .create(CreateRequest::new())
        .unwrap()
        .await
        .unwrap();

    assert_eq!(edge.out_v, json!("v9"));
    assert_eq!(edge.in_v, json!("u1"));
}

#[tokio::test]
async fn test_create_with_transform() {
    let pool = MemoryPool::replying(graph_server);
    let app = social_app(&pool);
    let follows = app
        .relationship(Direction::Out, ["Follows"], ["User"])
        .for_vertex(Vertex::new("u1", "user"));

    let ids = follows
        .create_with(CreateRequest::new(), |edge, vertex| Ok((edge.id, vertex.id)))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(ids, (json!("e1"), json!("v9")));
}

#[test]
fn test_undeclared_edge_type_is_rejected() {
    let pool = MemoryPool::replying(graph_server);
    let app = social_app(&pool);
    let follows = app
        .relationship(Direction::Out, ["Follows"], ["User"])
        .for_vertex(Vertex::new("u1", "user"));

    let err = follows
        .create(CreateRequest::new().edge_type("Likes"))
        .err()
        .unwrap();

    assert_eq!(
        err,
        OgmError::SchemaViolation {
            edge: "Likes".to_string(),
            direction: "OUT".to_string(),
            vertex: "User".to_string(),
        }
    );
    assert!(pool.requests().is_empty());
}

#[test]
fn test_unbound_relationship_cannot_create() {
    let pool = MemoryPool::replying(graph_server);
    let app = social_app(&pool);
    let follows = app.relationship(Direction::Out, ["Follows"], ["User"]);

    let err = follows.create(CreateRequest::new()).err().unwrap();
    assert!(matches!(err, OgmError::Relationship(message) if message.contains("no vertex")));
}

#[tokio::test]
async fn test_edge_failure_leaves_vertex_and_reports() {
    let pool = MemoryPool::replying(|request| {
        if request.script.contains("addE") {
            Err(OgmError::Transport("connection reset".to_string()))
        } else {
            graph_server(request)
        }
    });
    let app = social_app(&pool);
    let follows = app
        .relationship(Direction::Out, ["Follows"], ["User"])
        .for_vertex(Vertex::new("u1", "user"));

    let err = follows
        .create(CreateRequest::new())
        .unwrap()
        .await
        .unwrap_err();

    assert_eq!(err, OgmError::Transport("connection reset".to_string()));
    assert_eq!(pool.requests().len(), 2);
}

#[tokio::test]
async fn test_read_related_vertices() {
    let pool = MemoryPool::replying(graph_server);
    let app = social_app(&pool);
    let follows = app
        .relationship(Direction::Out, ["Follows"], ["User"])
        .for_vertex(Vertex::new("u1", "user"));

    let vertices = follows
        .vertices(app.dispatcher(), Some(5))
        .unwrap()
        .await
        .unwrap();

    let ids: Vec<_> = vertices.iter().map(|v| v.id.clone()).collect();
    assert_eq!(ids, vec![json!("v2"), json!("v3")]);

    let request = &pool.requests()[0];
    assert_eq!(
        request.script,
        "g.V(vid).outE(*elabels).inV().hasLabel(*vlabels).limit(lim)"
    );
    assert_eq!(request.bindings.get("elabels"), Some(&json!(["follows"])));
    assert_eq!(request.bindings.get("vlabels"), Some(&json!(["user"])));
    assert_eq!(request.bindings.get("lim"), Some(&json!(5)));
}

#[tokio::test]
async fn test_both_directions_use_other_vertex() {
    let pool = MemoryPool::replying(graph_server);
    let app = social_app(&pool);
    let knows = app
        .relationship(Direction::Both, ["Follows", "Likes"], ["User"])
        .for_vertex(Vertex::new("u1", "user"));

    knows
        .vertices(app.dispatcher(), None)
        .unwrap()
        .await
        .unwrap();

    let request = &pool.requests()[0];
    assert_eq!(
        request.script,
        "g.V(vid).bothE(*elabels).otherV().hasLabel(*vlabels)"
    );
    assert_eq!(
        request.bindings.get("elabels"),
        Some(&json!(["follows", "likes"]))
    );
}
