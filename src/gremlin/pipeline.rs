//! Result pipelines
//!
//! Each pipeline layers one continuation over a dispatched stream and
//! returns a new deferred. A failure in the stream or in the
//! transformation becomes the failure of the returned deferred.

use crate::connection::{read_all, ResultStream};
use crate::deferred::Deferred;
use crate::errors::{OgmError, Result};
use crate::models::element::GraphValue;

use super::table::Table;

pub type StreamResult = Deferred<Box<dyn ResultStream>>;

/// The stream itself, unread.
pub fn raw(stream: StreamResult) -> StreamResult {
    stream
}

/// The whole result with graph elements deserialized.
pub fn elements(stream: StreamResult) -> Deferred<GraphValue> {
    stream.and_then(read_all).map(GraphValue::from_wire)
}

/// Exactly one value.
///
/// Null resolves to `None`. Mappings, elements and primitives are single
/// values already; a sequence must hold exactly one item.
pub fn scalar(stream: StreamResult) -> Deferred<Option<GraphValue>> {
    elements(stream).map(single_value)
}

/// The single row of the result, as a table.
pub fn tabular(stream: StreamResult) -> Deferred<Table> {
    elements(stream).map(Table::from_result)
}

fn single_value(result: GraphValue) -> Result<Option<GraphValue>> {
    match result {
        value if value.is_null() => Ok(None),
        GraphValue::List(mut items) => {
            if items.len() != 1 {
                return Err(OgmError::Cardinality { count: items.len() });
            }
            Ok(items.pop())
        }
        value => Ok(Some(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::memory::BufferedStream;
    use serde_json::{json, Value};

    fn stream(messages: Vec<Value>) -> StreamResult {
        Deferred::resolved(Box::new(BufferedStream::new(messages)))
    }

    #[tokio::test]
    async fn test_scalar_unwraps_single_item() {
        assert_eq!(
            scalar(stream(vec![json!([7])])).await.unwrap(),
            Some(GraphValue::Scalar(json!(7)))
        );
    }

    #[tokio::test]
    async fn test_scalar_rejects_two_items() {
        assert_eq!(
            scalar(stream(vec![json!([1, 2])])).await,
            Err(OgmError::Cardinality { count: 2 })
        );
        assert_eq!(
            scalar(stream(vec![json!([])])).await,
            Err(OgmError::Cardinality { count: 0 })
        );
    }

    #[tokio::test]
    async fn test_scalar_null_and_exempt_kinds() {
        assert_eq!(scalar(stream(vec![])).await.unwrap(), None);
        assert_eq!(scalar(stream(vec![Value::Null])).await.unwrap(), None);
        assert_eq!(
            scalar(stream(vec![json!("text")])).await.unwrap(),
            Some(GraphValue::Scalar(json!("text")))
        );
        assert!(matches!(
            scalar(stream(vec![json!({"a": 1, "b": 2})])).await.unwrap(),
            Some(GraphValue::Map(m)) if m.len() == 2
        ));
        assert!(matches!(
            scalar(stream(vec![json!({"id": 1, "type": "vertex", "label": "user"})]))
                .await
                .unwrap(),
            Some(GraphValue::Element(_))
        ));
    }

    #[tokio::test]
    async fn test_elements_deserializes_across_messages() {
        let value = elements(stream(vec![
            json!([{"id": 1, "type": "vertex", "label": "user"}]),
            json!([{"id": 2, "type": "vertex", "label": "user"}]),
        ]))
        .await
        .unwrap();
        let GraphValue::List(items) = value else {
            panic!("expected a list");
        };
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.as_element().is_some()));
    }

    #[tokio::test]
    async fn test_inner_failure_reaches_outer_deferred() {
        let failed: StreamResult = Deferred::failed(OgmError::Transport("reset".into()));
        assert_eq!(
            tabular(failed).await,
            Err(OgmError::Transport("reset".into()))
        );
    }

    #[tokio::test]
    async fn test_raw_passes_stream_through() {
        let mut s = raw(stream(vec![json!(1)])).await.unwrap();
        assert_eq!(s.read().await.unwrap(), Some(json!(1)));
        assert_eq!(s.read().await.unwrap(), None);
    }
}
