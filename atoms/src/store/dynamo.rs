use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoClient;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use super::{document_id, Document, DocumentStore, StoreError, StoreResult};

type Item = HashMap<String, AttributeValue>;

/// Single-table DynamoDB backend.
///
/// PK = "TASK" / "USER" (one partition per collection)
/// SK = "TASK#{id}" / "USER#{id}"
///
/// Every other document field is stored as its own attribute.
#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

fn partition_key(collection: &str) -> String {
    collection.to_uppercase()
}

fn sort_key(collection: &str, id: &str) -> String {
    format!("{}#{}", partition_key(collection), id)
}

fn document_to_item(collection: &str, id: &str, doc: &Document) -> Item {
    let mut item: Item = doc
        .iter()
        .map(|(k, v)| (k.clone(), to_attribute(v)))
        .collect();
    item.insert("PK".to_string(), AttributeValue::S(partition_key(collection)));
    item.insert("SK".to_string(), AttributeValue::S(sort_key(collection, id)));
    item
}

fn item_to_document(item: &Item) -> StoreResult<Document> {
    item.iter()
        .filter(|(k, _)| k.as_str() != "PK" && k.as_str() != "SK")
        .map(|(k, v)| Ok((k.clone(), from_attribute(v)?)))
        .collect()
}

fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_attribute(v)))
                .collect(),
        ),
    }
}

fn from_attribute(attr: &AttributeValue) -> StoreResult<Value> {
    Ok(match attr {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::N(n) => parse_number(n)?,
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::Ss(set) => Value::Array(set.iter().cloned().map(Value::String).collect()),
        AttributeValue::L(items) => {
            Value::Array(items.iter().map(from_attribute).collect::<StoreResult<_>>()?)
        }
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), from_attribute(v)?)))
                .collect::<StoreResult<Map<_, _>>>()?,
        ),
        other => {
            return Err(StoreError::Codec(format!(
                "unsupported DynamoDB attribute: {:?}",
                other
            )))
        }
    })
}

fn parse_number(raw: &str) -> StoreResult<Value> {
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(Value::from(i));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| StoreError::Codec(format!("invalid number attribute: {}", raw)))
}

#[async_trait]
impl DocumentStore for DynamoStore {
    async fn scan(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let mut documents = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let result = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("PK = :pk")
                .expression_attribute_values(":pk", AttributeValue::S(partition_key(collection)))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| StoreError::Backend(format!("DynamoDB query error: {}", e)))?;

            for item in result.items() {
                documents.push(item_to_document(item)?);
            }

            match result.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(partition_key(collection)))
            .key("SK", AttributeValue::S(sort_key(collection, id)))
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB get_item error: {}", e)))?;

        result.item().map(item_to_document).transpose()
    }

    async fn insert(&self, collection: &str, document: Document) -> StoreResult<()> {
        let id = document_id(&document)
            .ok_or_else(|| StoreError::Codec("document has no _id".to_string()))?
            .to_string();

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(document_to_item(collection, &id, &document)))
            .condition_expression("attribute_not_exists(PK)")
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    StoreError::Backend(format!("duplicate {} id {}", collection, id))
                } else {
                    StoreError::Backend(format!("DynamoDB put_item error: {}", service_error))
                }
            })?;

        Ok(())
    }

    async fn replace(&self, collection: &str, id: &str, document: Document) -> StoreResult<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(document_to_item(collection, id, &document)))
            .condition_expression("attribute_exists(PK)")
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    StoreError::not_found(collection, id)
                } else {
                    StoreError::Backend(format!("DynamoDB put_item error: {}", service_error))
                }
            })?;

        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> StoreResult<Document> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(partition_key(collection)))
            .key("SK", AttributeValue::S(sort_key(collection, id)))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB delete_item error: {}", e)))?;

        match result.attributes() {
            Some(item) if !item.is_empty() => item_to_document(item),
            _ => Err(StoreError::not_found(collection, id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn items_carry_collection_keys() {
        let doc = match json!({"_id": "abc", "name": "T"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let item = document_to_item("task", "abc", &doc);

        assert_eq!(item.get("PK"), Some(&AttributeValue::S("TASK".to_string())));
        assert_eq!(item.get("SK"), Some(&AttributeValue::S("TASK#abc".to_string())));
        assert_eq!(item_to_document(&item).unwrap(), doc);
    }

    #[test]
    fn nested_values_survive_attribute_mapping() {
        let value = json!({
            "deadline": 1735689600000_i64,
            "ratio": 0.5,
            "completed": false,
            "assignedUser": "",
            "pendingTasks": ["t1", "t2"],
            "meta": {"note": null}
        });
        let back = from_attribute(&to_attribute(&value)).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn string_sets_read_as_arrays() {
        let attr = AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(from_attribute(&attr).unwrap(), json!(["a", "b"]));
        assert!(parse_number("not-a-number").is_err());
    }
}
