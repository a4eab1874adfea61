use crate::error::ServiceError;
use crate::store::{Document, Entity, EntityStore, FindQuery};

/// A parsed `GET /<collection>` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListRequest {
    pub query: FindQuery,
    /// `count=true`: return the cardinality of `where` only
    pub count: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListOutcome {
    Count(u64),
    Documents(Vec<Document>),
}

pub async fn run_list<T: Entity>(
    store: &EntityStore<T>,
    request: &ListRequest,
) -> Result<ListOutcome, ServiceError> {
    if request.count {
        let count = store.count(&request.query.filter).await?;
        return Ok(ListOutcome::Count(count));
    }
    Ok(ListOutcome::Documents(store.find(&request.query).await?))
}
