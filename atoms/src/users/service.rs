use super::model::{User, UserPayload};
use crate::error::ServiceError;
use crate::listing::{run_list, ListOutcome, ListRequest};
use crate::store::{Condition, Document, EntityStore, Filter, Projection, ID_FIELD};
use crate::sync::{plan_user_change, SyncQueue};

pub async fn list_users(
    users: &EntityStore<User>,
    request: &ListRequest,
) -> Result<ListOutcome, ServiceError> {
    run_list(users, request).await
}

/// Fails with `Validation` when another user already owns `email`.
async fn ensure_email_free(
    users: &EntityStore<User>,
    email: &str,
    except_id: Option<&str>,
) -> Result<(), ServiceError> {
    let mut clauses = vec![Filter::eq("email", email)];
    if let Some(id) = except_id {
        clauses.push(Filter::field(ID_FIELD, Condition::Ne(id.into())));
    }

    match users.find_one(&Filter::And(clauses)).await? {
        Some(_) => Err(ServiceError::Validation("Email already exists.".to_string())),
        None => Ok(()),
    }
}

/// Create a user. The initial `pendingTasks` list is stored as given; the
/// tasks it names are not touched.
pub async fn create_user(
    users: &EntityStore<User>,
    sync: &SyncQueue,
    payload: UserPayload,
) -> Result<User, ServiceError> {
    payload.require_fields()?;
    ensure_email_free(users, payload.email.as_deref().unwrap_or_default(), None).await?;

    let user = users.create(payload.into_user()).await?;
    tracing::info!("Created user {}", user.id);

    sync.submit(plan_user_change(None, Some(&user)));
    Ok(user)
}

pub async fn get_user(
    users: &EntityStore<User>,
    user_id: &str,
    projection: Option<&Projection>,
) -> Result<Document, ServiceError> {
    Ok(users.find_by_id(user_id, projection).await?)
}

/// Replace a user; tasks entering or leaving `pendingTasks` are re-pointed.
pub async fn replace_user(
    users: &EntityStore<User>,
    sync: &SyncQueue,
    user_id: &str,
    payload: UserPayload,
) -> Result<User, ServiceError> {
    payload.require_fields()?;
    ensure_email_free(users, payload.email.as_deref().unwrap_or_default(), Some(user_id)).await?;

    let old_user = users.get(user_id).await?;

    let mut user = payload.into_user();
    user.id = old_user.id.clone();
    user.date_created = old_user.date_created.clone();

    let updated = users.update(user_id, user).await?;
    tracing::info!("Updated user {}", updated.id);

    sync.submit(plan_user_change(Some(&old_user), Some(&updated)));
    Ok(updated)
}

/// Delete a user and queue unassignment of every pending task
pub async fn delete_user(
    users: &EntityStore<User>,
    sync: &SyncQueue,
    user_id: &str,
) -> Result<User, ServiceError> {
    let removed = users.delete(user_id).await?;
    tracing::info!("Deleted user {}", removed.id);

    sync.submit(plan_user_change(Some(&removed), None));
    Ok(removed)
}
