use async_trait::async_trait;
use aws_sdk_dynamodb::{types::ReturnValue, Client};
use tracing::debug;

use super::repo_types::{User, UserChanges, UserProfile};
use crate::{
    error::StoreError,
    storage::{self, get_s, get_timestamp, s, Item},
};

/// Key-value access to user records, keyed by `userId`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Point lookup that never fetches the password hash.
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Fails with `Conflict` when the email is already registered.
    async fn create(&self, user: &User) -> Result<(), StoreError>;
    async fn update(&self, user_id: &str, changes: &UserChanges) -> Result<UserProfile, StoreError>;
    async fn delete(&self, user_id: &str) -> Result<(), StoreError>;
}

pub const EMAIL_TAKEN: &str = "Email already registered";

pub struct DynamoUserStore {
    client: Client,
    table: String,
    email_index: String,
}

impl DynamoUserStore {
    pub fn new(client: Client, table: impl Into<String>, email_index: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            email_index: email_index.into(),
        }
    }

    async fn ensure_email_free(&self, email: &str, owner: Option<&str>) -> Result<(), StoreError> {
        match self.find_by_email(email).await? {
            Some(existing) if Some(existing.user_id.as_str()) != owner => {
                Err(StoreError::Conflict(EMAIL_TAKEN.into()))
            }
            _ => Ok(()),
        }
    }
}

fn user_to_item(user: &User) -> Result<Item, StoreError> {
    let mut item = Item::new();
    item.insert("userId".into(), s(&user.user_id));
    item.insert("email".into(), s(&user.email));
    item.insert("passwordHash".into(), s(&user.password_hash));
    item.insert("createdAt".into(), storage::timestamp(user.created_at)?);
    Ok(item)
}

fn user_from_item(item: &Item) -> Result<User, StoreError> {
    Ok(User {
        user_id: get_s(item, "userId")?,
        email: get_s(item, "email")?,
        password_hash: get_s(item, "passwordHash")?,
        created_at: get_timestamp(item, "createdAt")?,
    })
}

fn profile_from_item(item: &Item) -> Result<UserProfile, StoreError> {
    Ok(UserProfile {
        user_id: get_s(item, "userId")?,
        email: get_s(item, "email")?,
        created_at: get_timestamp(item, "createdAt")?,
    })
}

#[async_trait]
impl UserStore for DynamoUserStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("userId", s(user_id))
            .projection_expression("#uid, #email, #created")
            .expression_attribute_names("#uid", "userId")
            .expression_attribute_names("#email", "email")
            .expression_attribute_names("#created", "createdAt")
            .send()
            .await
            .map_err(StoreError::unavailable)?;
        out.item().map(profile_from_item).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let out = self
            .client
            .query()
            .table_name(&self.table)
            .index_name(&self.email_index)
            .key_condition_expression("#email = :email")
            .expression_attribute_names("#email", "email")
            .expression_attribute_values(":email", s(email))
            .limit(1)
            .send()
            .await
            .map_err(StoreError::unavailable)?;
        out.items().first().map(user_from_item).transpose()
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        self.ensure_email_free(&user.email, None).await?;
        let result = self
            .client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(user_to_item(user)?))
            .condition_expression("attribute_not_exists(userId)")
            .send()
            .await;
        match result {
            Ok(_) => {
                debug!(user_id = %user.user_id, "user item written");
                Ok(())
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(StoreError::Conflict("user id already exists".into()))
            }
            Err(err) => Err(StoreError::unavailable(err)),
        }
    }

    async fn update(&self, user_id: &str, changes: &UserChanges) -> Result<UserProfile, StoreError> {
        if let Some(email) = &changes.email {
            self.ensure_email_free(email, Some(user_id)).await?;
        }

        let mut sets = Vec::new();
        let mut req = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("userId", s(user_id))
            .condition_expression("attribute_exists(userId)")
            .return_values(ReturnValue::AllNew);
        if let Some(email) = &changes.email {
            sets.push("#email = :email");
            req = req
                .expression_attribute_names("#email", "email")
                .expression_attribute_values(":email", s(email));
        }
        if let Some(hash) = &changes.password_hash {
            sets.push("#hash = :hash");
            req = req
                .expression_attribute_names("#hash", "passwordHash")
                .expression_attribute_values(":hash", s(hash));
        }
        if sets.is_empty() {
            return self.get_profile(user_id).await?.ok_or(StoreError::NotFound);
        }

        let result = req
            .update_expression(format!("SET {}", sets.join(", ")))
            .send()
            .await;
        match result {
            Ok(out) => out
                .attributes()
                .map(profile_from_item)
                .transpose()?
                .ok_or_else(|| StoreError::Corrupt("update returned no attributes".into())),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(StoreError::NotFound)
            }
            Err(err) => Err(StoreError::unavailable(err)),
        }
    }

    async fn delete(&self, user_id: &str) -> Result<(), StoreError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table)
            .key("userId", s(user_id))
            .condition_expression("attribute_exists(userId)")
            .send()
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(StoreError::NotFound)
            }
            Err(err) => Err(StoreError::unavailable(err)),
        }
    }
}
