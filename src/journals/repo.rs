use async_trait::async_trait;
use aws_sdk_dynamodb::{
    types::{AttributeValue, ReturnValue},
    Client,
};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;

use super::repo_types::{format_match_date, JournalChanges, JournalEntry};
use crate::{
    error::StoreError,
    storage::{self, s, string_list, Item},
};

/// Journal entries keyed by `(userId, entryId)`. Every operation is scoped
/// to one owner's partition.
#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn create(&self, entry: JournalEntry) -> Result<JournalEntry, StoreError>;
    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<JournalEntry>, StoreError>;
    async fn get(&self, user_id: &str, entry_id: &str) -> Result<JournalEntry, StoreError>;
    async fn update(
        &self,
        user_id: &str,
        entry_id: &str,
        changes: &JournalChanges,
    ) -> Result<JournalEntry, StoreError>;
    /// `NotFound` when nothing is stored under the key.
    async fn delete(&self, user_id: &str, entry_id: &str) -> Result<(), StoreError>;
    /// Removes every entry in the owner's partition, returning how many.
    async fn delete_all_for_owner(&self, user_id: &str) -> Result<usize, StoreError>;
}

pub struct DynamoJournalStore {
    client: Client,
    table: String,
}

impl DynamoJournalStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

/// `SET` for each allow-listed field present in the change set, `REMOVE`
/// for optional fields being cleared.
#[derive(Default)]
struct UpdatePlan {
    sets: Vec<String>,
    removes: Vec<String>,
    names: Vec<(String, String)>,
    values: Vec<(String, AttributeValue)>,
}

impl UpdatePlan {
    fn set(&mut self, attr: &str, value: AttributeValue) {
        self.sets.push(format!("#{attr} = :{attr}"));
        self.names.push((format!("#{attr}"), attr.to_string()));
        self.values.push((format!(":{attr}"), value));
    }

    fn remove(&mut self, attr: &str) {
        self.removes.push(format!("#{attr}"));
        self.names.push((format!("#{attr}"), attr.to_string()));
    }

    fn expression(&self) -> String {
        let mut expr = format!("SET {}", self.sets.join(", "));
        if !self.removes.is_empty() {
            expr.push_str(&format!(" REMOVE {}", self.removes.join(", ")));
        }
        expr
    }
}

fn plan_update(changes: &JournalChanges, now: OffsetDateTime) -> Result<UpdatePlan, StoreError> {
    let mut plan = UpdatePlan::default();

    if let Some(v) = changes.date {
        plan.set("date", s(format_match_date(v)?));
    }
    if let Some(v) = &changes.opponent {
        plan.set("opponent", s(v));
    }
    if let Some(v) = &changes.tournament_name {
        plan.set("tournamentName", s(v));
    }
    if let Some(v) = &changes.location {
        plan.set("location", s(v));
    }
    if let Some(v) = changes.court_surface {
        plan.set("courtSurface", s(v.as_str()));
    }
    if let Some(v) = &changes.strengths {
        plan.set("strengths", string_list(v));
    }
    if let Some(v) = &changes.weaknesses {
        plan.set("weaknesses", string_list(v));
    }
    if let Some(v) = &changes.lessons_learned {
        plan.set("lessonsLearned", s(v));
    }
    match changes.result {
        Some(Some(v)) => plan.set("result", s(v.as_str())),
        Some(None) => plan.remove("result"),
        None => {}
    }
    match &changes.score {
        Some(Some(v)) => plan.set("score", s(v)),
        Some(None) => plan.remove("score"),
        None => {}
    }
    if let Some(v) = &changes.stats {
        plan.set("stats", storage::json_to_attr(&Value::Object(v.clone())));
    }
    plan.set("updatedAt", storage::timestamp(now)?);

    Ok(plan)
}

#[async_trait]
impl JournalStore for DynamoJournalStore {
    async fn create(&self, entry: JournalEntry) -> Result<JournalEntry, StoreError> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(entry.to_item()?))
            .condition_expression("attribute_not_exists(entryId)")
            .send()
            .await;
        match result {
            Ok(_) => {
                debug!(user_id = %entry.user_id, entry_id = %entry.entry_id, "journal item written");
                Ok(entry)
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(StoreError::Conflict("entry id already exists".into()))
            }
            Err(err) => Err(StoreError::unavailable(err)),
        }
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<JournalEntry>, StoreError> {
        let mut entries = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let out = self
                .client
                .query()
                .table_name(&self.table)
                .key_condition_expression("#uid = :uid")
                .expression_attribute_names("#uid", "userId")
                .expression_attribute_values(":uid", s(user_id))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(StoreError::unavailable)?;
            for item in out.items() {
                entries.push(JournalEntry::from_item(item)?);
            }
            match out.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }
        debug!(user_id = %user_id, count = entries.len(), "journal partition read");
        Ok(entries)
    }

    async fn get(&self, user_id: &str, entry_id: &str) -> Result<JournalEntry, StoreError> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("userId", s(user_id))
            .key("entryId", s(entry_id))
            .consistent_read(true)
            .send()
            .await
            .map_err(StoreError::unavailable)?;
        match out.item() {
            Some(item) => JournalEntry::from_item(item),
            None => Err(StoreError::NotFound),
        }
    }

    async fn update(
        &self,
        user_id: &str,
        entry_id: &str,
        changes: &JournalChanges,
    ) -> Result<JournalEntry, StoreError> {
        let plan = plan_update(changes, OffsetDateTime::now_utc())?;
        let mut req = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("userId", s(user_id))
            .key("entryId", s(entry_id))
            .update_expression(plan.expression())
            .condition_expression("attribute_exists(entryId)")
            .return_values(ReturnValue::AllNew);
        for (placeholder, attr) in plan.names {
            req = req.expression_attribute_names(placeholder, attr);
        }
        for (placeholder, value) in plan.values {
            req = req.expression_attribute_values(placeholder, value);
        }

        match req.send().await {
            Ok(out) => match out.attributes() {
                Some(item) => JournalEntry::from_item(item),
                None => Err(StoreError::Corrupt("update returned no attributes".into())),
            },
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

    async fn delete(&self, user_id: &str, entry_id: &str) -> Result<(), StoreError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table)
            .key("userId", s(user_id))
            .key("entryId", s(entry_id))
            .condition_expression("attribute_exists(entryId)")
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

    async fn delete_all_for_owner(&self, user_id: &str) -> Result<usize, StoreError> {
        let entries = self.list_by_owner(user_id).await?;
        let mut deleted = 0;
        for entry in &entries {
            match self.delete(user_id, &entry.entry_id).await {
                Ok(()) => deleted += 1,
                // Raced with a concurrent delete; already gone.
                Err(StoreError::NotFound) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(deleted)
    }
}
