use tracing::{debug, info};

use super::repo_types::{JournalChanges, JournalEntry, JournalFields};
use crate::{error::StoreError, state::AppState};

/// Newest match first; entries on the same day fall back to creation time.
pub fn sort_newest_first(entries: &mut [JournalEntry]) {
    entries.sort_by(|a, b| {
        b.fields
            .date
            .cmp(&a.fields.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

pub async fn create_entry(
    st: &AppState,
    owner: &str,
    fields: JournalFields,
) -> Result<JournalEntry, StoreError> {
    let entry = JournalEntry::new(owner, fields);
    let entry = st.journals.create(entry).await?;
    info!(user_id = %owner, entry_id = %entry.entry_id, "journal entry created");
    Ok(entry)
}

pub async fn list_entries(st: &AppState, owner: &str) -> Result<Vec<JournalEntry>, StoreError> {
    let mut entries = st.journals.list_by_owner(owner).await?;
    sort_newest_first(&mut entries);
    debug!(user_id = %owner, count = entries.len(), "journal entries listed");
    Ok(entries)
}

pub async fn get_entry(
    st: &AppState,
    owner: &str,
    entry_id: &str,
) -> Result<JournalEntry, StoreError> {
    st.journals.get(owner, entry_id).await
}

pub async fn update_entry(
    st: &AppState,
    owner: &str,
    entry_id: &str,
    changes: &JournalChanges,
) -> Result<JournalEntry, StoreError> {
    let entry = st.journals.update(owner, entry_id, changes).await?;
    info!(user_id = %owner, entry_id = %entry_id, "journal entry updated");
    Ok(entry)
}

pub async fn delete_entry(st: &AppState, owner: &str, entry_id: &str) -> Result<(), StoreError> {
    st.journals.delete(owner, entry_id).await?;
    info!(user_id = %owner, entry_id = %entry_id, "journal entry deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journals::repo_types::{parse_match_date, sample_fields};
    use time::{macros::date, Duration};

    fn entry_on(day: &str, offset_secs: i64) -> JournalEntry {
        let mut fields = sample_fields();
        fields.date = parse_match_date(day).unwrap();
        let mut entry = JournalEntry::new("u1", fields);
        entry.created_at += Duration::seconds(offset_secs);
        entry
    }

    #[test]
    fn sorts_by_date_then_creation() {
        let mut entries = vec![
            entry_on("2024-01-01", 0),
            entry_on("2024-10-01", 0),
            entry_on("2024-09-01", 0),
            entry_on("2024-01-01", 10),
        ];
        let newest_same_day = entries[3].entry_id.clone();
        sort_newest_first(&mut entries);
        let days: Vec<_> = entries.iter().map(|e| e.fields.date).collect();
        assert_eq!(
            days,
            vec![
                date!(2024 - 10 - 01),
                date!(2024 - 09 - 01),
                date!(2024 - 01 - 01),
                date!(2024 - 01 - 01)
            ]
        );
        assert_eq!(entries[2].entry_id, newest_same_day);
    }

    #[tokio::test]
    async fn create_assigns_owner_and_lists_sorted() {
        let st = AppState::fake();
        let mut older = sample_fields();
        older.date = date!(2023 - 12 - 31);
        create_entry(&st, "u1", older).await.unwrap();
        let newest = create_entry(&st, "u1", sample_fields()).await.unwrap();
        assert_eq!(newest.user_id, "u1");

        let listed = list_entries(&st, "u1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].entry_id, newest.entry_id);
        assert!(list_entries(&st, "u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_owners_cannot_reach_an_entry() {
        let st = AppState::fake();
        let entry = create_entry(&st, "u1", sample_fields()).await.unwrap();
        let changes = JournalChanges {
            opponent: Some("Mallory".into()),
            ..Default::default()
        };

        assert!(matches!(
            get_entry(&st, "u2", &entry.entry_id).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            update_entry(&st, "u2", &entry.entry_id, &changes).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            delete_entry(&st, "u2", &entry.entry_id).await,
            Err(StoreError::NotFound)
        ));
        assert_eq!(
            get_entry(&st, "u1", &entry.entry_id).await.unwrap().fields.opponent,
            "Bob"
        );
    }
}
