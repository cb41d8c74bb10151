use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::repo_types::{
    parse_match_date, CourtSurface, JournalChanges, JournalEntry, JournalFields, MatchResult,
};
use crate::error::ApiError;

/// POST /journals body. Everything is optional at the type level so that
/// missing fields can be reported together; `userId`/`entryId` are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJournalRequest {
    pub date: Option<String>,
    pub opponent: Option<String>,
    pub tournament_name: Option<String>,
    pub location: Option<String>,
    pub court_surface: Option<CourtSurface>,
    pub strengths: Option<Vec<String>>,
    pub weaknesses: Option<Vec<String>>,
    pub lessons_learned: Option<String>,
    pub result: Option<MatchResult>,
    pub score: Option<String>,
    pub stats: Option<Map<String, Value>>,
}

/// PUT /journals/:entryId body. Only allow-listed fields are accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateJournalRequest {
    pub date: Option<String>,
    pub opponent: Option<String>,
    pub tournament_name: Option<String>,
    pub location: Option<String>,
    pub court_surface: Option<CourtSurface>,
    pub strengths: Option<Vec<String>>,
    pub weaknesses: Option<Vec<String>>,
    pub lessons_learned: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub result: Option<Option<MatchResult>>,
    #[serde(default, deserialize_with = "nullable")]
    pub score: Option<Option<String>>,
    pub stats: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "present")]
    pub user_id: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub entry_id: Option<Value>,
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Absent stays `None`; an explicit `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct JournalListResponse {
    pub message: &'static str,
    pub journals: Vec<JournalEntry>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Blank-only text counts as absent; anything else is kept exactly as sent.
fn text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn match_date(raw: &str) -> Result<time::Date, ApiError> {
    parse_match_date(raw.trim())
        .ok_or_else(|| ApiError::validation(format!("Invalid date `{raw}`, expected YYYY-MM-DD")))
}

/// Drops blank entries and duplicates, keeping first occurrence.
fn tag_set(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for v in values {
        if !v.trim().is_empty() && !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

impl CreateJournalRequest {
    pub fn validate(self) -> Result<JournalFields, ApiError> {
        let date = text(self.date);
        let opponent = text(self.opponent);
        let tournament_name = text(self.tournament_name);
        let location = text(self.location);
        let lessons_learned = text(self.lessons_learned);

        let mut missing = Vec::new();
        for (name, absent) in [
            ("date", date.is_none()),
            ("opponent", opponent.is_none()),
            ("tournamentName", tournament_name.is_none()),
            ("location", location.is_none()),
            ("courtSurface", self.court_surface.is_none()),
            ("strengths", self.strengths.is_none()),
            ("weaknesses", self.weaknesses.is_none()),
            ("lessonsLearned", lessons_learned.is_none()),
        ] {
            if absent {
                missing.push(name);
            }
        }

        match (
            date,
            opponent,
            tournament_name,
            location,
            self.court_surface,
            self.strengths,
            self.weaknesses,
            lessons_learned,
        ) {
            (
                Some(date),
                Some(opponent),
                Some(tournament_name),
                Some(location),
                Some(court_surface),
                Some(strengths),
                Some(weaknesses),
                Some(lessons_learned),
            ) => Ok(JournalFields {
                date: match_date(&date)?,
                opponent,
                tournament_name,
                location,
                court_surface,
                strengths: tag_set(strengths),
                weaknesses: tag_set(weaknesses),
                lessons_learned,
                result: self.result,
                score: text(self.score),
                stats: self.stats.unwrap_or_default(),
            }),
            _ => Err(ApiError::validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

impl UpdateJournalRequest {
    pub fn validate(self) -> Result<JournalChanges, ApiError> {
        if self.user_id.is_some() || self.entry_id.is_some() {
            return Err(ApiError::validation("userId and entryId cannot be updated"));
        }

        let non_empty = |name: &str, value: Option<String>| match value {
            None => Ok(None),
            Some(v) => match text(Some(v)) {
                Some(v) => Ok(Some(v)),
                None => Err(ApiError::validation(format!("{name} cannot be empty"))),
            },
        };

        let changes = JournalChanges {
            date: non_empty("date", self.date)?
                .map(|d| match_date(&d))
                .transpose()?,
            opponent: non_empty("opponent", self.opponent)?,
            tournament_name: non_empty("tournamentName", self.tournament_name)?,
            location: non_empty("location", self.location)?,
            court_surface: self.court_surface,
            strengths: self.strengths.map(tag_set),
            weaknesses: self.weaknesses.map(tag_set),
            lessons_learned: non_empty("lessonsLearned", self.lessons_learned)?,
            result: self.result,
            score: self.score.map(text),
            stats: self.stats,
        };

        if changes.is_empty() {
            return Err(ApiError::validation("No updatable fields provided"));
        }
        Ok(changes)
    }
}
