use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};
use uuid::Uuid;

use crate::{
    error::StoreError,
    storage::{self, get_opt_s, get_s, get_string_list, get_timestamp, s, string_list, Item},
};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, keeping only the day.
pub fn parse_match_date(raw: &str) -> Option<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| OffsetDateTime::parse(raw, &Rfc3339).ok().map(|t| t.date()))
}

pub fn format_match_date(date: Date) -> Result<String, StoreError> {
    date.format(format_description!("[year]-[month]-[day]"))
        .map_err(|e| StoreError::Corrupt(format!("unformattable date: {e}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourtSurface {
    Hard,
    Clay,
    Grass,
}

impl CourtSurface {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourtSurface::Hard => "Hard",
            CourtSurface::Clay => "Clay",
            CourtSurface::Grass => "Grass",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Hard" => Some(CourtSurface::Hard),
            "Clay" => Some(CourtSurface::Clay),
            "Grass" => Some(CourtSurface::Grass),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchResult {
    Win,
    Lose,
}

impl MatchResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchResult::Win => "Win",
            MatchResult::Lose => "Lose",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Win" => Some(MatchResult::Win),
            "Lose" => Some(MatchResult::Lose),
            _ => None,
        }
    }
}

/// Client-controlled content of an entry, validated at the API boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalFields {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub opponent: String,
    pub tournament_name: String,
    pub location: String,
    pub court_surface: CourtSurface,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub lessons_learned: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    pub stats: Map<String, Value>,
}

/// Stored journal entry. `userId` is the partition key, `entryId` the sort key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub entry_id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub fields: JournalFields,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Allow-listed partial update. `None` leaves the stored value untouched;
/// for `result` and `score`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JournalChanges {
    pub date: Option<Date>,
    pub opponent: Option<String>,
    pub tournament_name: Option<String>,
    pub location: Option<String>,
    pub court_surface: Option<CourtSurface>,
    pub strengths: Option<Vec<String>>,
    pub weaknesses: Option<Vec<String>>,
    pub lessons_learned: Option<String>,
    pub result: Option<Option<MatchResult>>,
    pub score: Option<Option<String>>,
    pub stats: Option<Map<String, Value>>,
}

impl JournalChanges {
    pub fn is_empty(&self) -> bool {
        *self == JournalChanges::default()
    }
}

impl JournalEntry {
    /// Stamps owner, a fresh random id and timestamps onto validated fields.
    pub fn new(user_id: &str, fields: JournalFields) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            entry_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, changes: &JournalChanges, now: OffsetDateTime) {
        let f = &mut self.fields;
        if let Some(v) = changes.date {
            f.date = v;
        }
        if let Some(v) = &changes.opponent {
            f.opponent = v.clone();
        }
        if let Some(v) = &changes.tournament_name {
            f.tournament_name = v.clone();
        }
        if let Some(v) = &changes.location {
            f.location = v.clone();
        }
        if let Some(v) = changes.court_surface {
            f.court_surface = v;
        }
        if let Some(v) = &changes.strengths {
            f.strengths = v.clone();
        }
        if let Some(v) = &changes.weaknesses {
            f.weaknesses = v.clone();
        }
        if let Some(v) = &changes.lessons_learned {
            f.lessons_learned = v.clone();
        }
        if let Some(v) = changes.result {
            f.result = v;
        }
        if let Some(v) = &changes.score {
            f.score = v.clone();
        }
        if let Some(v) = &changes.stats {
            f.stats = v.clone();
        }
        self.updated_at = now;
    }

    pub fn to_item(&self) -> Result<Item, StoreError> {
        let f = &self.fields;
        let mut item = Item::new();
        item.insert("userId".into(), s(&self.user_id));
        item.insert("entryId".into(), s(&self.entry_id));
        item.insert("date".into(), s(format_match_date(f.date)?));
        item.insert("opponent".into(), s(&f.opponent));
        item.insert("tournamentName".into(), s(&f.tournament_name));
        item.insert("location".into(), s(&f.location));
        item.insert("courtSurface".into(), s(f.court_surface.as_str()));
        item.insert("strengths".into(), string_list(&f.strengths));
        item.insert("weaknesses".into(), string_list(&f.weaknesses));
        item.insert("lessonsLearned".into(), s(&f.lessons_learned));
        if let Some(result) = f.result {
            item.insert("result".into(), s(result.as_str()));
        }
        if let Some(score) = &f.score {
            item.insert("score".into(), s(score));
        }
        item.insert("stats".into(), storage::json_to_attr(&Value::Object(f.stats.clone())));
        item.insert("createdAt".into(), storage::timestamp(self.created_at)?);
        item.insert("updatedAt".into(), storage::timestamp(self.updated_at)?);
        Ok(item)
    }

    pub fn from_item(item: &Item) -> Result<Self, StoreError> {
        let raw_date = get_s(item, "date")?;
        let date = parse_match_date(&raw_date)
            .ok_or_else(|| StoreError::Corrupt(format!("unparseable date `{raw_date}`")))?;
        let surface = get_s(item, "courtSurface")?;
        let court_surface = CourtSurface::parse(&surface)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown court surface `{surface}`")))?;
        let result = match get_opt_s(item, "result") {
            Some(raw) => Some(
                MatchResult::parse(&raw)
                    .ok_or_else(|| StoreError::Corrupt(format!("unknown result `{raw}`")))?,
            ),
            None => None,
        };
        let stats = match item.get("stats").map(storage::attr_to_json).transpose()? {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => Map::new(),
            Some(_) => return Err(StoreError::Corrupt("`stats` is not a map".into())),
        };
        let created_at = get_timestamp(item, "createdAt")?;
        let updated_at = match item.get("updatedAt") {
            Some(_) => get_timestamp(item, "updatedAt")?,
            None => created_at,
        };

        Ok(Self {
            entry_id: get_s(item, "entryId")?,
            user_id: get_s(item, "userId")?,
            fields: JournalFields {
                date,
                opponent: get_s(item, "opponent")?,
                tournament_name: get_s(item, "tournamentName")?,
                location: get_s(item, "location")?,
                court_surface,
                strengths: get_string_list(item, "strengths")?,
                weaknesses: get_string_list(item, "weaknesses")?,
                lessons_learned: get_s(item, "lessonsLearned")?,
                result,
                score: get_opt_s(item, "score"),
                stats,
            },
            created_at,
            updated_at,
        })
    }
}

#[cfg(test)]
pub(crate) fn sample_fields() -> JournalFields {
    JournalFields {
        date: time::macros::date!(2024 - 01 - 01),
        opponent: "Bob".into(),
        tournament_name: "Open".into(),
        location: "NY".into(),
        court_surface: CourtSurface::Hard,
        strengths: vec!["Serve".into()],
        weaknesses: vec!["Volley".into()],
        lessons_learned: "Stay calm".into(),
        result: None,
        score: None,
        stats: Map::new(),
    }
}
