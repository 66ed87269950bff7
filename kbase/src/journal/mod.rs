//! Date-sharded journal
//!
//! Entries live at a path derived from their date (see [`entry_path`]), so
//! there is no separate index: existence is a read at the derived path and
//! every listing walks a range of dates, skipping days without an entry.

use crate::error::{KbError, Result};
use crate::store::{DocumentStore, Precondition};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::sync::Arc;

pub mod entry;

pub use entry::{entry_path, parse_date, JournalEntry, JOURNAL_ROOT};

/// Characters in a search excerpt
pub const EXCERPT_CHARS: usize = 200;

/// Keyword occurrences that saturate the relevance score
const SATURATING_OCCURRENCES: f64 = 5.0;

/// Snippets kept per story candidate
const SNIPPETS_PER_STORY: usize = 3;

/// Parameters for [`JournalIndex::search`]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Case-insensitive substring to look for in the raw entry text
    pub keyword: Option<String>,
    /// Entry must carry at least one of these tags; empty matches all
    pub tags: Vec<String>,
    /// Oldest date searched, inclusive
    pub start: NaiveDate,
    /// Newest date searched, inclusive
    pub end: NaiveDate,
    /// Maximum number of hits
    pub limit: usize,
}

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub date: NaiveDate,
    pub path: String,
    pub excerpt: String,
    /// `min(1.0, occurrences / 5)`; 1.0 when no keyword was given
    pub relevance: f64,
    pub tags: Vec<String>,
}

/// A theme that recurs across entries and might make a good story
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryCandidate {
    pub theme: String,
    pub title: String,
    /// Up to three `date: note` snippets joined with ` | `
    pub snippet: String,
    /// Dates the snippets came from
    pub dates: Vec<NaiveDate>,
    pub tags: Vec<String>,
}

struct Theme {
    name: &'static str,
    title: &'static str,
    min_entries: usize,
    tags: &'static [&'static str],
    notes: fn(&JournalEntry) -> &[String],
}

const THEMES: [Theme; 3] = [
    Theme {
        name: "kid moments",
        title: "Moments with the kids",
        min_entries: 2,
        tags: &["family", "parenting"],
        notes: kid_moments,
    },
    Theme {
        name: "struggles",
        title: "Working through a hard stretch",
        min_entries: 1,
        tags: &["resilience", "growth"],
        notes: struggles,
    },
    Theme {
        name: "wins",
        title: "A run of wins",
        min_entries: 2,
        tags: &["achievement", "career"],
        notes: wins,
    },
];

fn kid_moments(entry: &JournalEntry) -> &[String] {
    &entry.kid_moments
}

fn struggles(entry: &JournalEntry) -> &[String] {
    &entry.struggles
}

fn wins(entry: &JournalEntry) -> &[String] {
    &entry.wins
}

/// Journal operations over a document store
#[derive(Clone)]
pub struct JournalIndex {
    store: Arc<dyn DocumentStore>,
}

impl JournalIndex {
    /// Create an index over `store`
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Whether an entry exists for `date`
    pub async fn exists(&self, date: NaiveDate) -> Result<bool> {
        self.store.exists(&entry_path(date)).await
    }

    /// Store a new entry. Entries are written once; a second entry for the
    /// same date fails with `Duplicate`.
    pub async fn create(&self, entry: &JournalEntry) -> Result<()> {
        let path = entry.path();
        let id = entry.date.to_string();

        // Backends that ignore preconditions need the explicit check.
        if self.store.exists(&path).await? {
            return Err(KbError::duplicate("journal entry", id));
        }

        let message = format!("Add journal entry {id}");
        match self
            .store
            .write(&path, &entry.encode()?, &Precondition::Absent, &message)
            .await
        {
            Ok(_) => {
                tracing::info!("Created journal entry {}", path);
                Ok(())
            }
            Err(e) if e.is_conflict() => Err(KbError::duplicate("journal entry", id)),
            Err(e) => Err(e),
        }
    }

    /// Entry for `date`, `NotFound` if there is none
    pub async fn get(&self, date: NaiveDate) -> Result<JournalEntry> {
        let path = entry_path(date);
        let bytes = self.store.read(&path).await?;
        JournalEntry::decode(&path, &bytes)
    }

    /// Entries from the `days` days ending at `today`, newest first
    pub async fn list_recent(&self, today: NaiveDate, days: u32) -> Result<Vec<JournalEntry>> {
        let mut entries = Vec::new();
        for date in dates_back(today, days) {
            if let Some((_, entry)) = self.load(date).await? {
                entries.push(entry);
            }
        }
        tracing::debug!("Found {} journal entries in the last {} days", entries.len(), days);
        Ok(entries)
    }

    /// Walk `query.end` back to `query.start` collecting matches.
    ///
    /// With a keyword the hits are re-ordered by descending relevance; ties
    /// keep newest-first order.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        let keyword = query
            .keyword
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(|k| fold_case(k).0);

        let mut hits = Vec::new();
        for date in dates_between_desc(query.start, query.end) {
            if hits.len() >= query.limit {
                break;
            }
            let Some((raw, entry)) = self.load(date).await? else {
                continue;
            };

            if !query.tags.is_empty() && !entry.tags.iter().any(|t| query.tags.contains(t)) {
                continue;
            }

            let (excerpt, relevance) = match &keyword {
                Some(keyword) => {
                    let (lowered, starts) = fold_case(&raw);
                    let Some(first) = lowered.find(keyword.as_str()) else {
                        continue;
                    };
                    let occurrences = lowered.matches(keyword.as_str()).count() as f64;
                    let center = starts.partition_point(|&start| start <= first) - 1;
                    (
                        excerpt_around(&raw, center),
                        (occurrences / SATURATING_OCCURRENCES).min(1.0),
                    )
                }
                None => (raw.chars().take(EXCERPT_CHARS).collect(), 1.0),
            };

            hits.push(SearchHit {
                date,
                path: entry_path(date).to_string(),
                excerpt,
                relevance,
                tags: entry.tags,
            });
        }

        if keyword.is_some() {
            hits.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        }
        Ok(hits)
    }

    /// Group entries between `start` and `end` into recurring themes
    pub async fn extract_stories(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<StoryCandidate>> {
        let mut entries = Vec::new();
        let mut dates = dates_between_desc(start, end);
        dates.reverse();
        for date in dates {
            if let Some((_, entry)) = self.load(date).await? {
                entries.push(entry);
            }
        }

        let stories: Vec<StoryCandidate> = THEMES
            .iter()
            .filter_map(|theme| story_for(theme, &entries))
            .collect();
        tracing::debug!(
            "Extracted {} story candidates from {} entries",
            stories.len(),
            entries.len()
        );
        Ok(stories)
    }

    /// Read and decode one entry. Missing days are `None`; undecodable
    /// entries are logged and skipped so one bad file does not hide the rest.
    async fn load(&self, date: NaiveDate) -> Result<Option<(String, JournalEntry)>> {
        let path = entry_path(date);
        let bytes = match self.store.read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        match JournalEntry::decode(&path, &bytes) {
            Ok(entry) => Ok(Some((String::from_utf8_lossy(&bytes).into_owned(), entry))),
            Err(e) => {
                tracing::warn!("Skipping unreadable journal entry {}: {}", path, e);
                Ok(None)
            }
        }
    }
}

fn story_for(theme: &Theme, entries: &[JournalEntry]) -> Option<StoryCandidate> {
    let with_notes: Vec<(&JournalEntry, &String)> = entries
        .iter()
        .filter_map(|entry| (theme.notes)(entry).first().map(|note| (entry, note)))
        .collect();
    if with_notes.len() < theme.min_entries {
        return None;
    }

    let picked = &with_notes[..with_notes.len().min(SNIPPETS_PER_STORY)];
    Some(StoryCandidate {
        theme: theme.name.to_string(),
        title: theme.title.to_string(),
        snippet: picked
            .iter()
            .map(|(entry, note)| format!("{}: {}", entry.date, note))
            .collect::<Vec<_>>()
            .join(" | "),
        dates: picked.iter().map(|(entry, _)| entry.date).collect(),
        tags: theme.tags.iter().map(|t| t.to_string()).collect(),
    })
}

/// `today`, `today - 1`, ... for `days` days
fn dates_back(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..u64::from(days))
        .map_while(|i| today.checked_sub_days(Days::new(i)))
        .collect()
}

/// `end` down to `start`, inclusive; empty if `start > end`
fn dates_between_desc(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut date = end;
    while date >= start {
        dates.push(date);
        match date.pred_opt() {
            Some(prev) => date = prev,
            None => break,
        }
    }
    dates
}

/// Lowercase `text` one character at a time.
///
/// Lowercasing can expand a character (`İ` becomes two), so the second value
/// holds the byte offset in the folded string where each source character
/// starts, indexed by source character position.
fn fold_case(text: &str) -> (String, Vec<usize>) {
    let mut folded = String::with_capacity(text.len());
    let mut starts = Vec::with_capacity(text.len());
    for c in text.chars() {
        starts.push(folded.len());
        folded.extend(c.to_lowercase());
    }
    (folded, starts)
}

/// `EXCERPT_CHARS` characters of `text` centred on character index `center`
fn excerpt_around(text: &str, center: usize) -> String {
    let total = text.chars().count();
    let start = center
        .saturating_sub(EXCERPT_CHARS / 2)
        .min(total.saturating_sub(EXCERPT_CHARS));
    text.chars().skip(start).take(EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalBackend, RemoteVersionedBackend};
    use tempfile::TempDir;

    fn date(text: &str) -> NaiveDate {
        parse_date(text).unwrap()
    }

    fn local_index() -> (TempDir, JournalIndex) {
        let temp = TempDir::new().unwrap();
        let index = JournalIndex::new(Arc::new(LocalBackend::new(temp.path())));
        (temp, index)
    }

    fn entry_with_body(day: &str, body: &str) -> JournalEntry {
        let mut entry = JournalEntry::new(date(day));
        entry.body = body.to_string();
        entry
    }

    #[tokio::test]
    async fn test_journal_example() {
        let (_temp, index) = local_index();
        let mut entry = JournalEntry::new(date("2025-06-01"));
        entry.wins = vec!["shipped X".to_string()];
        index.create(&entry).await.unwrap();

        let recent = index.list_recent(date("2025-06-01"), 1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].wins, vec!["shipped X"]);
    }

    #[tokio::test]
    async fn test_create_twice_is_duplicate() {
        let (_temp, index) = local_index();
        let entry = JournalEntry::new(date("2025-06-01"));
        index.create(&entry).await.unwrap();
        assert!(matches!(
            index.create(&entry).await,
            Err(KbError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_twice_is_duplicate_on_remote() {
        let index = JournalIndex::new(Arc::new(RemoteVersionedBackend::in_memory()));
        let entry = JournalEntry::new(date("2025-06-01"));
        index.create(&entry).await.unwrap();
        assert!(index.exists(date("2025-06-01")).await.unwrap());
        assert!(matches!(
            index.create(&entry).await,
            Err(KbError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_temp, index) = local_index();
        let err = index.get(date("2025-06-01")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_skips_gaps() {
        let (_temp, index) = local_index();
        for day in ["2025-06-01", "2025-06-03", "2025-05-20"] {
            index.create(&JournalEntry::new(date(day))).await.unwrap();
        }

        let recent = index.list_recent(date("2025-06-03"), 7).await.unwrap();
        let dates: Vec<NaiveDate> = recent.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date("2025-06-03"), date("2025-06-01")]);
    }

    #[tokio::test]
    async fn test_search_finds_only_matching_day() {
        let (_temp, index) = local_index();
        index.create(&entry_with_body("2025-06-01", "quiet day")).await.unwrap();
        index.create(&entry_with_body("2025-06-02", "fixed the foo bug")).await.unwrap();
        index.create(&entry_with_body("2025-06-03", "nothing much")).await.unwrap();

        let hits = index
            .search(&SearchQuery {
                keyword: Some("foo".to_string()),
                tags: Vec::new(),
                start: date("2025-06-01"),
                end: date("2025-06-03"),
                limit: 10,
            })
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].date, date("2025-06-02"));
        assert!(hits[0].excerpt.contains("foo"));
        assert!((hits[0].relevance - 0.2).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_search_orders_by_relevance_then_date() {
        let (_temp, index) = local_index();
        index.create(&entry_with_body("2025-06-01", "rust rust rust")).await.unwrap();
        index.create(&entry_with_body("2025-06-02", "Rust")).await.unwrap();
        index.create(&entry_with_body("2025-06-03", "rust")).await.unwrap();

        let hits = index
            .search(&SearchQuery {
                keyword: Some("RUST".to_string()),
                tags: Vec::new(),
                start: date("2025-06-01"),
                end: date("2025-06-03"),
                limit: 10,
            })
            .await
            .unwrap();

        let dates: Vec<NaiveDate> = hits.iter().map(|h| h.date).collect();
        assert_eq!(
            dates,
            vec![date("2025-06-01"), date("2025-06-03"), date("2025-06-02")]
        );
    }

    #[tokio::test]
    async fn test_search_tags_and_limit() {
        let (_temp, index) = local_index();
        for (day, tag) in [("2025-06-01", "work"), ("2025-06-02", "family"), ("2025-06-03", "work")] {
            let mut entry = JournalEntry::new(date(day));
            entry.tags = vec![tag.to_string()];
            index.create(&entry).await.unwrap();
        }

        let query = SearchQuery {
            keyword: None,
            tags: vec!["work".to_string()],
            start: date("2025-06-01"),
            end: date("2025-06-03"),
            limit: 1,
        };
        let hits = index.search(&query).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].date, date("2025-06-03"));

        let hits = index.search(&SearchQuery { limit: 10, ..query }).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.relevance == 1.0));
    }

    #[test]
    fn test_excerpt_is_centred_and_bounded() {
        let text = format!("{}needle{}", "a".repeat(300), "b".repeat(300));
        let excerpt = excerpt_around(&text, 300);
        assert_eq!(excerpt.chars().count(), EXCERPT_CHARS);
        assert!(excerpt.contains("needle"));
        assert!(excerpt.starts_with('a'));

        assert_eq!(excerpt_around("short", 2), "short");
    }

    #[test]
    fn test_fold_case_tracks_expanding_characters() {
        let (folded, starts) = fold_case("İx");
        assert_eq!(folded, "i\u{307}x");
        assert_eq!(starts, vec![0, 3]);
    }

    #[tokio::test]
    async fn test_search_excerpt_survives_case_expansion() {
        let (_temp, index) = local_index();
        let body = format!("{}needle{}", "İ".repeat(300), "b".repeat(300));
        index.create(&entry_with_body("2025-06-01", &body)).await.unwrap();

        let hits = index
            .search(&SearchQuery {
                keyword: Some("NEEDLE".to_string()),
                tags: Vec::new(),
                start: date("2025-06-01"),
                end: date("2025-06-01"),
                limit: 10,
            })
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert!(hits[0].excerpt.contains("needle"));
        assert!(hits[0].excerpt.starts_with('İ'));
    }

    #[tokio::test]
    async fn test_search_keyword_is_not_trimmed() {
        let (_temp, index) = local_index();
        index.create(&entry_with_body("2025-06-01", "the other one")).await.unwrap();
        index.create(&entry_with_body("2025-06-02", "another")).await.unwrap();

        let query = SearchQuery {
            keyword: Some(" the".to_string()),
            tags: Vec::new(),
            start: date("2025-06-01"),
            end: date("2025-06-02"),
            limit: 10,
        };
        let hits = index.search(&query).await.unwrap();
        let dates: Vec<NaiveDate> = hits.iter().map(|h| h.date).collect();
        assert_eq!(dates, vec![date("2025-06-01")]);
        // " other" is the only match; the leading "the" has no space before it.
        assert!((hits[0].relevance - 0.2).abs() < f64::EPSILON);

        let blank = SearchQuery {
            keyword: Some("   ".to_string()),
            ..query
        };
        assert!(index.search(&blank).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_story_thresholds() {
        let (_temp, index) = local_index();

        let mut first = JournalEntry::new(date("2025-06-01"));
        first.kid_moments = vec!["first bike ride".to_string()];
        first.wins = vec!["closed the deal".to_string()];
        index.create(&first).await.unwrap();

        let mut second = JournalEntry::new(date("2025-06-02"));
        second.kid_moments = vec!["lost a tooth".to_string()];
        second.struggles = vec!["no sleep".to_string()];
        index.create(&second).await.unwrap();

        let stories = index
            .extract_stories(date("2025-06-01"), date("2025-06-07"))
            .await
            .unwrap();
        let themes: Vec<&str> = stories.iter().map(|s| s.theme.as_str()).collect();
        // One win is not enough for a wins story.
        assert_eq!(themes, vec!["kid moments", "struggles"]);

        let kids = &stories[0];
        assert_eq!(
            kids.snippet,
            "2025-06-01: first bike ride | 2025-06-02: lost a tooth"
        );
        assert_eq!(kids.dates, vec![date("2025-06-01"), date("2025-06-02")]);
        assert_eq!(kids.tags, vec!["family", "parenting"]);
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_skipped() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(LocalBackend::new(temp.path()));
        let index = JournalIndex::new(store.clone());

        store
            .write(
                &entry_path(date("2025-06-02")),
                b"---\nunterminated",
                &Precondition::Any,
                "seed",
            )
            .await
            .unwrap();
        index.create(&JournalEntry::new(date("2025-06-01"))).await.unwrap();

        let recent = index.list_recent(date("2025-06-02"), 2).await.unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[test]
    fn test_date_walks() {
        assert_eq!(dates_back(date("2025-03-01"), 2), vec![date("2025-03-01"), date("2025-02-28")]);
        assert!(dates_between_desc(date("2025-06-02"), date("2025-06-01")).is_empty());
        assert_eq!(dates_between_desc(date("2025-06-01"), date("2025-06-01")).len(), 1);
    }
}
