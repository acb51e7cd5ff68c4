//! Per-topic JSON store of summarized articles.
//!
//! One file per topic, `summary_db_{topic}.json` with the topic passed
//! through [`topic_slug`], holding a JSON array of
//! [`SummaryRecord`]s. Files are always read and rewritten whole.
//!
//! ```text
//! store_dir/
//! ├── summary_db_technology.json
//! └── summary_db_climate_change.json
//! ```

use crate::error::Result;
use crate::models::SummaryRecord;
use crate::utils::topic_slug;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Summaries on disk, one JSON file per topic under `dir`.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

/// Merge freshly summarized records into stored ones.
///
/// A new record replaces the stored record with the same URL. Afterwards
/// records whose case-folded title was already seen are dropped, keeping
/// the first (new records come first).
pub fn merge(existing: Vec<SummaryRecord>, new: Vec<SummaryRecord>) -> Vec<SummaryRecord> {
    let new_urls: HashSet<String> = new.iter().map(|r| r.url.clone()).collect();
    let mut seen_titles = HashSet::new();
    new.into_iter()
        .chain(existing.into_iter().filter(|r| !new_urls.contains(&r.url)))
        .filter(|r| seen_titles.insert(r.title.trim().to_lowercase()))
        .collect()
}

impl JsonStore {
    /// Create a store rooted at `dir`.
    ///
    /// Nothing is touched on disk until the first [`save`](Self::save);
    /// a missing directory is created then.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn topic_file(&self, topic: &str) -> PathBuf {
        self.dir.join(format!("summary_db_{}.json", topic_slug(topic)))
    }

    /// Stored records for `topic`; empty when the topic has no file yet.
    #[instrument(level = "info", skip(self))]
    pub async fn load(&self, topic: &str) -> Result<Vec<SummaryRecord>> {
        let path = self.topic_file(topic);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No store file yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let records: Vec<SummaryRecord> = serde_json::from_str(&raw)?;
        info!(path = %path.display(), records = records.len(), "Loaded stored summaries");
        Ok(records)
    }

    /// Rewrite the topic file with `records`.
    ///
    /// # Arguments
    ///
    /// * `topic` - Topic whose file is written
    /// * `records` - Complete record list; whatever the file held before is replaced
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    #[instrument(level = "info", skip(self, records), fields(records = records.len()))]
    pub async fn save(&self, topic: &str, records: &[SummaryRecord]) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.topic_file(topic);
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&path, json).await?;
        info!(path = %path.display(), "Wrote store file");
        Ok(())
    }

    /// Merge `new` into the stored records, rewrite the file, return the result.
    pub async fn merge_and_save(&self, topic: &str, new: Vec<SummaryRecord>) -> Result<Vec<SummaryRecord>> {
        let merged = merge(self.load(topic).await?, new);
        self.save(topic, &merged).await?;
        Ok(merged)
    }

    /// Stored record for `url`, if any.
    pub async fn find(&self, topic: &str, url: &str) -> Result<Option<SummaryRecord>> {
        Ok(self.load(topic).await?.into_iter().find(|r| r.url == url))
    }

    /// URLs already summarized for `topic`, used to skip them on the next run.
    pub async fn known_urls(&self, topic: &str) -> Result<HashSet<String>> {
        Ok(self.load(topic).await?.into_iter().map(|r| r.url).collect())
    }

    /// Replace the stored record with the same URL, or append it.
    pub async fn upsert(&self, topic: &str, record: SummaryRecord) -> Result<()> {
        let mut records = self.load(topic).await?;
        match records.iter_mut().find(|r| r.url == record.url) {
            Some(slot) => *slot = record,
            None => records.push(record),
        }
        self.save(topic, &records).await
    }
}

/// Most recent `summarized_at` among `records`.
pub fn last_updated(records: &[SummaryRecord]) -> Option<DateTime<Utc>> {
    records.iter().map(|r| r.summarized_at).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionMethod;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn record(title: &str, url: &str, summary: &str) -> SummaryRecord {
        SummaryRecord {
            title: title.to_string(),
            topic: "Climate Change".to_string(),
            url: url.to_string(),
            summary: summary.to_string(),
            full_text: "Body.".to_string(),
            source: "Yahoo".to_string(),
            published_at: None,
            extraction_method: ExtractionMethod::Density,
            chunk_count: 1,
            summarized_at: Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_topic_file_name() {
        let store = JsonStore::new("/data");
        assert_eq!(
            store.topic_file(" Climate Change "),
            PathBuf::from("/data/summary_db_climate_change.json")
        );
        assert_eq!(
            store.topic_file("../../etc/passwd"),
            PathBuf::from("/data/summary_db_etcpasswd.json")
        );
    }

    #[test]
    fn test_merge_replaces_by_url_and_dedups_titles() {
        let existing = vec![
            record("Old story", "https://a.example/1", "old"),
            record("Kept story", "https://a.example/2", "kept"),
            record("fresh STORY", "https://a.example/3", "stale duplicate title"),
        ];
        let new = vec![
            record("Old story", "https://a.example/1", "new"),
            record("Fresh story", "https://a.example/4", "fresh"),
        ];
        let merged = merge(existing, new);
        let summaries: Vec<&str> = merged.iter().map(|r| r.summary.as_str()).collect();
        assert_eq!(summaries, vec!["new", "fresh", "kept"]);
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        assert!(store.load("tech").await.unwrap().is_empty());
        assert!(store.known_urls("tech").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_load_and_find() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("nested"));
        store
            .merge_and_save("Climate Change", vec![record("A", "https://a.example/1", "s")])
            .await
            .unwrap();

        assert!(store.topic_file("climate change").exists());
        let found = store.find("Climate Change", "https://a.example/1").await.unwrap();
        assert_eq!(found.map(|r| r.title), Some("A".to_string()));
        assert!(store.find("Climate Change", "https://a.example/9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store
            .save("tech", &[record("A", "https://a.example/1", "v1"), record("B", "https://a.example/2", "b")])
            .await
            .unwrap();
        store.upsert("tech", record("A", "https://a.example/1", "v2")).await.unwrap();

        let records = store.load("tech").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].summary, "v2");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        std::fs::write(store.topic_file("tech"), "{not json").unwrap();
        assert!(store.load("tech").await.is_err());
    }

    #[test]
    fn test_last_updated() {
        let mut newer = record("B", "https://a.example/2", "b");
        newer.summarized_at = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let records = vec![record("A", "https://a.example/1", "a"), newer.clone()];
        assert_eq!(last_updated(&records), Some(newer.summarized_at));
        assert_eq!(last_updated(&[]), None);
    }
}
