//! Entry storage: put, match, count.
//!
//! Entries are whole responses (status, headers, body) stored under a
//! request key. They never expire; they live until their partition is
//! dropped or a later response for the same request replaces them.

use super::connection::CacheDb;
use super::hash::{compute_request_key, strip_search};
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};
use url::Url;

/// A stored response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CachedResponse {
    /// Build an entry for `method url`, stamped with the current time.
    pub fn new(
        method: &str, url: &Url, status: u16, content_type: Option<String>, headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            status,
            content_type,
            headers,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Options for matching a request against stored entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Ignore the query string on both the request and the stored entries.
    pub ignore_search: bool,
}

impl MatchOptions {
    pub fn ignore_search() -> Self {
        Self { ignore_search: true }
    }
}

const SELECT_COLUMNS: &str = "method, url, status_code, content_type, headers_json, body, stored_at";

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(CachedResponse, Option<String>)> {
    Ok((
        CachedResponse {
            method: row.get(0)?,
            url: row.get(1)?,
            status: row.get::<_, i64>(2)? as u16,
            content_type: row.get(3)?,
            headers: Vec::new(),
            body: row.get(5)?,
            stored_at: row.get(6)?,
        },
        row.get(4)?,
    ))
}

fn decode(row: (CachedResponse, Option<String>)) -> Result<CachedResponse, Error> {
    let (mut response, headers_json) = row;
    if let Some(json) = headers_json {
        response.headers = serde_json::from_str(&json)?;
    }
    Ok(response)
}

impl CacheDb {
    /// Store a response in a partition, replacing any entry for the same request.
    ///
    /// The partition is created if needed. Only `GET` requests can be stored.
    pub async fn put_entry(&self, partition: &str, response: &CachedResponse) -> Result<(), Error> {
        if response.method != "GET" {
            return Err(Error::InvalidInput(format!("cannot cache {} requests", response.method)));
        }
        let url = Url::parse(&response.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let key_hash = compute_request_key(&response.method, &url);
        let url_no_search = strip_search(&url);
        let headers_json = serde_json::to_string(&response.headers)?;
        let partition = partition.to_string();
        let response = response.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![&partition, &response.stored_at],
                )?;
                conn.execute(
                    "INSERT INTO entries (
                        partition, key_hash, method, url, url_no_search,
                        status_code, content_type, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(partition, key_hash) DO UPDATE SET
                        status_code = excluded.status_code,
                        content_type = excluded.content_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &partition,
                        &key_hash,
                        &response.method,
                        &response.url,
                        &url_no_search,
                        response.status as i64,
                        &response.content_type,
                        &headers_json,
                        &response.body,
                        &response.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Find the stored response for a request in one partition.
    ///
    /// With `ignore_search`, the oldest entry whose query-stripped URL matches wins.
    pub async fn match_entry(
        &self, partition: &str, method: &str, url: &Url, options: MatchOptions,
    ) -> Result<Option<CachedResponse>, Error> {
        self.match_in(Some(partition.to_string()), method, url, options).await
    }

    /// Find the stored response for a request in any partition, oldest partition first.
    pub async fn match_any(&self, method: &str, url: &Url, options: MatchOptions) -> Result<Option<CachedResponse>, Error> {
        self.match_in(None, method, url, options).await
    }

    async fn match_in(
        &self, partition: Option<String>, method: &str, url: &Url, options: MatchOptions,
    ) -> Result<Option<CachedResponse>, Error> {
        let method = method.to_ascii_uppercase();
        let (column, needle) = if options.ignore_search {
            ("e.url_no_search", strip_search(url))
        } else {
            ("e.key_hash", compute_request_key(&method, url))
        };
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM entries e
             JOIN partitions p ON p.name = e.partition
             WHERE e.method = ?1 AND {column} = ?2 AND (?3 IS NULL OR e.partition = ?3)
             ORDER BY p.created_at ASC, e.stored_at ASC
             LIMIT 1"
        );

        let row = self
            .conn
            .call(move |conn| -> Result<Option<(CachedResponse, Option<String>)>, Error> {
                let mut stmt = conn.prepare(&sql)?;
                match stmt.query_row(params![method, needle, partition], read_row) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode).transpose()
    }

    /// Number of entries stored in a partition.
    pub async fn count_entries(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
