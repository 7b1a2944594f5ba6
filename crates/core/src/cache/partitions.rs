//! Partition lifecycle: open, enumerate, delete.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// A partition and how many entries it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartitionInfo {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
}

impl CacheDb {
    /// Open a partition, creating it if it doesn't exist.
    ///
    /// Returns true if the partition was created by this call.
    pub async fn open_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(inserted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a partition exists.
    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List partition names in creation order.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// List partitions with their entry counts.
    pub async fn partitions(&self) -> Result<Vec<PartitionInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PartitionInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT p.name, p.created_at, COUNT(e.key_hash)
                     FROM partitions p
                     LEFT JOIN entries e ON e.partition = p.name
                     GROUP BY p.name, p.created_at
                     ORDER BY p.created_at ASC, p.name ASC",
                )?;
                let infos = stmt
                    .query_map([], |row| {
                        Ok(PartitionInfo {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(infos)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and every entry in it.
    ///
    /// Returns false if the partition didn't exist.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                conn.execute("DELETE FROM entries WHERE partition = ?1", params![name])?;
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_partition_once() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.open_partition("uninav-tiles-v1").await.unwrap());
        assert!(!db.open_partition("uninav-tiles-v1").await.unwrap());
        assert!(db.has_partition("uninav-tiles-v1").await.unwrap());
        assert!(!db.has_partition("uninav-tiles-v0").await.unwrap());
    }

    #[tokio::test]
    async fn test_partition_names_and_delete() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("uninav-app-v1").await.unwrap();
        db.open_partition("uninav-tiles-v1").await.unwrap();

        let mut names = db.partition_names().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["uninav-app-v1".to_string(), "uninav-tiles-v1".to_string()]);

        assert!(db.delete_partition("uninav-app-v1").await.unwrap());
        assert!(!db.delete_partition("uninav-app-v1").await.unwrap());
        assert_eq!(db.partition_names().await.unwrap(), vec!["uninav-tiles-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_partitions_empty_counts() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("uninav-app-v1").await.unwrap();

        let infos = db.partitions().await.unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "uninav-app-v1");
        assert_eq!(infos[0].entries, 0);
    }
}
