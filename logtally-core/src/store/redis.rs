use crate::store::{CountingStore, StoreError, join_key};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Counting store backed by Redis `INCR` / `GET` / `MGET`.
///
/// `ConnectionManager` reconnects on its own after transient failures; a
/// request that hits a broken connection surfaces as `StoreError::Backend`.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    delimiter: String,
}

impl RedisStore {
    pub async fn connect(url: &str, delimiter: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| StoreError::Connect {
            url: url.to_string(),
            source: e.into(),
        })?;

        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Connect {
                url: url.to_string(),
                source: e.into(),
            })?;

        tracing::info!(url, "connected to redis counting store");

        Ok(Self {
            conn,
            delimiter: delimiter.to_string(),
        })
    }
}

#[async_trait]
impl CountingStore for RedisStore {
    async fn increment(&self, parts: &[&str]) -> Result<(), StoreError> {
        let key = join_key(parts, &self.delimiter);
        let mut conn = self.conn.clone();

        conn.incr::<_, _, i64>(&key, 1)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::backend(key, e))
    }

    async fn get(&self, parts: &[&str]) -> Result<u64, StoreError> {
        let key = join_key(parts, &self.delimiter);
        let mut conn = self.conn.clone();

        match conn.get::<_, Option<u64>>(&key).await {
            Ok(Some(count)) => Ok(count),
            Ok(None) => Err(StoreError::not_found(key)),
            Err(e) => Err(StoreError::backend(key, e)),
        }
    }

    async fn get_many(&self, keys: &[&[&str]]) -> Vec<Result<u64, StoreError>> {
        // MGET with a single key is sent as GET by the client and comes back as a scalar.
        if keys.len() < 2 {
            let mut out = Vec::with_capacity(keys.len());
            for parts in keys {
                out.push(self.get(parts).await);
            }
            return out;
        }

        let joined: Vec<String> = keys
            .iter()
            .map(|parts| join_key(parts, &self.delimiter))
            .collect();
        let mut conn = self.conn.clone();

        let reply = conn.mget::<_, Vec<Option<u64>>>(joined.clone()).await;
        mget_results(joined, reply)
    }
}

/// One result per requested key, in request order.
///
/// Nil entries, and entries missing from a short reply, are `NotFound`. A
/// failed request fails every key with the same reason.
pub(crate) fn mget_results<E: std::fmt::Display>(
    keys: Vec<String>,
    reply: Result<Vec<Option<u64>>, E>,
) -> Vec<Result<u64, StoreError>> {
    match reply {
        Ok(values) => keys
            .into_iter()
            .zip(values.into_iter().map(Some).chain(std::iter::repeat(None)))
            .map(|(key, value)| match value.flatten() {
                Some(count) => Ok(count),
                None => Err(StoreError::not_found(key)),
            })
            .collect(),
        Err(e) => {
            let reason = e.to_string();
            keys.into_iter()
                .map(|key| Err(StoreError::backend(key, reason.clone())))
                .collect()
        }
    }
}
