//! Redis backend with per-record expiry.

use ::redis::aio::{ConnectionLike, ConnectionManager};
use ::redis::{AsyncCommands, Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use async_trait::async_trait;
use exn::ResultExt;
use std::time::Duration;
use themer_config::RedisConfig;
use tracing::instrument;

use crate::backend::{ResourceRepository, validate_key, validate_put};
use crate::codec;
use crate::error::{ErrorKind, Result};
use crate::models::Record;

/// Repository stored in Redis under `{namespace}:{theme}:{name}` keys.
///
/// When a TTL is set every write carries it, so a record expires that long
/// after it was last written. Any async
/// connection works; [`connect`](Self::connect) opens a [`ConnectionManager`].
#[derive(Clone)]
pub struct RedisRepository<C = ConnectionManager> {
    connection: C,
    namespace: String,
    ttl: Option<Duration>,
}

impl RedisRepository {
    /// Open a connection described by `config`.
    ///
    /// With `config.connection` set, that URL is used as-is and no expiry is
    /// applied; otherwise the host, port, password and database settings
    /// describe the server.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = match &config.connection {
            Some(url) => Client::open(url.as_str()),
            None => Client::open(ConnectionInfo {
                addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
                redis: RedisConnectionInfo {
                    db: config.database,
                    password: config.password.clone(),
                    ..Default::default()
                },
            }),
        }
        .or_raise(|| ErrorKind::Connection)?;
        let connection = ConnectionManager::new(client).await.or_raise(|| ErrorKind::Connection)?;
        tracing::debug!(namespace = %config.namespace, ttl = ?config.ttl(), "Connected to redis");
        Ok(Self::with_connection(connection, config.namespace.clone(), config.ttl()))
    }
}

impl<C> RedisRepository<C> {
    /// Reuse an existing connection.
    pub fn with_connection(connection: C, namespace: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self { connection, namespace: namespace.into(), ttl }
    }

    fn key(&self, theme: &str, name: &str) -> String {
        record_key(&self.namespace, theme, name)
    }
}

fn record_key(namespace: &str, theme: &str, name: &str) -> String {
    format!("{namespace}:{theme}:{name}")
}

/// `PSETEX` rejects a zero expiry, so anything below a millisecond rounds up.
fn expiry_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl<C> ResourceRepository for RedisRepository<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, theme: &str, name: &str) -> Result<Option<Record>> {
        validate_key(theme, name)?;
        let mut connection = self.connection.clone();
        let payload: Option<String> = connection.get(self.key(theme, name)).await.or_raise(|| ErrorKind::Network)?;
        payload.as_deref().map(codec::decode).transpose()
    }

    #[instrument(skip_all, fields(theme = %theme, name = %name))]
    async fn put(&self, theme: &str, name: &str, record: &Record) -> Result<()> {
        validate_put(theme, name, record)?;
        let payload = codec::encode(record)?;
        let key = self.key(theme, name);
        let mut connection = self.connection.clone();
        match self.ttl {
            Some(ttl) => connection.pset_ex::<_, _, ()>(key, payload, expiry_millis(ttl)).await,
            None => connection.set::<_, _, ()>(key, payload).await,
        }
        .or_raise(|| ErrorKind::Network)
    }

    async fn delete(&self, theme: &str, name: &str) -> Result<()> {
        validate_key(theme, name)?;
        let mut connection = self.connection.clone();
        connection.del::<_, ()>(self.key(theme, name)).await.or_raise(|| ErrorKind::Network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Preset, Resource, Source};
    use ::redis::{Value, cmd};
    use redis_test::{MockCmd, MockRedisConnection};
    use rstest::rstest;

    fn app_css() -> Record {
        Resource::with_defaults("app.css", Source::Link { source: "/app.css".to_string() }).into()
    }

    #[test]
    fn test_record_key() {
        assert_eq!(record_key("assert", "main", "app.css"), "assert:main:app.css");
    }

    #[rstest]
    #[case(Duration::from_secs_f64(2.5), 2500)]
    #[case(Duration::from_micros(10), 1)]
    #[case(Duration::from_secs(60), 60_000)]
    fn test_expiry_millis(#[case] ttl: Duration, #[case] expected: u64) {
        assert_eq!(expiry_millis(ttl), expected);
    }

    #[tokio::test]
    async fn test_put_with_ttl_sends_psetex() {
        let payload = codec::encode(&app_css()).unwrap();
        let connection = MockRedisConnection::new(vec![MockCmd::new(
            cmd("PSETEX").arg("assert:main:app.css").arg(2500u64).arg(&payload),
            Ok("OK"),
        )]);
        let repo = RedisRepository::with_connection(connection, "assert", Some(Duration::from_millis(2500)));
        repo.put("main", "app.css", &app_css()).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_without_ttl_sends_set() {
        let preset = Record::Preset(Preset { name: "default".to_string(), items: vec![], appendable: true });
        let payload = codec::encode(&preset).unwrap();
        let connection =
            MockRedisConnection::new(vec![MockCmd::new(cmd("SET").arg("assert:t1:default").arg(&payload), Ok("OK"))]);
        let repo = RedisRepository::with_connection(connection, "assert", None);
        repo.put("t1", "default", &preset).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_decodes_payload_and_misses() {
        let payload = codec::encode(&app_css()).unwrap();
        let connection = MockRedisConnection::new(vec![
            MockCmd::new(cmd("GET").arg("assert:main:app.css"), Ok(payload)),
            MockCmd::new(cmd("GET").arg("assert:main:missing.css"), Ok(Value::Nil)),
        ]);
        let repo = RedisRepository::with_connection(connection, "assert", None);
        assert_eq!(repo.get("main", "app.css").await.unwrap(), Some(app_css()));
        assert_eq!(repo.get("main", "missing.css").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_sends_del() {
        let del = MockCmd::new(cmd("DEL").arg("assert:main:app.css"), Ok(Value::Int(1)));
        let repo = RedisRepository::with_connection(MockRedisConnection::new(vec![del]), "assert", None);
        repo.delete("main", "app.css").await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_key_sends_nothing() {
        let repo = RedisRepository::with_connection(MockRedisConnection::new(vec![]), "assert", None);
        let err = repo.put("ma:in", "app.css", &app_css()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(_, _)));
    }
}
