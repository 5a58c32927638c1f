//! Stream consumer for Redis operations.
//!
//! Handles reading messages from Redis Streams using consumer groups,
//! acknowledgement/cleanup, retry re-queueing and recovery of entries
//! abandoned by crashed workers.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};

use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::error::StreamError;
use crate::event::StreamEvent;
use crate::registry::StreamJob;

/// Raw XREADGROUP reply shape: stream -> entries -> field/value pairs.
type StreamReadReply = Vec<(String, Vec<(String, Vec<(String, String)>)>)>;

/// Stream consumer bound to one queue and one consumer group member.
#[derive(Clone)]
pub struct StreamConsumer {
    redis: ConnectionManager,
    config: WorkerConfig,
}

impl StreamConsumer {
    pub fn new(redis: ConnectionManager, config: WorkerConfig) -> Self {
        Self { redis, config }
    }

    /// Create the consumer group if it doesn't exist (MKSTREAM creates the
    /// stream as well, so workers can start before the first enqueue).
    pub async fn ensure_consumer_group(&self) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let result: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => {
                info!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Created consumer group"
                );
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Consumer group already exists"
                );
            }
            Err(e) => return Err(StreamError::Redis(e)),
        }

        Ok(())
    }

    /// Read entries already delivered to this consumer but not yet acked
    /// (our own restarts plus anything claimed from dead consumers).
    pub async fn read_pending<J: StreamJob>(&self) -> Result<Vec<StreamEvent<J>>, StreamError> {
        let mut conn = self.redis.clone();

        let result: RedisResult<Option<StreamReadReply>> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id)
            .arg("COUNT")
            .arg(self.config.batch_size)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg("0")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(Some(streams)) => self.decode_reply(streams).await,
            Ok(None) => Ok(vec![]),
            Err(e) if e.to_string().contains("NOGROUP") => Ok(vec![]),
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    /// Read new entries from the stream, blocking up to the configured
    /// timeout when blocking mode is enabled.
    pub async fn read_new<J: StreamJob>(&self) -> Result<Vec<StreamEvent<J>>, StreamError> {
        let mut conn = self.redis.clone();

        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id);

        if let Some(timeout) = self.config.block_timeout_ms {
            cmd.arg("BLOCK").arg(timeout);
        }

        cmd.arg("COUNT")
            .arg(self.config.batch_size)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">");

        let result: RedisResult<Option<StreamReadReply>> = cmd.query_async(&mut conn).await;

        match result {
            Ok(Some(streams)) => self.decode_reply(streams).await,
            Ok(None) => Ok(vec![]), // blocking timeout, nothing arrived
            Err(e) if e.to_string().contains("NOGROUP") => Ok(vec![]),
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    /// Acknowledge an entry.
    pub async fn ack(&self, stream_id: &str) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let _: i64 = conn
            .xack(
                &self.config.stream_name,
                &self.config.consumer_group,
                &[stream_id],
            )
            .await?;

        debug!(stream_id = %stream_id, "Acknowledged entry");
        Ok(())
    }

    /// Acknowledge an entry and, when the queue removes completed jobs,
    /// delete it from the stream so it is no longer enumerable.
    pub async fn ack_and_cleanup(&self, stream_id: &str) -> Result<(), StreamError> {
        self.ack(stream_id).await?;

        if self.config.remove_on_complete {
            self.remove(stream_id).await?;
        }

        Ok(())
    }

    /// Delete an entry from the stream.
    pub async fn remove(&self, stream_id: &str) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let _: i64 = conn.xdel(&self.config.stream_name, &[stream_id]).await?;

        debug!(stream_id = %stream_id, "Removed entry");
        Ok(())
    }

    /// Append a retry of `job` to the stream.
    pub async fn requeue<J: StreamJob>(&self, job: &J) -> Result<String, StreamError> {
        let mut conn = self.redis.clone();
        let job_json = serde_json::to_string(job)?;

        let stream_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.config.max_length)
            .arg("*")
            .arg("job")
            .arg(&job_json)
            .query_async(&mut conn)
            .await?;

        debug!(
            job_id = %job.job_id(),
            retry_count = %job.retry_count(),
            stream_id = %stream_id,
            "Re-queued job"
        );

        Ok(stream_id)
    }

    /// Claim ALL pending entries on startup, regardless of idle time.
    ///
    /// Restarting workers get fresh consumer IDs, so anything still owned by
    /// a previous incarnation would otherwise sit unclaimed until the idle
    /// timeout.
    pub async fn claim_all_pending_on_startup(&self) -> Result<usize, StreamError> {
        self.autoclaim(0, 100).await
    }

    /// Claim entries abandoned by crashed consumers (idle past the
    /// configured threshold). Claimed entries surface on the next
    /// `read_pending` call.
    pub async fn claim_abandoned(&self) -> Result<usize, StreamError> {
        let claimed = self.autoclaim(self.config.claim_idle_ms, 10).await?;
        if claimed > 0 {
            info!(
                count = claimed,
                consumer = %self.config.consumer_id,
                "Claimed abandoned entries"
            );
        }
        Ok(claimed)
    }

    /// XAUTOCLAIM loop; returns how many entries were claimed.
    async fn autoclaim(&self, min_idle_ms: u64, count: usize) -> Result<usize, StreamError> {
        let mut conn = self.redis.clone();
        let mut total_claimed = 0usize;
        let mut start_id = "0-0".to_string();

        loop {
            let result: redis::Value = redis::cmd("XAUTOCLAIM")
                .arg(&self.config.stream_name)
                .arg(&self.config.consumer_group)
                .arg(&self.config.consumer_id)
                .arg(min_idle_ms)
                .arg(&start_id)
                .arg("COUNT")
                .arg(count)
                .query_async(&mut conn)
                .await
                .unwrap_or(redis::Value::Nil);

            // Reply: [next-start-id, [[entry-id, fields], ...], [deleted-ids]]
            let redis::Value::Array(arr) = &result else {
                break;
            };
            if arr.len() < 2 {
                break;
            }

            let next = match &arr[0] {
                redis::Value::BulkString(bytes) => String::from_utf8_lossy(bytes).to_string(),
                redis::Value::SimpleString(s) => s.clone(),
                _ => break,
            };

            if let redis::Value::Array(entries) = &arr[1] {
                total_claimed += entries.len();
                if entries.is_empty() && next == "0-0" {
                    break;
                }
            } else {
                break;
            }

            if next == "0-0" {
                break;
            }
            start_id = next;
        }

        Ok(total_claimed)
    }

    /// Get stream length and pending count for monitoring.
    pub async fn stream_info(&self) -> Result<StreamInfo, StreamError> {
        let mut conn = self.redis.clone();

        let len: i64 = conn.xlen(&self.config.stream_name).await?;

        let pending: RedisResult<(i64, Option<String>, Option<String>, Option<Vec<(String, i64)>>)> =
            redis::cmd("XPENDING")
                .arg(&self.config.stream_name)
                .arg(&self.config.consumer_group)
                .query_async(&mut conn)
                .await;

        let pending_count = pending.map(|(count, _, _, _)| count).unwrap_or(0);

        Ok(StreamInfo {
            stream_name: self.config.stream_name.clone(),
            length: len,
            pending_count,
            consumer_group: self.config.consumer_group.clone(),
        })
    }

    /// Decode an XREADGROUP reply, quarantining unparseable entries.
    async fn decode_reply<J: StreamJob>(
        &self,
        streams: StreamReadReply,
    ) -> Result<Vec<StreamEvent<J>>, StreamError> {
        let mut events = Vec::new();
        let mut poison: Vec<(String, String)> = Vec::new();

        for (_stream_name, entries) in streams {
            for (stream_id, fields) in entries {
                let job_data = fields
                    .iter()
                    .find(|(k, _)| k == "job")
                    .map(|(_, v)| v.clone());

                match job_data {
                    Some(json) => match serde_json::from_str::<J>(&json) {
                        Ok(job) => events.push(StreamEvent::new(stream_id, job)),
                        Err(e) => {
                            warn!(
                                stream_id = %stream_id,
                                error = %e,
                                "Failed to parse job payload"
                            );
                            poison.push((stream_id, json));
                        }
                    },
                    None => {
                        warn!(stream_id = %stream_id, "Missing 'job' field in entry");
                        poison.push((stream_id, String::new()));
                    }
                }
            }
        }

        for (stream_id, raw) in poison {
            self.quarantine(&stream_id, &raw).await;
        }

        Ok(events)
    }

    /// Move an unparseable entry to the DLQ and drop it from the stream.
    /// Left in place it would be re-delivered forever.
    async fn quarantine(&self, stream_id: &str, raw: &str) {
        let mut conn = self.redis.clone();

        let entry = serde_json::json!({
            "raw_payload": raw,
            "original_stream_id": stream_id,
            "error": "unparseable job payload",
            "failed_at": chrono::Utc::now().to_rfc3339(),
        });

        let result: RedisResult<String> = redis::cmd("XADD")
            .arg(&self.config.dlq_stream)
            .arg("MAXLEN")
            .arg(self.config.fail_retain)
            .arg("*")
            .arg("data")
            .arg(entry.to_string())
            .query_async(&mut conn)
            .await;

        if let Err(e) = result {
            warn!(stream_id = %stream_id, error = %e, "Failed to quarantine entry");
        }

        if let Err(e) = self.ack(stream_id).await {
            warn!(stream_id = %stream_id, error = %e, "Failed to ACK quarantined entry");
        }
        if let Err(e) = self.remove(stream_id).await {
            warn!(stream_id = %stream_id, error = %e, "Failed to remove quarantined entry");
        }
    }
}

/// Stream information for health endpoints.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StreamInfo {
    pub stream_name: String,
    pub length: i64,
    pub pending_count: i64,
    pub consumer_group: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_info_shape() {
        let info = StreamInfo {
            stream_name: "email".to_string(),
            length: 100,
            pending_count: 5,
            consumer_group: "email_workers".to_string(),
        };

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["stream_name"], "email");
        assert_eq!(json["pending_count"], 5);
    }
}
