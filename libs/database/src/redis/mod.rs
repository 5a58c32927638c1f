mod connector;

pub use connector::{connect, connect_from_config, connect_from_config_with_retry, connect_with_retry};
pub use core_config::redis::RedisConfig;
