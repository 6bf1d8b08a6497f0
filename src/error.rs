//! Error taxonomy shared by every subsystem (§7 of the design).
//!
//! Internal functions return `Result<T, Error>`; the REPL boundary widens
//! this into `anyhow::Result` so a classified, human-readable message can
//! be printed without unwinding the call stack's structure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("{}", describe_kafka_code(.0))]
    KafkaCode(i16),

    #[error("no leader available for partition: {0}")]
    LeaderUnavailable(String),

    #[error("no such zookeeper path: {0}")]
    ZkNotFound(String),

    #[error("failed to recursively delete {path}: {reason}")]
    ZkDeleteFailed { path: String, reason: String },

    #[error("lost connection to zookeeper ensemble")]
    ZkConnectionLost,

    #[error("unrecognized value type: {0}")]
    InvalidType(String),

    #[error("literal does not match type: {0}")]
    InvalidLiteral(String),

    #[error("syntax error in '{0}': {1}")]
    InvalidArgs(String, String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The command name carried by `InvalidArgs`, if any. Used by the REPL
    /// to suggest `syntax <cmd>`.
    pub fn offending_command(&self) -> Option<&str> {
        match self {
            Error::InvalidArgs(cmd, _) => Some(cmd),
            _ => None,
        }
    }
}

/// The fixed Kafka wire error-code table (§4.3). An unrecognized code still
/// carries its numeric value through to the message.
pub fn describe_kafka_code(code: i16) -> String {
    let msg = match code {
        -1 => "Unknown",
        0 => "NoError",
        1 => "OffsetOutOfRange",
        2 => "InvalidMessage",
        3 => "UnknownTopicOrPartition",
        4 => "InvalidFetchSize",
        5 => "LeaderNotAvailable",
        6 => "NotLeaderForPartition",
        7 => "RequestTimedOut",
        8 => "BrokerNotAvailable",
        9 => "ReplicaNotAvailable",
        10 => "MessageSizeTooLarge",
        11 => "StaleControllerEpoch",
        12 => "OffsetMetadataTooLarge",
        13 => "StaleLeaderEpoch",
        14 => "OffsetsLoadInProgress",
        15 => "ConsumerCoordinatorNotAvailable",
        16 => "NotCoordinatorForConsumer",
        _ => return format!("Unrecognized Error Code: {code}"),
    };
    format!("{msg} ({code})")
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<zookeeper::ZkError> for Error {
    fn from(e: zookeeper::ZkError) -> Self {
        match e {
            zookeeper::ZkError::NoNode => Error::ZkNotFound(String::new()),
            zookeeper::ZkError::ConnectionLoss | zookeeper::ZkError::SessionExpired => {
                Error::ZkConnectionLost
            }
            other => Error::Internal(format!("zookeeper: {other:?}")),
        }
    }
}

impl From<rdkafka::error::KafkaError> for Error {
    fn from(e: rdkafka::error::KafkaError) -> Self {
        Error::Protocol(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
