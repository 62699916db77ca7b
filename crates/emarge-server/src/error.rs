use emarge_core::AttendanceError;
use emarge_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("database connection failed: {0}")]
    Connect(#[from] surrealdb::Error),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Attendance(#[from] AttendanceError),

    #[error("output failed: {0}")]
    Output(#[from] serde_json::Error),
}
