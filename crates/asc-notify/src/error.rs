#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification sink disconnected: {sink}")]
    Disconnected { sink: String },
    #[error("notification sink failed: {message}")]
    SinkFailed { message: String },
}
