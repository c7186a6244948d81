use asc_core::events::LifecycleEvent;
use std::io::Write;
use std::sync::mpsc::Sender;
use tracing::{error, info, warn};

use crate::error::NotifyError;
use crate::mapper::notification_for_lifecycle;
use crate::types::{NotificationMessage, NotificationSeverity, NotificationSinkKind};

pub trait NotificationSink: Send + Sync {
    fn kind(&self) -> NotificationSinkKind;
    fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError>;
}

/// Forwards notifications into a front end's event channel.
#[derive(Debug)]
pub struct ChannelSink<T> {
    tx: Sender<T>,
}

impl<T> ChannelSink<T> {
    pub fn new(tx: Sender<T>) -> Self {
        Self { tx }
    }
}

impl<T> NotificationSink for ChannelSink<T>
where
    T: From<NotificationMessage> + Send,
{
    fn kind(&self) -> NotificationSinkKind {
        NotificationSinkKind::Channel
    }

    fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        self.tx
            .send(T::from(message.clone()))
            .map_err(|_| NotifyError::Disconnected {
                sink: "channel".to_string(),
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn kind(&self) -> NotificationSinkKind {
        NotificationSinkKind::Tracing
    }

    fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        let kind = message.event.kind();
        match message.severity {
            NotificationSeverity::Info => info!(kind = kind, "{}", message.summary()),
            NotificationSeverity::Warning => warn!(kind = kind, "{}", message.summary()),
            NotificationSeverity::Error => error!(kind = kind, "{}", message.summary()),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn kind(&self) -> NotificationSinkKind {
        NotificationSinkKind::Stdout
    }

    fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(
            stdout,
            "[{}] {} {}",
            message.at.format("%H:%M:%S"),
            message.severity.as_str(),
            message.summary()
        )
        .map_err(|e| NotifyError::SinkFailed {
            message: format!("failed to write to stdout: {e}"),
        })
    }
}

/// Fans one notification out to every sink. A failing sink is logged and
/// never blocks the others.
#[derive(Default)]
pub struct NotificationDispatcher {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl NotificationDispatcher {
    pub fn new(sinks: Vec<Box<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_kinds(&self) -> Vec<NotificationSinkKind> {
        self.sinks.iter().map(|sink| sink.kind()).collect()
    }

    pub fn dispatch(
        &self,
        message: &NotificationMessage,
    ) -> Vec<(NotificationSinkKind, Result<(), NotifyError>)> {
        let mut out = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            let result = sink.send(message);
            if let Err(err) = &result {
                warn!(sink = ?sink.kind(), error = %err, "notification delivery failed");
            }
            out.push((sink.kind(), result));
        }
        out
    }

    /// Called once per reconciliation pass or reload failure.
    pub fn publish(&self, event: &LifecycleEvent) -> NotificationMessage {
        let message = notification_for_lifecycle(event);
        self.dispatch(&message);
        message
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("sinks", &self.sink_kinds())
            .finish()
    }
}
