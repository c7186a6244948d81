pub mod error;
pub mod mapper;
pub mod sink;
pub mod types;

pub use error::*;
pub use mapper::*;
pub use sink::*;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::{
        notification_for_lifecycle, ChannelSink, NotificationDispatcher, NotificationMessage,
        NotificationSeverity, NotificationSinkKind, NotificationTopic, NotifyError, StdoutSink,
        TracingSink,
    };
    use asc_core::events::LifecycleEvent;
    use std::any::TypeId;

    #[test]
    fn crate_root_reexports_types() {
        let _ = TypeId::of::<NotifyError>();
        let _ = TypeId::of::<NotificationMessage>();
        let _ = TypeId::of::<NotificationSeverity>();
        let _ = TypeId::of::<NotificationTopic>();
        let _ = TypeId::of::<NotificationSinkKind>();
        let _ = TypeId::of::<StdoutSink>();
        let _ = TypeId::of::<TracingSink>();
        let _ = TypeId::of::<ChannelSink<NotificationMessage>>();
        let _ = TypeId::of::<NotificationDispatcher>();
    }

    #[test]
    fn crate_root_reexports_mapper_helper() {
        let _mapper: fn(&LifecycleEvent) -> NotificationMessage = notification_for_lifecycle;
    }
}
