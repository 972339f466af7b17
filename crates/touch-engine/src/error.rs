/// Errors raised by event bus callbacks and input handlers.
///
/// These are logged where they occur and never abort dispatch.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The outgoing control channel has been closed.
    #[error("control channel closed")]
    ChannelClosed,

    /// A widget referenced by an event no longer exists.
    #[error("unknown widget: {0}")]
    UnknownWidget(crate::WidgetId),

    /// Any other handler failure.
    #[error("{0}")]
    Failed(String),
}
