use crate::domain::checkout::PresentationEvent;
use crate::domain::ports::Presenter;
use tokio::sync::mpsc;
use tracing::debug;

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present(&self, _event: PresentationEvent) {}
}

/// Forwards events to an async consumer, typically the host's UI loop.
#[derive(Debug, Clone)]
pub struct ChannelPresenter {
    events: mpsc::UnboundedSender<PresentationEvent>,
}

impl ChannelPresenter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PresentationEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, rx)
    }
}

impl Presenter for ChannelPresenter {
    fn present(&self, event: PresentationEvent) {
        if self.events.send(event).is_err() {
            debug!("presentation event dropped, no consumer");
        }
    }
}
