pub mod dispatcher;
pub mod handler;
pub mod registry;

use crate::chat::ChatOrchestrator;
use crate::cli::ViewKind;
use crate::config::Settings;
use crate::image::ImageStudio;
use crate::providers::GenerativeGateway;
use std::sync::Arc;
use tracing::debug;

pub use dispatcher::create_command_registry;

/// The mounted view. Only one exists at a time; switching drops the other.
pub enum View {
    Chat(ChatOrchestrator),
    Image(ImageStudio),
}

impl View {
    pub fn kind(&self) -> ViewKind {
        match self {
            View::Chat(_) => ViewKind::Chat,
            View::Image(_) => ViewKind::Image,
        }
    }
}

pub struct StudioState {
    gateway: Arc<dyn GenerativeGateway>,
    pub settings: Arc<Settings>,
    pub view: View,
    pub should_continue: bool,
    mounts: u64,
}

impl StudioState {
    pub fn new(gateway: Arc<dyn GenerativeGateway>, settings: Arc<Settings>, kind: ViewKind) -> Self {
        let view = Self::build_view(&gateway, &settings, kind);
        Self {
            gateway,
            settings,
            view,
            should_continue: true,
            mounts: 1,
        }
    }

    /// Replace the current view with a freshly initialised one of `kind`.
    pub fn mount(&mut self, kind: ViewKind) {
        debug!(?kind, "Mounting view");
        self.view = Self::build_view(&self.gateway, &self.settings, kind);
        self.mounts += 1;
    }

    /// Bumped on every mount, so callers can tell a view was replaced.
    pub fn mounts(&self) -> u64 {
        self.mounts
    }

    fn build_view(
        gateway: &Arc<dyn GenerativeGateway>,
        settings: &Settings,
        kind: ViewKind,
    ) -> View {
        match kind {
            ViewKind::Chat => {
                let mut chat = ChatOrchestrator::new(Arc::clone(gateway));
                chat.initialize();
                View::Chat(chat)
            }
            ViewKind::Image => View::Image(
                ImageStudio::new(Arc::clone(gateway))
                    .with_defaults(settings.number_of_images, settings.aspect_ratio),
            ),
        }
    }

    pub fn kind(&self) -> ViewKind {
        self.view.kind()
    }

    pub fn image_studio(&mut self) -> Option<&mut ImageStudio> {
        match &mut self.view {
            View::Image(studio) => Some(studio),
            View::Chat(_) => None,
        }
    }
}
