//! Session dispatcher.
//!
//! One pass per inbound event: resolve the user's direction, extract source
//! text for the event's modality, build the prompt, translate, sanitize. Every
//! failure along the way ends the pass with a user-facing message; nothing is
//! propagated to the transport and the direction store is only written by
//! mode-change events.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::direction::{Direction, DirectionStore, InMemoryDirectionStore, UserId};
use crate::error::{DispatchError, ExtractionError, Result};
use crate::extract::{ExtractorRouter, Modality, Payload};
use crate::translate::{sanitize, BackendFactory, PromptBuilder, TranslationBackend, TranslationInvoker};

/// Event delivered by the chat transport
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub user_id: UserId,
    pub kind: EventKind,
}

#[derive(Debug, Clone)]
pub enum EventKind {
    /// A message to translate. `modality` is `None` when the attachment type is not recognized.
    Message {
        modality: Option<Modality>,
        payload: Payload,
    },
    /// Explicit direction change (button press or command)
    ModeChange { token: Option<String> },
    /// First contact / help request
    Start,
}

impl InboundEvent {
    pub fn text(user_id: UserId, text: impl Into<String>) -> Self {
        Self::message(user_id, Modality::Text, Payload::Text(text.into()))
    }

    pub fn message(user_id: UserId, modality: Modality, payload: Payload) -> Self {
        Self {
            user_id,
            kind: EventKind::Message {
                modality: Some(modality),
                payload,
            },
        }
    }

    pub fn mode_change(user_id: UserId, token: impl Into<String>) -> Self {
        Self {
            user_id,
            kind: EventKind::ModeChange {
                token: Some(token.into()),
            },
        }
    }
}

/// What the dispatcher did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyStatus {
    Translated(Direction),
    DirectionChanged(Direction),
    Welcome,
    Usage,
    Failed(DispatchError),
}

/// Exactly one reply string per event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub status: ReplyStatus,
}

impl Reply {
    fn failed(error: DispatchError) -> Self {
        Self {
            text: error.user_message().to_string(),
            status: ReplyStatus::Failed(error),
        }
    }
}

/// Coordinates the direction store, extraction, prompt building, translation and sanitizing
pub struct SessionDispatcher {
    store: Arc<dyn DirectionStore>,
    router: ExtractorRouter,
    prompts: PromptBuilder,
    invoker: TranslationInvoker,
    dialect_name: String,
    echo_source: bool,
}

impl SessionDispatcher {
    pub fn new(
        config: &Config,
        store: Arc<dyn DirectionStore>,
        router: ExtractorRouter,
        backend: Arc<dyn TranslationBackend>,
    ) -> Self {
        Self {
            store,
            router,
            prompts: PromptBuilder::new(&config.prompt),
            invoker: TranslationInvoker::new(backend, Duration::from_secs(config.translate.timeout_secs)),
            dialect_name: config.prompt.dialect_name.clone(),
            echo_source: config.session.echo_source,
        }
    }

    /// Wire up the production collaborators described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(InMemoryDirectionStore::with_default(config.session.default_direction));
        let router = ExtractorRouter::from_config(config);
        let backend = BackendFactory::create_backend(config)?;
        Ok(Self::new(config, store, router, backend))
    }

    pub fn direction_of(&self, user: UserId) -> Direction {
        self.store.get(user)
    }

    /// Process one inbound event to its single reply
    pub async fn handle(&self, event: InboundEvent) -> Reply {
        let span = info_span!("event", id = %Uuid::new_v4(), user = %event.user_id);

        async move {
            match event.kind {
                EventKind::Message { modality, payload } => {
                    self.handle_message(event.user_id, modality, payload).await
                }
                EventKind::ModeChange { token } => self.handle_mode_change(event.user_id, token.as_deref()),
                EventKind::Start => self.welcome(event.user_id),
            }
        }
        .instrument(span)
        .await
    }

    async fn handle_message(&self, user: UserId, modality: Option<Modality>, payload: Payload) -> Reply {
        let Some(modality) = modality else {
            warn!("Rejecting message without a recognized payload");
            return Reply::failed(ExtractionError::UnsupportedModality.into());
        };

        let direction = self.store.get(user);
        info!("Translating {} message ({})", modality, direction);

        let source = match self.router.extract(modality, payload, direction).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Extraction failed: {}", e);
                return Reply::failed(e.into());
            }
        };

        let prompt = self.prompts.build(&source, direction);

        let raw = match self.invoker.translate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Translation failed: {}", e);
                return Reply::failed(e.into());
            }
        };

        let translation = sanitize(&raw);
        if translation.is_empty() {
            warn!("Translation was empty after sanitizing");
            return Reply::failed(crate::error::TranslationError::EmptyResponse.into());
        }

        info!("Translated {} characters", translation.chars().count());

        let text = match (modality, self.echo_source) {
            (Modality::Image, true) => {
                format!("Extracted Text:\n{}\n\nTranslation:\n{}", source, translation)
            }
            (Modality::Voice, true) => {
                format!("Transcript:\n{}\n\nTranslation:\n{}", source, translation)
            }
            _ => translation,
        };

        Reply {
            text,
            status: ReplyStatus::Translated(direction),
        }
    }

    fn handle_mode_change(&self, user: UserId, token: Option<&str>) -> Reply {
        let parsed = token.map(str::parse::<Direction>);

        match parsed {
            Some(Ok(direction)) => {
                self.store.set(user, direction);
                info!("Direction set to {}", direction);
                Reply {
                    text: format!(
                        "Mode set: {}. Send me text, a photo, or a voice message to translate.",
                        self.direction_label(direction)
                    ),
                    status: ReplyStatus::DirectionChanged(direction),
                }
            }
            Some(Err(e)) => {
                warn!("Rejected mode change: {}", e);
                self.usage()
            }
            None => self.usage(),
        }
    }

    fn welcome(&self, user: UserId) -> Reply {
        let current = self.store.get(user);
        Reply {
            text: format!(
                "Welcome to the translator bot! Please choose your desired translation direction:\n\
                 • {} (mode en_to_ku)\n\
                 • {} (mode ku_to_en)\n\
                 \n\
                 Current mode: {}",
                self.direction_label(Direction::EnToKu),
                self.direction_label(Direction::KuToEn),
                self.direction_label(current),
            ),
            status: ReplyStatus::Welcome,
        }
    }

    fn usage(&self) -> Reply {
        Reply {
            text: format!(
                "Usage: mode <direction>, where direction is one of: {}.\n\
                 en_to_ku translates English → {}, ku_to_en translates {} → English.",
                Direction::accepted_tokens().join(", "),
                self.dialect_name,
                self.dialect_name,
            ),
            status: ReplyStatus::Usage,
        }
    }

    fn direction_label(&self, direction: Direction) -> String {
        match direction {
            Direction::EnToKu => format!("English → {}", self.dialect_name),
            Direction::KuToEn => format!("{} → English", self.dialect_name),
        }
    }
}
