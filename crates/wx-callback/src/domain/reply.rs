//! Outbound replies and the per-call reply slot.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// One news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Picture URL
    pub pic_url: String,
    /// Link URL
    pub url: String,
}

/// Music reply payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Music {
    /// Thumbnail media id (required by the platform)
    pub thumb_media_id: String,
    /// Music URL
    pub music_url: Option<String>,
    /// High-quality music URL
    pub hq_music_url: Option<String>,
    /// Title
    pub title: Option<String>,
    /// Description
    pub description: Option<String>,
}

/// A reply message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// Plain text.
    Text {
        /// Text content
        content: String,
    },
    /// Image by media id.
    Image {
        /// Uploaded media id
        media_id: String,
    },
    /// Voice by media id.
    Voice {
        /// Uploaded media id
        media_id: String,
    },
    /// Video by media id.
    Video {
        /// Uploaded media id
        media_id: String,
        /// Title
        title: Option<String>,
        /// Description
        description: Option<String>,
    },
    /// Music.
    Music(Music),
    /// News articles.
    News {
        /// Articles, in display order
        articles: Vec<Article>,
    },
    /// Hand the conversation to customer service.
    TransferCustomerService {
        /// Specific agent account
        account: Option<String>,
    },
}

impl Reply {
    /// `MsgType` of the rendered reply.
    pub fn msg_type(&self) -> &'static str {
        match self {
            Reply::Text { .. } => "text",
            Reply::Image { .. } => "image",
            Reply::Voice { .. } => "voice",
            Reply::Video { .. } => "video",
            Reply::Music(_) => "music",
            Reply::News { .. } => "news",
            Reply::TransferCustomerService { .. } => "transfer_customer_service",
        }
    }
}

/// A reply addressed back to the sender of the inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressedReply {
    /// Recipient: the inbound `FromUserName`.
    pub to: String,
    /// Sender: the inbound `ToUserName`.
    pub from: String,
    /// The inbound `CreateTime`, echoed.
    pub create_time: String,
    /// Body.
    pub reply: Reply,
}

/// A sealed reply envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedReply {
    /// Base64 cipher text.
    pub encrypt: String,
    /// Signature over `(token, timestamp, nonce, encrypt)`.
    pub signature: String,
    /// Timestamp from the inbound call.
    pub timestamp: String,
    /// Nonce from the inbound call.
    pub nonce: String,
}

/// Per-call reply slot shared by every listener of one dispatch.
///
/// Holds at most one reply; each setter replaces the previous value. An
/// empty slot at the end of the dispatch means a silent acknowledgment.
#[derive(Debug, Clone, Default)]
pub struct ReplySender {
    slot: Arc<Mutex<Option<Reply>>>,
}

impl ReplySender {
    /// Empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reply.
    pub fn reply(&self, reply: Reply) -> &Self {
        *self.slot.lock() = Some(reply);
        self
    }

    /// Reply with text.
    pub fn text(&self, content: impl ToString) -> &Self {
        self.reply(Reply::Text {
            content: content.to_string(),
        })
    }

    /// Reply with an image.
    pub fn image(&self, media_id: impl Into<String>) -> &Self {
        self.reply(Reply::Image {
            media_id: media_id.into(),
        })
    }

    /// Reply with a voice clip.
    pub fn voice(&self, media_id: impl Into<String>) -> &Self {
        self.reply(Reply::Voice {
            media_id: media_id.into(),
        })
    }

    /// Reply with a video.
    pub fn video(
        &self,
        media_id: impl Into<String>,
        title: Option<String>,
        description: Option<String>,
    ) -> &Self {
        self.reply(Reply::Video {
            media_id: media_id.into(),
            title,
            description,
        })
    }

    /// Reply with music.
    pub fn music(&self, music: Music) -> &Self {
        self.reply(Reply::Music(music))
    }

    /// Reply with news articles.
    pub fn news(&self, articles: Vec<Article>) -> &Self {
        self.reply(Reply::News { articles })
    }

    /// Transfer to customer service, optionally to a specific agent.
    pub fn transfer_customer_service(&self, account: Option<String>) -> &Self {
        self.reply(Reply::TransferCustomerService { account })
    }

    /// Current reply, if any.
    pub fn current(&self) -> Option<Reply> {
        self.slot.lock().clone()
    }

    /// Whether a reply has been set.
    pub fn has_reply(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Remove and return the reply.
    pub fn take(&self) -> Option<Reply> {
        self.slot.lock().take()
    }

    /// Clear any reply.
    pub fn clear(&self) {
        self.slot.lock().take();
    }
}
