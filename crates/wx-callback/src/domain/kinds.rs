//! Message kinds, event kinds and listener topics.
//!
//! Routing names are normalized: lowercased with underscores removed, so
//! `SCAN_CODE_PUSH`, `scancode_push` and `scanCodePush` all route to
//! `scancodepush`. Names outside the tables still route; they only fail to
//! match a specific listener.

use std::fmt;

/// Whether a kind arrives as a plain message or as an event push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindClass {
    /// `MsgType` itself names the kind.
    Message,
    /// `MsgType` is `event` and `Event` names the kind.
    Event,
}

/// Receivable message kinds.
pub const MESSAGE_KINDS: &[&str] = &[
    "text",
    "image",
    "voice",
    "video",
    "shortvideo",
    "location",
    "link",
];

/// Event kinds pushed under `MsgType = event`.
pub const EVENT_KINDS: &[&str] = &[
    // Subscription and QR scans
    "subscribe",
    "unsubscribe",
    "scan",
    // Custom menus
    "click",
    "view",
    "scancodepush",
    "scancodewaitmsg",
    "picsysphoto",
    "picphotooralbum",
    "picweixin",
    "locationselect",
    "viewminiprogram",
    // Shake nearby
    "shakearoundusershake",
    "shakearoundlotterybind",
    // Account verification
    "qualificationverifysuccess",
    "qualificationverifyfail",
    "namingverifysuccess",
    "namingverifyfail",
    "annualrenew",
    // Cards and coupons
    "cardpasscheck",
    "usergetcard",
    "usergiftingcard",
    "userdelcard",
    "userconsumecard",
    "userpayfrompaycell",
    "userviewcard",
    "userentersessionfromcard",
    "updatemembercard",
    "cardskuremind",
    "cardpayorder",
    "submitmembercarduserinfo",
    // Gift cards
    "giftcardpaydone",
    "giftcardsendtofriend",
    "giftcarduseraccept",
    // Shopping guide
    "guideqrcodescanevent",
    "addguidebuyerrelationevent",
    "guideinviteresulteven",
    // Invoices
    "userauthorizeinvoice",
    "updateinvoicestatus",
    // Jobs and notifications
    "userauthorizationrevoke",
    "templatesendjobfinish",
    "masssendjobfinish",
    "publishjobfinish",
    "poichecknotify",
    "wificonnected",
];

/// Lowercase and strip underscores.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Look up a normalized name in the kind tables.
pub fn class_of(normalized: &str) -> Option<KindClass> {
    if MESSAGE_KINDS.contains(&normalized) {
        Some(KindClass::Message)
    } else if EVENT_KINDS.contains(&normalized) {
        Some(KindClass::Event)
    } else {
        None
    }
}

/// Resolve the routing kind of a message.
///
/// For `MsgType = event` a non-empty `Event` field supersedes the type.
pub fn routing_kind(msg_type: &str, event: Option<&str>) -> String {
    let raw = match event {
        Some(event) if msg_type == "event" && !event.is_empty() => event,
        _ => msg_type,
    };
    normalize(raw)
}

/// What a listener is registered for.
///
/// Lifecycle topics are separate from kinds: a message whose type is
/// literally `error` routes to `Kind("error")`, never to [`Topic::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Runs before the kind listeners.
    Before,
    /// Runs last, even after failures.
    After,
    /// Receives listener failures and deadline misses.
    Error,
    /// Runs when no listener is registered for the kind.
    Default,
    /// A normalized message or event kind.
    Kind(String),
}

impl Topic {
    /// Topic for a message or event kind; the name is normalized.
    pub fn kind(name: &str) -> Self {
        Topic::Kind(normalize(name))
    }

    /// Topic name as used in logs.
    pub fn as_str(&self) -> &str {
        match self {
            Topic::Before => "before",
            Topic::After => "after",
            Topic::Error => "error",
            Topic::Default => "default",
            Topic::Kind(kind) => kind,
        }
    }

    /// Whether this is one of the lifecycle topics.
    pub fn is_lifecycle(&self) -> bool {
        !matches!(self, Topic::Kind(_))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
