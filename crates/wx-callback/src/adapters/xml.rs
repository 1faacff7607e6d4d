//! XML wire codec.
//!
//! Parsing flattens the document into a `serde_json::Value`: leaf elements
//! become strings (text and CDATA concatenated), elements with children
//! become maps, and repeated siblings become lists. Attributes are ignored.
//! Rendering uses fixed templates with CDATA for free text.

use crate::domain::{AddressedReply, CodecError, Reply, SealedReply};
use crate::ports::WireCodec;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

/// Default [`WireCodec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl XmlCodec {
    /// Create the codec.
    pub fn new() -> Self {
        Self
    }
}

struct Frame {
    name: String,
    text: String,
    children: Map<String, Value>,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            children: Map::new(),
        }
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn into_value(self) -> Value {
        if self.children.is_empty() {
            Value::String(self.text)
        } else {
            Value::Object(self.children)
        }
    }
}

impl WireCodec for XmlCodec {
    fn parse(&self, body: &str) -> Result<Value, CodecError> {
        let mut reader = Reader::from_str(body);
        reader.trim_text(true);

        let mut stack = vec![Frame::new(String::new())];

        loop {
            let event = reader
                .read_event()
                .map_err(|e| CodecError::Syntax(format!("{} at byte {}", e, reader.buffer_position())))?;

            match event {
                Event::Start(start) => {
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    stack.push(Frame::new(name));
                }
                Event::Empty(empty) => {
                    let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.add_child(name, Value::String(String::new()));
                    }
                }
                Event::Text(text) => {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| CodecError::Syntax(e.to_string()))?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&unescaped);
                    }
                }
                Event::CData(cdata) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&cdata));
                    }
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(CodecError::Syntax("unbalanced end tag".into()));
                    }
                    if let Some(frame) = stack.pop() {
                        let name = frame.name.clone();
                        if let Some(parent) = stack.last_mut() {
                            parent.add_child(name, frame.into_value());
                        }
                    }
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype
                _ => {}
            }
        }

        if stack.len() != 1 {
            let open = stack.last().map(|f| f.name.clone()).unwrap_or_default();
            return Err(CodecError::Syntax(format!("unclosed element <{}>", open)));
        }

        let root = stack.pop().map(|f| f.children).unwrap_or_default();
        if root.is_empty() {
            return Err(CodecError::Empty);
        }
        Ok(Value::Object(root))
    }

    fn render_reply(&self, reply: &AddressedReply) -> String {
        let mut xml = String::from("<xml>");
        push_cdata(&mut xml, "ToUserName", &reply.to);
        push_cdata(&mut xml, "FromUserName", &reply.from);
        push_text(&mut xml, "CreateTime", &reply.create_time);
        push_cdata(&mut xml, "MsgType", reply.reply.msg_type());
        push_body(&mut xml, &reply.reply);
        xml.push_str("</xml>");
        xml
    }

    fn render_sealed(&self, sealed: &SealedReply) -> String {
        let mut xml = String::from("<xml>");
        push_cdata(&mut xml, "Encrypt", &sealed.encrypt);
        push_cdata(&mut xml, "MsgSignature", &sealed.signature);
        push_text(&mut xml, "TimeStamp", &sealed.timestamp);
        push_cdata(&mut xml, "Nonce", &sealed.nonce);
        xml.push_str("</xml>");
        xml
    }
}

fn push_body(xml: &mut String, reply: &Reply) {
    match reply {
        Reply::Text { content } => push_cdata(xml, "Content", content),
        Reply::Image { media_id } => {
            xml.push_str("<Image>");
            push_cdata(xml, "MediaId", media_id);
            xml.push_str("</Image>");
        }
        Reply::Voice { media_id } => {
            xml.push_str("<Voice>");
            push_cdata(xml, "MediaId", media_id);
            xml.push_str("</Voice>");
        }
        Reply::Video {
            media_id,
            title,
            description,
        } => {
            xml.push_str("<Video>");
            push_cdata(xml, "MediaId", media_id);
            push_optional(xml, "Title", title);
            push_optional(xml, "Description", description);
            xml.push_str("</Video>");
        }
        Reply::Music(music) => {
            xml.push_str("<Music>");
            push_cdata(xml, "ThumbMediaId", &music.thumb_media_id);
            push_optional(xml, "MusicUrl", &music.music_url);
            push_optional(xml, "HQMusicUrl", &music.hq_music_url);
            push_optional(xml, "Title", &music.title);
            push_optional(xml, "Description", &music.description);
            xml.push_str("</Music>");
        }
        Reply::News { articles } => {
            push_text(xml, "ArticleCount", &articles.len().to_string());
            xml.push_str("<Articles>");
            for article in articles {
                xml.push_str("<item>");
                push_cdata(xml, "Title", &article.title);
                push_cdata(xml, "Description", &article.description);
                push_cdata(xml, "PicUrl", &article.pic_url);
                push_cdata(xml, "Url", &article.url);
                xml.push_str("</item>");
            }
            xml.push_str("</Articles>");
        }
        Reply::TransferCustomerService { account } => {
            if let Some(account) = account.as_deref().filter(|a| !a.is_empty()) {
                xml.push_str("<TransInfo>");
                push_cdata(xml, "KfAccount", account);
                xml.push_str("</TransInfo>");
            }
        }
    }
}

fn push_cdata(xml: &mut String, name: &str, value: &str) {
    // "]]>" cannot appear inside a CDATA section; split it across two
    let value = value.replace("]]>", "]]]]><![CDATA[>");
    xml.push_str(&format!("<{name}><![CDATA[{value}]]></{name}>"));
}

fn push_text(xml: &mut String, name: &str, value: &str) {
    xml.push_str(&format!("<{name}>{}</{name}>", escape(value)));
}

fn push_optional(xml: &mut String, name: &str, value: &Option<String>) {
    if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
        push_cdata(xml, name, value);
    }
}
