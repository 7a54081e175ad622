use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Apps the built-in workflows know how to drive.
///
/// Label tables list the English string first and the Vietnamese one second;
/// layouts differ between app versions so every table is a fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialApp {
    Facebook,
    Messenger,
    Zalo,
}

impl SocialApp {
    pub fn package(&self) -> &'static str {
        match self {
            SocialApp::Facebook => "com.facebook.katana",
            SocialApp::Messenger => "com.facebook.orca",
            SocialApp::Zalo => "com.zing.zalo",
        }
    }

    /// Entry point that opens the post composer
    pub fn composer_labels(&self) -> &'static [&'static str] {
        match self {
            SocialApp::Facebook => &[
                "What's on your mind?",
                "Bạn đang nghĩ gì?",
                "Write something",
            ],
            SocialApp::Zalo => &["Hôm nay bạn thế nào?", "How are you today?", "Nhật ký"],
            SocialApp::Messenger => &[],
        }
    }

    pub fn publish_labels(&self) -> &'static [&'static str] {
        match self {
            SocialApp::Facebook => &["POST", "Post", "Đăng"],
            SocialApp::Zalo => &["Đăng", "Post"],
            SocialApp::Messenger => &[],
        }
    }

    pub fn search_labels(&self) -> &'static [&'static str] {
        match self {
            SocialApp::Facebook | SocialApp::Messenger => &["Search", "Tìm kiếm"],
            SocialApp::Zalo => &["Tìm kiếm", "Search"],
        }
    }

    /// Hints of the conversation input box
    pub fn message_hints(&self) -> &'static [&'static str] {
        match self {
            SocialApp::Messenger => &["Message", "Aa", "Nhắn tin"],
            SocialApp::Zalo => &["Tin nhắn", "Message"],
            SocialApp::Facebook => &["Write a comment", "Viết bình luận"],
        }
    }

    pub fn send_labels(&self) -> &'static [&'static str] {
        match self {
            SocialApp::Messenger => &["Send", "Gửi"],
            SocialApp::Zalo => &["Gửi", "Send"],
            SocialApp::Facebook => &["Post", "Đăng", "Send"],
        }
    }

    pub fn all() -> [SocialApp; 3] {
        [SocialApp::Facebook, SocialApp::Messenger, SocialApp::Zalo]
    }
}

impl fmt::Display for SocialApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SocialApp::Facebook => "Facebook",
            SocialApp::Messenger => "Messenger",
            SocialApp::Zalo => "Zalo",
        };
        f.write_str(name)
    }
}

impl FromStr for SocialApp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SocialApp::all()
            .into_iter()
            .find(|app| app.to_string().to_lowercase() == wanted || app.package() == wanted)
            .ok_or_else(|| format!("unsupported app '{s}'"))
    }
}
