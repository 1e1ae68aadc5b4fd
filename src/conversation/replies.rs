//! User-facing reply texts.
//!
//! Everything the bot says outside of generated answers lives here, so the
//! conversation flow stays free of string literals.

use crate::llm::routing::{ModelPreference, ModelProfile, PROFILES};

pub fn welcome(display_name: &str) -> String {
    format!(
        "Xin chào {display_name}! 👋\n\n🤖 Tôi là Gemini Bot trên Zalo. Tôi có thể:\n• Trả lời câu hỏi về mọi chủ đề\n• Viết và giải thích code\n• Dịch thuật đa ngôn ngữ\n• 📸 Phân tích và mô tả ảnh\n• 📄 Đọc và tóm tắt tệp văn bản\n\n💡 Hãy chat bình thường với tôi nhé!\n\n📝 Lệnh hữu ích:\n/help - Xem hướng dẫn\n/model - Chọn model AI\n/clear - Xóa lịch sử chat"
    )
}

pub const HELP: &str = "📚 Hướng dẫn sử dụng Gemini Bot:\n\n🔹 Chat bình thường: gửi bất kỳ câu hỏi nào\n🔹 /start - Khởi động bot và xem giới thiệu\n🔹 /clear - Xóa lịch sử cuộc trò chuyện\n🔹 /model - Xem và chọn model AI\n🔹 /help - Hiển thị hướng dẫn này\n\n💡 Ví dụ:\n• \"Giải thích thuật toán bubble sort\"\n• \"Viết code Python tính giai thừa\"\n• 📸 Gửi ảnh + \"Ảnh này có gì?\"\n• 📄 Gửi tệp .txt + \"Tóm tắt giúp tôi\"\n\n🎯 Bot nhớ ngữ cảnh cuộc trò chuyện để trả lời chính xác hơn!";

pub const CLEARED: &str = "🗑️ Đã xóa lịch sử chat. Bắt đầu cuộc trò chuyện mới!";

pub const GENERATION_FAILED: &str =
    "🤖 Xin lỗi, tôi đang gặp sự cố kỹ thuật. Vui lòng thử lại sau.";

pub const IMAGE_DOWNLOAD_FAILED: &str =
    "🖼️ Xin lỗi, tôi không tải được ảnh này. Vui lòng thử lại sau.";

pub const FILE_DOWNLOAD_FAILED: &str =
    "📄 Xin lỗi, tôi không tải được tệp này. Vui lòng thử lại sau.";

pub const FILE_UNSUPPORTED: &str =
    "📄 Tôi chỉ đọc được tệp văn bản thuần túy (.txt, .md, .csv, .json...). Tệp này tôi chưa đọc được, bạn gửi nội dung dạng văn bản giúp nhé!";

/// Render the `/model` listing with the user's current selection.
pub fn model_listing(preference: Option<&ModelPreference>) -> String {
    let mut text = String::from("🧠 Các model hiện có:\n");
    for profile in PROFILES {
        text.push_str(&format!(
            "• {} — {}: {}\n",
            profile.key, profile.display_label, profile.description
        ));
    }
    text.push_str("• auto — để bot tự chọn theo câu hỏi\n\n");

    let current = match preference {
        Some(ModelPreference::Model(key)) => key.as_str(),
        Some(ModelPreference::Auto) => "auto",
        None => "auto (mặc định)",
    };
    text.push_str(&format!(
        "Đang dùng: {current}\nĐổi model: /model <tên>, ví dụ /model pro"
    ));
    text
}

pub fn model_set(profile: &ModelProfile) -> String {
    format!(
        "✅ Đã chuyển sang {} ({}). Dùng /model auto để bot tự chọn lại.",
        profile.display_label, profile.key
    )
}

pub const MODEL_SET_AUTO: &str =
    "✅ Bot sẽ tự chọn model phù hợp theo từng câu hỏi.";

pub fn unknown_model(key: &str) -> String {
    let keys: Vec<&str> = PROFILES.iter().map(|p| p.key).collect();
    format!(
        "❓ Không có model \"{key}\". Các lựa chọn hợp lệ: {}, auto.",
        keys.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_listing_names_every_profile_and_current_choice() {
        let listing = model_listing(Some(&ModelPreference::Model("pro".into())));
        for profile in PROFILES {
            assert!(listing.contains(profile.key));
        }
        assert!(listing.contains("Đang dùng: pro"));
    }

    #[test]
    fn test_unknown_model_lists_valid_keys() {
        let message = unknown_model("ultra");
        assert!(message.contains("ultra"));
        assert!(message.contains("flash"));
        assert!(message.contains("pro"));
        assert!(message.contains("lite"));
        assert!(message.contains("auto"));
    }
}
