//! Prompt assembly for generation calls.

use crate::conversation::session::{PROMPT_WINDOW_TURNS, Role, Turn};

/// Fixed system instruction prefixed to every generation call.
///
/// Zalo renders plain text only, so the instruction forbids markdown up
/// front instead of relying on the output normalizer alone.
const SYSTEM_INSTRUCTION: &str = "Bạn là một AI assistant thông minh và thân thiện tên là Gemini Bot, đang trò chuyện với người dùng trên Zalo. Hãy trả lời bằng tiếng Việt một cách tự nhiên.

QUAN TRỌNG: Trả lời bằng văn bản thuần túy, KHÔNG dùng định dạng markdown như **, *, #, backtick hay [liên kết](url) vì Zalo chỉ hiển thị văn bản thường. Dùng emoji để làm đẹp tin nhắn thay cho markdown. Không mở đầu câu trả lời bằng lời tự giới thiệu bản thân.

Bạn có thể giúp viết code, giải thích kiến thức, dịch thuật và nhiều việc khác.";

/// Note appended when the call carries an image, so the model grounds its
/// answer in the picture.
const IMAGE_NOTE: &str =
    "Người dùng đã gửi kèm một hình ảnh. Hãy phân tích ảnh và trả lời dựa trên nội dung ảnh.";

/// Attachment accompanying one turn. Image and extracted file text are
/// mutually exclusive per call.
#[derive(Debug, Clone)]
pub enum EventAttachment {
    Image { bytes: Vec<u8>, media_type: String },
    FileText { file_name: String, content: String },
}

/// Inline image payload for a multi-part generation call.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

/// A fully composed generation request. Ephemeral; discarded after the call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image: Option<InlineImage>,
}

/// Build the generation request from session history and the current input.
///
/// Pure data transformation over already-validated inputs. Only the most
/// recent [`PROMPT_WINDOW_TURNS`] turns are threaded in, even when the
/// stored history holds more.
pub fn compose(
    history: &[Turn],
    input: &str,
    attachment: Option<EventAttachment>,
) -> GenerationRequest {
    let mut prompt = String::from(SYSTEM_INSTRUCTION);
    prompt.push_str("\n\n");

    if !history.is_empty() {
        let window_start = history.len().saturating_sub(PROMPT_WINDOW_TURNS);
        prompt.push_str("Lịch sử cuộc trò chuyện:\n");
        for turn in &history[window_start..] {
            let label = match turn.role {
                Role::User => "Người dùng",
                Role::Assistant => "Bot",
            };
            prompt.push_str(label);
            prompt.push_str(": ");
            prompt.push_str(&turn.content);
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    let mut image = None;
    match attachment {
        Some(EventAttachment::FileText { file_name, content }) => {
            prompt.push_str(&format!(
                "Nội dung tệp \"{file_name}\" người dùng gửi kèm:\n---\n{content}\n---\n\n"
            ));
        }
        Some(EventAttachment::Image { bytes, media_type }) => {
            image = Some(InlineImage { bytes, media_type });
        }
        None => {}
    }

    prompt.push_str("Câu hỏi hiện tại: ");
    prompt.push_str(input);

    if image.is_some() {
        prompt.push_str("\n\n");
        prompt.push_str(IMAGE_NOTE);
    }

    GenerationRequest { prompt, image }
}
