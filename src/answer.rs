//! Answer generation from retrieved context.
//!
//! Retrieved chunks are joined with blank lines into the `{context}` slot of
//! a fixed Arabic prompt that restricts the model to the supplied context,
//! requires a polite register and an apology when the answer is absent, and
//! asks it to close with an invitation for further questions. The closing
//! line is appended when the model omits it.

use std::sync::Arc;

use crate::llm::ChatModel;
use crate::messages::FOLLOW_UP;
use crate::models::RetrievedChunk;
use crate::provider::ProviderError;

pub const PROMPT_TEMPLATE: &str = "
أنت مساعد ذكي لشركة حكومية سعودية. عليك الرد على استفسارات الموظفين بناءً على الأنظمة واللوائح المرفقة فقط.

قواعد صارمة:
1. كن مهذبًا (استخدم \"حياك الله\"، \"تفضل\")
2. لا ترد على الاستفزازات
3. إذا لم يكن الجواب في المستندات، اعتذر بأدب
4. ختم الرد بـ \"هل لديك استفسار آخر؟\"

السياق: {context}
السؤال: {question}
الرد:
";

/// Fills the template. Placeholders inside the inserted text are left alone.
pub fn render_prompt(context: &[RetrievedChunk], question: &str) -> String {
    let context = context
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let (head, rest) = PROMPT_TEMPLATE
        .split_once("{context}")
        .unwrap_or((PROMPT_TEMPLATE, ""));
    let (middle, tail) = rest.split_once("{question}").unwrap_or((rest, ""));

    let mut prompt = String::with_capacity(PROMPT_TEMPLATE.len() + context.len() + question.len());
    prompt.push_str(head);
    prompt.push_str(&context);
    prompt.push_str(middle);
    prompt.push_str(question);
    prompt.push_str(tail);
    prompt
}

fn ensure_follow_up(answer: String) -> String {
    let trimmed = answer.trim_end();
    if trimmed.ends_with(FOLLOW_UP) {
        trimmed.to_string()
    } else if trimmed.is_empty() {
        FOLLOW_UP.to_string()
    } else {
        format!("{}\n\n{}", trimmed, FOLLOW_UP)
    }
}

#[derive(Clone)]
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub async fn generate(
        &self,
        question: &str,
        context: &[RetrievedChunk],
    ) -> Result<String, ProviderError> {
        let prompt = render_prompt(context, question);
        let answer = self.model.complete(&prompt).await?;
        Ok(ensure_follow_up(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn hit(text: &str) -> RetrievedChunk {
        RetrievedChunk {
            chunk_id: "c".to_string(),
            document_id: "d".to_string(),
            text: text.to_string(),
            score: 1.0,
        }
    }

    struct RecordingModel {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        fn model_name(&self) -> &str {
            "recording"
        }
        async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn prompt_contains_context_and_question() {
        let prompt = render_prompt(
            &[hit("المادة الأولى: الإجازة ثلاثون يوماً"), hit("المادة الثانية")],
            "كم مدة الإجازة؟",
        );
        assert!(prompt.contains("السياق: المادة الأولى: الإجازة ثلاثون يوماً\n\nالمادة الثانية\n"));
        assert!(prompt.contains("السؤال: كم مدة الإجازة؟\n"));
        assert!(prompt.contains("اعتذر بأدب"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn placeholders_in_user_text_are_not_expanded() {
        let prompt = render_prompt(&[hit("{question}")], "literal {context}");
        assert!(prompt.contains("السياق: {question}"));
        assert!(prompt.contains("السؤال: literal {context}"));
    }

    #[test]
    fn follow_up_is_appended_once() {
        assert_eq!(
            ensure_follow_up("حياك الله، المدة ثلاثون يوماً.".to_string()),
            format!("حياك الله، المدة ثلاثون يوماً.\n\n{}", FOLLOW_UP)
        );
        let already = format!("تفضل. {}\n", FOLLOW_UP);
        assert_eq!(ensure_follow_up(already), format!("تفضل. {}", FOLLOW_UP));
    }

    #[tokio::test]
    async fn generate_sends_rendered_prompt() {
        let model = Arc::new(RecordingModel {
            reply: "حياك الله".to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let generator = AnswerGenerator::new(model.clone());

        let answer = generator
            .generate("سؤال", &[hit("سياق")])
            .await
            .unwrap();
        assert!(answer.starts_with("حياك الله"));
        assert!(answer.ends_with(FOLLOW_UP));

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("السياق: سياق"));
    }
}
