use anyhow::Result;

use crate::application::Answer;

use super::super::Container;

pub struct AskController<'a> {
    container: &'a Container,
}

impl<'a> AskController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// One text-only turn: retrieve, generate, no speech.
    pub async fn ask(&self, question: String) -> Result<String> {
        let use_case = self.container.answer_use_case()?;
        let answer = use_case.answer(&question, &[]).await?;
        Ok(self.format_answer(&answer))
    }

    fn format_answer(&self, answer: &Answer) -> String {
        let grounding = if answer.grounded {
            format!("grounded on {} documents", answer.context_documents)
        } else {
            "no product context".to_string()
        };
        format!("{}\n\n({})", answer.text, grounding)
    }
}
