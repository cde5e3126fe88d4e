//! Prompt assembly: context block + instruction template + question.
//!
//! Templates use `{context}`, `{question}` and optionally `{history}`
//! placeholders. They are parsed once, so text inside the question or the
//! retrieved chunks is never interpreted as a placeholder.

use crate::document::{ConversationTurn, Role, SearchResult};
use crate::error::{RagError, Result};

/// Directive telling the generator to decline questions outside the corpus.
pub const DECLINE_DIRECTIVE: &str = "If the question is about a university not in your knowledge base, politely say you only cover these 4 universities.";

/// Directive telling the generator to admit gaps instead of inventing facts.
pub const MISSING_INFO_DIRECTIVE: &str = "If specific information is not in the context, say so honestly and suggest checking the official website.";

/// The instruction template used unless the caller supplies one.
pub const DEFAULT_TEMPLATE: &str = "You are a helpful university admissions assistant for Pakistani students.
You have detailed knowledge about these 4 universities:
1. COMSATS University Islamabad (CUI)
2. NUST - National University of Sciences and Technology
3. UET Lahore - University of Engineering and Technology Lahore
4. QAU - Quaid-i-Azam University Islamabad

Use only the context below to answer the student's question clearly and accurately.
Use bullet points for lists. Be specific with numbers, percentages, and requirements.
If the question is about a university not in your knowledge base, politely say you only cover these 4 universities.
If specific information is not in the context, say so honestly and suggest checking the official website.
{history}
Context:
{context}

Student Question: {question}

Answer:";

/// Separator between chunk texts in the context block.
const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Context,
    Question,
    History,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Slot),
}

/// A parsed instruction template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        // The built-in template is known to contain both required slots.
        Self { segments: parse_segments(DEFAULT_TEMPLATE) }
    }
}

impl PromptTemplate {
    /// Parse a template.
    ///
    /// Unknown `{...}` sequences are kept literally.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] unless the template contains both
    /// `{context}` and `{question}`.
    pub fn parse(template: &str) -> Result<Self> {
        let segments = parse_segments(template);
        for (slot, name) in [(Slot::Context, "{context}"), (Slot::Question, "{question}")] {
            if !segments.contains(&Segment::Slot(slot)) {
                return Err(RagError::Config(format!("prompt template must contain {name}")));
            }
        }
        Ok(Self { segments })
    }

    /// Fill the placeholders.
    pub fn render(&self, context: &str, question: &str, history: &str) -> String {
        let mut out = String::with_capacity(context.len() + question.len() + 1024);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(Slot::Context) => out.push_str(context),
                Segment::Slot(Slot::Question) => out.push_str(question),
                Segment::Slot(Slot::History) => out.push_str(history),
            }
        }
        out
    }
}

fn parse_segments(template: &str) -> Vec<Segment> {
    const SLOTS: [(&str, Slot); 3] = [
        ("{context}", Slot::Context),
        ("{question}", Slot::Question),
        ("{history}", Slot::History),
    ];

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = template;
    while !rest.is_empty() {
        if let Some((name, slot)) = SLOTS.iter().find(|(name, _)| rest.starts_with(name)) {
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Slot(*slot));
            rest = &rest[name.len()..];
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                literal.push(c);
            }
            rest = chars.as_str();
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// Join chunk texts, best first, separated by a blank line.
///
/// Overlapping text from adjacent chunks is kept as is.
pub fn context_block(results: &[SearchResult]) -> String {
    results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Builds the final prompt sent to the generator.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    template: PromptTemplate,
    history_turns: usize,
}

impl PromptAssembler {
    /// Create an assembler using `template`.
    pub fn new(template: PromptTemplate) -> Self {
        Self { template, history_turns: 0 }
    }

    /// Include up to `turns` of the most recent conversation turns in the prompt.
    ///
    /// Zero (the default) ignores history entirely.
    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    /// Assemble the prompt for `question` from the retrieved `results`.
    ///
    /// An empty `results` produces an empty context block; the template's
    /// instructions still apply.
    pub fn assemble(
        &self,
        question: &str,
        results: &[SearchResult],
        history: &[ConversationTurn],
    ) -> String {
        let context = context_block(results);
        let history = self.render_history(history);
        self.template.render(&context, question, &history)
    }

    fn render_history(&self, history: &[ConversationTurn]) -> String {
        if self.history_turns == 0 || history.is_empty() {
            return String::new();
        }

        let recent = &history[history.len().saturating_sub(self.history_turns)..];
        let mut out = String::from("\nConversation so far:\n");
        for turn in recent {
            let speaker = match turn.role {
                Role::User => "Student",
                Role::Assistant => "Assistant",
            };
            out.push_str(speaker);
            out.push_str(": ");
            out.push_str(turn.content.trim());
            out.push('\n');
        }
        out
    }
}
