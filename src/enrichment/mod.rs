//! Year enrichment through a hosted text-generation model.

pub mod client;
pub mod gemini;
pub mod query;
pub mod response;

use std::fmt;

use crate::enrichment::response::GenerateContentResponse;

/// Failure classes a text generator can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// The service asked the caller to slow down (HTTP 429).
    RateLimited,
    /// Any other status returned by the service.
    Service,
    /// Connection, TLS or I/O failure before a status was received.
    Transport,
    /// The service answered with a body that could not be decoded.
    InvalidResponse,
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RateLimited => "rate limited",
            Self::Service => "service error",
            Self::Transport => "transport error",
            Self::InvalidResponse => "invalid response",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind == GenerationErrorKind::RateLimited
    }
}

/// Interface implemented by concrete text-generation backends.
pub trait TextGenerator {
    /// Sends one system instruction plus one user message and returns the raw reply.
    fn generate(
        &self,
        system_prompt: &str,
        user_text: &str,
    ) -> Result<GenerateContentResponse, GenerationError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::{GenerationError, GenerationErrorKind, TextGenerator};
    use crate::enrichment::response::{Candidate, Content, GenerateContentResponse, Part};

    type Reply = Result<GenerateContentResponse, GenerationError>;

    /// Canned generator that records every user message it receives.
    pub(crate) struct StubGenerator {
        handler: Box<dyn Fn(&str) -> Reply>,
        calls: RefCell<Vec<(String, String)>>,
    }

    impl StubGenerator {
        pub(crate) fn new(handler: impl Fn(&str) -> Reply + 'static) -> Self {
            Self {
                handler: Box::new(handler),
                calls: RefCell::new(Vec::new()),
            }
        }

        /// Answers calls with `replies` in order.
        pub(crate) fn sequence(replies: Vec<Reply>) -> Self {
            let queue = RefCell::new(VecDeque::from(replies));
            Self::new(move |_| {
                queue
                    .borrow_mut()
                    .pop_front()
                    .expect("stub generator ran out of replies")
            })
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }

        pub(crate) fn user_messages(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .map(|(_, user_text)| user_text.clone())
                .collect()
        }

        pub(crate) fn system_prompts(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .map(|(system_prompt, _)| system_prompt.clone())
                .collect()
        }
    }

    impl TextGenerator for StubGenerator {
        fn generate(&self, system_prompt: &str, user_text: &str) -> Reply {
            self.calls
                .borrow_mut()
                .push((system_prompt.to_string(), user_text.to_string()));
            (self.handler)(user_text)
        }
    }

    impl TextGenerator for Rc<StubGenerator> {
        fn generate(&self, system_prompt: &str, user_text: &str) -> Reply {
            self.as_ref().generate(system_prompt, user_text)
        }
    }

    pub(crate) fn response_with_parts(parts: Vec<Part>) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content { parts }),
            }],
        }
    }

    pub(crate) fn text_reply(text: &str) -> Reply {
        Ok(response_with_parts(vec![Part::Text {
            text: text.to_string(),
        }]))
    }

    pub(crate) fn error_reply(kind: GenerationErrorKind) -> Reply {
        Err(GenerationError::new(kind, "stubbed failure"))
    }
}
