use std::time::Duration;

use async_trait::async_trait;
use care_flow::ChatMessage;
use rand::Rng;

use crate::error::PortalResult;
use crate::models::Language;

/// Default simulated reply latency, matching the typing-indicator delay the
/// portal shows while a reply is in flight.
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(1500);

const SYMPTOM_REPLIES_EN: [&str; 5] = [
    "I understand you're experiencing some discomfort. Can you tell me more about when these symptoms started? 🤔",
    "Based on what you've described, it might be helpful to consult with a general practitioner. Would you like me to help you book an appointment? 👩‍⚕️",
    "It's important to stay hydrated and get plenty of rest. Have you been drinking enough water today? 💧",
    "These symptoms could be related to stress or fatigue. Have you been getting enough sleep lately? 😴",
    "I recommend monitoring your symptoms for the next 24-48 hours. If they worsen, please seek medical attention immediately. 🏥",
];

const SYMPTOM_REPLIES_NP: [&str; 5] = [
    "म बुझ्छु कि तपाईं केही असुविधा महसुस गर्दै हुनुहुन्छ। यी लक्षणहरू कहिले देखि सुरु भएको बारेमा अझ बताउन सक्नुहुन्छ? 🤔",
    "तपाईंले वर्णन गर्नुभएको आधारमा, सामान्य चिकित्सकसँग सल्लाह लिनु उपयोगी हुन सक्छ। के म तपाईंलाई अपोइन्टमेन्ट बुक गर्न मद्दत गर्न सक्छु? 👩‍⚕️",
    "हाइड्रेटेड रहनु र पर्याप्त आराम लिनु महत्वपूर्ण छ। के तपाईंले आज पर्याप्त पानी पिउनुभएको छ? 💧",
    "यी लक्षणहरू तनाव वा थकानसँग सम्बन्धित हुन सक्छन्। के तपाईं हालै पर्याप्त निद्रा लिनुभएको छ? 😴",
    "म तपाईंका लक्षणहरू अर्को २४-४८ घण्टासम्म निगरानी गर्न सुझाव दिन्छु। यदि तिनीहरू बिग्रिए भने, कृपया तुरुन्त चिकित्सा सहायता लिनुहोस्। 🏥",
];

/// Greeting returned when a chat session opens. Presentation only: it is
/// not part of the transcript, so replies stay 1:1 with user messages.
pub fn welcome_message(language: Language) -> &'static str {
    match language {
        Language::En => {
            "Hi! I'm your AI health assistant 💖 I'm here to help you understand your symptoms and provide wellness guidance. How are you feeling today?"
        }
        Language::Np => {
            "नमस्ते! म तपाईंको AI स्वास्थ्य सहायक हुँ 💖 म तपाईंका लक्षणहरू बुझ्न र स्वास्थ्य सल्लाह दिन यहाँ छु। आज तपाईं कस्तो महसुस गर्दै हुनुहुन्छ?"
        }
    }
}

/// Everything a reply source may look at when producing the next reply.
pub struct ReplyPrompt<'a> {
    pub language: Language,
    pub user_message: &'a str,
    pub history: &'a [ChatMessage],
}

/// Pluggable source of assistant replies. The chat state machine only
/// depends on this contract, so a real inference backend can replace the
/// scripted pool without touching it.
#[async_trait]
pub trait ReplySource: Send + Sync {
    async fn next_reply(&self, prompt: ReplyPrompt<'_>) -> PortalResult<String>;
}

/// Scripted replies drawn uniformly at random from a fixed per-language
/// pool, after a simulated think delay.
pub struct ScriptedReplySource {
    delay: Duration,
}

impl ScriptedReplySource {
    pub fn new() -> Self {
        Self {
            delay: DEFAULT_REPLY_DELAY,
        }
    }

    /// Override the simulated latency; tests use `Duration::ZERO`.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    fn pool(language: Language) -> &'static [&'static str] {
        match language {
            Language::En => &SYMPTOM_REPLIES_EN,
            Language::Np => &SYMPTOM_REPLIES_NP,
        }
    }
}

impl Default for ScriptedReplySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplySource for ScriptedReplySource {
    async fn next_reply(&self, prompt: ReplyPrompt<'_>) -> PortalResult<String> {
        let pool = Self::pool(prompt.language);
        let reply = {
            let mut rng = rand::rng();
            pool[rng.random_range(0..pool.len())]
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Ok(reply.to_string())
    }
}

#[cfg(feature = "rig")]
pub use llm::LlmReplySource;

#[cfg(feature = "rig")]
mod llm {
    use super::{ReplyPrompt, ReplySource};
    use crate::error::{PortalError, PortalResult};
    use async_trait::async_trait;
    use rig::agent::Agent;
    use rig::client::CompletionClient;
    use rig::completion::Prompt;
    use rig::providers::openrouter;

    const HEALTH_ASSISTANT_PROMPT: &str = "You are a friendly virtual health assistant for a patient portal in Nepal. \
Help users understand their symptoms and give general wellness guidance in the language they write in. \
Always remind them that you provide general information only and that a healthcare professional should be consulted for medical advice.";

    /// Reply source backed by a hosted model, satisfying the same contract
    /// as the scripted pool.
    pub struct LlmReplySource {
        agent: Agent<openrouter::CompletionModel>,
    }

    impl LlmReplySource {
        pub fn from_env() -> anyhow::Result<Self> {
            let api_key = std::env::var("OPENROUTER_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENROUTER_API_KEY not set"))?;
            let client = openrouter::Client::new(&api_key);
            let agent = client
                .agent("openai/gpt-4o-mini")
                .preamble(HEALTH_ASSISTANT_PROMPT)
                .build();
            Ok(Self { agent })
        }
    }

    #[async_trait]
    impl ReplySource for LlmReplySource {
        async fn next_reply(&self, prompt: ReplyPrompt<'_>) -> PortalResult<String> {
            self.agent
                .prompt(prompt.user_message)
                .await
                .map_err(|e| PortalError::ExternalCall(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_replies_come_from_the_language_pool() {
        let source = ScriptedReplySource::with_delay(Duration::ZERO);

        for _ in 0..20 {
            let reply = source
                .next_reply(ReplyPrompt {
                    language: Language::En,
                    user_message: "I have a headache",
                    history: &[],
                })
                .await
                .unwrap();
            assert!(SYMPTOM_REPLIES_EN.contains(&reply.as_str()));
        }

        let reply = source
            .next_reply(ReplyPrompt {
                language: Language::Np,
                user_message: "टाउको दुखेको छ",
                history: &[],
            })
            .await
            .unwrap();
        assert!(SYMPTOM_REPLIES_NP.contains(&reply.as_str()));
    }

    #[test]
    fn welcome_is_localized() {
        assert!(welcome_message(Language::En).starts_with("Hi!"));
        assert!(welcome_message(Language::Np).starts_with("नमस्ते!"));
    }
}
