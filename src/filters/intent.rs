const GREETINGS: &[&str] = &["salut", "bonjour", "hello", "coucou", "hey", "hi"];

const ACKNOWLEDGMENTS: &[&str] = &[
    "ok",
    "okay",
    "d'accord",
    "dac",
    "dacc",
    "c'est bon",
    "cest bon",
    "merci",
    "parfait",
    "super",
    "top",
    "ça marche",
    "ca marche",
];

/// Acknowledgments are only recognised in short messages.
const MAX_ACKNOWLEDGMENT_CHARS: usize = 40;

const GREETING_REPLY: &str = "Salut ! Je suis là pour t'aider avec DigiTickets. Que veux-tu faire ?";
const ACKNOWLEDGMENT_REPLY: &str = "👍 C'est noté. Dites-moi si vous voulez faire une action (créer un ticket, le résoudre, voir vos tickets, etc.).";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedResponse {
    Greeting,
    Acknowledgment,
}

impl CannedResponse {
    pub fn reply(self) -> &'static str {
        match self {
            Self::Greeting => GREETING_REPLY,
            Self::Acknowledgment => ACKNOWLEDGMENT_REPLY,
        }
    }
}

/// Catches small talk before it reaches retrieval.
#[derive(Debug, Clone)]
pub struct IntentFilter {
    greetings: &'static [&'static str],
    acknowledgments: &'static [&'static str],
}

impl IntentFilter {
    pub fn new() -> Self {
        Self {
            greetings: GREETINGS,
            acknowledgments: ACKNOWLEDGMENTS,
        }
    }

    pub fn classify(&self, raw_message: &str) -> Option<CannedResponse> {
        let text = raw_message.trim().to_lowercase();

        if self.greetings.iter().any(|token| is_greeting(&text, token)) {
            return Some(CannedResponse::Greeting);
        }

        if text.chars().count() <= MAX_ACKNOWLEDGMENT_CHARS
            && self.acknowledgments.iter().any(|phrase| text.contains(phrase))
        {
            return Some(CannedResponse::Acknowledgment);
        }

        None
    }
}

impl Default for IntentFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole-word match at either end of the message.
fn is_greeting(text: &str, token: &str) -> bool {
    if text == token {
        return true;
    }
    let starts = text
        .strip_prefix(token)
        .is_some_and(|rest| rest.starts_with(' '));
    let ends = text
        .strip_suffix(token)
        .is_some_and(|rest| rest.ends_with(' '));
    starts || ends
}
