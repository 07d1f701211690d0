use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ChatConfig;
use crate::error::Result;
use crate::model::{ChatMessage, EcoAction};
use crate::scope::ViewScope;

pub const GREETING: &str =
    "Hello! I'm your Eco-Assistant. How can I help you with sustainable living today?";

const GREETING_REPLY: &str =
    "Hello! I'm happy to help with any sustainability questions you have today.";
const CARBON_REPLY: &str = "Your carbon footprint is the total amount of greenhouse gases you produce. The average person produces about 12 tons per year. Some ways to reduce it include: using public transportation, reducing meat consumption, and using energy-efficient appliances.";
const WATER_REPLY: &str = "Great question about water conservation! You can save water by taking shorter showers, fixing leaky faucets, installing low-flow fixtures, and collecting rainwater for your garden.";
const PLASTIC_REPLY: &str = "Reducing plastic use is crucial for the environment. Try using reusable bags, water bottles, and containers. For plastics you do use, check local recycling guidelines as they vary by location.";
const ENERGY_REPLY: &str = "To reduce energy usage, consider: switching to LED bulbs, unplugging electronics when not in use, using a programmable thermostat, and washing clothes in cold water.";
const FOOD_REPLY: &str = "Your diet has a significant environmental impact. Consider eating more plant-based meals, buying local and seasonal produce, reducing food waste, and composting organic waste.";
const TRANSPORT_REPLY: &str = "Transportation is a major source of emissions. Consider walking, cycling, carpooling, using public transit, or switching to an electric vehicle if possible.";
const FALLBACK_REPLY: &str = "I'm here to help with sustainable living questions. You can ask about reducing your carbon footprint, saving water, recycling, energy conservation, sustainable diet, or eco-friendly transportation. Or ask for a random eco tip!";

/// Which canned reply an input maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Greeting,
    Carbon,
    Water,
    Plastic,
    Energy,
    Food,
    Transport,
    Tip,
    Fallback,
}

/// Keyword rules, checked in order; the first hit wins.
const RULES: &[(&[&str], Topic)] = &[
    (&["hello", "hi"], Topic::Greeting),
    (&["carbon", "footprint"], Topic::Carbon),
    (&["water", "save water"], Topic::Water),
    (&["plastic", "recycle"], Topic::Plastic),
    (&["energy", "electricity"], Topic::Energy),
    (&["food", "diet"], Topic::Food),
    (&["transport", "car", "travel"], Topic::Transport),
    (&["tip", "advice"], Topic::Tip),
];

/// Plain substring match on the lowercased input, so "hi" also fires inside
/// words like "this" or "which".
pub fn classify(input: &str) -> Topic {
    let lower = input.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, topic)| *topic)
        .unwrap_or(Topic::Fallback)
}

/// Render the reply for `input`. Tip requests pick an action through `rng`.
pub fn respond<R: Rng + ?Sized>(input: &str, actions: &[EcoAction], rng: &mut R) -> String {
    match classify(input) {
        Topic::Greeting => GREETING_REPLY.to_string(),
        Topic::Carbon => CARBON_REPLY.to_string(),
        Topic::Water => WATER_REPLY.to_string(),
        Topic::Plastic => PLASTIC_REPLY.to_string(),
        Topic::Energy => ENERGY_REPLY.to_string(),
        Topic::Food => FOOD_REPLY.to_string(),
        Topic::Transport => TRANSPORT_REPLY.to_string(),
        Topic::Tip if !actions.is_empty() => {
            let action = &actions[rng.gen_range(0..actions.len())];
            tip_reply(action)
        }
        Topic::Tip | Topic::Fallback => FALLBACK_REPLY.to_string(),
    }
}

fn tip_reply(action: &EcoAction) -> String {
    format!(
        "Here's a sustainable tip: {} - {} This can reduce your carbon footprint by approximately {} tons CO₂.",
        action.title, action.description, action.impact.carbon
    )
}

/// A chat transcript, seeded with the assistant's greeting.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    typing: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::bot(GREETING)],
            typing: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// True between a user message and the matching bot reply.
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Append a user message. Blank input is ignored and returns `None`.
    pub fn push_user(&mut self, input: &str) -> Option<ChatMessage> {
        if input.trim().is_empty() {
            return None;
        }
        let message = ChatMessage::user(input);
        self.messages.push(message.clone());
        self.typing = true;
        Some(message)
    }

    pub fn push_bot(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.typing = false;
    }

    /// Clear the typing flag after a reply that never arrived.
    pub fn abandon_reply(&mut self) {
        self.typing = false;
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Produces bot replies after a simulated delay.
pub struct Chatbot {
    delay: Duration,
    rng: Mutex<StdRng>,
}

impl Chatbot {
    pub fn new(delay: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            delay,
            rng: Mutex::new(rng),
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(Duration::from_millis(config.reply_delay_ms), config.seed)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Reply to `input` without waiting.
    pub fn reply_now(&self, input: &str, actions: &[EcoAction]) -> ChatMessage {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        ChatMessage::bot(respond(input, actions, &mut *rng))
    }

    /// Wait out the reply delay inside `scope`, then reply.
    /// Returns `Cancelled` if the scope ends first.
    pub async fn reply(
        &self,
        scope: &ViewScope,
        input: &str,
        actions: &[EcoAction],
    ) -> Result<ChatMessage> {
        let delay = self.delay;
        scope
            .run(async {
                tokio::time::sleep(delay).await;
                Ok(())
            })
            .await?;
        tracing::debug!(topic = ?classify(input), "chat reply");
        Ok(self.reply_now(input, actions))
    }
}
