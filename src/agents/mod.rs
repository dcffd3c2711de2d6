mod openai;
mod outfit;
pub mod prompts;

pub use openai::OpenAiAgent;
pub use outfit::{OutfitRating, OutfitRecommendation};
