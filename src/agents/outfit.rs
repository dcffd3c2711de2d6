use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::AppError;

/// Models quote prices as `"$89"` or as bare numbers.
fn price_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutfitItem {
    #[serde(rename = "type", default)]
    pub item_type: String,
    pub description: String,
    pub color: String,
    #[serde(default)]
    pub style_notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecommendation {
    #[serde(default)]
    pub item: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "price_text")]
    pub price: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutfitRecommendation {
    pub outfit_concept: String,
    pub items: Vec<OutfitItem>,
    #[serde(default)]
    pub color_palette: String,
    #[serde(default)]
    pub occasion_notes: String,
    #[serde(default)]
    pub product_recommendations: Vec<ProductRecommendation>,
}

impl OutfitRecommendation {
    /// Parses model output strictly; anything that is not the expected
    /// JSON object is a parse error.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let parsed: Self =
            serde_json::from_str(raw).map_err(|e| AppError::parse("outfit description", e))?;

        if parsed.outfit_concept.trim().is_empty() {
            return Err(AppError::parse("outfit description", "empty outfit_concept"));
        }
        if parsed.items.is_empty() {
            return Err(AppError::parse("outfit description", "no outfit items"));
        }
        if let Some(pos) = parsed
            .items
            .iter()
            .position(|i| i.description.trim().is_empty() || i.color.trim().is_empty())
        {
            return Err(AppError::parse(
                "outfit description",
                format!("item {} is missing a description or color", pos),
            ));
        }

        let recommendations = parsed.product_recommendations.len();
        if !(5..=8).contains(&recommendations) {
            warn!(
                "Outfit description has {} product recommendations (expected 5-8)",
                recommendations
            );
        }

        Ok(parsed)
    }

    /// Garment text handed to the image model.
    pub fn image_outfit_details(&self) -> String {
        self.items
            .iter()
            .map(|i| format!("{} in {}", i.description, i.color))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingRecommendation {
    #[serde(default)]
    pub item: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "price_text")]
    pub price: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutfitRating {
    pub wow_factor: f64,
    pub occasion_fitness: f64,
    pub overall_rating: f64,
    #[serde(default)]
    pub wow_factor_explanation: String,
    #[serde(default)]
    pub occasion_fitness_explanation: String,
    #[serde(default)]
    pub overall_explanation: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub shopping_recommendations: Vec<ShoppingRecommendation>,
}

impl OutfitRating {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let parsed: Self =
            serde_json::from_str(raw).map_err(|e| AppError::parse("outfit rating", e))?;

        for (name, score) in [
            ("wow_factor", parsed.wow_factor),
            ("occasion_fitness", parsed.occasion_fitness),
            ("overall_rating", parsed.overall_rating),
        ] {
            if !(1.0..=10.0).contains(&score) {
                return Err(AppError::parse(
                    "outfit rating",
                    format!("{} {} is outside 1-10", name, score),
                ));
            }
        }

        Ok(parsed)
    }
}
