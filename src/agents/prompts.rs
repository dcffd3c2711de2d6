pub const DEFAULT_OCCASION: &str = "Casual Outing";

const RUNWAY_BACKGROUND: &str =
    "professional fashion runway catwalk stage with dramatic lighting and elegant backdrop";

pub fn rating_prompt(occasion: &str, budget: &str) -> String {
    let budget_text = if budget.is_empty() {
        String::new()
    } else {
        format!(" with a budget of {}", budget)
    };

    format!(
        r#"Analyze this outfit for a {occasion}{budget_text}.

Please provide:
1. Wow Factor Score (1-10): Rate the overall visual impact and style
2. Occasion Fitness Score (1-10): How appropriate is this for {occasion}?
3. Overall Rating (1-10): Combined assessment

Then provide detailed feedback including:
- Strengths of the outfit
- Areas for improvement
- Specific suggestions for colors, fit, accessories
- 3-5 shopping recommendations with descriptions

Format your response as JSON with this structure:
{{
  "wow_factor": <number>,
  "occasion_fitness": <number>,
  "overall_rating": <number>,
  "wow_factor_explanation": "<brief explanation>",
  "occasion_fitness_explanation": "<brief explanation>",
  "overall_explanation": "<brief explanation>",
  "strengths": ["<strength1>", "<strength2>", ...],
  "improvements": ["<improvement1>", "<improvement2>", ...],
  "suggestions": ["<suggestion1>", "<suggestion2>", ...],
  "shopping_recommendations": [
    {{
      "item": "<item name>",
      "description": "<description>",
      "price": "<estimated price>",
      "reason": "<why this would enhance the outfit>"
    }}
  ]
}}"#
    )
}

pub fn style_descriptor(wow_factor: u8) -> &'static str {
    match wow_factor {
        0..=3 => "classic, safe, and timeless",
        4..=6 => "balanced, stylish, and modern",
        _ => "bold, creative, and fashion-forward",
    }
}

pub struct OutfitPreferences<'a> {
    pub occasion: &'a str,
    pub wow_factor: u8,
    pub brands: &'a [String],
    pub budget: &'a str,
    pub conditions: &'a str,
}

pub fn outfit_description_prompt(prefs: &OutfitPreferences<'_>) -> String {
    let occasion = prefs.occasion;
    let wow_factor = prefs.wow_factor;
    let style_desc = style_descriptor(wow_factor);
    let brand_text = if prefs.brands.is_empty() {
        String::new()
    } else {
        format!(" from brands like {}", prefs.brands.join(", "))
    };
    let budget_text = if prefs.budget.is_empty() {
        String::new()
    } else {
        format!(" within a budget of {}", prefs.budget)
    };
    let conditions_text = if prefs.conditions.is_empty() {
        String::new()
    } else {
        format!(" Additional requirements: {}.", prefs.conditions)
    };

    format!(
        r#"Create a detailed outfit recommendation for {occasion}.

Style level: {wow_factor}/10 ({style_desc})
Preferences:{brand_text}{budget_text}
{conditions_text}

Provide:
1. Complete outfit description (top, bottom, shoes, accessories)
2. Color palette and why it works
3. Style notes and occasion appropriateness
4. 5-8 specific product recommendations with:
   - Item type and description
   - Estimated price
   - Why it fits the outfit

Format as JSON:
{{
  "outfit_concept": "<overall concept and inspiration>",
  "items": [
    {{
      "type": "<item type>",
      "description": "<detailed description>",
      "color": "<color>",
      "style_notes": "<why this works>"
    }}
  ],
  "color_palette": "<description of colors and why they work>",
  "occasion_notes": "<why this works for the occasion>",
  "product_recommendations": [
    {{
      "item": "<item name>",
      "type": "<clothing type>",
      "brand": "<suggested brand>",
      "description": "<description>",
      "price": "<estimated price>",
      "reason": "<why recommended>"
    }}
  ]
}}"#
    )
}

/// Scene rendered behind the person for a given occasion.
pub fn background_for_occasion(occasion: &str) -> &'static str {
    match occasion {
        "Job Interview" => "professional office lobby with modern corporate interior",
        "Casual Outing" => "trendy urban street with stylish storefronts and natural daylight",
        "Formal Event" => "elegant ballroom with chandeliers and sophisticated ambiance",
        "Date Night" => "upscale restaurant interior with romantic lighting",
        "Business Meeting" => "contemporary conference room with glass walls",
        "Wedding" => "beautiful outdoor garden venue with floral decorations",
        "Beach Trip" => "pristine sandy beach with turquoise ocean water",
        "Gym/Sports" => "modern fitness center or outdoor athletic track",
        "Party/Club" => "stylish nightclub interior with ambient lighting",
        "Travel" => "airport terminal or scenic travel destination",
        _ => RUNWAY_BACKGROUND,
    }
}

pub fn image_edit_prompt(outfit: &str, occasion: &str, background: &str) -> String {
    format!(
        "Transform this person wearing {outfit}. \n\
         Setting: {background}. \n\
         Occasion: {occasion}. \n\
         Keep the same person's face and features exactly as in the original image. \
         Natural pose appropriate for {occasion}, facial expression matching the formality. \n\
         Photorealistic, professional fashion photography, magazine quality, \
         3/4 body shot with professional studio lighting."
    )
}
