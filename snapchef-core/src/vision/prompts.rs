//! Prompt templates shared by all providers.

/// Prompt asking whether an image shows food.
///
/// Non-food answers must start with "NO" so `is_food_description` can read them.
pub const CLASSIFY_PROMPT: &str = "Analyze the provided image. If it contains food, return a brief recipe description. If not, respond with 'NO' followed by a 5-word description of the image content.";

/// Render the recipe generation prompt with optional constraints.
pub fn render_recipe_prompt(dietary_preference: &str, cuisine: &str) -> String {
    let mut prompt = String::from(
        r#"I need a recipe for the food item in this image. Please return a single, clean JSON object with the following keys and data types: 'title' (string), 'cuisine' (string), 'dietary_preference' (string), 'cooking_time' (string), 'servings' (string), 'ingredients' (map of ingredient names to quantities), 'instructions' (array of strings), and 'shopping_cart' (map of ingredient names to quantities). The JSON response should be clean and not contain any markdown formatting (e.g., ```json)."#,
    );

    let dietary_preference = dietary_preference.trim();
    if !dietary_preference.is_empty() {
        prompt.push_str(&format!(" The recipe should be {}.", dietary_preference));
    }

    let cuisine = cuisine.trim();
    if !cuisine.is_empty() {
        prompt.push_str(&format!(" The recipe should be {} cuisine.", cuisine));
    }

    prompt
}
