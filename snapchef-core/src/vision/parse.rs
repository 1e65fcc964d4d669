//! Turning raw model text into a [`RecipeDraft`].
//!
//! Models are asked for a bare JSON object but routinely wrap it in prose or
//! Markdown fences. Each provider picks a cleanup strategy, then hands the result to
//! [`parse_recipe`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::VisionError;
use crate::types::RecipeDraft;

/// Return the span from the first `{` to the last `}`, if there is one.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if start > end {
        return None;
    }
    Some(&raw[start..=end])
}

/// Strip a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Parse the recipe object. `raw` is the untouched model text, kept for diagnostics.
pub fn parse_recipe(json: &str, raw: &str) -> Result<RecipeDraft, VisionError> {
    let generated: GeneratedRecipe =
        serde_json::from_str(json).map_err(|e| VisionError::MalformedOutput {
            reason: format!("Failed to parse recipe JSON: {}", e),
            raw: raw.to_string(),
        })?;

    if generated.title.trim().is_empty() {
        return Err(VisionError::MalformedOutput {
            reason: "Recipe has no title".to_string(),
            raw: raw.to_string(),
        });
    }

    Ok(RecipeDraft {
        title: generated.title,
        ingredients: generated.ingredients,
        instructions: generated.instructions,
        shopping_cart: generated.shopping_cart,
        cuisine: generated.cuisine,
        dietary_preference: generated.dietary_preference,
        cooking_time: generated.cooking_time,
        servings: generated.servings,
    })
}

/// Locate the outermost object in free text and parse it.
pub fn parse_recipe_in_text(raw: &str) -> Result<RecipeDraft, VisionError> {
    let json = extract_json_object(raw).ok_or_else(|| VisionError::MalformedOutput {
        reason: "No JSON object found in model response".to_string(),
        raw: raw.to_string(),
    })?;
    parse_recipe(json, raw)
}

/// Recipe object as models actually return it: numbers where strings were asked
/// for, nulls, missing keys.
#[derive(Debug, Deserialize)]
struct GeneratedRecipe {
    #[serde(deserialize_with = "text")]
    title: String,
    #[serde(default, deserialize_with = "text")]
    cuisine: String,
    #[serde(default, deserialize_with = "text")]
    dietary_preference: String,
    #[serde(default, deserialize_with = "text")]
    cooking_time: String,
    #[serde(default, deserialize_with = "text")]
    servings: String,
    #[serde(default, deserialize_with = "quantities")]
    ingredients: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "steps")]
    instructions: Vec<String>,
    #[serde(default, deserialize_with = "quantities")]
    shopping_cart: BTreeMap<String, String>,
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Array(items) => items
            .into_iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_to_text)
}

fn quantities<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(map
        .into_iter()
        .map(|(name, quantity)| (name, value_to_text(quantity)))
        .collect())
}

fn steps<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let steps = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(steps.into_iter().map(value_to_text).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE: &str = r#"{"title":"X","ingredients":{"Egg":"2"},"instructions":["Boil"],"shopping_cart":{"Egg":"2"},"cuisine":"French","dietary_preference":"","cooking_time":"10 minutes","servings":"1"}"#;

    #[test]
    fn test_extract_json_object_from_prose() {
        let raw = format!("Sure! Here is your recipe:\n```json\n{}\n```\nEnjoy!", RECIPE);
        assert_eq!(extract_json_object(&raw), Some(RECIPE));
    }

    #[test]
    fn test_extract_json_object_missing() {
        assert_eq!(extract_json_object("I cannot help with that."), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences(&format!("```json\n{}\n```", RECIPE)), RECIPE);
        assert_eq!(strip_code_fences(&format!("```\n{}\n```  ", RECIPE)), RECIPE);
        assert_eq!(strip_code_fences(RECIPE), RECIPE);
    }

    #[test]
    fn test_parse_recipe() {
        let draft = parse_recipe(RECIPE, RECIPE).unwrap();
        assert_eq!(draft.title, "X");
        assert_eq!(draft.ingredients.get("Egg").map(String::as_str), Some("2"));
        assert_eq!(draft.instructions, vec!["Boil".to_string()]);
        assert_eq!(draft.cuisine, "French");
        assert_eq!(draft.cooking_time, "10 minutes");
    }

    #[test]
    fn test_parse_recipe_is_lenient_about_types() {
        let json = r#"{
            "title": "Pancakes",
            "servings": 4,
            "cooking_time": null,
            "dietary_preference": ["vegetarian", "nut-free"],
            "ingredients": {"Eggs": 2, "Milk": "1 cup", "Salt": null},
            "instructions": ["Whisk", 2]
        }"#;
        let draft = parse_recipe(json, json).unwrap();
        assert_eq!(draft.servings, "4");
        assert_eq!(draft.cooking_time, "");
        assert_eq!(draft.dietary_preference, "vegetarian, nut-free");
        assert_eq!(draft.ingredients["Eggs"], "2");
        assert_eq!(draft.ingredients["Salt"], "");
        assert_eq!(draft.instructions, vec!["Whisk".to_string(), "2".to_string()]);
        assert!(draft.shopping_cart.is_empty());
    }

    #[test]
    fn test_parse_recipe_in_text_without_braces_is_malformed() {
        let err = parse_recipe_in_text("I'm sorry, I can't see any food.").unwrap_err();
        match err {
            VisionError::MalformedOutput { raw, .. } => {
                assert_eq!(raw, "I'm sorry, I can't see any food.")
            }
            other => panic!("expected MalformedOutput, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_recipe_invalid_json_is_malformed() {
        let err = parse_recipe_in_text("{title: unquoted}").unwrap_err();
        assert!(matches!(err, VisionError::MalformedOutput { .. }));
    }

    #[test]
    fn test_parse_recipe_requires_title() {
        let err = parse_recipe(r#"{"ingredients": {}}"#, "").unwrap_err();
        assert!(matches!(err, VisionError::MalformedOutput { .. }));

        let err = parse_recipe(r#"{"title": "  "}"#, "").unwrap_err();
        assert!(matches!(err, VisionError::MalformedOutput { .. }));
    }
}
