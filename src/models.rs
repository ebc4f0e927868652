//! Domain model for recipes returned by the search collaborator. The types
//! here stay light-weight data holders so other layers can focus on
//! presentation and fetch sequencing. The API layer populates the fixed
//! ingredient slot array at parse time, so nothing downstream ever probes
//! dynamic field names.

use std::fmt;

/// Number of ingredient slots a recipe record can carry. The upstream API
/// exposes exactly twenty numbered name/measure pairs per record.
pub const INGREDIENT_SLOTS: usize = 20;

/// Maximum number of instruction characters shown on a result card before
/// the text is cut off with an ellipsis.
const SUMMARY_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One populated ingredient slot. Slots whose name is blank upstream are
/// represented as `None` in [`Recipe::ingredients`], never as an
/// `Ingredient` with an empty name.
pub struct Ingredient {
    /// Ingredient name as supplied by the API.
    pub name: String,
    /// Free-text measure ("1 cup", "2 tbsp"). May be empty even when the
    /// name is present.
    pub measure: String,
}

impl fmt::Display for Ingredient {
    /// Render the `Name - Measure` pairing used by the detail view.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name, self.measure)
    }
}

#[derive(Debug, Clone, Default)]
/// Immutable snapshot of one recipe record. Owned by the search
/// controller's result list; the detail view clones the selected entry so
/// it survives the result list being replaced by a later fetch.
pub struct Recipe {
    /// Stable identifier from the upstream database.
    pub id: String,
    /// Display name shown on cards and in the modal title.
    pub name: String,
    /// Category label. Rendered as "N/A" when absent.
    pub category: Option<String>,
    /// Thumbnail image URL. The TUI renders it as a caption rather than an
    /// inline image.
    pub thumbnail: Option<String>,
    /// Free-text cooking instructions, also the text handed to the speech
    /// engine.
    pub instructions: Option<String>,
    /// Optional external video link, opened in the default browser.
    pub video_url: Option<String>,
    /// Fixed-size ordered slot array populated at parse time. Index `i`
    /// corresponds to the upstream slot `i + 1`.
    pub ingredients: [Option<Ingredient>; INGREDIENT_SLOTS],
}

impl Recipe {
    /// Derive the displayable ingredient list: only populated slots, in
    /// slot order, each formatted `"<name> - <measure>"`.
    pub fn ingredient_lines(&self) -> Vec<String> {
        self.ingredients
            .iter()
            .flatten()
            .map(Ingredient::to_string)
            .collect()
    }

    /// Category text with the placeholder used when the field is missing.
    pub fn category_label(&self) -> &str {
        match self.category.as_deref() {
            Some(category) if !category.trim().is_empty() => category,
            _ => "N/A",
        }
    }

    /// Short instructions excerpt for result cards. Falls back to a
    /// placeholder so a record without instructions still renders.
    pub fn summary(&self) -> String {
        match self.instructions.as_deref() {
            Some(instructions) if !instructions.trim().is_empty() => {
                let mut excerpt: String = instructions.chars().take(SUMMARY_CHARS).collect();
                excerpt.push_str("...");
                excerpt
            }
            _ => String::from("No description available."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(name: &str, measure: &str) -> Option<Ingredient> {
        Some(Ingredient {
            name: name.to_string(),
            measure: measure.to_string(),
        })
    }

    #[test]
    fn ingredient_lines_keep_only_populated_slots_in_order() {
        let mut recipe = Recipe::default();
        recipe.ingredients[0] = slot("Chicken", "1 whole");
        recipe.ingredients[2] = slot("Salt", "1 tsp");
        recipe.ingredients[4] = slot("Paprika", "2 tbsp");

        let lines = recipe.ingredient_lines();
        assert_eq!(
            lines,
            vec![
                "Chicken - 1 whole".to_string(),
                "Salt - 1 tsp".to_string(),
                "Paprika - 2 tbsp".to_string(),
            ]
        );
    }

    #[test]
    fn ingredient_lines_empty_when_no_slots_populated() {
        let recipe = Recipe::default();
        assert!(recipe.ingredient_lines().is_empty());
    }

    #[test]
    fn category_label_falls_back_to_placeholder() {
        let mut recipe = Recipe::default();
        assert_eq!(recipe.category_label(), "N/A");
        recipe.category = Some("  ".to_string());
        assert_eq!(recipe.category_label(), "N/A");
        recipe.category = Some("Dessert".to_string());
        assert_eq!(recipe.category_label(), "Dessert");
    }

    #[test]
    fn summary_truncates_long_instructions() {
        let mut recipe = Recipe::default();
        recipe.instructions = Some("x".repeat(200));
        let summary = recipe.summary();
        assert_eq!(summary.chars().count(), 83);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn summary_placeholder_when_instructions_missing() {
        let recipe = Recipe::default();
        assert_eq!(recipe.summary(), "No description available.");
    }
}
