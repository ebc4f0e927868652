use crate::models::Recipe;

/// State behind the detail modal. The recipe is cloned out of the result
/// list when the modal opens, so a fetch replacing the list underneath
/// never changes what the modal shows. The ingredient lines are derived
/// once at open time.
pub(crate) struct DetailView {
    pub(crate) recipe: Recipe,
    pub(crate) ingredients: Vec<String>,
    pub(crate) scroll: u16,
}

impl DetailView {
    pub(crate) fn new(recipe: Recipe) -> Self {
        let ingredients = recipe.ingredient_lines();
        Self {
            recipe,
            ingredients,
            scroll: 0,
        }
    }

    pub(crate) fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub(crate) fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_add(1);
    }
}
