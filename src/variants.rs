//! Expansion of substitution-group recipes into concrete variants

use tracing::debug;

use crate::catalog::Catalog;
use crate::error::{ResolveError, Result};
use crate::models::{ConcreteIngredient, ConcreteRecipe, Ingredient, IngredientKind, Recipe};

/// Expand a recipe into every concrete ingredient list.
///
/// Each substitution slot is replaced by one member of its group; the
/// result is the Cartesian product over all slots, with the last slot
/// varying fastest. Slots whose group cannot be resolved (unknown id or
/// no members) stay literal and count as a single option.
pub fn expand<F>(
    recipe: &Recipe,
    ingredients: &[Ingredient],
    lookup: F,
    max_variants: usize,
) -> Result<Vec<ConcreteRecipe>>
where
    F: FnMut(&str) -> Result<Option<Vec<String>>>,
{
    let options = slot_options(ingredients, lookup)?;

    let count = variant_count(&options);
    if count > max_variants as u128 {
        return Err(ResolveError::TooManyVariants {
            recipe_id: recipe.id.clone(),
            count,
            limit: max_variants,
        });
    }

    let mut variants = Vec::with_capacity(count as usize);
    let mut cursor = vec![0usize; options.len()];

    loop {
        let ingredients = cursor
            .iter()
            .zip(&options)
            .map(|(&i, slot)| slot[i].clone())
            .collect();
        variants.push(concrete(recipe, ingredients));

        // Odometer step, rightmost slot first
        let mut slot = options.len();
        loop {
            if slot == 0 {
                return Ok(variants);
            }
            slot -= 1;
            cursor[slot] += 1;
            if cursor[slot] < options[slot].len() {
                break;
            }
            cursor[slot] = 0;
        }
    }
}

/// The first variant [`expand`] would produce, without enumerating the rest
pub fn first_variant<F>(recipe: &Recipe, ingredients: &[Ingredient], lookup: F) -> Result<ConcreteRecipe>
where
    F: FnMut(&str) -> Result<Option<Vec<String>>>,
{
    let options = slot_options(ingredients, lookup)?;
    let ingredients = options
        .into_iter()
        .filter_map(|slot| slot.into_iter().next())
        .collect();
    Ok(concrete(recipe, ingredients))
}

/// Expand a stored recipe by id
pub fn expand_recipe_variants(
    catalog: &impl Catalog,
    recipe_id: &str,
    max_variants: usize,
) -> Result<Vec<ConcreteRecipe>> {
    let recipe = catalog
        .get_recipe(recipe_id)?
        .ok_or_else(|| ResolveError::recipe_not_found(recipe_id))?;
    let ingredients = catalog.get_recipe_ingredients(recipe_id)?;

    expand(
        &recipe,
        &ingredients,
        |group| catalog.get_substitution_group_members(group),
        max_variants,
    )
}

fn slot_options<F>(ingredients: &[Ingredient], mut lookup: F) -> Result<Vec<Vec<ConcreteIngredient>>>
where
    F: FnMut(&str) -> Result<Option<Vec<String>>>,
{
    let mut options = Vec::with_capacity(ingredients.len());

    for ingredient in ingredients {
        let slot = match &ingredient.kind {
            IngredientKind::Item { item_id, item_name } => vec![ConcreteIngredient {
                item_id: item_id.clone(),
                item_name: item_name.clone(),
                quantity: ingredient.quantity,
                position: ingredient.position,
                is_substitute_group: false,
                substituted_from: None,
            }],
            IngredientKind::Group { group_id } => match lookup(group_id)? {
                Some(members) if !members.is_empty() => members
                    .into_iter()
                    .map(|member| ConcreteIngredient {
                        item_id: member,
                        item_name: None,
                        quantity: ingredient.quantity,
                        position: ingredient.position,
                        is_substitute_group: false,
                        substituted_from: Some(group_id.clone()),
                    })
                    .collect(),
                _ => {
                    debug!(group = %group_id, "unresolved substitution group kept literally");
                    vec![ConcreteIngredient {
                        item_id: group_id.clone(),
                        item_name: None,
                        quantity: ingredient.quantity,
                        position: ingredient.position,
                        is_substitute_group: true,
                        substituted_from: None,
                    }]
                }
            },
        };
        options.push(slot);
    }

    Ok(options)
}

fn variant_count(options: &[Vec<ConcreteIngredient>]) -> u128 {
    options
        .iter()
        .fold(1u128, |acc, slot| acc.saturating_mul(slot.len() as u128))
}

fn concrete(recipe: &Recipe, ingredients: Vec<ConcreteIngredient>) -> ConcreteRecipe {
    ConcreteRecipe {
        recipe_id: recipe.id.clone(),
        output_item_id: recipe.output_item_id.clone(),
        output_quantity: recipe.output_quantity,
        ingredients,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;

    fn recipe() -> Recipe {
        Recipe {
            id: "r_salad".into(),
            output_item_id: "salad".into(),
            output_quantity: 1,
            station: None,
        }
    }

    fn item(position: u32, id: &str, quantity: u64) -> Ingredient {
        Ingredient {
            position,
            quantity,
            kind: IngredientKind::Item {
                item_id: id.into(),
                item_name: None,
            },
        }
    }

    fn group(position: u32, id: &str, quantity: u64) -> Ingredient {
        Ingredient {
            position,
            quantity,
            kind: IngredientKind::Group {
                group_id: id.into(),
            },
        }
    }

    fn groups() -> HashMap<String, Vec<String>> {
        HashMap::from([
            ("AnyLeaf".to_string(), vec!["lettuce".to_string(), "spinach".to_string()]),
            (
                "AnyTomato".to_string(),
                vec!["red".to_string(), "green".to_string(), "cherry".to_string()],
            ),
            ("AnyNothing".to_string(), vec![]),
        ])
    }

    fn lookup(groups: &HashMap<String, Vec<String>>) -> impl FnMut(&str) -> Result<Option<Vec<String>>> + '_ {
        move |id| Ok(groups.get(id).cloned())
    }

    #[test]
    fn product_of_group_sizes() {
        let groups = groups();
        let slots = [group(0, "AnyLeaf", 1), item(1, "oil", 2), group(2, "AnyTomato", 3)];

        let variants = expand(&recipe(), &slots, lookup(&groups), 100).unwrap();
        assert_eq!(variants.len(), 6);

        let distinct: HashSet<Vec<String>> = variants
            .iter()
            .map(|v| v.ingredients.iter().map(|i| i.item_id.clone()).collect())
            .collect();
        assert_eq!(distinct.len(), 6);

        for variant in &variants {
            assert_eq!(variant.ingredients[1].item_id, "oil");
            assert_eq!(variant.ingredients[2].quantity, 3);
            assert_eq!(variant.ingredients[2].position, 2);
            assert!(variant.ingredients.iter().all(|i| !i.is_substitute_group));
        }
        assert_eq!(
            variants[0].ingredients[2].substituted_from.as_deref(),
            Some("AnyTomato")
        );
    }

    #[test]
    fn last_slot_varies_fastest() {
        let groups = groups();
        let slots = [group(0, "AnyLeaf", 1), group(1, "AnyTomato", 1)];

        let variants = expand(&recipe(), &slots, lookup(&groups), 100).unwrap();
        let picks: Vec<(&str, &str)> = variants
            .iter()
            .map(|v| (v.ingredients[0].item_id.as_str(), v.ingredients[1].item_id.as_str()))
            .collect();
        assert_eq!(picks[0], ("lettuce", "red"));
        assert_eq!(picks[1], ("lettuce", "green"));
        assert_eq!(picks[3], ("spinach", "red"));
    }

    #[test]
    fn concrete_recipe_yields_itself() {
        let groups = groups();
        let slots = [item(0, "oil", 1), item(1, "salt", 1)];

        let variants = expand(&recipe(), &slots, lookup(&groups), 1).unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].ingredients.len(), 2);
    }

    #[test]
    fn dangling_and_empty_groups_stay_literal() {
        let groups = groups();
        let slots = [group(0, "AnyGhost", 2), group(1, "AnyNothing", 1), group(2, "AnyLeaf", 1)];

        let variants = expand(&recipe(), &slots, lookup(&groups), 100).unwrap();
        assert_eq!(variants.len(), 2);
        let literal = &variants[0].ingredients[0];
        assert_eq!(literal.item_id, "AnyGhost");
        assert!(literal.is_substitute_group);
        assert!(variants[1].ingredients[1].is_substitute_group);
    }

    #[test]
    fn cap_rejects_oversized_products() {
        let groups = groups();
        let slots = [group(0, "AnyLeaf", 1), group(1, "AnyTomato", 1)];

        let err = expand(&recipe(), &slots, lookup(&groups), 5).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::TooManyVariants { count: 6, limit: 5, .. }
        ));
    }

    #[test]
    fn first_variant_matches_full_expansion() {
        let groups = groups();
        let slots = [group(0, "AnyTomato", 1), item(1, "oil", 1), group(2, "AnyLeaf", 4)];

        let all = expand(&recipe(), &slots, lookup(&groups), 100).unwrap();
        let first = first_variant(&recipe(), &slots, lookup(&groups)).unwrap();
        assert_eq!(first, all[0]);
    }
}
