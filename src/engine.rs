//! # Transition Engine Module
//!
//! The conversation state machine: maps (persisted state, inbound text)
//! to (next state, render instruction). Text never carries intent beyond
//! literal membership in the startup name snapshot — there is no parsing
//! here, only an ordered decision list and a step dispatch.
//!
//! Step layout: `0` greeting, `1` category menu, `2` item menu, `3` and
//! above item detail. There is no terminal step; the funnel is a loop
//! the user re-enters by sending any recognized text.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::catalog::{self, CatalogSnapshot, Category, Goods};
use crate::state::{self, UserConversation};

/// Keyword that triggers back-navigation when contained in a message,
/// case-insensitively. All back buttons carry it in their label.
pub const BACK_KEYWORD: &str = "back";

/// Label of the single choice offered with the greeting
pub const VIEW_ASSORTMENT_LABEL: &str = "View the assortment";
/// Back button shown on the category menu
pub const BACK_TO_INTRO_LABEL: &str = "Back to the community description";
/// Back button shown on the item menu
pub const BACK_TO_CATEGORIES_LABEL: &str = "Back to categories";
/// Back button shown with an item detail
pub const BACK_TO_ITEMS_LABEL: &str = "Back to items";

/// Greeting text used when step 0 has no seeded prompt
pub const DEFAULT_GREETING: &str = "Hello! You can browse our assortment.";
/// Category menu text used when step 1 has no seeded prompt
pub const DEFAULT_CATEGORY_PROMPT: &str = "Here is what we can do:";

const CATEGORY_REPROMPT: &str = "Please pick a category first:";
const UNKNOWN_ITEM_APOLOGY: &str = "Sorry, that one is not on our shelves. Have a look at these:";

/// The four funnel steps. Any persisted state of 3 or more is the item
/// detail step; the value itself is not bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunnelStep {
    Greeting,
    CategoryMenu,
    ItemMenu,
    ItemDetail,
}

impl FunnelStep {
    pub fn from_state(state: i64) -> Self {
        match state {
            i64::MIN..=0 => FunnelStep::Greeting,
            1 => FunnelStep::CategoryMenu,
            2 => FunnelStep::ItemMenu,
            _ => FunnelStep::ItemDetail,
        }
    }
}

/// What one inbound message asks the funnel to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavAction {
    /// Step back one funnel step
    Back,
    /// Advance and bind the named category
    SelectCategory(String),
    /// Advance towards the detail step of a just-picked item
    SelectItem,
    /// Text matched nothing; hold position and re-prompt
    Stay,
}

/// Classify inbound text against the name snapshot.
///
/// Exactly one action comes out; earlier predicates win. Back-navigation
/// outranks a category name, which outranks an item name, so a label
/// that happens to sit in more than one set behaves predictably.
pub fn classify(text: &str, snapshot: &CatalogSnapshot) -> NavAction {
    if text.to_lowercase().contains(BACK_KEYWORD) {
        return NavAction::Back;
    }
    if snapshot.category_names.iter().any(|name| name == text) {
        return NavAction::SelectCategory(text.to_string());
    }
    if snapshot.item_names.iter().any(|name| name == text) {
        return NavAction::SelectItem;
    }
    NavAction::Stay
}

/// One outbound message: text, a choice keyboard (one labeled button per
/// row), and an optional photo. The transport adapter turns this into
/// exactly one platform send.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub button_rows: Vec<Vec<String>>,
    pub photo: Option<Vec<u8>>,
}

impl Reply {
    fn text_only(text: String, button_rows: Vec<Vec<String>>) -> Self {
        Self {
            text,
            button_rows,
            photo: None,
        }
    }
}

/// Result of a full turn: the committed conversation row and the reply
/// to render. The state mutation is already durable by the time this is
/// returned; a lost send leaves the store ahead of the user, and their
/// next message simply continues from the new step.
#[derive(Debug)]
pub struct TurnOutcome {
    pub conv: UserConversation,
    pub reply: Reply,
}

fn greeting_reply(prompt: Option<String>) -> Reply {
    Reply::text_only(
        prompt.unwrap_or_else(|| DEFAULT_GREETING.to_string()),
        vec![vec![VIEW_ASSORTMENT_LABEL.to_string()]],
    )
}

fn category_menu_reply(prompt: Option<String>, names: &[String], reprompt: bool) -> Reply {
    let base = prompt.unwrap_or_else(|| DEFAULT_CATEGORY_PROMPT.to_string());
    let text = if reprompt {
        format!("{CATEGORY_REPROMPT}\n{base}")
    } else {
        base
    };

    let mut rows: Vec<Vec<String>> = names.iter().map(|name| vec![name.clone()]).collect();
    rows.push(vec![BACK_TO_INTRO_LABEL.to_string()]);

    Reply::text_only(text, rows)
}

fn item_menu_reply(category: &Category, items: &[Goods], apology: bool) -> Reply {
    let text = if apology {
        format!("{UNKNOWN_ITEM_APOLOGY}\n{}", category.description)
    } else {
        category.description.clone()
    };

    let mut rows: Vec<Vec<String>> = items.iter().map(|item| vec![item.name.clone()]).collect();
    rows.push(vec![BACK_TO_CATEGORIES_LABEL.to_string()]);

    Reply::text_only(text, rows)
}

fn item_detail_reply(item: &Goods) -> Reply {
    Reply {
        text: format!("{}\n{}", item.name, item.description),
        button_rows: vec![vec![BACK_TO_ITEMS_LABEL.to_string()]],
        photo: Some(item.image.clone()),
    }
}

/// Run one turn for one user: load (or lazily create) their state, apply
/// the navigation the text asks for, and build the reply for the step
/// they land on. Every state mutation commits before this returns.
pub async fn run_turn(
    pool: &SqlitePool,
    snapshot: &CatalogSnapshot,
    user_id: i64,
    text: &str,
) -> Result<TurnOutcome> {
    let conv = state::load_or_create(pool, user_id).await?;

    let action = classify(text, snapshot);
    debug!(user_id, state = conv.state, action = ?action, "navigation decision");

    let conv = match &action {
        NavAction::Back => state::retreat(pool, conv).await?,
        NavAction::SelectCategory(name) => state::advance(pool, conv, Some(name.as_str())).await?,
        NavAction::SelectItem => state::advance(pool, conv, None).await?,
        NavAction::Stay => conv,
    };

    match FunnelStep::from_state(conv.state) {
        FunnelStep::Greeting => {
            // The greeting advances itself after being shown once; a user
            // cannot linger at step 0.
            let conv = state::advance(pool, conv, None).await?;
            let prompt = catalog::prompt_for_step(pool, 0).await?;
            Ok(TurnOutcome {
                conv,
                reply: greeting_reply(prompt),
            })
        }
        FunnelStep::CategoryMenu => {
            let prompt = catalog::prompt_for_step(pool, 1).await?;
            Ok(TurnOutcome {
                conv,
                reply: category_menu_reply(prompt, &snapshot.category_names, false),
            })
        }
        FunnelStep::ItemMenu => match resolve_category(pool, &conv).await? {
            Some(category) => {
                let items = catalog::items_in_category(pool, category.id).await?;
                Ok(TurnOutcome {
                    conv,
                    reply: item_menu_reply(&category, &items, false),
                })
            }
            None => recover_to_category_menu(pool, snapshot, conv).await,
        },
        FunnelStep::ItemDetail => {
            if let Some(item) = catalog::item_by_name(pool, text).await? {
                return Ok(TurnOutcome {
                    conv,
                    reply: item_detail_reply(&item),
                });
            }
            // No item carries that name. Hold the step and show the
            // current category's shelf again.
            match resolve_category(pool, &conv).await? {
                Some(category) => {
                    let items = catalog::items_in_category(pool, category.id).await?;
                    Ok(TurnOutcome {
                        conv,
                        reply: item_menu_reply(&category, &items, true),
                    })
                }
                None => recover_to_category_menu(pool, snapshot, conv).await,
            }
        }
    }
}

async fn resolve_category(
    pool: &SqlitePool,
    conv: &UserConversation,
) -> Result<Option<Category>> {
    match conv.category_id {
        Some(id) => catalog::category_by_id(pool, id).await,
        None => Ok(None),
    }
}

/// A conversation reached an item step without a resolvable category.
/// Put the user back at the category menu and re-prompt instead of
/// failing the turn.
async fn recover_to_category_menu(
    pool: &SqlitePool,
    snapshot: &CatalogSnapshot,
    conv: UserConversation,
) -> Result<TurnOutcome> {
    warn!(
        user_id = conv.user_id,
        state = conv.state,
        category_id = ?conv.category_id,
        "conversation has no resolvable category; resetting to category menu"
    );

    let conv = state::reset_to_category_menu(pool, conv).await?;
    let prompt = catalog::prompt_for_step(pool, 1).await?;
    Ok(TurnOutcome {
        conv,
        reply: category_menu_reply(prompt, &snapshot.category_names, true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            category_names: vec!["Cakes".to_string(), "Cookies".to_string()],
            item_names: vec!["WiseMan".to_string(), "Ginger".to_string()],
        }
    }

    #[test]
    fn test_funnel_step_mapping() {
        assert_eq!(FunnelStep::from_state(0), FunnelStep::Greeting);
        assert_eq!(FunnelStep::from_state(1), FunnelStep::CategoryMenu);
        assert_eq!(FunnelStep::from_state(2), FunnelStep::ItemMenu);
        assert_eq!(FunnelStep::from_state(3), FunnelStep::ItemDetail);
        assert_eq!(FunnelStep::from_state(17), FunnelStep::ItemDetail);
        // Legacy rows from before the floor clamp still render the greeting
        assert_eq!(FunnelStep::from_state(-2), FunnelStep::Greeting);
    }

    #[test]
    fn test_classify_back_is_case_insensitive_containment() {
        let snap = snapshot();
        assert_eq!(classify("back", &snap), NavAction::Back);
        assert_eq!(classify("Back to categories", &snap), NavAction::Back);
        assert_eq!(classify("take me BACK please", &snap), NavAction::Back);
    }

    #[test]
    fn test_classify_category_and_item() {
        let snap = snapshot();
        assert_eq!(
            classify("Cakes", &snap),
            NavAction::SelectCategory("Cakes".to_string())
        );
        assert_eq!(classify("Ginger", &snap), NavAction::SelectItem);
    }

    #[test]
    fn test_classify_requires_exact_names() {
        let snap = snapshot();
        assert_eq!(classify("cakes", &snap), NavAction::Stay);
        assert_eq!(classify("Cakes ", &snap), NavAction::Stay);
        assert_eq!(classify("hello", &snap), NavAction::Stay);
    }

    #[test]
    fn test_classify_priority_back_wins() {
        // A category that happens to contain the keyword is still a
        // back-navigation; earlier predicates win.
        let snap = CatalogSnapshot {
            category_names: vec!["Backgammon boards".to_string()],
            item_names: vec![],
        };
        assert_eq!(classify("Backgammon boards", &snap), NavAction::Back);
    }

    #[test]
    fn test_classify_category_outranks_item() {
        let snap = CatalogSnapshot {
            category_names: vec!["Ginger".to_string()],
            item_names: vec!["Ginger".to_string()],
        };
        assert_eq!(
            classify("Ginger", &snap),
            NavAction::SelectCategory("Ginger".to_string())
        );
    }

    #[test]
    fn test_greeting_reply_fallback() {
        let reply = greeting_reply(None);
        assert_eq!(reply.text, DEFAULT_GREETING);
        assert_eq!(reply.button_rows, vec![vec![VIEW_ASSORTMENT_LABEL.to_string()]]);
        assert!(reply.photo.is_none());

        let reply = greeting_reply(Some("Welcome!".to_string()));
        assert_eq!(reply.text, "Welcome!");
    }

    #[test]
    fn test_category_menu_reply_lists_all_names() {
        let snap = snapshot();
        let reply = category_menu_reply(None, &snap.category_names, false);
        assert_eq!(reply.text, DEFAULT_CATEGORY_PROMPT);
        assert_eq!(reply.button_rows.len(), 3);
        assert_eq!(reply.button_rows[0], vec!["Cakes".to_string()]);
        assert_eq!(reply.button_rows[1], vec!["Cookies".to_string()]);
        assert_eq!(
            reply.button_rows[2],
            vec![BACK_TO_INTRO_LABEL.to_string()]
        );
    }

    #[test]
    fn test_every_back_label_triggers_back() {
        let snap = snapshot();
        for label in [
            BACK_TO_INTRO_LABEL,
            BACK_TO_CATEGORIES_LABEL,
            BACK_TO_ITEMS_LABEL,
        ] {
            assert_eq!(classify(label, &snap), NavAction::Back, "label: {label}");
        }
        // The greeting choice is deliberately not a recognized token; it
        // falls through to Stay and re-renders the current step.
        assert_eq!(classify(VIEW_ASSORTMENT_LABEL, &snap), NavAction::Stay);
    }
}
