use super::literal::{Literal, Member, parse_config_module, render_module};
use super::{ConflictNote, ConflictPolicy};
use crate::{RegraphError, Result};

/// `theme.extend` keys merged across fragments. `animation` and `keyframes`
/// together form the animations category.
pub const EXTENSION_CATEGORIES: [&str; 7] = [
    "colors",
    "animation",
    "keyframes",
    "fontFamily",
    "borderRadius",
    "boxShadow",
    "spacing",
];

/// Merges every fragment's theme extensions into the base config and renders
/// the result as a CommonJS config module.
pub fn merge_tailwind(
    base: &str,
    fragments: &[(&str, &str)],
    policy: ConflictPolicy,
    notes: &mut Vec<ConflictNote>,
) -> Result<String> {
    let mut merged = parse_config_module(base)?;

    for (origin, text) in fragments {
        let fragment = parse_config_module(text)?;

        let Some(extend) = fragment.get("theme").and_then(|theme| theme.get("extend")) else {
            tracing::debug!(component = origin, "tailwind fragment has no theme.extend");
            continue;
        };

        for category in EXTENSION_CATEGORIES {
            let Some(incoming) = extend.get(category) else {
                continue;
            };

            let Literal::Object(incoming) = incoming else {
                tracing::warn!(
                    component = origin,
                    category,
                    "tailwind extension is not an object literal, skipping"
                );
                continue;
            };

            let target = extension_members(&mut merged, category)?;
            merge_members(target, incoming, category, origin, policy, notes)?;
        }
    }

    Ok(render_module(&merged))
}

fn extension_members<'a>(config: &'a mut Literal, category: &str) -> Result<&'a mut Vec<Member>> {
    config
        .object_entry("theme")
        .and_then(|theme| theme.object_entry("extend"))
        .and_then(|extend| extend.object_entry(category))
        .and_then(Literal::members_mut)
        .ok_or_else(|| RegraphError::TailwindParse {
            offset: 0,
            reason: format!("base theme.extend.{} is not an object literal", category),
        })
}

fn merge_members(
    target: &mut Vec<Member>,
    incoming: &[Member],
    category: &str,
    origin: &str,
    policy: ConflictPolicy,
    notes: &mut Vec<ConflictNote>,
) -> Result<()> {
    for member in incoming {
        let Member::Pair(key, value) = member else {
            if !target.contains(member) {
                target.push(member.clone());
            }
            continue;
        };

        let existing = target.iter_mut().find_map(|m| match m {
            Member::Pair(k, v) if k == key => Some(v),
            _ => None,
        });

        let Some(existing) = existing else {
            target.push(member.clone());
            continue;
        };

        if existing == value {
            continue;
        }

        match policy {
            ConflictPolicy::FirstWins => {
                tracing::warn!(
                    component = origin,
                    category,
                    key = key.as_str(),
                    "duplicate tailwind extension dropped, earlier definition kept"
                );
            }
            ConflictPolicy::LastWins => {
                tracing::warn!(
                    component = origin,
                    category,
                    key = key.as_str(),
                    "duplicate tailwind extension replaces earlier definition"
                );
                *existing = value.clone();
            }
            ConflictPolicy::Error => {
                return Err(RegraphError::StyleConflict {
                    category: category.to_string(),
                    key: key.clone(),
                });
            }
        }

        notes.push(ConflictNote {
            category: category.to_string(),
            key: key.clone(),
            origin: origin.to_string(),
            policy,
        });
    }

    Ok(())
}
