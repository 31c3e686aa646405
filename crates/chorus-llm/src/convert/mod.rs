//! Conversion between canonical types and vendor wire formats
//!
//! Outbound conversions build request messages from the canonical history;
//! inbound conversions turn decoded response bodies and stream chunks into
//! canonical deltas. Reasoning-parameter encoding lives with each adapter.

pub mod anthropic;
pub mod google;
pub mod openai;

use crate::types::{Message, Role};

/// Join system messages into one instruction, for vendors that carry it
/// outside the message list
fn system_instruction(messages: &[Message]) -> Option<String> {
    let parts: Vec<String> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_text())
        .filter(|text| !text.is_empty())
        .collect();

    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

/// Append `item` to the last group if it has the same role, else open a new group
///
/// Vendors that require alternating turns get consecutive same-role
/// messages merged into one.
fn push_grouped<R: PartialEq, T>(groups: &mut Vec<(R, Vec<T>)>, role: R, item: T) {
    match groups.last_mut() {
        Some((last, items)) if *last == role => items.push(item),
        _ => groups.push((role, vec![item])),
    }
}
