use crate::responses::ResponseTable;

const PRICE_WORD: &str = "price";

/// What to do with an inbound text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    /// Fetch and reply with the live price report.
    Price,
    /// Reply with a canned text.
    Reply(&'a str),
    Ignore,
}

/// Price requests win over keyword triggers; otherwise the first trigger in
/// table order that occurs in the text.
pub fn route<'a>(table: &'a ResponseTable, text: &str) -> Route<'a> {
    if text.to_lowercase().contains(PRICE_WORD) {
        return Route::Price;
    }

    match table.match_reply(text) {
        Some(reply) => Route::Reply(reply),
        None => Route::Ignore,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Member,
    Pending,
    Left,
    Kicked,
}

/// Only someone becoming a plain member from outside the group is greeted.
/// A member held by membership screening has not been let in yet.
pub fn should_welcome(old: MemberStatus, new: MemberStatus) -> bool {
    matches!(
        old,
        MemberStatus::Left | MemberStatus::Kicked | MemberStatus::Pending
    ) && new == MemberStatus::Member
}

fn screening_status(pending: bool) -> MemberStatus {
    if pending {
        MemberStatus::Pending
    } else {
        MemberStatus::Member
    }
}

/// A join carries no prior state; the user was not in the guild before.
pub fn join_transition(pending: bool) -> (MemberStatus, MemberStatus) {
    (MemberStatus::Left, screening_status(pending))
}

/// Member updates only matter when the screening flag flips. Without the
/// previous member state nothing can be said.
pub fn update_transition(
    was_pending: Option<bool>,
    pending: bool,
) -> Option<(MemberStatus, MemberStatus)> {
    match was_pending {
        Some(was) if was != pending => Some((screening_status(was), screening_status(pending))),
        _ => None,
    }
}
