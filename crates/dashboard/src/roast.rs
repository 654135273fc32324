use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Success,
    Info,
    Warning,
    Destructive,
}

#[must_use]
pub fn activity_status(days_since_update: i64) -> ActivityStatus {
    match days_since_update {
        days if days > 60 => ActivityStatus::Destructive,
        days if days > 30 => ActivityStatus::Warning,
        days if days > 14 => ActivityStatus::Info,
        _ => ActivityStatus::Success,
    }
}

/// One-liner shown on a dashboard card.
#[must_use]
pub fn card_roast(days_since_update: i64, progress: u8) -> &'static str {
    if days_since_update > 90 && progress < 30 {
        "This project is collecting more dust than your gym membership card."
    } else if days_since_update > 60 && progress < 50 {
        "Your project is aging like milk, not wine. Time to revive it!"
    } else if days_since_update > 30 && progress < 70 {
        "Another day, another excuse not to finish this project."
    } else if days_since_update > 14 {
        "Coffee's getting cold. Time to wake up and code!"
    } else {
        "You're on a roll! Don't stop now!"
    }
}

const SMALL_REPO_KB: u64 = 1000;
const MANY_OPEN_ISSUES: u64 = 5;

/// Paragraph used in the reminder email.
#[must_use]
pub fn email_roast(repo_name: &str, days_since_push: i64, size_kb: u64, open_issues: u64) -> String {
    let mut roast = if days_since_push > 30 {
        format!(
            "Your project \"{repo_name}\" hasn't seen a commit in {days_since_push} days! Even dinosaurs moved faster than your development pace. Is this a project or a digital fossil?"
        )
    } else if days_since_push > 14 {
        format!(
            "Two weeks without a commit to \"{repo_name}\"? Your code must be feeling neglected. Even house plants get more attention!"
        )
    } else if days_since_push > 7 {
        format!(
            "A week without touching \"{repo_name}\"? Your GitHub contribution graph is getting as empty as a developer's social calendar."
        )
    } else if days_since_push > 3 {
        format!(
            "{days_since_push} days since your last commit to \"{repo_name}\". At this rate, you'll finish just in time for the retirement party."
        )
    } else {
        format!(
            "Nice recent activity on \"{repo_name}\", but let's be honest - we both know it won't last. Prove me wrong!"
        )
    };

    if size_kb < SMALL_REPO_KB {
        roast.push_str(&format!(
            " And with only {size_kb}KB? That's not a project, that's a digital sticky note!"
        ));
    }

    if open_issues > MANY_OPEN_ISSUES {
        roast.push_str(&format!(
            " With {open_issues} open issues, you're collecting bugs like they're trading cards."
        ));
    }

    roast
}

#[must_use]
pub fn unavailable_roast(repo_name: &str) -> String {
    format!(
        "I tried to roast your project \"{repo_name}\", but it's so inactive even my roasting algorithm got bored looking at it."
    )
}
