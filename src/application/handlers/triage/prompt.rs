//! Prompt construction for issue classification.

use crate::domain::issue::{ClassificationResult, UpstreamIssue};
use crate::ports::StructuredPrompt;

/// Builds the classification prompt for one upstream issue.
///
/// `repository` is the `owner/name` of the watched repository. The issue's
/// comment thread is embedded when it has been fetched.
pub fn build_triage_prompt(repository: &str, issue: &UpstreamIssue) -> StructuredPrompt {
    let system = format!(
        "You are an AI assistant helping to triage GitHub issues for the {repository} repository.\n\
         Classify the issue you are given and fill in the result fields as follows:\n\
         - Do not fill in the id field.\n\
         - Use the reasoning field to explain why you classified the issue the way you did.\n\
         - Use the summary field for a short summary of the issue body and its conversation.\n\
         - Always leave isTriaged set to false."
    );

    StructuredPrompt::new(
        system,
        render_issue(issue),
        "ClassificationResult",
        ClassificationResult::json_schema(),
    )
}

fn render_issue(issue: &UpstreamIssue) -> String {
    let mut text = String::new();
    text.push_str(&format!("Issue Title: {}\n", issue.title));
    text.push_str(&format!(
        "Issue Body: {}\n",
        issue.body.as_deref().unwrap_or("(empty)")
    ));
    text.push_str(&format!("Issue Labels: {}\n", issue.labels.join(", ")));

    let comment_count = issue.comment_count.max(issue.comments.len() as u32);
    text.push_str(&format!("Issue Comments ({comment_count}):\n"));
    for comment in &issue.comments {
        text.push_str(&format!("- {}: {}\n", comment.author, comment.body.trim()));
    }

    text.push_str(&format!("Issue URL: {}\n", issue.url));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::issue::IssueComment;

    fn issue() -> UpstreamIssue {
        UpstreamIssue::new(42, "Crash on start", "https://github.com/o/r/issues/42")
            .with_body("It crashes.")
            .with_label("bug")
            .with_label("untriaged")
            .with_comment(IssueComment::new("alice", "Same for me"))
    }

    #[test]
    fn system_prompt_names_repository_and_rules() {
        let prompt = build_triage_prompt("o/r", &issue());

        assert!(prompt.system.contains("for the o/r repository"));
        assert!(prompt.system.contains("Do not fill in the id field"));
        assert!(prompt.system.contains("reasoning field"));
        assert!(prompt.system.contains("summary field"));
        assert!(prompt.system.contains("isTriaged set to false"));
        assert_eq!(prompt.shape_name, "ClassificationResult");
    }

    #[test]
    fn user_message_embeds_issue_fields() {
        let prompt = build_triage_prompt("o/r", &issue());

        assert!(prompt.user.contains("Issue Title: Crash on start"));
        assert!(prompt.user.contains("Issue Body: It crashes."));
        assert!(prompt.user.contains("Issue Labels: bug, untriaged"));
        assert!(prompt.user.contains("Issue Comments (1):"));
        assert!(prompt.user.contains("- alice: Same for me"));
        assert!(prompt.user.contains("Issue URL: https://github.com/o/r/issues/42"));
    }

    #[test]
    fn empty_body_is_marked() {
        let bare = UpstreamIssue::new(1, "t", "u");
        let prompt = build_triage_prompt("o/r", &bare);
        assert!(prompt.user.contains("Issue Body: (empty)"));
        assert!(prompt.user.contains("Issue Comments (0):"));
    }
}
