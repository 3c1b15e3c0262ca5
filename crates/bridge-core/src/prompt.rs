//! Prompt composition
//!
//! Pure and synchronous: no I/O, no clock, no randomness. A bundle is fully
//! determined by (role, text, passages).

use crate::types::{ContextPassage, PromptBundle, Role};

const PREAMBLE: &str = "Relevant context from prior project material follows.";
const SEPARATOR: &str = "---";

const INSTRUCTION_FOOTER: &str = "Write 2-3 short paragraphs. Be direct. Avoid fluff.";

const DEVELOPER_FOCUS: &str = "Focus on: what changed in the code, implementation detail, \
     dependencies, schema or migration impact, API surface changes, and technical trade-offs.";

const PM_FOCUS: &str = "Focus on: the user problem being solved, user-facing value, workflow \
     impact, and what new capabilities this enables for the product.";

const SUPPORT_FOCUS: &str = "Focus on: what users will notice, questions customers are likely \
     to ask, troubleshooting steps, and talking points for customer conversations.";

/// The system instruction for a role in the closed set.
pub fn instruction_for(role: Role) -> String {
    let focus = match role {
        Role::Developer => DEVELOPER_FOCUS,
        Role::Pm => PM_FOCUS,
        Role::Support => SUPPORT_FOCUS,
    };
    format!(
        "You are a technical translator. Your job is to explain technical content clearly \
         for {} teams.\n\n{}\n\n{}",
        role.as_str(),
        focus,
        INSTRUCTION_FOOTER
    )
}

/// Fallback instruction for role names that do not parse into the closed
/// set. Unreachable through the typed API; kept for wire boundaries that
/// may transmit role values this crate does not know yet.
pub fn generic_instruction() -> String {
    format!(
        "You are a helpful assistant. Summarize the following technical content clearly \
         and concisely.\n\n{INSTRUCTION_FOOTER}"
    )
}

/// Resolve a system instruction from a role name arriving over a wire
/// boundary, falling back to [`generic_instruction`] for unknown names.
pub fn instruction_for_name(name: &str) -> String {
    match Role::parse(name) {
        Some(role) => instruction_for(role),
        None => generic_instruction(),
    }
}

/// Compose the prompt for one (role, text) pair.
///
/// With no passages the user prompt is the source text verbatim. With
/// passages, each is rendered as a `[Context i]:` block in input order,
/// separated by blank lines, followed by a separator and the source text.
pub fn compose(role: Role, text: &str, passages: &[ContextPassage]) -> PromptBundle {
    let user_prompt = if passages.is_empty() {
        text.to_string()
    } else {
        let mut prompt = String::from(PREAMBLE);
        prompt.push_str("\n\n");
        for (i, passage) in passages.iter().enumerate() {
            prompt.push_str(&format!("[Context {}]: {}\n\n", i + 1, passage.content));
        }
        prompt.push_str(SEPARATOR);
        prompt.push_str("\n\n");
        prompt.push_str(text);
        prompt
    };

    PromptBundle {
        system_instruction: instruction_for(role),
        user_prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(content: &str, similarity: f32) -> ContextPassage {
        ContextPassage {
            content: content.to_string(),
            similarity,
        }
    }

    #[test]
    fn empty_passages_pass_text_through_verbatim() {
        let text = "Added caching layer to reduce DB load";
        for role in Role::ALL {
            let bundle = compose(role, text, &[]);
            assert_eq!(bundle.user_prompt, text);
        }
    }

    #[test]
    fn passages_are_rendered_in_input_order() {
        let bundle = compose(
            Role::Pm,
            "the change",
            &[
                passage("first passage", 0.9),
                passage("second passage", 0.7),
                passage("third passage", 0.6),
            ],
        );
        let prompt = &bundle.user_prompt;

        let first = prompt.find("[Context 1]: first passage").unwrap();
        let second = prompt.find("[Context 2]: second passage").unwrap();
        let third = prompt.find("[Context 3]: third passage").unwrap();
        assert!(first < second && second < third);

        let separator = prompt.find("---").unwrap();
        let text = prompt.find("the change").unwrap();
        assert!(third < separator && separator < text);
        assert!(prompt.starts_with(PREAMBLE));
    }

    #[test]
    fn each_role_gets_its_own_instruction() {
        let dev = instruction_for(Role::Developer);
        let pm = instruction_for(Role::Pm);
        let support = instruction_for(Role::Support);

        assert!(dev.contains("Developer teams"));
        assert!(dev.contains("technical trade-offs"));
        assert!(pm.contains("PM teams"));
        assert!(pm.contains("user-facing value"));
        assert!(support.contains("Support teams"));
        assert!(support.contains("troubleshooting steps"));
        assert_ne!(dev, pm);
        assert_ne!(pm, support);
    }

    #[test]
    fn unknown_role_names_fall_back_to_generic_instruction() {
        assert_eq!(instruction_for_name("designer"), generic_instruction());
        assert_eq!(instruction_for_name(""), generic_instruction());
        assert_eq!(
            instruction_for_name("developer"),
            instruction_for(Role::Developer)
        );
    }

    #[test]
    fn composition_is_deterministic() {
        let passages = vec![passage("prior work", 0.8)];
        let a = compose(Role::Support, "text", &passages);
        let b = compose(Role::Support, "text", &passages);
        assert_eq!(a, b);
    }
}
