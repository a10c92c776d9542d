// Prompt templates for the agent scoring collaborator
//
// Prompts are versioned so that scorer decisions recorded in the audit log
// can be traced back to the instructions that produced them.

use std::collections::HashMap;

/// Prompt template structure
pub struct PromptTemplate {
    pub name: String,
    pub version: String,
    pub system: String,
    pub user_template: String,
}

impl PromptTemplate {
    /// Render the user template, replacing every `{{name}}` with its value
    ///
    /// Placeholders without a value are left untouched.
    ///
    /// # Example
    /// ```
    /// use std::collections::HashMap;
    /// use ticketdesk_api::assignment::prompts::PromptTemplate;
    ///
    /// let template = PromptTemplate {
    ///     name: "t".to_string(),
    ///     version: "1".to_string(),
    ///     system: String::new(),
    ///     user_template: "Ticket: {{title}} ({{missing}})".to_string(),
    /// };
    /// let vars = HashMap::from([("title".to_string(), "VPN down".to_string())]);
    /// assert_eq!(template.render(&vars), "Ticket: VPN down ({{missing}})");
    /// ```
    pub fn render(&self, variables: &HashMap<String, String>) -> String {
        let mut out = String::with_capacity(self.user_template.len());
        let mut rest = self.user_template.as_str();

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = after[..end].trim();
                    match variables.get(key) {
                        Some(value) => out.push_str(value),
                        None => out.push_str(&rest[start..start + 2 + end + 2]),
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

pub mod library {
    use super::PromptTemplate;

    pub fn agent_selection() -> PromptTemplate {
        PromptTemplate {
            name: "agent_selection".to_string(),
            version: "1.1.0".to_string(),
            system: "You route customer support tickets to human agents. \
                     Pick exactly one agent from the candidate list and answer in JSON \
                     with the fields success, agent, confidence (0-1), reasoning, method \
                     and estimatedResponseTime."
                .to_string(),
            user_template: "Ticket\n\
                            Title: {{title}}\n\
                            Category: {{category}}\n\
                            Priority: {{priority}}\n\
                            Description: {{description}}\n\n\
                            Candidates (id | name | availability | active tickets | expertise):\n\
                            {{candidates}}\n\n\
                            Prefer agents whose expertise matches the category. \
                            Avoid overloading agents who already carry many active tickets."
                .to_string(),
        }
    }
}
