//! System prompt composition.
//!
//! The effective system prompt is assembled from four parts in a fixed
//! order: tool-descriptions block, tool-reading notice, user base
//! instructions, Markdown-formatting notice. Without enabled tools only
//! the last two apply. Composition never fails; every missing input has
//! a fallback.

use std::collections::BTreeMap;

use toolchat_config::PromptTemplates;
use toolchat_core::tool::ToolDescriptor;

use crate::parser::CommandSyntax;

const TOOL_READING_NOTICE: &str = "\
【CRITICAL: Tool Description Reading Requirements - MANDATORY】

**MUST READ COMPLETE DESCRIPTIONS:**
You MUST carefully read the ENTIRE description for EACH tool before using it.

**PAY SPECIAL ATTENTION TO:**
Sections marked with 'CRITICAL', 'MUST', 'REQUIREMENT', 'WORKFLOW', or 'PREREQUISITE'.
These sections contain required setup steps, dependencies on other tools that
must be called FIRST, correct parameter order, and common mistakes to avoid.

**MANDATORY PRACTICE:**
1. BEFORE calling any tool: read its COMPLETE description
2. Follow documented workflows EXACTLY
3. NEVER skip steps marked as 'REQUIRED' or 'MUST'
4. If a description says \"Call X first\", ALWAYS call X first

Skipping these sections will cause operations to FAIL because prerequisite
information or setup will be missing.";

const MARKDOWN_FORMAT_NOTICE: &str = "\
【CRITICAL: Markdown Formatting Requirements - MANDATORY】

**MANDATORY LINE BREAK RULES:**
Use actual newline characters between different points, items, or sections.
- NEVER cram multiple items into one paragraph
- ALWAYS put each bullet point and numbered list item on its own line
- ALWAYS separate sections with blank lines

**MANDATORY STRUCTURE:**
1. Start with a brief summary (2-3 sentences max)
2. Use ## for main sections
3. Use - or * for bullet points
4. Use numbered lists (1. 2. 3.) for steps
5. Use ```language fences for code blocks
6. End with a brief conclusion

**LANGUAGE RULE:**
Respond in the SAME language as the user's message.";

/// Builds the effective system prompt.
pub struct PromptComposer {
    templates: PromptTemplates,
    syntax: CommandSyntax,
}

impl PromptComposer {
    pub fn new(templates: PromptTemplates, syntax: CommandSyntax) -> Self {
        Self { templates, syntax }
    }

    pub fn templates(&self) -> &PromptTemplates {
        &self.templates
    }

    /// Compose the system prompt from the user's base instructions and
    /// the enabled tool descriptors.
    pub fn compose(&self, base_prompt: Option<&str>, tools: &[ToolDescriptor]) -> String {
        let base = match base_prompt {
            Some(p) if !p.trim().is_empty() => p,
            _ => &self.templates.default_system_prompt,
        };

        let enabled: Vec<&ToolDescriptor> = tools.iter().filter(|t| t.enabled).collect();
        if enabled.is_empty() {
            return format!("{base}\n\n{MARKDOWN_FORMAT_NOTICE}");
        }

        let tool_block = self.tool_block(&enabled);
        format!("{tool_block}\n\n{TOOL_READING_NOTICE}\n\n{base}\n\n{MARKDOWN_FORMAT_NOTICE}")
    }

    /// The tool-descriptions block: descriptions grouped by server,
    /// full and untruncated, followed by positional-call guidance.
    fn tool_block(&self, enabled: &[&ToolDescriptor]) -> String {
        let mut desc = String::from("【Available Tools】\nYou can use the following tools:\n\n");

        let mut groups: BTreeMap<&str, Vec<&ToolDescriptor>> = BTreeMap::new();
        for tool in enabled {
            groups
                .entry(tool.server_group.as_deref().unwrap_or("builtin"))
                .or_default()
                .push(tool);
        }

        for (group, tools) in &groups {
            desc.push_str(&format!(
                "─── {} SERVER ───\n   Available tools: {}\n\n",
                group.to_uppercase(),
                tools.len()
            ));

            for tool in tools {
                desc.push_str(&tool.description);
                if !tool.description.contains("CORRECT:")
                    && !tool.description.contains("WRONG:")
                {
                    desc.push_str(
                        "\n\nIMPORTANT: Call with positional arguments only, do NOT use parameter names.",
                    );
                }
                desc.push_str("\n\n");
            }
        }

        let start = &self.syntax.start;
        let sep = &self.syntax.separator;
        desc.push_str("\n【Tool Usage】\n");
        desc.push_str(
            "IMPORTANT: Call tools with POSITIONAL arguments only, NOT named parameters.\n\n",
        );
        desc.push_str(&format!(
            "CORRECT format: {start} tool_name {sep} value1 {sep} value2\n"
        ));
        desc.push_str(&format!(
            "WRONG format: {start} tool_name {sep} param1=value1 {sep} param2=value2\n\n"
        ));
        desc.push_str(&format!("Example: {start} ls {sep} /home/user/documents\n"));
        desc.push_str(&format!("NOT: {start} ls {sep} directory=/home/user/documents\n\n"));

        desc.push_str("【Important Notes】\n");
        desc.push_str("1. Pass ONLY values, do NOT include parameter names\n");
        desc.push_str("2. Pass parameters in the correct order as shown in tool descriptions\n");
        desc.push_str("3. String values should NOT be quoted (unless they contain spaces)\n");
        desc.push_str("4. Use tools based on their descriptions and parameter requirements");

        desc
    }
}
