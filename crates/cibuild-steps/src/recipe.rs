//! Build recipe generation
//!
//! A recipe is one base-image declaration followed by one shell instruction
//! per planned command. Rendering is a pure function of its inputs, so the
//! same configuration and resolved pull specs always give byte-identical
//! text.

use crate::planner::ShellCommand;

/// A single recipe instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Base image declaration
    From(String),
    /// Command executed under `bash -c`
    Run(ShellCommand),
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::From(image) => write!(f, "FROM {image}"),
            Self::Run(command) => write!(f, r#"RUN ["bash", "-c", "{command}"]"#),
        }
    }
}

/// Ordered build instructions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Recipe {
    instructions: Vec<Instruction>,
}

impl Recipe {
    /// Layer `commands` onto `base_image`, preserving their order
    #[must_use]
    pub fn render(base_image: impl Into<String>, commands: Vec<ShellCommand>) -> Self {
        let mut instructions = Vec::with_capacity(commands.len() + 1);
        instructions.push(Instruction::From(base_image.into()));
        instructions.extend(commands.into_iter().map(Instruction::Run));
        Self { instructions }
    }

    /// All instructions, base image first
    #[inline]
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions including the base image line
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Always false: a recipe has at least its base image
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Recipe text: blank line, instructions, blank line
    #[must_use]
    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for instruction in &self.instructions {
            write!(f, "\n{instruction}")?;
        }
        f.write_str("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn base_only_recipe() {
        let recipe = Recipe::render("pipeline:src", Vec::new());
        assert_eq!(recipe.len(), 1);
        assert_eq!(recipe.text(), "\nFROM pipeline:src\n");
    }

    #[test]
    fn renders_run_instructions_in_order() {
        let commands = vec![
            ShellCommand::replace("bundle/manifests", "quay.io/a/op:1", "r/ns/stable:operator").unwrap(),
            ShellCommand::replace("bundle/manifests", "quay.io/a/operand:1", "r/ns/stable:operand").unwrap(),
        ];
        let recipe = Recipe::render("pipeline:src", commands);

        let expected = concat!(
            "\n",
            "FROM pipeline:src\n",
            r#"RUN ["bash", "-c", "find bundle/manifests -type f -exec sed -i 's?quay.io/a/op:1?r/ns/stable:operator?g' {} +"]"#,
            "\n",
            r#"RUN ["bash", "-c", "find bundle/manifests -type f -exec sed -i 's?quay.io/a/operand:1?r/ns/stable:operand?g' {} +"]"#,
            "\n",
        );
        assert_eq!(recipe.text(), expected);
        assert!(matches!(recipe.instructions()[0], Instruction::From(_)));
    }

    #[test]
    fn rendering_is_repeatable() {
        let commands = || vec![ShellCommand::replace("m", "a:1", "b:2").unwrap()];
        let first = Recipe::render("pipeline:src", commands());
        let second = Recipe::render("pipeline:src", commands());
        assert_eq!(first, second);
        assert_eq!(first.text(), second.text());
        assert_eq!(first.text(), first.text());
    }
}
