//! Substitution planning
//!
//! Each configured substitution becomes one in-place rewrite of every
//! regular file under the manifest directory. The commands are plain text
//! substitution: a pattern that matches nothing is not an error.

use crate::error::RecipeError;
use crate::pullspec::PullSpecResolver;
use cibuild_api::config::{reserved_character, unsafe_path_character, SED_MATCH_REFERENCE};
use cibuild_api::{ExecutionMode, PullSpecSubstitution};

/// One planned in-place rewrite over a manifest directory
///
/// Rendered as a `sed` expression: the search value is a basic regular
/// expression, not a literal, so `.` in a registry host matches any
/// character. `&` would expand to the matched text in the replacement and
/// is rejected there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShellCommand {
    manifest_dir: String,
    search: String,
    replace: String,
}

impl ShellCommand {
    /// Rewrite `search` to `replace` under `manifest_dir`
    ///
    /// # Errors
    /// Fails if either value contains a character reserved by the command
    /// syntax, or the directory contains whitespace or a reserved character;
    /// nothing is escaped.
    pub fn replace(
        manifest_dir: impl Into<String>,
        search: impl Into<String>,
        replace: impl Into<String>,
    ) -> Result<Self, RecipeError> {
        let manifest_dir = manifest_dir.into();
        let search = search.into();
        let replace = replace.into();
        if let Some(character) = unsafe_path_character(&manifest_dir) {
            return Err(RecipeError::UnsafeManifestDir {
                path: manifest_dir,
                character,
            });
        }
        let unsafe_replacement = reserved_character(&replace)
            .or_else(|| replace.chars().find(|c| *c == SED_MATCH_REFERENCE));
        for (value, found) in [
            (&search, reserved_character(&search)),
            (&replace, unsafe_replacement),
        ] {
            if let Some(character) = found {
                return Err(RecipeError::UnsafeSubstitution {
                    value: value.clone(),
                    character,
                });
            }
        }
        Ok(Self {
            manifest_dir,
            search,
            replace,
        })
    }

    /// Directory the rewrite is scoped to
    #[must_use]
    pub fn manifest_dir(&self) -> &str {
        &self.manifest_dir
    }

    /// Pattern searched for
    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Literal written in its place
    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replace
    }
}

impl std::fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "find {} -type f -exec sed -i 's?{}?{}?g' {{}} +",
            self.manifest_dir, self.search, self.replace
        )
    }
}

/// Plan the rewrites for `substitutions`, in input order
///
/// Resolution is fail-fast: the first tag that cannot be resolved aborts
/// planning and no partial plan is returned.
pub async fn plan(
    manifest_dir: &str,
    substitutions: &[PullSpecSubstitution],
    resolver: &PullSpecResolver,
    mode: ExecutionMode,
) -> Result<Vec<ShellCommand>, RecipeError> {
    let mut commands = Vec::with_capacity(substitutions.len());
    for sub in substitutions {
        let replacement = resolver
            .resolve(&sub.with, mode)
            .await
            .map_err(|source| RecipeError::Replacement {
                tag: sub.with.clone(),
                source,
            })?;
        commands.push(ShellCommand::replace(manifest_dir, &sub.pull_spec, replacement)?);
    }
    Ok(commands)
}
