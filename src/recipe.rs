//! Loading of the user-supplied options recipe (§6, §9).
//!
//! The original loader faked a file's `st_size` to a flat 1024 bytes to cope
//! with process-substitution inputs reporting a size of 0. We stream to EOF
//! instead so the recipe can be arbitrarily long and pipe/process-substitution
//! inputs just work without a magic cap (see SPEC_FULL.md §9).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::StartupError;

/// An immutable, ordered sequence of option-kind bytes, loaded once at
/// startup and shared read-only by every packet for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe(Vec<u8>);

impl Recipe {
    pub fn load(path: &Path) -> Result<Recipe, StartupError> {
        let mut file = File::open(path).map_err(|source| StartupError::RecipeIo {
            path: path.display().to_string(),
            source,
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|source| StartupError::RecipeIo {
                path: path.display().to_string(),
                source,
            })?;

        if bytes.is_empty() {
            return Err(StartupError::EmptyRecipe {
                path: path.display().to_string(),
            });
        }

        Ok(Recipe(bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Builds a recipe directly from an in-memory byte sequence, bypassing
    /// the file loader. Used by tests that exercise the builder/driver
    /// without a recipe file on disk.
    pub fn from_bytes(bytes: Vec<u8>) -> Recipe {
        Recipe(bytes)
    }
}
